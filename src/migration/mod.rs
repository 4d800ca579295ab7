// ABOUTME: Migration orchestrator driving the per-table, per-page control flow
// ABOUTME: Ensures each table exists in the destination, then pages rows from source to destination

pub mod report;

pub use report::{MigrationReport, TableReport};

use crate::error::{MigrateError, Result};
use crate::filters::TableFilter;
use crate::sqlite::catalog::{get_table_row_count, lookup_create_statement, Catalog, Table};
use crate::sqlite::reader::PageReader;
use crate::sqlite::writer::BatchLoader;
use crate::sqlite::{open_destination, open_source};
use crate::utils::{sanitize_identifier, validate_source_destination_different};
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use serde::Deserialize;
use std::io::IsTerminal;
use std::path::PathBuf;

/// Where the `CREATE TABLE` statement for a missing destination table comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaSource {
    /// Copy the source table's definition verbatim
    #[default]
    Source,
    /// Look the definition up in the destination's own sqlite_master
    Destination,
}

/// What to do when one table fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the run at the first error
    #[default]
    Abort,
    /// Record the failure and continue with the next table
    SkipTable,
}

/// Everything one run needs to know
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationJob {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub page_size: usize,
    pub batch_rows: usize,
    pub schema_source: SchemaSource,
    pub on_error: FailurePolicy,
    pub filter: TableFilter,
    pub show_progress: bool,
}

/// Per-table lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    NotStarted,
    EnsuringSchema,
    PagingLoop,
    Done,
}

/// Holds both connections for the duration of a run
pub struct Migrator {
    job: MigrationJob,
    source: Connection,
    destination: Connection,
}

/// Open both databases, migrate every selected table, close both databases
///
/// Both connections are closed even when the migration fails; the
/// migration error takes precedence over a close error.
pub fn run(job: MigrationJob) -> Result<MigrationReport> {
    let mut migrator = Migrator::open(job)?;
    let outcome = migrator.migrate();
    let closed = migrator.close();

    let report = outcome?;
    closed?;
    Ok(report)
}

impl Migrator {
    pub fn open(job: MigrationJob) -> Result<Self> {
        validate_source_destination_different(&job.source, &job.destination)?;

        let source = open_source(&job.source)?;
        let destination = open_destination(&job.destination)?;

        Ok(Self {
            job,
            source,
            destination,
        })
    }

    /// Migrate every selected source table, in catalog order
    ///
    /// Both catalogs are read once up front. Under [`FailurePolicy::Abort`]
    /// the first error is returned; tables already migrated stay migrated.
    pub fn migrate(&mut self) -> Result<MigrationReport> {
        let source_catalog = Catalog::load(&self.source)?;
        let destination_catalog = Catalog::load(&self.destination)?;

        tracing::info!(
            "Found {} tables in source, {} in destination",
            source_catalog.len(),
            destination_catalog.len()
        );

        let mut report = MigrationReport::default();

        for table in source_catalog.tables() {
            if !self.job.filter.should_migrate_table(table.name()) {
                tracing::info!(
                    "Skipping table '{}' (filtered)",
                    sanitize_identifier(table.name())
                );
                report.skipped.push(table.name().to_string());
                continue;
            }

            match self.migrate_table(table, &destination_catalog) {
                Ok(table_report) => report.tables.push(table_report),
                Err(e) => match self.job.on_error {
                    FailurePolicy::Abort => return Err(e),
                    FailurePolicy::SkipTable => {
                        tracing::warn!(
                            "Table '{}' failed, continuing: {}",
                            sanitize_identifier(table.name()),
                            e
                        );
                        report.tables.push(TableReport::failed(table.name(), &e));
                    }
                },
            }
        }

        tracing::info!(
            "Migrated {} tables ({} rows, {} failed)",
            report.succeeded().count(),
            report.total_rows(),
            report.failed().count()
        );

        Ok(report)
    }

    /// Run one table through `NotStarted → EnsuringSchema → PagingLoop → Done`
    pub fn migrate_table(&mut self, table: &Table, destination_catalog: &Catalog) -> Result<TableReport> {
        let mut report = TableReport::new(table.name());
        let mut state = TableState::NotStarted;

        while state != TableState::Done {
            tracing::trace!("Table '{}' in state {:?}", table.name(), state);

            state = match state {
                TableState::NotStarted => TableState::EnsuringSchema,
                TableState::EnsuringSchema => {
                    report.created = self.ensure_table(table, destination_catalog)?;
                    if self.job.filter.should_transfer_data(table.name()) {
                        TableState::PagingLoop
                    } else {
                        tracing::info!(
                            "Table '{}' is schema-only, skipping rows",
                            sanitize_identifier(table.name())
                        );
                        TableState::Done
                    }
                }
                TableState::PagingLoop => {
                    self.copy_rows(table, &mut report)?;
                    report.data_transferred = true;
                    TableState::Done
                }
                TableState::Done => TableState::Done,
            };
        }

        tracing::info!(
            "✓ '{}': {} rows in {} pages",
            sanitize_identifier(table.name()),
            report.rows,
            report.pages_loaded
        );

        Ok(report)
    }

    /// Create the table in the destination unless it already exists
    ///
    /// Returns whether a table was created.
    fn ensure_table(&self, table: &Table, destination_catalog: &Catalog) -> Result<bool> {
        if destination_catalog.table_exists(table.name()) {
            tracing::debug!("Table '{}' already exists in destination", table.name());
            return Ok(false);
        }

        let create_sql = match self.job.schema_source {
            SchemaSource::Source => Some(table.create_sql().to_string()),
            SchemaSource::Destination => lookup_create_statement(&self.destination, table.name())?,
        }
        .filter(|sql| !sql.trim().is_empty())
        .ok_or_else(|| MigrateError::MissingDefinition(table.name().to_string()))?;

        self.destination
            .execute_batch(&create_sql)
            .map_err(|e| MigrateError::exec(format!("create table '{}'", table.name()), e))?;

        tracing::info!(
            "Created table '{}' in destination",
            sanitize_identifier(table.name())
        );

        Ok(true)
    }

    /// Read and load pages until a short or empty page ends the table
    fn copy_rows(&mut self, table: &Table, report: &mut TableReport) -> Result<()> {
        let progress = self.progress_bar(table)?;
        let page_size = self.job.page_size;

        let reader = PageReader::new(&self.source, page_size);
        let mut loader = BatchLoader::new(&mut self.destination, self.job.batch_rows);

        let mut page = 1;
        loop {
            let rows = reader.read_page(table, page)?;
            report.pages_read += 1;

            if rows.is_empty() {
                break;
            }

            let stats = loader.load(table.name(), &rows)?;
            report.pages_loaded += 1;
            report.rows += stats.rows;
            report.statements += stats.statements;
            progress.inc(stats.rows as u64);

            tracing::debug!(
                "Page {} of '{}': {} rows in {} statements",
                page,
                table.name(),
                stats.rows,
                stats.statements
            );

            if rows.len() < page_size {
                break;
            }
            page += 1;
        }

        progress.finish_and_clear();
        Ok(())
    }

    /// Bars are drawn only when enabled and stderr is a terminal
    fn draws_progress(&self, stderr_is_terminal: bool) -> bool {
        self.job.show_progress && stderr_is_terminal
    }

    fn progress_bar(&self, table: &Table) -> Result<ProgressBar> {
        // The row count is a full scan; skip it when nothing would be drawn.
        if !self.draws_progress(std::io::stderr().is_terminal()) {
            return Ok(ProgressBar::hidden());
        }

        let total = get_table_row_count(&self.source, table.name())?;
        let style = ProgressStyle::with_template("{msg:>24} [{bar:40}] {pos}/{len} rows")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_message(sanitize_identifier(table.name()));
        Ok(bar)
    }

    /// Close both connections, reporting the first close failure
    pub fn close(self) -> Result<()> {
        let source = self
            .source
            .close()
            .map_err(|(_, e)| MigrateError::exec("close source database", e));
        let destination = self
            .destination
            .close()
            .map_err(|(_, e)| MigrateError::exec("close destination database", e));

        source.and(destination)
    }
}
