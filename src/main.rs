// ABOUTME: CLI entry point for sqlite-migrate
// ABOUTME: Parses arguments, runs the migration and maintains the error log file

use anyhow::{bail, Context};
use clap::Parser;
use sqlite_migrate::config::{load_config_from_file, MigrationConfig, TablesConfig};
use sqlite_migrate::error_log::ErrorLog;
use sqlite_migrate::migration::{self, FailurePolicy, SchemaSource};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sqlite-migrate")]
#[command(about = "Copy every table of one SQLite database into another", long_about = None)]
struct Cli {
    /// Source database file followed by destination database file
    #[arg(value_name = "DB")]
    paths: Vec<PathBuf>,
    /// Rows fetched from the source per page (default 10000)
    #[arg(long)]
    page_size: Option<usize>,
    /// Rows per REPLACE statement (default 20)
    #[arg(long)]
    batch_rows: Option<usize>,
    /// Where CREATE TABLE statements for missing tables come from
    #[arg(long, value_enum)]
    schema_source: Option<SchemaSource>,
    /// Stop at the first failing table, or skip it and continue
    #[arg(long, value_enum)]
    on_error: Option<FailurePolicy>,
    /// Migrate only these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    include_tables: Option<Vec<String>>,
    /// Do not migrate these tables (comma-separated)
    #[arg(long, value_delimiter = ',')]
    exclude_tables: Option<Vec<String>>,
    /// Create these tables but copy no rows (comma-separated)
    #[arg(long, value_delimiter = ',')]
    schema_only: Option<Vec<String>>,
    /// TOML file with migration settings; flags override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Error log path (default: migrateError.log next to the executable)
    #[arg(long)]
    error_log: Option<PathBuf>,
    /// Disable per-table progress bars
    #[arg(long)]
    no_progress: bool,
}

impl Cli {
    fn overrides(&self) -> MigrationConfig {
        MigrationConfig {
            page_size: self.page_size,
            batch_rows: self.batch_rows,
            schema_source: self.schema_source,
            on_error: self.on_error,
            error_log: self.error_log.clone(),
            progress: self.no_progress.then_some(false),
            tables: TablesConfig {
                include: self.include_tables.clone(),
                exclude: self.exclude_tables.clone(),
                schema_only: self.schema_only.clone(),
            },
        }
    }
}

fn print_usage() {
    println!("usage: sqlite-migrate <SOURCE_DB> <DESTINATION_DB> [OPTIONS]");
    println!("copies every table of SOURCE_DB into DESTINATION_DB; see --help for options");
}

fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let [source, destination] = match <[PathBuf; 2]>::try_from(cli.paths.clone()) {
        Ok(paths) => paths,
        Err(_) => {
            print_usage();
            return Ok(());
        }
    };

    let file_config = match &cli.config {
        Some(path) => load_config_from_file(path),
        None => Ok(MigrationConfig::default()),
    };

    let error_log_path = cli.error_log.clone().or_else(|| {
        file_config
            .as_ref()
            .ok()
            .and_then(|config| config.error_log.clone())
    });
    let error_log = match error_log_path {
        Some(path) => ErrorLog::new(path),
        None => ErrorLog::beside_executable()
            .context("Failed to locate the executable directory for the error log")?,
    };

    let outcome = file_config
        .and_then(|config| config.merge(cli.overrides()).into_job(source, destination))
        .and_then(migration::run);

    match outcome {
        Ok(report) => {
            if let Some(summary) = report.failure_summary() {
                eprintln!("run error:\n{}", summary);
                error_log.record(&summary).with_context(|| {
                    format!("Failed to write error log {}", error_log.path().display())
                })?;
                bail!(
                    "{} table(s) failed; details in {}",
                    report.failed().count(),
                    error_log.path().display()
                );
            }

            error_log.clear().with_context(|| {
                format!("Failed to remove error log {}", error_log.path().display())
            })?;

            tracing::info!(
                "✓ Migration complete: {} tables, {} rows ({} skipped by filter)",
                report.tables.len(),
                report.total_rows(),
                report.skipped.len()
            );
            Ok(())
        }
        Err(e) => {
            let message = e.format_detailed();
            eprintln!("run error: {}", message);
            if let Err(log_err) = error_log.record(&message) {
                tracing::error!(
                    "Failed to write error log {}: {}",
                    error_log.path().display(),
                    log_err
                );
            }
            Err(anyhow::Error::new(e).context("Migration failed"))
        }
    }
}
