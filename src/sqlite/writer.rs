// ABOUTME: Transactional batch loading of RowSets into the destination database
// ABOUTME: Pages are written as multi-row REPLACE statements with positional parameters

use crate::error::{MigrateError, Result};
use crate::utils::quote_ident;
use crate::value::RowSet;
use rusqlite::Connection;

/// Default number of rows per REPLACE statement
pub const DEFAULT_BATCH_ROWS: usize = 20;

/// Upper bound on host parameters in one statement (SQLITE_MAX_VARIABLE_NUMBER)
pub const MAX_BOUND_PARAMETERS: usize = 32_766;

/// Outcome of loading one page
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub rows: usize,
    pub statements: usize,
}

/// Writes pages into the destination, one transaction per page
pub struct BatchLoader<'conn> {
    conn: &'conn mut Connection,
    batch_rows: usize,
}

impl<'conn> BatchLoader<'conn> {
    pub fn new(conn: &'conn mut Connection, batch_rows: usize) -> Self {
        Self { conn, batch_rows }
    }

    /// Rows per statement for a given column count
    ///
    /// The configured batch size, reduced when needed so that one statement
    /// stays within [`MAX_BOUND_PARAMETERS`].
    pub fn rows_per_statement(&self, columns: usize) -> usize {
        let limit = MAX_BOUND_PARAMETERS / columns.max(1);
        self.batch_rows.min(limit).max(1)
    }

    /// Insert-or-replace every row of a page inside one transaction
    ///
    /// Rows are split into chunks of `batch_rows`; each chunk is a single
    /// `REPLACE INTO "t"("a", "b") VALUES (?,?),(?,?)` statement with all of
    /// its values bound row-major. Rows that share a primary or unique key
    /// with an existing destination row replace it.
    ///
    /// # Errors
    ///
    /// Returns `Exec` if the transaction cannot begin or commit, or if a
    /// statement fails. Work done so far in the page is rolled back.
    pub fn load(&mut self, table: &str, rows: &RowSet) -> Result<LoadStats> {
        if rows.is_empty() {
            return Ok(LoadStats::default());
        }

        let columns = rows.columns();
        if columns.is_empty() {
            return Err(MigrateError::scan(
                format!("page of '{}'", table),
                "result set has no columns",
            ));
        }

        let chunk_rows = self.rows_per_statement(columns.len());
        let prefix = format!(
            "REPLACE INTO {}({}) VALUES ",
            quote_ident(table),
            columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let row_placeholder = format!("({})", vec!["?"; columns.len()].join(","));

        tracing::debug!(
            "Loading {} rows into '{}' in chunks of {}",
            rows.len(),
            table,
            chunk_rows
        );

        let tx = self
            .conn
            .transaction()
            .map_err(|e| MigrateError::exec(format!("begin transaction for '{}'", table), e))?;

        let mut stats = LoadStats::default();

        for (chunk_num, chunk) in rows.rows().chunks(chunk_rows).enumerate() {
            let sql = format!(
                "{}{}",
                prefix,
                vec![row_placeholder.as_str(); chunk.len()].join(",")
            );

            // Full chunks share one SQL text, so the cached statement is reused.
            let mut stmt = tx.prepare_cached(&sql).map_err(|e| {
                MigrateError::exec(format!("prepare replace into '{}'", table), e)
            })?;

            stmt.execute(rusqlite::params_from_iter(chunk.iter().flatten()))
                .map_err(|e| {
                    MigrateError::exec(
                        format!(
                            "replace batch {} ({} rows) into '{}'",
                            chunk_num,
                            chunk.len(),
                            table
                        ),
                        e,
                    )
                })?;

            stats.rows += chunk.len();
            stats.statements += 1;
        }

        tx.commit()
            .map_err(|e| MigrateError::exec(format!("commit page into '{}'", table), e))?;

        Ok(stats)
    }
}
