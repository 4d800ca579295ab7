// ABOUTME: Paged extraction of table rows from the source database
// ABOUTME: Each page is a bounded LIMIT/OFFSET query decoded into a RowSet

use crate::error::{MigrateError, Result};
use crate::sqlite::catalog::Table;
use crate::sqlite::decoder::{decode_value, ColumnKind};
use crate::utils::quote_ident;
use crate::value::RowSet;
use rusqlite::Connection;

/// Default number of rows fetched per page
pub const DEFAULT_PAGE_SIZE: usize = 10_000;

/// Reads a table one bounded page at a time
pub struct PageReader<'conn> {
    conn: &'conn Connection,
    page_size: usize,
}

impl<'conn> PageReader<'conn> {
    pub fn new(conn: &'conn Connection, page_size: usize) -> Self {
        Self { conn, page_size }
    }

    /// Read one page of a table; pages are numbered from 1
    ///
    /// Returns the rows at offset `(page - 1) * page_size`, at most
    /// `page_size` of them. An empty RowSet means the table is exhausted.
    ///
    /// # Errors
    ///
    /// - `Query` if the statement cannot be prepared or executed
    /// - `Scan` if a row cannot be fetched or a value cannot be decoded
    pub fn read_page(&self, table: &Table, page: usize) -> Result<RowSet> {
        if page == 0 {
            return Err(MigrateError::Config(
                "page numbers start at 1".to_string(),
            ));
        }

        let offset = (page - 1).checked_mul(self.page_size).ok_or_else(|| {
            MigrateError::Config(format!("page {} of '{}' is out of range", page, table.name()))
        })?;
        let limit = i64::try_from(self.page_size).map_err(|_| {
            MigrateError::Config(format!("page size {} is too large", self.page_size))
        })?;
        let sql_offset = i64::try_from(offset).map_err(|_| {
            MigrateError::Config(format!("page {} of '{}' is out of range", page, table.name()))
        })?;

        let query = format!(
            "SELECT {} FROM {} LIMIT ?1 OFFSET ?2",
            table.select_list(),
            quote_ident(table.name())
        );

        let mut stmt = self
            .conn
            .prepare_cached(&query)
            .map_err(|e| MigrateError::query(format!("prepare page read of '{}'", table.name()), e))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let kinds = ColumnKind::for_columns(table, &columns);

        tracing::debug!(
            "Reading page {} of '{}' (offset {}, limit {})",
            page,
            table.name(),
            offset,
            self.page_size
        );

        let mut rows = stmt
            .query(rusqlite::params![limit, sql_offset])
            .map_err(|e| MigrateError::query(format!("read page {} of '{}'", page, table.name()), e))?;

        let mut row_set = RowSet::new(columns);
        let mut row_num = offset;

        while let Some(row) = rows.next().map_err(|e| {
            MigrateError::scan(
                format!("row {} of '{}'", row_num + 1, table.name()),
                e.to_string(),
            )
        })? {
            row_num += 1;

            let mut values = Vec::with_capacity(kinds.len());
            for (idx, kind) in kinds.iter().enumerate() {
                let raw = row.get_ref(idx).map_err(|e| {
                    MigrateError::scan(
                        format!("row {} of '{}'", row_num, table.name()),
                        e.to_string(),
                    )
                })?;

                let value = decode_value(raw, *kind).map_err(|e| {
                    MigrateError::scan(
                        format!(
                            "row {} column '{}' of '{}'",
                            row_num,
                            row_set.columns()[idx],
                            table.name()
                        ),
                        e.to_string(),
                    )
                })?;
                values.push(value);
            }

            row_set.push(values)?;
        }

        Ok(row_set)
    }
}
