// ABOUTME: Outcome of a migration run, per table and in total
// ABOUTME: Counts pages read and loaded so callers can verify paging behaviour

use crate::error::MigrateError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableReport {
    pub name: String,
    /// The table was created in the destination by this run
    pub created: bool,
    /// The paging loop ran (false for schema-only and failed tables)
    pub data_transferred: bool,
    /// Page reads issued, including a trailing empty read
    pub pages_read: usize,
    /// Page loads committed
    pub pages_loaded: usize,
    pub rows: usize,
    /// REPLACE statements executed
    pub statements: usize,
    /// Set when the table failed under the skip-table policy
    pub error: Option<String>,
}

impl TableReport {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn failed(name: &str, error: &MigrateError) -> Self {
        Self {
            name: name.to_string(),
            error: Some(error.format_detailed()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub tables: Vec<TableReport>,
    /// Source tables left out by the table filter
    pub skipped: Vec<String>,
}

impl MigrationReport {
    pub fn table(&self, name: &str) -> Option<&TableReport> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| !t.is_failed())
    }

    pub fn failed(&self) -> impl Iterator<Item = &TableReport> {
        self.tables.iter().filter(|t| t.is_failed())
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows).sum()
    }

    /// All failure messages, one block per table, for the error log
    pub fn failure_summary(&self) -> Option<String> {
        let lines: Vec<String> = self
            .failed()
            .map(|t| {
                format!(
                    "table '{}': {}",
                    t.name,
                    t.error.as_deref().unwrap_or("unknown error")
                )
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}
