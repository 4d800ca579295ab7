// ABOUTME: Table selection rules for a migration run
// ABOUTME: Handles include/exclude lists and tables whose schema is copied without data

use crate::error::{MigrateError, Result};

/// Represents which tables a run touches and which of them receive data
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
    schema_only_tables: Vec<String>,
}

impl TableFilter {
    /// Creates a filter from CLI or config lists
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
        schema_only_tables: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            return Err(MigrateError::Config(
                "Cannot use both include_tables and exclude_tables".to_string(),
            ));
        }

        for list in [&include_tables, &exclude_tables, &schema_only_tables]
            .into_iter()
            .flatten()
        {
            if list.iter().any(|t| t.trim().is_empty()) {
                return Err(MigrateError::Config(
                    "Table names in filters cannot be empty".to_string(),
                ));
            }
        }

        Ok(Self {
            include_tables,
            exclude_tables,
            schema_only_tables: schema_only_tables.unwrap_or_default(),
        })
    }

    /// Creates an empty filter (migrate everything)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Checks if any filters are active
    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none()
            && self.exclude_tables.is_none()
            && self.schema_only_tables.is_empty()
    }

    /// Determines if a table is migrated at all (schema and, usually, data)
    pub fn should_migrate_table(&self, table_name: &str) -> bool {
        if let Some(ref include) = self.include_tables {
            if !include.iter().any(|t| t == table_name) {
                return false;
            }
        }

        if let Some(ref exclude) = self.exclude_tables {
            if exclude.iter().any(|t| t == table_name) {
                return false;
            }
        }

        true
    }

    /// Determines if a migrated table also receives its rows
    pub fn should_transfer_data(&self, table_name: &str) -> bool {
        self.should_migrate_table(table_name)
            && !self.schema_only_tables.iter().any(|t| t == table_name)
    }
}
