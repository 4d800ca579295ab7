// ABOUTME: Migration settings: defaults, TOML config file and CLI overrides
// ABOUTME: Produces the validated MigrationJob the orchestrator runs

use crate::error::{MigrateError, Result};
use crate::filters::TableFilter;
use crate::migration::{FailurePolicy, MigrationJob, SchemaSource};
use crate::sqlite::reader::DEFAULT_PAGE_SIZE;
use crate::sqlite::writer::DEFAULT_BATCH_ROWS;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// On-disk configuration; every field is optional
#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    pub page_size: Option<usize>,
    pub batch_rows: Option<usize>,
    pub schema_source: Option<SchemaSource>,
    pub on_error: Option<FailurePolicy>,
    pub error_log: Option<PathBuf>,
    pub progress: Option<bool>,
    #[serde(default)]
    pub tables: TablesConfig,
}

#[derive(Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TablesConfig {
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub schema_only: Option<Vec<String>>,
}

pub fn load_config_from_file(path: &Path) -> Result<MigrationConfig> {
    let raw = fs::read_to_string(path).map_err(|e| {
        MigrateError::Config(format!(
            "Failed to read config file at {}: {}",
            path.display(),
            e
        ))
    })?;

    toml::from_str(&raw).map_err(|e| {
        MigrateError::Config(format!(
            "Failed to parse TOML config at {}: {}",
            path.display(),
            e
        ))
    })
}

impl MigrationConfig {
    /// Overlay `other` on top of `self`; values set in `other` win
    pub fn merge(self, other: MigrationConfig) -> MigrationConfig {
        MigrationConfig {
            page_size: other.page_size.or(self.page_size),
            batch_rows: other.batch_rows.or(self.batch_rows),
            schema_source: other.schema_source.or(self.schema_source),
            on_error: other.on_error.or(self.on_error),
            error_log: other.error_log.or(self.error_log),
            progress: other.progress.or(self.progress),
            tables: TablesConfig {
                include: other.tables.include.or(self.tables.include),
                exclude: other.tables.exclude.or(self.tables.exclude),
                schema_only: other.tables.schema_only.or(self.tables.schema_only),
            },
        }
    }

    /// Build the job for a source/destination pair, applying defaults
    pub fn into_job(self, source: PathBuf, destination: PathBuf) -> Result<MigrationJob> {
        let page_size = self.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page_size == 0 {
            return Err(MigrateError::Config(
                "page_size must be greater than 0".to_string(),
            ));
        }
        if i64::try_from(page_size).is_err() {
            return Err(MigrateError::Config(format!(
                "page_size must be at most {}",
                i64::MAX
            )));
        }

        let batch_rows = self.batch_rows.unwrap_or(DEFAULT_BATCH_ROWS);
        if batch_rows == 0 {
            return Err(MigrateError::Config(
                "batch_rows must be greater than 0".to_string(),
            ));
        }

        let filter = TableFilter::new(
            self.tables.include,
            self.tables.exclude,
            self.tables.schema_only,
        )?;

        Ok(MigrationJob {
            source,
            destination,
            page_size,
            batch_rows,
            schema_source: self.schema_source.unwrap_or_default(),
            on_error: self.on_error.unwrap_or_default(),
            filter,
            show_progress: self.progress.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_sample_config() {
        let mut tmp = NamedTempFile::new().unwrap();
        let contents = r#"
            page_size = 500
            batch_rows = 50
            schema_source = "destination"
            on_error = "skip-table"
            error_log = "/var/log/migrate.log"

            [tables]
            include = ["trpt", "users"]
            schema_only = ["users"]
        "#;
        write!(tmp, "{}", contents).unwrap();

        let config = load_config_from_file(tmp.path()).unwrap();
        assert_eq!(config.page_size, Some(500));
        assert_eq!(config.batch_rows, Some(50));
        assert_eq!(config.schema_source, Some(SchemaSource::Destination));
        assert_eq!(config.on_error, Some(FailurePolicy::SkipTable));
        assert_eq!(config.error_log, Some(PathBuf::from("/var/log/migrate.log")));

        let job = config
            .into_job(PathBuf::from("a.db"), PathBuf::from("b.db"))
            .unwrap();
        assert!(job.filter.should_migrate_table("trpt"));
        assert!(!job.filter.should_migrate_table("posts"));
        assert!(!job.filter.should_transfer_data("users"));
    }

    #[test]
    fn defaults_apply_when_unset() {
        let job = MigrationConfig::default()
            .into_job(PathBuf::from("a.db"), PathBuf::from("b.db"))
            .unwrap();

        assert_eq!(job.page_size, 10_000);
        assert_eq!(job.batch_rows, 20);
        assert_eq!(job.schema_source, SchemaSource::Source);
        assert_eq!(job.on_error, FailurePolicy::Abort);
        assert!(job.filter.is_empty());
        assert!(job.show_progress);
    }

    #[test]
    fn merge_prefers_overrides() {
        let file = MigrationConfig {
            page_size: Some(100),
            batch_rows: Some(10),
            ..Default::default()
        };
        let cli = MigrationConfig {
            page_size: Some(5),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.page_size, Some(5));
        assert_eq!(merged.batch_rows, Some(10));
    }

    #[test]
    fn zero_sizes_rejected() {
        let config = MigrationConfig {
            page_size: Some(0),
            ..Default::default()
        };
        let result = config.into_job(PathBuf::from("a.db"), PathBuf::from("b.db"));
        assert!(matches!(result, Err(MigrateError::Config(_))));

        let config = MigrationConfig {
            batch_rows: Some(0),
            ..Default::default()
        };
        assert!(config
            .into_job(PathBuf::from("a.db"), PathBuf::from("b.db"))
            .is_err());
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn page_size_beyond_sql_integer_rejected() {
        let config = MigrationConfig {
            page_size: Some(i64::MAX as usize + 1),
            ..Default::default()
        };
        let result = config.into_job(PathBuf::from("a.db"), PathBuf::from("b.db"));
        assert!(matches!(result, Err(MigrateError::Config(msg)) if msg.contains("at most")));

        let config = MigrationConfig {
            page_size: Some(i64::MAX as usize),
            ..Default::default()
        };
        assert!(config
            .into_job(PathBuf::from("a.db"), PathBuf::from("b.db"))
            .is_ok());
    }

    #[test]
    fn unknown_keys_rejected() {
        let mut tmp = NamedTempFile::new().unwrap();
        write!(tmp, "pagesize = 10").unwrap();

        let result = load_config_from_file(tmp.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Failed to parse"));
    }
}
