// ABOUTME: Error taxonomy for the migration engine
// ABOUTME: Distinguishes open, query, scan and exec failures so the driver can pick a policy

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for migration operations.
#[derive(Error, Debug)]
pub enum MigrateError {
    /// A database file could not be opened
    #[error("Failed to open database {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// A database path was rejected before opening it
    #[error("Invalid database path: {0}")]
    InvalidPath(String),

    /// A metadata or data query failed
    #[error("Query failed ({context}): {source}")]
    Query {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// A fetched row could not be decoded
    #[error("Failed to decode {context}: {message}")]
    Scan { context: String, message: String },

    /// A create-table or replace statement failed
    #[error("Statement failed ({context}): {source}")]
    Exec {
        context: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Table creation found no create statement to run
    #[error("No create statement for table '{0}' in the destination schema")]
    MissingDefinition(String),

    /// Invalid configuration (bad TOML, out-of-range values, conflicting flags)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (config and log file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl MigrateError {
    pub fn query(context: impl Into<String>, source: rusqlite::Error) -> Self {
        MigrateError::Query {
            context: context.into(),
            source,
        }
    }

    pub fn exec(context: impl Into<String>, source: rusqlite::Error) -> Self {
        MigrateError::Exec {
            context: context.into(),
            source,
        }
    }

    pub fn scan(context: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::Scan {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Short category name, used as the prefix of error log entries
    pub fn kind(&self) -> &'static str {
        match self {
            MigrateError::Open { .. } | MigrateError::InvalidPath(_) => "OpenError",
            MigrateError::Query { .. } => "QueryError",
            MigrateError::Scan { .. } => "ScanError",
            MigrateError::Exec { .. } | MigrateError::MissingDefinition(_) => "ExecError",
            MigrateError::Config(_) => "ConfigError",
            MigrateError::Io(_) => "IoError",
        }
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("{}: {}", self.kind(), self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for migration operations.
pub type Result<T> = std::result::Result<T, MigrateError>;
