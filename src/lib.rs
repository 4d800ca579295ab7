// ABOUTME: Library module for sqlite-migrate
// ABOUTME: Exports the migration engine for use in the binary and tests

pub mod config;
pub mod error;
pub mod error_log;
pub mod filters;
pub mod migration;
pub mod sqlite;
pub mod utils;
pub mod value;

pub use error::{MigrateError, Result};
pub use migration::{run, MigrationJob, MigrationReport};
