// ABOUTME: SQLite connection handling for both ends of a migration
// ABOUTME: Validates file paths and opens the source read-only and the destination read-write

pub mod catalog;
pub mod decoder;
pub mod reader;
pub mod writer;

use crate::error::{MigrateError, Result};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

/// Validate a source database path
///
/// Security checks:
/// - Canonicalizes path to resolve symlinks and relative paths
/// - Verifies file exists and is a regular file (not directory)
///
/// Any file name is accepted: SQLite files are frequently stored with
/// application-specific extensions.
///
/// # Returns
///
/// Canonicalized absolute path if valid, error otherwise
pub fn validate_sqlite_path(path: &Path) -> Result<PathBuf> {
    if path.as_os_str().is_empty() {
        return Err(MigrateError::InvalidPath(
            "SQLite file path cannot be empty".to_string(),
        ));
    }

    let canonical = path.canonicalize().map_err(|e| {
        MigrateError::InvalidPath(format!(
            "failed to resolve '{}': {}. File may not exist or may not be readable.",
            path.display(),
            e
        ))
    })?;

    if !canonical.is_file() {
        return Err(MigrateError::InvalidPath(format!(
            "'{}' is not a regular file (may be a directory)",
            path.display()
        )));
    }

    tracing::debug!("Validated SQLite path: {}", canonical.display());

    Ok(canonical)
}

/// Open the source database in read-only mode
///
/// The file must already exist. The connection is probed with a trivial
/// query so that a non-database file fails here rather than mid-migration.
pub fn open_source(path: &Path) -> Result<Connection> {
    let canonical = validate_sqlite_path(path)?;

    tracing::info!("Opening source database: {}", canonical.display());

    let conn = Connection::open_with_flags(
        &canonical,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|source| MigrateError::Open {
        path: canonical.clone(),
        source,
    })?;

    probe(&conn, &canonical)?;

    Ok(conn)
}

/// Open the destination database for writing, creating the file if missing
pub fn open_destination(path: &Path) -> Result<Connection> {
    if path.as_os_str().is_empty() {
        return Err(MigrateError::InvalidPath(
            "SQLite file path cannot be empty".to_string(),
        ));
    }

    tracing::info!("Opening destination database: {}", path.display());

    let conn = Connection::open(path).map_err(|source| MigrateError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    probe(&conn, path)?;

    Ok(conn)
}

fn probe(conn: &Connection, path: &Path) -> Result<()> {
    // sqlite_master is only read once the header is parsed, so this also
    // rejects files that are not databases.
    let tables: i64 = conn
        .query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get(0))
        .map_err(|source| MigrateError::Open {
            path: path.to_path_buf(),
            source,
        })?;

    tracing::debug!(
        "Opened {} ({} schema entries)",
        path.display(),
        tables
    );

    Ok(())
}
