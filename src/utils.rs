// ABOUTME: Utility functions for identifier handling and path safety
// ABOUTME: Provides SQL identifier quoting, log-safe display and source/destination checks

use crate::error::{MigrateError, Result};
use std::path::Path;

/// Quote an SQLite identifier for direct interpolation into SQL text
///
/// Wraps the identifier in double quotes and doubles any embedded double
/// quote, which is the SQL-standard escaping SQLite accepts for every
/// identifier. Values are never interpolated; they are always bound.
///
/// # Examples
///
/// ```
/// # use sqlite_migrate::utils::quote_ident;
/// assert_eq!(quote_ident("users"), "\"users\"");
/// assert_eq!(quote_ident("my \"odd\" table"), "\"my \"\"odd\"\" table\"");
/// ```
pub fn quote_ident(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Sanitize an identifier (table name, column name) for display
///
/// Removes control characters and limits length to prevent log injection and
/// keep error messages readable.
///
/// **Note**: This is for display purposes only. For SQL, use [`quote_ident`].
///
/// # Examples
///
/// ```
/// # use sqlite_migrate::utils::sanitize_identifier;
/// assert_eq!(sanitize_identifier("normal_table"), "normal_table");
/// assert_eq!(sanitize_identifier("table\nname"), "tablename");
/// assert_eq!(sanitize_identifier(&"a".repeat(200)).len(), 100);
/// ```
pub fn sanitize_identifier(identifier: &str) -> String {
    identifier
        .chars()
        .filter(|c| !c.is_control())
        .take(100)
        .collect()
}

/// Validate that source and destination are different database files
///
/// Writing the destination while it is also open as the source would
/// replace rows with themselves at best and corrupt the read cursor at
/// worst. A destination that does not exist yet can never be the source.
pub fn validate_source_destination_different(source: &Path, destination: &Path) -> Result<()> {
    let source_canonical = match source.canonicalize() {
        Ok(path) => path,
        Err(_) => return Ok(()),
    };
    let destination_canonical = match destination.canonicalize() {
        Ok(path) => path,
        Err(_) => return Ok(()),
    };

    if source_canonical == destination_canonical {
        return Err(MigrateError::InvalidPath(format!(
            "source and destination are the same file: {}",
            source_canonical.display()
        )));
    }

    Ok(())
}
