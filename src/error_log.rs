// ABOUTME: Failure marker file written when a run aborts
// ABOUTME: Holds the last error message; removed again after a fully successful run

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// File name used when no explicit error log path is configured
pub const DEFAULT_ERROR_LOG_NAME: &str = "migrateError.log";

/// The error log of one run
///
/// Its presence after a run signals that the run (or an earlier one not
/// followed by a successful run) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLog {
    path: PathBuf,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Error log placed next to the running executable
    pub fn beside_executable() -> io::Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self::new(dir.join(DEFAULT_ERROR_LOG_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the log contents with `message`
    ///
    /// Written to a temporary file in the same directory and renamed into
    /// place, so a reader never sees a half-written log.
    pub fn record(&self, message: &str) -> io::Result<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(message.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!("Wrote error log {}", self.path.display());
        Ok(())
    }

    /// Remove the log; a missing file is not an error
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed stale error log {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn record_then_clear() {
        let dir = tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join(DEFAULT_ERROR_LOG_NAME));

        log.record("QueryError: no such table: users").unwrap();
        assert!(log.exists());
        let contents = fs::read_to_string(log.path()).unwrap();
        assert_eq!(contents, "QueryError: no such table: users\n");

        log.clear().unwrap();
        assert!(!log.exists());
    }

    #[test]
    fn record_overwrites_previous_message() {
        let dir = tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("nested").join("errors.log"));

        log.record("first").unwrap();
        log.record("second").unwrap();

        assert_eq!(fs::read_to_string(log.path()).unwrap(), "second\n");
    }

    #[test]
    fn clear_missing_file_is_ok() {
        let dir = tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("never-written.log"));
        assert!(log.clear().is_ok());
    }

    #[test]
    fn default_location_is_next_to_executable() {
        let log = ErrorLog::beside_executable().unwrap();
        assert_eq!(
            log.path().file_name().unwrap().to_str().unwrap(),
            DEFAULT_ERROR_LOG_NAME
        );
    }
}
