// ABOUTME: Converts rusqlite runtime values into canonical cell values
// ABOUTME: The declared column type decides blob-vs-text, timestamps and booleans

use crate::error::{MigrateError, Result};
use crate::sqlite::catalog::Table;
use crate::value::Value;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use rusqlite::types::ValueRef;

/// Offset-carrying layouts accepted for timestamp columns
const OFFSET_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
];

/// Layouts without an offset; these are read as UTC
const NAIVE_TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// What the declared type asks the decoder to do with a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Binary payloads stay binary
    Blob,
    /// Text that parses as a date/time becomes a timestamp
    Timestamp,
    /// Integers become booleans
    Boolean,
    /// Everything else; binary payloads are read as UTF-8 text
    Plain,
}

impl ColumnKind {
    /// Classify a declared type such as `BLOB`, `DATETIME` or `boolean`
    pub fn from_declared_type(declared: &str) -> Self {
        let base = declared
            .split('(')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase();

        match base.as_str() {
            "BLOB" => ColumnKind::Blob,
            "DATE" | "DATETIME" | "TIMESTAMP" => ColumnKind::Timestamp,
            "BOOLEAN" | "BOOL" => ColumnKind::Boolean,
            _ => ColumnKind::Plain,
        }
    }

    /// Resolve the kind of every column of a result set, in column order
    pub fn for_columns(table: &Table, columns: &[String]) -> Vec<Self> {
        columns
            .iter()
            .map(|c| ColumnKind::from_declared_type(table.declared_type(c)))
            .collect()
    }
}

/// Convert a single SQLite value to a canonical [`Value`]
///
/// Classification order: integer, text, timestamp, boolean, binary. Only
/// a binary payload consults the declared type for blob-vs-text:
/// - declared `BLOB` → raw bytes
/// - anything else → UTF-8 text; bytes that are not valid UTF-8 stay
///   binary rather than being altered
///
/// # Errors
///
/// Text storage that is not valid UTF-8 cannot be represented and is a
/// scan error.
pub fn decode_value(value: ValueRef<'_>, kind: ColumnKind) -> Result<Value> {
    match value {
        ValueRef::Null => Ok(Value::Null),

        ValueRef::Integer(i) if kind == ColumnKind::Boolean => Ok(Value::Boolean(i > 0)),
        ValueRef::Integer(i) => Ok(Value::Integer(i)),

        ValueRef::Real(f) => Ok(Value::Real(f)),

        ValueRef::Text(bytes) => {
            let text = std::str::from_utf8(bytes)
                .map_err(|e| MigrateError::scan("text value", e.to_string()))?;

            if kind == ColumnKind::Timestamp {
                if let Some(ts) = parse_timestamp(text) {
                    return Ok(Value::Timestamp(ts));
                }
            }

            Ok(Value::Text(text.to_string()))
        }

        ValueRef::Blob(bytes) if kind == ColumnKind::Blob => Ok(Value::Blob(bytes.to_vec())),
        ValueRef::Blob(bytes) => match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(Value::Text(text)),
            Err(e) => {
                tracing::warn!(
                    "Binary value in non-BLOB column is not valid UTF-8, keeping it binary: {}",
                    e.utf8_error()
                );
                Ok(Value::Blob(e.into_bytes()))
            }
        },
    }
}

/// Parse the timestamp layouts SQLite applications commonly store
///
/// A trailing `Z` is treated as UTC. Values without an offset are UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<FixedOffset>> {
    let trimmed = text.trim();
    let utc = FixedOffset::east_opt(0)?;

    if let Some(stripped) = trimmed.strip_suffix('Z') {
        return parse_naive(stripped).map(|naive| utc.from_utc_datetime(&naive));
    }

    for format in OFFSET_TIMESTAMP_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }

    parse_naive(trimmed).map(|naive| utc.from_utc_datetime(&naive))
}

fn parse_naive(text: &str) -> Option<NaiveDateTime> {
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive);
        }
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_kind_from_declared_type() {
        assert_eq!(ColumnKind::from_declared_type("BLOB"), ColumnKind::Blob);
        assert_eq!(ColumnKind::from_declared_type("blob"), ColumnKind::Blob);
        assert_eq!(
            ColumnKind::from_declared_type("DATETIME"),
            ColumnKind::Timestamp
        );
        assert_eq!(
            ColumnKind::from_declared_type("TIMESTAMP(6)"),
            ColumnKind::Timestamp
        );
        assert_eq!(
            ColumnKind::from_declared_type("BOOLEAN"),
            ColumnKind::Boolean
        );
        assert_eq!(ColumnKind::from_declared_type("TEXT"), ColumnKind::Plain);
        assert_eq!(ColumnKind::from_declared_type(""), ColumnKind::Plain);
    }

    #[test]
    fn test_decode_integer_real_null() {
        assert_eq!(
            decode_value(ValueRef::Integer(42), ColumnKind::Plain).unwrap(),
            Value::Integer(42)
        );
        assert_eq!(
            decode_value(ValueRef::Real(42.75), ColumnKind::Plain).unwrap(),
            Value::Real(42.75)
        );
        assert_eq!(
            decode_value(ValueRef::Null, ColumnKind::Blob).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_decode_blob_depends_on_declared_type() {
        let bytes = b"Hello";
        assert_eq!(
            decode_value(ValueRef::Blob(bytes), ColumnKind::Blob).unwrap(),
            Value::Blob(bytes.to_vec())
        );
        assert_eq!(
            decode_value(ValueRef::Blob(bytes), ColumnKind::Plain).unwrap(),
            Value::Text("Hello".to_string())
        );
    }

    #[test]
    fn test_decode_invalid_utf8_blob_stays_binary() {
        let bytes: [u8; 3] = [0xff, 0xfe, 0x00];
        assert_eq!(
            decode_value(ValueRef::Blob(&bytes), ColumnKind::Plain).unwrap(),
            Value::Blob(bytes.to_vec())
        );
    }

    #[test]
    fn test_decode_invalid_utf8_text_is_scan_error() {
        let result = decode_value(ValueRef::Text(&[0xff, 0xfe]), ColumnKind::Plain);
        assert!(matches!(result, Err(MigrateError::Scan { .. })));
    }

    #[test]
    fn test_decode_boolean() {
        assert_eq!(
            decode_value(ValueRef::Integer(1), ColumnKind::Boolean).unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            decode_value(ValueRef::Integer(0), ColumnKind::Boolean).unwrap(),
            Value::Boolean(false)
        );
        assert_eq!(
            decode_value(ValueRef::Text(b"yes"), ColumnKind::Boolean).unwrap(),
            Value::Text("yes".to_string())
        );
    }

    #[test]
    fn test_decode_timestamp_text() {
        let value = decode_value(ValueRef::Text(b"2024-01-02 03:04:05"), ColumnKind::Timestamp)
            .unwrap();
        let expected = DateTime::parse_from_rfc3339("2024-01-02T03:04:05+00:00").unwrap();
        assert_eq!(value, Value::Timestamp(expected));

        let unparsable = decode_value(ValueRef::Text(b"yesterday"), ColumnKind::Timestamp).unwrap();
        assert_eq!(unparsable, Value::Text("yesterday".to_string()));

        let plain = decode_value(ValueRef::Text(b"2024-01-02"), ColumnKind::Plain).unwrap();
        assert_eq!(plain, Value::Text("2024-01-02".to_string()));
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        let with_offset = parse_timestamp("2024-01-02 03:04:05.123+02:00").unwrap();
        assert_eq!(with_offset.offset().local_minus_utc(), 7200);
        assert_eq!(with_offset.timestamp_subsec_millis(), 123);

        let zulu = parse_timestamp("2024-01-02T03:04:05Z").unwrap();
        assert_eq!(zulu.offset().local_minus_utc(), 0);

        let date_only = parse_timestamp("2024-01-02").unwrap();
        assert_eq!(date_only.to_rfc3339(), "2024-01-02T00:00:00+00:00");

        let minutes = parse_timestamp("2024-01-02 03:04").unwrap();
        assert_eq!(minutes.to_rfc3339(), "2024-01-02T03:04:00+00:00");

        assert!(parse_timestamp("not a date").is_none());
    }
}
