// ABOUTME: Schema catalog built from sqlite_master for source and destination
// ABOUTME: Lists tables, parses declared column types from CREATE TABLE text and looks them up

use crate::error::{MigrateError, Result};
use crate::utils::{quote_ident, sanitize_identifier};
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;

/// Keywords that open a table-level constraint instead of a column definition
const TABLE_CONSTRAINT_KEYWORDS: &[&str] = &["CONSTRAINT", "PRIMARY", "UNIQUE", "CHECK", "FOREIGN"];

/// Keywords that may directly follow a column name when no type is declared
const COLUMN_CONSTRAINT_KEYWORDS: &[&str] = &[
    "CONSTRAINT",
    "PRIMARY",
    "NOT",
    "NULL",
    "UNIQUE",
    "CHECK",
    "DEFAULT",
    "COLLATE",
    "REFERENCES",
    "GENERATED",
    "AS",
];

/// One table and the declared type of each of its columns
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    create_sql: String,
    column_types: HashMap<String, String>,
    stored_columns: Vec<String>,
}

impl Table {
    /// Build a table entry from its name and `CREATE TABLE` text
    pub fn from_definition(name: impl Into<String>, create_sql: impl Into<String>) -> Self {
        let create_sql = create_sql.into();
        let column_types = parse_column_types(&create_sql);
        Self {
            name: name.into(),
            create_sql,
            column_types,
            stored_columns: Vec::new(),
        }
    }

    /// Attach the columns that hold stored data, see [`list_stored_columns`]
    pub fn with_stored_columns(mut self, columns: Vec<String>) -> Self {
        self.stored_columns = columns;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn create_sql(&self) -> &str {
        &self.create_sql
    }

    /// Column list for reading rows out of this table
    ///
    /// Generated columns are left out since the destination computes them
    /// itself and refuses explicit values for them. A table whose columns
    /// were never looked up reads `*`.
    pub fn select_list(&self) -> String {
        if self.stored_columns.is_empty() {
            return "*".to_string();
        }
        self.stored_columns
            .iter()
            .map(|c| quote_ident(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Declared type of a column, or `""` when the column is unknown or untyped
    ///
    /// Both sides are bracket-normalized, so `data`, `[data]`, `"data"` and
    /// `` `data` `` all resolve to the same entry.
    pub fn declared_type(&self, column: &str) -> &str {
        self.column_types
            .get(&normalize_column_key(column))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// The tables of one database, loaded once and read-only afterwards
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: Vec<Table>,
}

impl Catalog {
    /// Read every user table from `sqlite_master`
    pub fn load(conn: &Connection) -> Result<Self> {
        let tables = list_tables(conn)?
            .into_iter()
            .map(|(name, create_sql)| {
                // Virtual tables whose module is not loaded cannot be
                // inspected; they fail later at read time, under the policy.
                let columns = list_stored_columns(conn, &name).unwrap_or_else(|e| {
                    tracing::warn!(
                        "Could not list columns of '{}', reading all columns: {}",
                        sanitize_identifier(&name),
                        e
                    );
                    Vec::new()
                });
                Table::from_definition(name, create_sql).with_stored_columns(columns)
            })
            .collect();
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn get(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Exact-match lookup by table name
    pub fn table_exists(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// List all user tables with their definition text, in catalog order
///
/// SQLite-internal tables (`sqlite_sequence`, `sqlite_stat1`, ...) are
/// skipped; they are maintained by the engine and cannot be created by hand.
pub fn list_tables(conn: &Connection) -> Result<Vec<(String, String)>> {
    tracing::debug!("Listing tables from sqlite_master");

    let mut stmt = conn
        .prepare(
            "SELECT name, sql FROM sqlite_master \
             WHERE type='table' \
             AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY rowid",
        )
        .map_err(|e| MigrateError::query("prepare table listing", e))?;

    let tables = stmt
        .query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
            ))
        })
        .map_err(|e| MigrateError::query("list tables", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MigrateError::query("collect table list", e))?;

    tracing::debug!("Found {} user tables", tables.len());

    Ok(tables)
}

/// Names of the columns that hold stored data, in declaration order
///
/// `PRAGMA table_xinfo` marks hidden columns with a non-zero `hidden`
/// field: 1 for virtual-table hidden columns, 2 and 3 for generated ones.
pub fn list_stored_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let query = format!("PRAGMA table_xinfo({})", quote_ident(table));
    let mut stmt = conn
        .prepare(&query)
        .map_err(|e| MigrateError::query(format!("get column info for '{}'", table), e))?;

    let columns = stmt
        .query_map([], |row| Ok((row.get::<_, String>(1)?, row.get::<_, i64>(6)?)))
        .map_err(|e| MigrateError::query(format!("list columns of '{}'", table), e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| MigrateError::query(format!("collect columns of '{}'", table), e))?;

    Ok(columns
        .into_iter()
        .filter(|(_, hidden)| *hidden == 0)
        .map(|(name, _)| name)
        .collect())
}

/// Look up a table's `CREATE TABLE` statement by name
pub fn lookup_create_statement(conn: &Connection, name: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT sql FROM sqlite_master WHERE type='table' AND name=?1",
        [name],
        |row| row.get::<_, Option<String>>(0),
    )
    .optional()
    .map(Option::flatten)
    .map_err(|e| MigrateError::query(format!("look up definition of '{}'", name), e))
}

/// Get row count for a table
pub fn get_table_row_count(conn: &Connection, table: &str) -> Result<usize> {
    let query = format!("SELECT COUNT(*) FROM {}", quote_ident(table));

    let count: i64 = conn
        .query_row(&query, [], |row| row.get(0))
        .map_err(|e| MigrateError::query(format!("count rows in '{}'", table), e))?;

    Ok(count.max(0) as usize)
}

/// Parse column name → declared type pairs from `CREATE TABLE` text
///
/// Takes the text between the first `(` and the last `)`, drops SQL
/// comments, splits it on commas and whitespace that sit outside
/// parentheses and quotes, and
/// records the first token as the column name and the second (uppercased)
/// as its declared type. Table constraints are skipped. Keys are stored in
/// bracketed form, see [`normalize_column_key`].
pub fn parse_column_types(create_sql: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();

    let (Some(open), Some(close)) = (create_sql.find('('), create_sql.rfind(')')) else {
        return result;
    };
    if close <= open {
        return result;
    }

    let body = strip_comments(&create_sql[open + 1..close]);
    for fragment in split_top_level(&body, |c| c == ',') {
        let tokens = split_top_level(fragment, char::is_whitespace);
        let Some(name) = tokens.first() else {
            continue;
        };

        if is_keyword(name, TABLE_CONSTRAINT_KEYWORDS) {
            continue;
        }

        let declared = match tokens.get(1) {
            Some(token) if !is_keyword(token, COLUMN_CONSTRAINT_KEYWORDS) => token.to_uppercase(),
            _ => String::new(),
        };

        result.insert(normalize_column_key(name), declared);
    }

    result
}

/// Canonical bracketed form of a column name used as the lookup key
///
/// One layer of SQLite identifier quoting (`[x]`, `"x"`, `` `x` ``, `'x'`) is
/// removed before the name is wrapped in brackets.
pub fn normalize_column_key(column: &str) -> String {
    let trimmed = column.trim();
    let bare = [('[', ']'), ('"', '"'), ('`', '`'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| {
            trimmed
                .strip_prefix(*open)
                .and_then(|rest| rest.strip_suffix(*close))
        })
        .map(|inner| match trimmed.chars().next() {
            Some('"') => inner.replace("\"\"", "\""),
            Some('`') => inner.replace("``", "`"),
            Some('\'') => inner.replace("''", "'"),
            _ => inner.to_string(),
        })
        .unwrap_or_else(|| trimmed.to_string());

    format!("[{}]", bare)
}

/// Replace `-- ...` and `/* ... */` comments outside quotes with a space
///
/// SQLite keeps the definition text exactly as it was written, comments
/// included. An unterminated block comment runs to the end of the input.
fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            out.push(ch);
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '[' => quote = Some(']'),
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
                out.push(' ');
                continue;
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                out.push(' ');
                continue;
            }
            _ => {}
        }
        out.push(ch);
    }

    out
}

fn is_keyword(token: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| token.eq_ignore_ascii_case(k))
}

/// Split on separator characters that are outside parentheses and quotes
///
/// Empty pieces are dropped and every piece is trimmed.
fn split_top_level(input: &str, is_separator: impl Fn(char) -> bool) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in input.char_indices() {
        if let Some(q) = quote {
            // A doubled quote re-enters the quoted state on the next char.
            if ch == q {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => quote = Some(ch),
            '[' => quote = Some(']'),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            c if depth == 0 && is_separator(c) => {
                let piece = input[start..idx].trim();
                if !piece.is_empty() {
                    pieces.push(piece);
                }
                start = idx + ch.len_utf8();
            }
            _ => {}
        }
    }

    let piece = input[start..].trim();
    if !piece.is_empty() {
        pieces.push(piece);
    }

    pieces
}
