//! Schema introspection and controlled-vocabulary lookups.
//!
//! # Responsibility
//! - Report table columns (optionally with their declared kind).
//! - Resolve vocabulary names (`filetype`, `data_type`, ...) to ids.
//!
//! # Invariants
//! - Any identifier interpolated into SQL text has matched
//!   `IDENTIFIER_RE` first.

use crate::db::DbError;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

pub type LookupResult<T> = Result<T, LookupError>;

#[derive(Debug)]
pub enum LookupError {
    /// Value cannot be used as a bare SQL identifier.
    InvalidIdentifier(String),
    /// Table is not a known controlled vocabulary.
    UnsupportedTable(String),
    /// Table does not exist in the connected schema.
    UnknownTable(String),
    /// Vocabulary has no row with this name.
    UnknownValue { table: String, value: String },
    Db(DbError),
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(value) => write!(f, "invalid SQL identifier `{value}`"),
            Self::UnsupportedTable(table) => {
                write!(f, "`{table}` is not a controlled vocabulary table")
            }
            Self::UnknownTable(table) => write!(f, "table `{table}` does not exist"),
            Self::UnknownValue { table, value } => {
                write!(f, "`{value}` not found in `{table}`")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LookupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for LookupError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for LookupError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage kind of a column, derived from its declared SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    Float,
    Text,
}

impl ColumnType {
    /// Maps a declared type (`BOOLEAN`, `BIGINT`, `REAL`, ...) to its kind.
    ///
    /// Follows SQLite affinity rules, with `BOOL` checked before `INT`.
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("BOOL") {
            Self::Boolean
        } else if upper.contains("INT") {
            Self::Integer
        } else if ["REAL", "FLOA", "DOUB", "NUMERIC", "DECIMAL"]
            .iter()
            .any(|marker| upper.contains(marker))
        {
            Self::Float
        } else {
            Self::Text
        }
    }
}

/// One column as reported by `PRAGMA table_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub kind: ColumnType,
}

/// Rejects anything that is not a bare SQL identifier.
pub fn ensure_identifier(value: &str) -> LookupResult<&str> {
    if IDENTIFIER_RE.is_match(value) {
        Ok(value)
    } else {
        Err(LookupError::InvalidIdentifier(value.to_string()))
    }
}

/// Returns column names of `table` in declaration order.
pub fn get_table_cols(conn: &Connection, table: &str) -> LookupResult<Vec<String>> {
    Ok(get_table_cols_w_type(conn, table)?
        .into_iter()
        .map(|column| column.name)
        .collect())
}

/// Returns columns of `table` with their storage kind, in declaration order.
pub fn get_table_cols_w_type(conn: &Connection, table: &str) -> LookupResult<Vec<TableColumn>> {
    let table = ensure_identifier(table)?;
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        let name: String = row.get("name")?;
        let declared: String = row.get("type")?;
        columns.push(TableColumn {
            name,
            kind: ColumnType::from_declared(&declared),
        });
    }

    if columns.is_empty() {
        return Err(LookupError::UnknownTable(table.to_string()));
    }
    Ok(columns)
}

/// Returns whether `table` exists in the connected schema.
pub fn table_exists(conn: &Connection, table: &str) -> LookupResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

/// Returns the first table in `tables` that is missing, if any.
pub fn first_missing_table(
    conn: &Connection,
    tables: &[&'static str],
) -> LookupResult<Option<&'static str>> {
    for &table in tables {
        if !table_exists(conn, table)? {
            return Ok(Some(table));
        }
    }
    Ok(None)
}

/// Filetype name to id, e.g. `FASTQ -> 2`.
pub fn get_filetypes(conn: &Connection) -> LookupResult<BTreeMap<String, i64>> {
    vocabulary(conn, "filetype")
}

/// Data type name to id, e.g. `16S -> 1`.
pub fn get_data_types(conn: &Connection) -> LookupResult<BTreeMap<String, i64>> {
    vocabulary(conn, "data_type")
}

/// Filepath type name to id, e.g. `raw_barcodes -> 3`.
pub fn get_filepath_types(conn: &Connection) -> LookupResult<BTreeMap<String, i64>> {
    vocabulary(conn, "filepath_type")
}

/// Resolves `value` to its id in vocabulary `table`.
pub fn convert_to_id(conn: &Connection, value: &str, table: &str) -> LookupResult<i64> {
    let (id_column, name_column) = vocabulary_columns(table)?;
    conn.query_row(
        &format!("SELECT {id_column} FROM {table} WHERE {name_column} = ?1;"),
        [value],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or_else(|| LookupError::UnknownValue {
        table: table.to_string(),
        value: value.to_string(),
    })
}

/// Resolves an id in vocabulary `table` back to its name.
pub fn convert_from_id(conn: &Connection, id: i64, table: &str) -> LookupResult<String> {
    let (id_column, name_column) = vocabulary_columns(table)?;
    conn.query_row(
        &format!("SELECT {name_column} FROM {table} WHERE {id_column} = ?1;"),
        [id],
        |row| row.get::<_, String>(0),
    )
    .optional()?
    .ok_or_else(|| LookupError::UnknownValue {
        table: table.to_string(),
        value: id.to_string(),
    })
}

fn vocabulary(conn: &Connection, table: &str) -> LookupResult<BTreeMap<String, i64>> {
    let (id_column, name_column) = vocabulary_columns(table)?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {name_column}, {id_column} FROM {table} ORDER BY {id_column} ASC;"
    ))?;
    let mut rows = stmt.query([])?;
    let mut values = BTreeMap::new();
    while let Some(row) = rows.next()? {
        values.insert(row.get::<_, String>(0)?, row.get::<_, i64>(1)?);
    }
    Ok(values)
}

fn vocabulary_columns(table: &str) -> LookupResult<(&'static str, &'static str)> {
    match table {
        "filetype" => Ok(("filetype_id", "type")),
        "data_type" => Ok(("data_type_id", "data_type")),
        "filepath_type" => Ok(("filepath_type_id", "filepath_type")),
        "ontology" => Ok(("ontology_id", "ontology")),
        other => Err(LookupError::UnsupportedTable(other.to_string())),
    }
}
