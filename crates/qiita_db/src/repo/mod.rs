//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per record family.
//! - Keep SQL text and row decoding inside the persistence boundary.
//!
//! # Invariants
//! - Repositories are constructed with `try_new`, which rejects connections
//!   missing the tables they query.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Driver errors are wrapped, never rewritten.

use crate::db::DbError;
use crate::util::{first_missing_table, LookupError};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ontology_repo;
pub mod parameter_repo;
pub mod prep_template_repo;
pub mod raw_data_repo;
pub mod study_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Error shared by all study-record and parameter repositories.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    Lookup(LookupError),
    /// Referenced record does not exist.
    NotFound { entity: &'static str, id: String },
    /// Connection schema lacks a table the repository needs.
    MissingRequiredTable(&'static str),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl RepoError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Lookup(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Lookup(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::MissingRequiredTable(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<LookupError> for RepoError {
    fn from(value: LookupError) -> Self {
        match value {
            LookupError::Db(err) => Self::Db(err),
            other => Self::Lookup(other),
        }
    }
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    match first_missing_table(conn, tables)? {
        Some(table) => Err(RepoError::MissingRequiredTable(table)),
        None => Ok(()),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
