//! Parameter-set use-case service.
//!
//! # Responsibility
//! - Validate supplied columns against the parameter table schema.
//! - Reject duplicate value combinations before inserting.
//! - Hand out `ParameterSet`s only for rows that exist.
//!
//! # Invariants
//! - The expected columns of a table are all its columns except the key
//!   column and `param_set_name`.
//! - A parameter set is unique by its full combination of expected column
//!   values; the name does not take part.

use crate::model::parameters::{
    ParamSetId, ParamTable, ParamValue, ParamValues, ParameterSet, QiimeParamsError,
    PARAM_SET_NAME_COLUMN,
};
use crate::repo::parameter_repo::ParameterRepository;
use crate::repo::RepoError;
use crate::util::TableColumn;
use log::{info, warn};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::Write;

pub type ParamResult<T> = Result<T, ParamError>;

/// Service error for parameter-set use-cases.
#[derive(Debug)]
pub enum ParamError {
    /// Supplied columns do not match the table's expected columns.
    Validation {
        table: ParamTable,
        missing: Vec<String>,
        extra: Vec<String>,
    },
    /// Supplied text cannot be parsed for a column's kind.
    InvalidValue { column: String, message: String },
    /// An identical value combination is already stored.
    Duplicate { table: ParamTable, values: String },
    NotFound { table: ParamTable, id: ParamSetId },
    Qiime(QiimeParamsError),
    Repo(RepoError),
}

impl Display for ParamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation {
                table,
                missing,
                extra,
            } => {
                write!(f, "invalid columns for `{table}`:")?;
                if !missing.is_empty() {
                    write!(f, " missing columns: {}", missing.join(", "))?;
                }
                if !missing.is_empty() && !extra.is_empty() {
                    f.write_str(";")?;
                }
                if !extra.is_empty() {
                    write!(f, " extra columns: {}", extra.join(", "))?;
                }
                Ok(())
            }
            Self::InvalidValue { column, message } => {
                write!(f, "invalid value for `{column}`: {message}")
            }
            Self::Duplicate { table, values } => {
                write!(f, "parameter set already exists in `{table}`: {values}")
            }
            Self::NotFound { table, id } => {
                write!(f, "parameter set {id} not found in `{table}`")
            }
            Self::Qiime(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ParamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Qiime(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ParamError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<QiimeParamsError> for ParamError {
    fn from(value: QiimeParamsError) -> Self {
        Self::Qiime(value)
    }
}

/// Parameter-set service facade over repository implementations.
pub struct ParameterService<R: ParameterRepository> {
    repo: R,
}

impl<R: ParameterRepository> ParameterService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Columns a caller must supply to `exists`/`create`, with their kinds.
    pub fn expected_columns(&self, table: ParamTable) -> ParamResult<Vec<TableColumn>> {
        Ok(self
            .repo
            .table_columns(table)?
            .into_iter()
            .filter(|column| {
                column.name != table.id_column() && column.name != PARAM_SET_NAME_COLUMN
            })
            .collect())
    }

    /// Checks that `values` supplies exactly the expected columns, each with a
    /// value its column can hold.
    ///
    /// Missing and extra columns are both reported, each sorted by name.
    pub fn check_columns(&self, table: ParamTable, values: &ParamValues) -> ParamResult<()> {
        let columns = self.expected_columns(table)?;
        let expected = columns
            .iter()
            .map(|column| column.name.clone())
            .collect::<BTreeSet<_>>();
        let supplied = values.keys().cloned().collect::<BTreeSet<_>>();

        let missing = expected.difference(&supplied).cloned().collect::<Vec<_>>();
        let extra = supplied.difference(&expected).cloned().collect::<Vec<_>>();
        if !missing.is_empty() || !extra.is_empty() {
            warn!(
                "event=param_validate module=parameters status=error table={} missing={} extra={}",
                table.table_name(),
                missing.len(),
                extra.len()
            );
            return Err(ParamError::Validation {
                table,
                missing,
                extra,
            });
        }

        for column in &columns {
            let Some(value) = values.get(&column.name) else {
                continue;
            };
            if !value.fits(column.kind) {
                warn!(
                    "event=param_validate module=parameters status=error table={} column={}",
                    table.table_name(),
                    column.name
                );
                return Err(ParamError::InvalidValue {
                    column: column.name.clone(),
                    message: format!(
                        "{} value `{value}` does not fit a {:?} column",
                        value.kind_name(),
                        column.kind
                    ),
                });
            }
        }
        Ok(())
    }

    /// Parses `column=value` text pairs into typed values for `table`.
    ///
    /// Unknown column names are passed through as text so that
    /// `check_columns` can report them.
    pub fn parse_values<'a>(
        &self,
        table: ParamTable,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> ParamResult<ParamValues> {
        let columns = self.expected_columns(table)?;
        let mut values = ParamValues::new();
        for (name, raw) in pairs {
            let value = match columns.iter().find(|column| column.name == name) {
                Some(column) => ParamValue::parse_as(column.kind, raw).map_err(|message| {
                    ParamError::InvalidValue {
                        column: name.to_string(),
                        message,
                    }
                })?,
                None => ParamValue::Text(raw.to_string()),
            };
            values.insert(name.to_string(), value);
        }
        Ok(values)
    }

    /// Returns whether a set with exactly these values is stored.
    pub fn exists(&self, table: ParamTable, values: &ParamValues) -> ParamResult<bool> {
        self.check_columns(table, values)?;
        Ok(self.repo.value_set_exists(table, values)?)
    }

    /// Stores a new named set and returns it.
    ///
    /// # Errors
    /// - `Validation` when columns are missing or unexpected.
    /// - `InvalidValue` when a value does not fit its column.
    /// - `Duplicate` when the value combination is already stored.
    pub fn create(
        &self,
        table: ParamTable,
        name: &str,
        values: &ParamValues,
    ) -> ParamResult<ParameterSet> {
        if self.exists(table, values)? {
            warn!(
                "event=param_create module=parameters status=duplicate table={}",
                table.table_name()
            );
            return Err(ParamError::Duplicate {
                table,
                values: describe_values(values),
            });
        }

        let id = self.repo.insert_parameter_set(table, name, values)?;
        info!(
            "event=param_create module=parameters status=ok table={} id={}",
            table.table_name(),
            id
        );
        self.load(table, id)
    }

    /// Loads the set with key `id`; the row must exist.
    pub fn load(&self, table: ParamTable, id: ParamSetId) -> ParamResult<ParameterSet> {
        self.repo
            .get_parameter_set(table, id)?
            .ok_or(ParamError::NotFound { table, id })
    }

    /// Whether a set with key `id` is stored.
    pub fn id_exists(&self, table: ParamTable, id: ParamSetId) -> ParamResult<bool> {
        Ok(self.repo.parameter_set_exists(table, id)?)
    }

    pub fn list(&self, table: ParamTable) -> ParamResult<Vec<ParameterSet>> {
        Ok(self.repo.list_parameter_sets(table)?)
    }

    /// Loads a set and renders it as command-line options.
    pub fn to_str(&self, table: ParamTable, id: ParamSetId) -> ParamResult<String> {
        Ok(self.load(table, id)?.to_str())
    }

    /// Loads an OTU-picking set and writes it as a QIIME parameters file.
    pub fn write_qiime_params<W: Write>(&self, id: ParamSetId, writer: W) -> ParamResult<()> {
        let set = self.load(ParamTable::ProcessedSortmerna, id)?;
        set.write_qiime_params(writer)?;
        Ok(())
    }
}

fn describe_values(values: &ParamValues) -> String {
    values
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{describe_values, ParamError};
    use crate::model::parameters::{ParamTable, ParamValue, ParamValues};

    #[test]
    fn validation_message_names_offending_columns() {
        let err = ParamError::Validation {
            table: ParamTable::Preprocessed454,
            missing: vec!["max_ambig".to_string(), "min_seq_len".to_string()],
            extra: vec!["bogus".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "invalid columns for `preprocessed_sequence_454_params`: \
             missing columns: max_ambig, min_seq_len; extra columns: bogus"
        );
    }

    #[test]
    fn describe_values_is_sorted_by_column() {
        let mut values = ParamValues::new();
        values.insert("threads".to_string(), ParamValue::Integer(4));
        values.insert("similarity".to_string(), ParamValue::Float(0.97));
        assert_eq!(describe_values(&values), "similarity=0.97, threads=4");
    }
}
