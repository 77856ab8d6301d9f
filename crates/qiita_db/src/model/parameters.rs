//! Parameter sets for preprocessing and OTU-picking steps.
//!
//! # Responsibility
//! - Describe the parameter tables (name, key column, ignored columns).
//! - Render a stored set as a command-line flag string or as a QIIME
//!   parameters file.
//!
//! # Invariants
//! - `ParameterSet::values` never contains the key column or
//!   `param_set_name`.
//! - Renderers iterate columns in ascending name order.

use crate::util::ColumnType;
use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};

pub type ParamSetId = i64;
pub type ReferenceId = i64;

/// Column shared by every parameter table holding the human-readable name.
pub const PARAM_SET_NAME_COLUMN: &str = "param_set_name";

/// Column values of one parameter set, keyed by column name.
pub type ParamValues = BTreeMap<String, ParamValue>;

/// Parameter tables known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamTable {
    /// `split_libraries_fastq.py` parameters.
    PreprocessedIllumina,
    /// `split_libraries.py` parameters.
    Preprocessed454,
    /// Closed-reference OTU picking with SortMeRNA.
    ProcessedSortmerna,
}

impl ParamTable {
    pub const ALL: [ParamTable; 3] = [
        Self::PreprocessedIllumina,
        Self::Preprocessed454,
        Self::ProcessedSortmerna,
    ];

    pub fn table_name(self) -> &'static str {
        match self {
            Self::PreprocessedIllumina => "preprocessed_sequence_illumina_params",
            Self::Preprocessed454 => "preprocessed_sequence_454_params",
            Self::ProcessedSortmerna => "processed_params_sortmerna",
        }
    }

    pub fn id_column(self) -> &'static str {
        match self {
            Self::PreprocessedIllumina | Self::Preprocessed454 => "preprocessed_params_id",
            Self::ProcessedSortmerna => "processed_params_id",
        }
    }

    /// Columns left out of rendered parameter strings and files.
    pub fn ignored_columns(self) -> &'static [&'static str] {
        match self {
            Self::PreprocessedIllumina | Self::Preprocessed454 => &[PARAM_SET_NAME_COLUMN],
            Self::ProcessedSortmerna => &[PARAM_SET_NAME_COLUMN, "reference_id"],
        }
    }

    /// Short name used by the CLI.
    pub fn slug(self) -> &'static str {
        match self {
            Self::PreprocessedIllumina => "illumina",
            Self::Preprocessed454 => "454",
            Self::ProcessedSortmerna => "sortmerna",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|table| table.slug() == value)
    }

    fn is_ignored(self, column: &str) -> bool {
        self.ignored_columns().iter().any(|ignored| *ignored == column)
    }
}

impl Display for ParamTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.table_name())
    }
}

/// A single column value of a parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    Null,
}

impl ParamValue {
    /// Parses user text for a column of the given kind.
    ///
    /// Empty input is `Null` for every kind.
    pub fn parse_as(kind: ColumnType, raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(Self::Null);
        }
        match kind {
            ColumnType::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "t" | "1" | "yes" => Ok(Self::Bool(true)),
                "false" | "f" | "0" | "no" => Ok(Self::Bool(false)),
                other => Err(format!("`{other}` is not a boolean")),
            },
            ColumnType::Integer => trimmed
                .parse::<i64>()
                .map(Self::Integer)
                .map_err(|err| format!("`{trimmed}` is not an integer: {err}")),
            ColumnType::Float => trimmed
                .parse::<f64>()
                .map(Self::Float)
                .map_err(|err| format!("`{trimmed}` is not a number: {err}")),
            ColumnType::Text => Ok(Self::Text(raw.to_string())),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Whether the value can be stored in a column of `kind` and read back.
    ///
    /// Integers widen into float columns; NULL fits any column.
    pub fn fits(&self, kind: ColumnType) -> bool {
        matches!(
            (self, kind),
            (Self::Null, _)
                | (Self::Bool(_), ColumnType::Boolean)
                | (Self::Integer(_), ColumnType::Integer | ColumnType::Float)
                | (Self::Float(_), ColumnType::Float)
                | (Self::Text(_), ColumnType::Text)
        )
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Null => "null",
        }
    }
}

impl Display for ParamValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(true) => f.write_str("True"),
            Self::Bool(false) => f.write_str("False"),
            Self::Integer(value) => write!(f, "{value}"),
            // Integral floats keep one decimal place: `1.0`, not `1`.
            Self::Float(value) if value.is_finite() && value.fract() == 0.0 => {
                write!(f, "{value:.1}")
            }
            Self::Float(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
            Self::Null => Ok(()),
        }
    }
}

/// Error writing a QIIME parameters file.
#[derive(Debug)]
pub enum QiimeParamsError {
    /// Only OTU-picking parameter sets map onto `pick_otus` options.
    Unsupported(ParamTable),
    Io(io::Error),
}

impl Display for QiimeParamsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported(table) => {
                write!(f, "parameter table `{table}` has no QIIME parameters file form")
            }
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for QiimeParamsError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unsupported(_) => None,
            Self::Io(err) => Some(err),
        }
    }
}

impl From<io::Error> for QiimeParamsError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

/// One stored parameter set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSet {
    pub id: ParamSetId,
    pub table: ParamTable,
    pub name: String,
    pub values: ParamValues,
}

impl ParameterSet {
    /// Renders the set as command-line options.
    ///
    /// Columns are sorted by name; ignored columns and NULL values are left
    /// out; booleans become a bare `--flag` when true and vanish when false.
    pub fn to_str(&self) -> String {
        let mut result = Vec::new();
        for (name, value) in &self.values {
            if self.table.is_ignored(name) {
                continue;
            }
            match value {
                ParamValue::Bool(true) => result.push(format!("--{name}")),
                ParamValue::Bool(false) | ParamValue::Null => {}
                other => result.push(format!("--{name} {other}")),
            }
        }
        result.join(" ")
    }

    /// Taxonomic reference used by an OTU-picking parameter set.
    pub fn reference_id(&self) -> Option<ReferenceId> {
        match self.values.get("reference_id") {
            Some(ParamValue::Integer(id)) => Some(*id),
            _ => None,
        }
    }

    /// Writes the set in QIIME parameters file format.
    ///
    /// Emits `pick_otus:otu_picking_method\tsortmerna` first, then one
    /// `pick_otus:<column>\t<value>` line per non-ignored column in name
    /// order.
    pub fn write_qiime_params<W: Write>(&self, mut writer: W) -> Result<(), QiimeParamsError> {
        if self.table != ParamTable::ProcessedSortmerna {
            return Err(QiimeParamsError::Unsupported(self.table));
        }

        writer.write_all(b"pick_otus:otu_picking_method\tsortmerna\n")?;
        for (name, value) in &self.values {
            if self.table.is_ignored(name) {
                continue;
            }
            writeln!(writer, "pick_otus:{name}\t{value}")?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ParamTable, ParamValue, ParamValues, ParameterSet, QiimeParamsError};
    use crate::util::ColumnType;

    fn illumina_set(values: &[(&str, ParamValue)]) -> ParameterSet {
        ParameterSet {
            id: 7,
            table: ParamTable::PreprocessedIllumina,
            name: "custom".to_string(),
            values: values
                .iter()
                .map(|(name, value)| (name.to_string(), value.clone()))
                .collect::<ParamValues>(),
        }
    }

    #[test]
    fn to_str_sorts_columns_and_renders_true_booleans_as_flags() {
        let set = illumina_set(&[
            ("sequence_max_n", ParamValue::Integer(0)),
            ("rev_comp", ParamValue::Bool(false)),
            ("barcode_type", ParamValue::Text("golay_12".to_string())),
            ("rev_comp_mapping_barcodes", ParamValue::Bool(true)),
            ("max_barcode_errors", ParamValue::Float(1.5)),
        ]);

        assert_eq!(
            set.to_str(),
            "--barcode_type golay_12 --max_barcode_errors 1.5 --rev_comp_mapping_barcodes --sequence_max_n 0"
        );
    }

    #[test]
    fn to_str_skips_ignored_and_null_columns() {
        let mut set = illumina_set(&[
            ("param_set_name", ParamValue::Text("leaked".to_string())),
            ("barcode_type", ParamValue::Null),
            ("max_bad_run_length", ParamValue::Integer(3)),
        ]);
        assert_eq!(set.to_str(), "--max_bad_run_length 3");

        set.values.clear();
        assert_eq!(set.to_str(), "");
    }

    #[test]
    fn qiime_params_are_written_for_sortmerna_only() {
        let set = ParameterSet {
            id: 1,
            table: ParamTable::ProcessedSortmerna,
            name: "Defaults".to_string(),
            values: [
                ("reference_id", ParamValue::Integer(1)),
                ("threads", ParamValue::Integer(1)),
                ("sortmerna_e_value", ParamValue::Float(1.0)),
                ("similarity", ParamValue::Float(0.97)),
            ]
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect(),
        };

        let mut out = Vec::new();
        set.write_qiime_params(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "pick_otus:otu_picking_method\tsortmerna\n\
             pick_otus:similarity\t0.97\n\
             pick_otus:sortmerna_e_value\t1.0\n\
             pick_otus:threads\t1\n"
        );
        assert_eq!(set.reference_id(), Some(1));

        let err = illumina_set(&[]).write_qiime_params(Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            QiimeParamsError::Unsupported(ParamTable::PreprocessedIllumina)
        ));
    }

    #[test]
    fn parse_as_follows_column_kind() {
        assert_eq!(
            ParamValue::parse_as(ColumnType::Boolean, "True").unwrap(),
            ParamValue::Bool(true)
        );
        assert_eq!(
            ParamValue::parse_as(ColumnType::Integer, " 42 ").unwrap(),
            ParamValue::Integer(42)
        );
        assert_eq!(
            ParamValue::parse_as(ColumnType::Float, "0.75").unwrap(),
            ParamValue::Float(0.75)
        );
        assert_eq!(
            ParamValue::parse_as(ColumnType::Text, "").unwrap(),
            ParamValue::Null
        );
        assert!(ParamValue::parse_as(ColumnType::Integer, "many").is_err());
        assert!(ParamValue::parse_as(ColumnType::Boolean, "maybe").is_err());
    }

    #[test]
    fn fits_accepts_matching_kinds_and_null() {
        assert!(ParamValue::Null.fits(ColumnType::Integer));
        assert!(ParamValue::Integer(3).fits(ColumnType::Float));
        assert!(ParamValue::Bool(true).fits(ColumnType::Boolean));
        assert!(!ParamValue::Text("many".to_string()).fits(ColumnType::Integer));
        assert!(!ParamValue::Float(0.5).fits(ColumnType::Integer));
        assert!(!ParamValue::Integer(1).fits(ColumnType::Boolean));
    }

    #[test]
    fn values_serialize_untagged() {
        let mut values = ParamValues::new();
        values.insert("rev_comp".to_string(), ParamValue::Bool(true));
        values.insert("threads".to_string(), ParamValue::Integer(1));
        values.insert("barcode_type".to_string(), ParamValue::Null);
        assert_eq!(
            serde_json::to_value(&values).unwrap(),
            serde_json::json!({ "barcode_type": null, "rev_comp": true, "threads": 1 })
        );
    }

    #[test]
    fn table_slugs_roundtrip() {
        for table in ParamTable::ALL {
            assert_eq!(ParamTable::from_slug(table.slug()), Some(table));
        }
        assert_eq!(ParamTable::from_slug("uclust"), None);
    }
}
