//! Prep templates: per-raw-data preparation metadata.

use super::raw_data::RawDataId;
use serde::Serialize;

pub type PrepTemplateId = i64;
pub type PreprocessedDataId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepTemplate {
    pub id: PrepTemplateId,
    pub raw_data_id: RawDataId,
    /// Data type name, e.g. `16S`.
    pub data_type: String,
    /// ENA investigation type; unset until the submitter picks one.
    pub investigation_type: Option<String>,
    /// Free-form status of the preprocessing job, e.g. `not_preprocessed`,
    /// `preprocessing`, `success`, `failed: <reason>`.
    pub preprocessing_status: String,
}
