//! Relational access layer for the Qiita study-management platform.
//!
//! Studies, raw/preprocessed data records and processing parameter sets
//! live in SQLite; this crate owns their schema, read models and the
//! parameter-set rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod uploads;
pub mod util;

pub use config::{ConfigError, QiitaConfig, CONFIG_ENV_VAR};
pub use logging::{init_logging, logging_status, LogLevel};
pub use model::ontology::{Ontology, OntologyId};
pub use model::parameters::{
    ParamSetId, ParamTable, ParamValue, ParamValues, ParameterSet, QiimeParamsError, ReferenceId,
};
pub use model::prep_template::{PrepTemplate, PrepTemplateId, PreprocessedDataId};
pub use model::raw_data::{Filepath, FilepathId, LinkStatus, RawData, RawDataId};
pub use model::study::{Study, StudyId, StudyStatus, User, UserLevel};
pub use repo::ontology_repo::{OntologyRepository, SqliteOntologyRepository};
pub use repo::parameter_repo::{ParameterRepository, SqliteParameterRepository};
pub use repo::prep_template_repo::{PrepTemplateRepository, SqlitePrepTemplateRepository};
pub use repo::raw_data_repo::{RawDataRepository, SqliteRawDataRepository};
pub use repo::study_repo::{SqliteStudyRepository, StudyRepository};
pub use repo::{RepoError, RepoResult};
pub use service::parameter_service::{ParamError, ParamResult, ParameterService};
pub use util::{ColumnType, LookupError, TableColumn};

/// Health check used by the CLI.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
