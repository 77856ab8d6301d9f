//! Raw data editor tab.
//!
//! # Responsibility
//! - Collect what a submitter needs to attach files and prep templates to
//!   one raw data record.
//! - Derive the link/unlink button state from the raw data link status.
//!
//! # Invariants
//! - While a link or unlink job runs, the link button is disabled and the
//!   unlink button hidden.
//! - `Other` is always the last ENA option.

use super::{ModuleEnv, UiResult};
use crate::render::escape_html;
use qiita_db::uploads::files_from_uploads_folders;
use qiita_db::util::{get_data_types, get_filepath_types};
use qiita_db::{
    Filepath, LinkStatus, OntologyRepository, PrepTemplate, PrepTemplateRepository, RawData,
    RawDataId, RawDataRepository, SqliteOntologyRepository, SqlitePrepTemplateRepository,
    SqliteRawDataRepository, Study, StudyId, StudyStatus, UserLevel,
};
use serde::Serialize;
use std::collections::BTreeMap;

const TEMPLATE: &str = "raw_data_editor_tab.html";
const ENA_ONTOLOGY: &str = "ENA";
const OTHER_TERM: &str = "Other";
const RAW_FILEPATH_PREFIX: &str = "raw_";

/// Choice offered for adding a user-defined investigation type.
pub const NEW_TYPE_TERM: &str = "New Type";

/// State of the link and unlink buttons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkControls {
    pub show_unlink_btn: bool,
    pub disable_link_btn: bool,
    pub link_msg: String,
}

/// Derives button state from the link status.
///
/// Unlinking is offered only when the raw data is editable, has files and no
/// job is running.
pub fn link_controls(status: &LinkStatus, is_editable: bool, has_files: bool) -> LinkControls {
    let busy = status.is_busy();
    let link_msg = match status {
        LinkStatus::Linking => "Linking files...".to_string(),
        LinkStatus::Unlinking => "Unlinking files...".to_string(),
        LinkStatus::Failed(_) => format!("Error (un)linking files: {status}"),
        LinkStatus::Idle => String::new(),
    };
    LinkControls {
        show_unlink_btn: !busy && is_editable && has_files,
        disable_link_btn: busy,
        link_msg,
    }
}

/// Builds `<option>` tags for ENA investigation types.
///
/// Terms are sorted, with `Other` moved to the end and always present.
pub fn ena_term_options(terms: &[String]) -> Vec<String> {
    let mut sorted = terms
        .iter()
        .filter(|term| term.as_str() != OTHER_TERM)
        .collect::<Vec<_>>();
    sorted.sort();

    let mut options = sorted
        .into_iter()
        .map(|term| {
            let escaped = escape_html(term);
            format!("<option value=\"{escaped}\">{escaped}</option>")
        })
        .collect::<Vec<_>>();
    options.push(format!("<option value=\"{OTHER_TERM}\">{OTHER_TERM}</option>"));
    options
}

/// Human labels of the raw filepath types, ordered by type id.
///
/// `raw_forward_seqs` becomes `forward seqs`.
pub fn raw_filepath_type_labels(filepath_types: &BTreeMap<String, i64>) -> Vec<String> {
    let mut raw_types = filepath_types
        .iter()
        .filter_map(|(name, id)| {
            name.strip_prefix(RAW_FILEPATH_PREFIX)
                .map(|rest| (*id, rest.replace('_', " ")))
        })
        .collect::<Vec<_>>();
    raw_types.sort_by_key(|(id, _)| *id);
    raw_types.into_iter().map(|(_, label)| label).collect()
}

/// Context of `raw_data_editor_tab.html`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDataEditorView {
    pub study_id: StudyId,
    pub study_status: StudyStatus,
    pub user_level: UserLevel,
    pub raw_data_id: RawDataId,
    /// Files in the study's upload folders.
    pub files: Vec<String>,
    /// `(name, id)` pairs ordered by id.
    pub data_types: Vec<(String, i64)>,
    pub ena_terms: Vec<String>,
    pub user_defined_terms: Vec<String>,
    pub available_prep_templates: Vec<PrepTemplate>,
    pub filepath_types: Vec<String>,
    pub is_editable: bool,
    #[serde(flatten)]
    pub link: LinkControls,
    pub raw_data_files: Vec<Filepath>,
    pub raw_data_filetype: String,
}

pub struct RawDataEditorTab<'a> {
    env: &'a ModuleEnv<'a>,
}

impl<'a> RawDataEditorTab<'a> {
    pub fn new(env: &'a ModuleEnv<'a>) -> Self {
        Self { env }
    }

    pub fn view(&self, study: &Study, raw_data: &RawData) -> UiResult<RawDataEditorView> {
        let conn = self.env.conn;
        let user = self.env.current_user()?;
        let raw_repo = SqliteRawDataRepository::try_new(conn)?;
        let prep_repo = SqlitePrepTemplateRepository::try_new(conn)?;
        let ontologies = SqliteOntologyRepository::try_new(conn)?;

        let files = files_from_uploads_folders(self.env.upload_roots, study.id)?;

        let mut data_types = get_data_types(conn)?.into_iter().collect::<Vec<_>>();
        data_types.sort_by_key(|(_, id)| *id);

        let ena = ontologies.find_by_name(ENA_ONTOLOGY)?;
        let ena_terms = ena_term_options(&ontologies.terms(ena.id)?);
        let mut user_defined_terms = ontologies.user_defined_terms(ena.id)?;
        user_defined_terms.push(NEW_TYPE_TERM.to_string());

        let mut prep_ids = raw_repo.prep_templates(raw_data.id)?;
        prep_ids.sort_unstable();
        let mut available_prep_templates = Vec::with_capacity(prep_ids.len());
        for prep_id in prep_ids {
            if let Some(prep) = prep_repo.get_prep_template(prep_id)? {
                available_prep_templates.push(prep);
            }
        }

        let filepath_types = raw_filepath_type_labels(&get_filepath_types(conn)?);

        let is_editable = study.status == StudyStatus::Sandbox || user.level == UserLevel::Admin;
        let raw_data_files = raw_repo.filepaths(raw_data.id)?;
        let link = link_controls(&raw_data.link_status, is_editable, !raw_data_files.is_empty());

        Ok(RawDataEditorView {
            study_id: study.id,
            study_status: study.status,
            user_level: user.level,
            raw_data_id: raw_data.id,
            files,
            data_types,
            ena_terms,
            user_defined_terms,
            available_prep_templates,
            filepath_types,
            is_editable,
            link,
            raw_data_files,
            raw_data_filetype: raw_data.filetype.clone(),
        })
    }

    pub fn render(&self, study: &Study, raw_data: &RawData) -> UiResult<String> {
        let view = self.view(study, raw_data)?;
        self.env.render(TEMPLATE, &view)
    }
}
