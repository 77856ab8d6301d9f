//! Prep template panel shown inside the raw data editor.
//!
//! Carries the preprocessing form: the submitter picks whether mapping file
//! barcodes are reverse complemented, which selects the Illumina parameter
//! set used for split libraries.

use super::{ModuleEnv, UiResult};
use log::info;
use qiita_db::{
    Filepath, ParamSetId, ParamTable, ParamValue, ParameterService, ParameterSet,
    PrepTemplateId, PrepTemplateRepository, PreprocessedDataId, RepoError,
    SqliteParameterRepository, SqlitePrepTemplateRepository, StudyId, StudyStatus,
};
use rusqlite::Connection;
use serde::Serialize;

const TEMPLATE: &str = "prep_template_panel.html";
const REV_COMP_MAPPING_BARCODES: &str = "rev_comp_mapping_barcodes";

/// An Illumina parameter set offered by the preprocessing form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamSetChoice {
    pub id: ParamSetId,
    pub name: String,
    /// Command-line form of the set.
    pub options: String,
}

/// Preprocessing form of the prep template panel.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PreprocessParametersForm {
    pub rev_comp_mapping_barcodes: bool,
    pub parameter_sets: Vec<ParamSetChoice>,
    /// Set the form resolves to with its current flag.
    pub selected_param_set: Option<ParamSetId>,
}

impl PreprocessParametersForm {
    /// Reads submitted form fields; a checkbox counts as set when present
    /// with any value other than `false`, `0`, `off` or empty.
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let rev_comp_mapping_barcodes = fields.into_iter().any(|(name, value)| {
            name == REV_COMP_MAPPING_BARCODES
                && !matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "" | "false" | "0" | "off"
                )
        });
        Self {
            rev_comp_mapping_barcodes,
            ..Self::default()
        }
    }

    /// First Illumina set, by id, whose reverse-complement flag matches the
    /// form.
    pub fn matching_param_set<'s>(&self, sets: &'s [ParameterSet]) -> Option<&'s ParameterSet> {
        sets.iter()
            .filter(|set| set.table == ParamTable::PreprocessedIllumina)
            .find(|set| {
                set.values.get(REV_COMP_MAPPING_BARCODES)
                    == Some(&ParamValue::Bool(self.rev_comp_mapping_barcodes))
            })
    }
}

/// Context of `prep_template_panel.html`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrepTemplatePanelView {
    pub prep_id: PrepTemplateId,
    pub data_type: String,
    pub filepaths: Vec<Filepath>,
    pub investigation_type: Option<String>,
    pub preprocessed_data: Vec<PreprocessedDataId>,
    pub preprocessing_status: String,
    pub study_id: StudyId,
    pub is_local_request: bool,
    pub is_editable: bool,
    pub ena_terms: Vec<String>,
    pub study_status: StudyStatus,
    pub user_defined_terms: Vec<String>,
    pub preprocess_form: PreprocessParametersForm,
}

/// Page-level facts the panel repeats from its enclosing editor tab.
#[derive(Debug, Clone, Copy)]
pub struct PanelOptions<'v> {
    pub study_id: StudyId,
    pub study_status: StudyStatus,
    pub is_editable: bool,
    pub ena_terms: &'v [String],
    pub user_defined_terms: &'v [String],
}

pub struct PrepTemplatePanel<'a> {
    env: &'a ModuleEnv<'a>,
}

impl<'a> PrepTemplatePanel<'a> {
    pub fn new(env: &'a ModuleEnv<'a>) -> Self {
        Self { env }
    }

    pub fn view(
        &self,
        prep_id: PrepTemplateId,
        options: &PanelOptions<'_>,
    ) -> UiResult<PrepTemplatePanelView> {
        let conn = self.env.conn;
        let preps = SqlitePrepTemplateRepository::try_new(conn)?;
        let prep = preps
            .get_prep_template(prep_id)?
            .ok_or_else(|| RepoError::not_found("prep template", prep_id))?;

        let illumina_sets = illumina_parameter_sets(conn)?;
        let mut preprocess_form = PreprocessParametersForm::default();
        preprocess_form.selected_param_set = preprocess_form
            .matching_param_set(&illumina_sets)
            .map(|set| set.id);
        preprocess_form.parameter_sets = illumina_sets
            .into_iter()
            .map(|set| ParamSetChoice {
                options: set.to_str(),
                id: set.id,
                name: set.name,
            })
            .collect();

        Ok(PrepTemplatePanelView {
            prep_id: prep.id,
            data_type: prep.data_type,
            filepaths: preps.filepaths(prep_id)?,
            investigation_type: prep.investigation_type,
            preprocessed_data: preps.preprocessed_data(prep_id)?,
            preprocessing_status: prep.preprocessing_status,
            study_id: options.study_id,
            is_local_request: self.env.request.is_local_request(),
            is_editable: options.is_editable,
            ena_terms: options.ena_terms.to_vec(),
            study_status: options.study_status,
            user_defined_terms: options.user_defined_terms.to_vec(),
            preprocess_form,
        })
    }

    /// Resolves a submitted preprocessing form to the Illumina parameter set
    /// split libraries should run with.
    ///
    /// # Errors
    /// - `NotFound` when the prep template does not exist or no stored set
    ///   matches the submitted flag.
    pub fn preprocess_param_set<'f>(
        &self,
        prep_id: PrepTemplateId,
        fields: impl IntoIterator<Item = (&'f str, &'f str)>,
    ) -> UiResult<ParamSetId> {
        let conn = self.env.conn;
        let preps = SqlitePrepTemplateRepository::try_new(conn)?;
        if !preps.exists(prep_id)? {
            return Err(RepoError::not_found("prep template", prep_id).into());
        }

        let form = PreprocessParametersForm::from_fields(fields);
        let illumina_sets = illumina_parameter_sets(conn)?;
        let set_id = form
            .matching_param_set(&illumina_sets)
            .map(|set| set.id)
            .ok_or_else(|| {
                RepoError::not_found(
                    "illumina parameter set",
                    format!(
                        "{REV_COMP_MAPPING_BARCODES}={}",
                        form.rev_comp_mapping_barcodes
                    ),
                )
            })?;
        info!(
            "event=preprocess_params module=ui status=ok prep_id={prep_id} param_set_id={set_id}"
        );
        Ok(set_id)
    }

    pub fn render(&self, prep_id: PrepTemplateId, options: &PanelOptions<'_>) -> UiResult<String> {
        let view = self.view(prep_id, options)?;
        self.env.render(TEMPLATE, &view)
    }
}

fn illumina_parameter_sets(conn: &Connection) -> UiResult<Vec<ParameterSet>> {
    let params = ParameterService::new(SqliteParameterRepository::try_new(conn)?);
    Ok(params.list(ParamTable::PreprocessedIllumina)?)
}
