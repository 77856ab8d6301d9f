//! Raw data tab of the study page.
//!
//! Lists the raw data a study holds and the raw data the current user could
//! adopt from their other studies.

use super::{ModuleEnv, UiResult};
use qiita_db::util::get_filetypes;
use qiita_db::{
    RawDataId, RawDataRepository, RepoError, SqliteRawDataRepository, SqliteStudyRepository,
    Study, StudyId, StudyRepository, User,
};
use serde::Serialize;
use std::collections::BTreeMap;

const TEMPLATE: &str = "raw_data_tab.html";

/// Raw data reachable through the user's other studies.
///
/// Maps each raw data id to the title of the last study it was linked to;
/// raw data of `study_id` itself is only included when another study of the
/// user also holds it.
pub fn raw_data_from_other_studies<S, R>(
    studies: &S,
    raw_data: &R,
    user: &User,
    study_id: StudyId,
) -> UiResult<BTreeMap<RawDataId, String>>
where
    S: StudyRepository,
    R: RawDataRepository,
{
    let mut titles = BTreeMap::new();
    for other_id in studies.user_studies(&user.email)? {
        if other_id == study_id {
            continue;
        }
        for raw_data_id in studies.raw_data_ids(other_id)? {
            let Some(&last_study) = raw_data.studies(raw_data_id)?.last() else {
                continue;
            };
            let last = studies
                .get_study(last_study)?
                .ok_or_else(|| RepoError::not_found("study", last_study))?;
            titles.insert(raw_data_id, last.title);
        }
    }
    Ok(titles)
}

/// Context of `raw_data_tab.html`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDataTabView {
    /// `(name, id)` pairs ordered by id.
    pub filetypes: Vec<(String, i64)>,
    /// `(raw data id, study title)` pairs ordered by raw data id.
    pub other_studies_rd: Vec<(RawDataId, String)>,
    /// `(raw data id, filetype)` for the raw data of the study.
    pub available_raw_data: Vec<(RawDataId, String)>,
    pub study: Study,
}

pub struct RawDataTab<'a> {
    env: &'a ModuleEnv<'a>,
}

impl<'a> RawDataTab<'a> {
    pub fn new(env: &'a ModuleEnv<'a>) -> Self {
        Self { env }
    }

    pub fn view(&self, study: &Study) -> UiResult<RawDataTabView> {
        let conn = self.env.conn;
        let user = self.env.current_user()?;
        let studies = SqliteStudyRepository::try_new(conn)?;
        let raw_data = SqliteRawDataRepository::try_new(conn)?;

        let mut filetypes = get_filetypes(conn)?.into_iter().collect::<Vec<_>>();
        filetypes.sort_by_key(|(_, id)| *id);

        let other_studies_rd = raw_data_from_other_studies(&studies, &raw_data, &user, study.id)?
            .into_iter()
            .collect::<Vec<_>>();

        let mut available_raw_data = Vec::new();
        for raw_data_id in studies.raw_data_ids(study.id)? {
            let record = raw_data
                .get_raw_data(raw_data_id)?
                .ok_or_else(|| RepoError::not_found("raw data", raw_data_id))?;
            available_raw_data.push((record.id, record.filetype));
        }

        Ok(RawDataTabView {
            filetypes,
            other_studies_rd,
            available_raw_data,
            study: study.clone(),
        })
    }

    pub fn render(&self, study: &Study) -> UiResult<String> {
        let view = self.view(study)?;
        self.env.render(TEMPLATE, &view)
    }
}
