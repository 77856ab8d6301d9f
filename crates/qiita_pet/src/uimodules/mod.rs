//! UI modules: view-model assemblers for study editing pages.
//!
//! # Responsibility
//! - Fetch the records a page fragment needs and reshape them into a
//!   serializable view model.
//! - Hand the view model to the template renderer under a fixed template name.
//!
//! # Invariants
//! - Assemblers only read; they never change stored records.
//! - Every list placed in a view model has a deterministic order.

use crate::render::{RenderError, TemplateRenderer};
use log::{info, warn};
use qiita_db::{ParamError, RepoError, SqliteStudyRepository, StudyRepository, User};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod prep_template_panel;
pub mod raw_data_editor;
pub mod raw_data_tab;

pub use prep_template_panel::{
    PanelOptions, ParamSetChoice, PrepTemplatePanel, PrepTemplatePanelView,
    PreprocessParametersForm,
};
pub use raw_data_editor::{
    ena_term_options, link_controls, raw_filepath_type_labels, LinkControls, RawDataEditorTab,
    RawDataEditorView, NEW_TYPE_TERM,
};
pub use raw_data_tab::{raw_data_from_other_studies, RawDataTab, RawDataTabView};

pub type UiResult<T> = Result<T, UiError>;

/// Error raised while assembling or rendering a UI module.
#[derive(Debug)]
pub enum UiError {
    /// The request carries no logged-in user.
    NotAuthenticated,
    Repo(RepoError),
    Param(ParamError),
    Render(RenderError),
    /// View model could not be turned into a template context.
    Context(serde_json::Error),
    Io(io::Error),
}

impl Display for UiError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAuthenticated => write!(f, "no user is logged in"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Param(err) => write!(f, "{err}"),
            Self::Render(err) => write!(f, "{err}"),
            Self::Context(err) => write!(f, "invalid template context: {err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for UiError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotAuthenticated => None,
            Self::Repo(err) => Some(err),
            Self::Param(err) => Some(err),
            Self::Render(err) => Some(err),
            Self::Context(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<RepoError> for UiError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<ParamError> for UiError {
    fn from(value: ParamError) -> Self {
        Self::Param(value)
    }
}

impl From<RenderError> for UiError {
    fn from(value: RenderError) -> Self {
        Self::Render(value)
    }
}

impl From<serde_json::Error> for UiError {
    fn from(value: serde_json::Error) -> Self {
        Self::Context(value)
    }
}

impl From<io::Error> for UiError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<qiita_db::LookupError> for UiError {
    fn from(value: qiita_db::LookupError) -> Self {
        Self::Repo(value.into())
    }
}

/// Per-request facts the web layer knows about the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UiContext {
    /// Email of the logged-in user, if any.
    pub current_user: Option<String>,
    pub remote_ip: String,
}

impl UiContext {
    pub fn new(current_user: Option<String>, remote_ip: impl Into<String>) -> Self {
        Self {
            current_user,
            remote_ip: remote_ip.into(),
        }
    }

    /// Whether the request originates from this host.
    pub fn is_local_request(&self) -> bool {
        matches!(self.remote_ip.trim(), "127.0.0.1" | "::1" | "localhost")
    }
}

/// Collaborators shared by every UI module of one request.
pub struct ModuleEnv<'a> {
    pub conn: &'a Connection,
    pub renderer: &'a dyn TemplateRenderer,
    pub request: &'a UiContext,
    /// Upload roots; each holds one folder per study id.
    pub upload_roots: &'a [PathBuf],
}

impl<'a> ModuleEnv<'a> {
    pub fn new(
        conn: &'a Connection,
        renderer: &'a dyn TemplateRenderer,
        request: &'a UiContext,
        upload_roots: &'a [PathBuf],
    ) -> Self {
        Self {
            conn,
            renderer,
            request,
            upload_roots,
        }
    }

    /// Loads the logged-in user.
    ///
    /// # Errors
    /// - `NotAuthenticated` when the request has no user.
    /// - `Repo(NotFound)` when the user is not stored.
    pub fn current_user(&self) -> UiResult<User> {
        let email = self
            .request
            .current_user
            .as_deref()
            .ok_or(UiError::NotAuthenticated)?;
        let studies = SqliteStudyRepository::try_new(self.conn)?;
        studies
            .get_user(email)?
            .ok_or_else(|| UiError::Repo(RepoError::not_found("user", email)))
    }

    /// Serializes `view` and renders `template` with it.
    pub fn render<V: Serialize>(&self, template: &str, view: &V) -> UiResult<String> {
        let context = serde_json::to_value(view)?;
        match self.renderer.render_string(template, &context) {
            Ok(markup) => {
                info!("event=ui_render module=uimodules status=ok template={template}");
                Ok(markup)
            }
            Err(err) => {
                warn!("event=ui_render module=uimodules status=error template={template}");
                Err(err.into())
            }
        }
    }
}
