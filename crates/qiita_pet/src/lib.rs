//! Web-facing layer of Qiita: UI modules and base handler helpers.
//!
//! Routing, sessions and the template engine belong to the hosting web
//! framework; this crate reaches it only through `TemplateRenderer`.

pub mod handlers;
pub mod render;
pub mod uimodules;

pub use handlers::{
    current_user_from_cookie, error_page, index_page, no_page, CookieUser, ErrorDetails, Page,
};
pub use render::{escape_html, JsonContextRenderer, RenderError, TemplateRenderer};
pub use uimodules::{
    ModuleEnv, PrepTemplatePanel, RawDataEditorTab, RawDataTab, UiContext, UiError, UiResult,
};
