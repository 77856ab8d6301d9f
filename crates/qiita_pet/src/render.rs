//! Template rendering seam.
//!
//! # Responsibility
//! - Define the call the web layer makes to turn a template name and a JSON
//!   context into markup.
//! - Provide HTML escaping for the few strings assembled outside templates.
//!
//! # Invariants
//! - Renderers receive fully serialized contexts; no database handle crosses
//!   this boundary.

use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Error raised by a template renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    pub template: String,
    pub message: String,
}

impl RenderError {
    pub fn new(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            message: message.into(),
        }
    }
}

impl Display for RenderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to render `{}`: {}", self.template, self.message)
    }
}

impl Error for RenderError {}

/// Renders a named template with a JSON context.
pub trait TemplateRenderer {
    fn render_string(&self, template: &str, context: &Value) -> Result<String, RenderError>;
}

/// Renderer that emits the template name and context as pretty JSON.
///
/// Used by the operator CLI to inspect what a page would receive.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonContextRenderer;

impl TemplateRenderer for JsonContextRenderer {
    fn render_string(&self, template: &str, context: &Value) -> Result<String, RenderError> {
        let document = serde_json::json!({
            "template": template,
            "context": context,
        });
        serde_json::to_string_pretty(&document)
            .map_err(|err| RenderError::new(template, err.to_string()))
    }
}

/// Escapes `&`, `<`, `>`, `"` and `'` for HTML text and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}
