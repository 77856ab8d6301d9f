//! Base request handler helpers.
//!
//! # Responsibility
//! - Resolve the current user from the session cookie.
//! - Produce the index, not-found and debug error pages.
//!
//! # Invariants
//! - A 404 always renders `404.html`, in debug mode too.
//! - Text placed into `error.html` outside the template is HTML escaped.

use crate::render::{escape_html, RenderError, TemplateRenderer};
use log::warn;
use serde_json::json;

/// Name of the session cookie holding the user email.
pub const USER_COOKIE: &str = "user";

pub const NOT_FOUND: u16 = 404;

/// Result of reading the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieUser {
    pub user: Option<String>,
    /// The caller should clear `USER_COOKIE` from the response.
    pub clear_cookie: bool,
}

/// Reads the current user from the (already verified) cookie value.
///
/// Surrounding quotes and spaces are stripped. An absent cookie yields no
/// user and asks for the cookie to be cleared.
pub fn current_user_from_cookie(cookie: Option<&str>) -> CookieUser {
    match cookie {
        Some(value) => CookieUser {
            user: Some(value.trim_matches(|ch| ch == '"' || ch == ' ').to_string()),
            clear_cookie: false,
        },
        None => CookieUser {
            user: None,
            clear_cookie: true,
        },
    }
}

/// A rendered response body with its status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Failure details shown on the debug error page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorDetails {
    pub error: String,
    /// Formatted backtrace, one entry per line.
    pub trace: Vec<String>,
    /// Request attributes as `(name, value)` pairs.
    pub request: Vec<(String, String)>,
}

impl ErrorDetails {
    /// Trace lines joined as HTML, each followed by `<br />`.
    pub fn trace_info(&self) -> String {
        self.trace
            .iter()
            .map(|line| format!("{}<br />", escape_html(line)))
            .collect()
    }

    /// Request attributes as `<strong>name</strong>: value<br />` HTML.
    pub fn request_info(&self) -> String {
        self.request
            .iter()
            .map(|(name, value)| {
                format!(
                    "<strong>{}</strong>: {}<br />",
                    escape_html(name),
                    escape_html(value)
                )
            })
            .collect()
    }
}

/// Renders the index page.
pub fn index_page(renderer: &dyn TemplateRenderer, user: Option<&str>) -> Result<Page, RenderError> {
    let body = renderer.render_string("index.html", &json!({ "user": user, "analyses": [] }))?;
    Ok(Page { status: 200, body })
}

/// Renders the not-found page for unrouted paths.
pub fn no_page(renderer: &dyn TemplateRenderer, user: Option<&str>) -> Result<Page, RenderError> {
    let body = renderer.render_string("404.html", &json!({ "user": user }))?;
    Ok(Page {
        status: NOT_FOUND,
        body,
    })
}

/// Renders the page for a failed request.
///
/// A 404 renders `404.html`. Other codes render `error.html` only in debug
/// mode with details; otherwise `None` is returned and the web layer keeps
/// its default error body.
pub fn error_page(
    renderer: &dyn TemplateRenderer,
    status: u16,
    debug: bool,
    user: Option<&str>,
    details: Option<&ErrorDetails>,
) -> Result<Option<Page>, RenderError> {
    if status == NOT_FOUND {
        return no_page(renderer, user).map(Some);
    }

    warn!("event=request_error module=handlers status={status} debug={debug}");
    let Some(details) = details.filter(|_| debug) else {
        return Ok(None);
    };
    let body = renderer.render_string(
        "error.html",
        &json!({
            "error": details.error,
            "trace_info": details.trace_info(),
            "request_info": details.request_info(),
            "user": user,
        }),
    )?;
    Ok(Some(Page { status, body }))
}
