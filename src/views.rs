//! Server-rendered view seam.
//!
//! Handlers never touch markup: they name a view and hand over a serialized
//! context ("render a named view with this data"). The engine behind the
//! seam is injected through `AppState`, so a deployment ships its own
//! template bundle without touching handler code. The built-in engine
//! renders the page scaffold with the context embedded as JSON for the
//! view bundle to hydrate.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// Renders a named view with a context document.
pub trait ViewEngine: Send + Sync {
    fn render(&self, view: &str, context: &Value) -> Result<String>;
}

/// A page response: view name, context, HTTP status.
pub struct View {
    name: &'static str,
    status: StatusCode,
    context: Value,
    engine: Arc<dyn ViewEngine>,
}

impl View {
    pub fn render<C: Serialize>(
        engine: Arc<dyn ViewEngine>,
        name: &'static str,
        context: &C,
    ) -> Result<View> {
        Ok(View {
            name,
            status: StatusCode::OK,
            context: serde_json::to_value(context)?,
            engine,
        })
    }

    pub fn with_status(mut self, status: StatusCode) -> View {
        self.status = status;
        self
    }
}

impl IntoResponse for View {
    fn into_response(self) -> Response {
        match self.engine.render(self.name, &self.context) {
            Ok(body) => (
                self.status,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(err) => err.into_response(),
        }
    }
}

/// Built-in engine: emits the document scaffold with the view name and the
/// context JSON inlined for client-side hydration by the deployed template
/// bundle.
pub struct ScaffoldEngine {
    site_title: String,
}

impl ScaffoldEngine {
    pub fn new(site_title: impl Into<String>) -> Self {
        Self {
            site_title: site_title.into(),
        }
    }
}

impl ViewEngine for ScaffoldEngine {
    fn render(&self, view: &str, context: &Value) -> Result<String> {
        let page_title = context
            .get("title")
            .and_then(Value::as_str)
            .map(|t| format!("{} | {}", escape_html(t), escape_html(&self.site_title)))
            .unwrap_or_else(|| escape_html(&self.site_title));

        let meta_description = context
            .get("meta_description")
            .and_then(Value::as_str)
            .map(|d| {
                format!(
                    "\n  <meta name=\"description\" content=\"{}\">",
                    escape_html(d)
                )
            })
            .unwrap_or_default();

        let payload = serde_json::to_string(context)?;

        Ok(format!(
            "<!doctype html>\n<html lang=\"en\">\n<head>\n  <meta charset=\"utf-8\">\n  \
             <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n  \
             <title>{page_title}</title>{meta_description}\n</head>\n\
             <body data-view=\"{view}\">\n  \
             <script id=\"view-context\" type=\"application/json\">{payload}</script>\n\
             </body>\n</html>\n",
            view = escape_html(view),
            payload = escape_json_for_html(&payload),
        ))
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Inside a <script> block only `</script>` termination matters; escaping
/// `<` keeps any embedded markup inert.
fn escape_json_for_html(json: &str) -> String {
    json.replace('<', "\\u003c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scaffold_embeds_view_name_and_context() {
        let engine = ScaffoldEngine::new("PromontolioBlog");
        let html = engine
            .render("admin/blogList", &json!({"title": "Manage Articles"}))
            .unwrap();
        assert!(html.contains("data-view=\"admin/blogList\""));
        assert!(html.contains("Manage Articles | PromontolioBlog"));
        assert!(html.contains("\"title\":\"Manage Articles\""));
    }

    #[test]
    fn scaffold_escapes_markup_in_context() {
        let engine = ScaffoldEngine::new("PromontolioBlog");
        let html = engine
            .render("blog", &json!({"title": "<script>alert(1)</script>"}))
            .unwrap();
        assert!(!html.contains("<script>alert"));
        assert!(!html.contains("</script>alert"));
    }

    #[test]
    fn scaffold_includes_meta_description_when_present() {
        let engine = ScaffoldEngine::new("PromontolioBlog");
        let html = engine
            .render("index", &json!({"title": "Home", "meta_description": "Premium oil"}))
            .unwrap();
        assert!(html.contains("name=\"description\" content=\"Premium oil\""));
    }
}
