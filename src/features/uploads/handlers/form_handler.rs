use axum::{extract::State, response::Html};
use minijinja::Environment;
use serde::Serialize;

use crate::core::error::{AppError, Result};
use crate::features::uploads::state::UploadState;

/// Name the form template is registered under; the `.html` suffix turns on
/// HTML auto-escaping.
const FORM_TEMPLATE_NAME: &str = "form.html";

#[derive(Serialize)]
struct FormContext<'a> {
    auth_token: &'a str,
}

/// Render the upload form.
///
/// The template is read from disk on every request so edits show up without a
/// restart, and a missing file surfaces as a 500 on the request that hit it.
pub async fn show_form(State(state): State<UploadState>) -> Result<Html<String>> {
    let path = &state.config.form_template_path;

    let source = tokio::fs::read_to_string(path).await.map_err(|e| {
        AppError::Template(format!("Failed to read {}: {}", path.display(), e))
    })?;

    render_form(&source, &state.config.auth_token).map(Html)
}

/// Render the form template source with the shared secret
pub fn render_form(source: &str, auth_token: &str) -> Result<String> {
    let mut env = Environment::new();
    env.add_template(FORM_TEMPLATE_NAME, source)
        .map_err(|e| AppError::Template(format!("Failed to parse form template: {}", e)))?;

    let template = env
        .get_template(FORM_TEMPLATE_NAME)
        .map_err(|e| AppError::Template(e.to_string()))?;

    template
        .render(FormContext { auth_token })
        .map_err(|e| AppError::Template(format!("Failed to render form template: {}", e)))
}
