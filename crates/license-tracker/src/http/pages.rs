//! Static HTML pages, served from the configured directory as-is.

use std::io::ErrorKind;
use std::path::Path;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use super::AppState;

const DASHBOARD_PAGE: &str = "dashboard.html";
const EDIT_PAGE: &str = "edit.html";

pub(crate) async fn dashboard(State(state): State<AppState>) -> Response {
    serve_page(&state.static_dir, DASHBOARD_PAGE).await
}

pub(crate) async fn edit(State(state): State<AppState>) -> Response {
    serve_page(&state.static_dir, EDIT_PAGE).await
}

async fn serve_page(dir: &Path, name: &str) -> Response {
    let path = dir.join(name);
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Page {} not found", path.display());
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "page not found" })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Failed to read page {}: {}", path.display(), e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "internal server error" })),
            )
                .into_response()
        }
    }
}
