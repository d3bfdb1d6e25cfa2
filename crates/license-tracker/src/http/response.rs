//! Mapping of crate errors onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use crate::error::Error;

/// Message returned for every server-side failure.
const INTERNAL_MESSAGE: &str = "internal server error";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self {
            Error::IndexOutOfRange { .. } => "index out of range".to_string(),
            err if err.is_client_error() || err.is_not_found() => err.to_string(),
            err => {
                // Storage details stay in the log, not in the response
                error!("Request failed: {}", err);
                INTERNAL_MESSAGE.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// The `{"status": "ok"}` body returned by successful operations.
pub(crate) fn ok_status() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
