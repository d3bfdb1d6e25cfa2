//! Request logging middleware.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};

/// Log one line per request with its status and latency.
pub(crate) async fn log_requests(request: Request, next: Next) -> Response {
    let span = info_span!(
        "http.request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    let started = Instant::now();

    let response = next.run(request).instrument(span.clone()).await;

    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "request completed"
        );
    });
    response
}
