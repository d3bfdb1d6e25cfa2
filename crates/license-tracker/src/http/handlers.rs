//! JSON API and CSV export handlers.
//!
//! Store calls do blocking file I/O, so every one of them runs on the
//! blocking thread pool.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};

use super::response::ok_status;
use super::AppState;
use crate::error::{Error, Result};
use crate::export::{self, CSV_CONTENT_TYPE};
use crate::license::{License, LicenseId};
use crate::store::{LicenseStore, StoreStats};
use crate::validation::parse_input;

/// Run a store operation on the blocking pool.
async fn with_store<T, F>(store: &Arc<LicenseStore>, op: F) -> Result<T>
where
    F: FnOnce(&LicenseStore) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|e| Error::internal(format!("store task failed: {e}")))?
}

/// Parse a positional index; anything that is not a non-negative integer
/// can never be in range.
fn parse_index(raw: &str) -> Result<usize> {
    raw.parse().map_err(|_| Error::index_out_of_range(raw))
}

/// Parse a license id; a malformed id can never match a record.
fn parse_id(raw: &str) -> Result<LicenseId> {
    raw.parse().map_err(|_| Error::license_not_found(raw))
}

pub(crate) async fn pulse() -> Json<Value> {
    ok_status()
}

pub(crate) async fn list_licenses(State(state): State<AppState>) -> Result<Json<Vec<License>>> {
    let records = with_store(&state.store, LicenseStore::list).await?;
    Ok(Json(records))
}

pub(crate) async fn create_license(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>)> {
    let input = parse_input(&body)?;
    let license = with_store(&state.store, move |store| store.create(input)).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "status": "ok", "id": license.id })),
    ))
}

pub(crate) async fn update_license(
    State(state): State<AppState>,
    Path(raw_index): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let input = parse_input(&body)?;
    let index = parse_index(&raw_index)?;
    with_store(&state.store, move |store| store.update_at(index, input)).await?;
    Ok(ok_status())
}

pub(crate) async fn delete_license(
    State(state): State<AppState>,
    Path(raw_index): Path<String>,
) -> Result<Json<Value>> {
    let index = parse_index(&raw_index)?;
    with_store(&state.store, move |store| store.delete_at(index)).await?;
    Ok(ok_status())
}

pub(crate) async fn get_license_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<License>> {
    let id = parse_id(&raw_id)?;
    let license = with_store(&state.store, move |store| store.get(id)).await?;
    Ok(Json(license))
}

pub(crate) async fn update_license_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    body: Bytes,
) -> Result<Json<Value>> {
    let input = parse_input(&body)?;
    let id = parse_id(&raw_id)?;
    with_store(&state.store, move |store| store.update(id, input)).await?;
    Ok(ok_status())
}

pub(crate) async fn delete_license_by_id(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<Value>> {
    let id = parse_id(&raw_id)?;
    with_store(&state.store, move |store| store.delete(id)).await?;
    Ok(ok_status())
}

pub(crate) async fn stats(State(state): State<AppState>) -> Result<Json<StoreStats>> {
    let stats = with_store(&state.store, LicenseStore::stats).await?;
    Ok(Json(stats))
}

pub(crate) async fn export_csv(State(state): State<AppState>) -> Result<Response> {
    let export_file = state.export_file.clone();
    let bytes = with_store(&state.store, move |store| {
        store.view(|records| export::export_to(&export_file, records))
    })
    .await?;

    let disposition = format!("attachment; filename=\"{}\"", state.export_name);
    Ok((
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
