//! HTTP surface of license-tracker.
//!
//! Routes the JSON API, the CSV export and the two static pages onto an
//! axum [`Router`] sharing one [`AppState`].

mod handlers;
mod middleware;
mod pages;
mod response;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;

use crate::config::Config;
use crate::error::Result;
use crate::store::LicenseStore;

/// State shared by every request handler.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The license store.
    pub store: Arc<LicenseStore>,
    /// Where the CSV export is regenerated.
    pub export_file: PathBuf,
    /// File name offered for the CSV download.
    pub export_name: String,
    /// Directory holding the static pages.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Open the store and collect the paths named in `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = LicenseStore::open(&config.storage.data_file, config.storage.on_corrupt)?;
        Ok(Self {
            store: Arc::new(store),
            export_file: config.storage.export_file.clone(),
            export_name: config.export_file_name(),
            static_dir: config.server.static_dir.clone(),
        })
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::dashboard))
        .route("/edit", get(pages::edit))
        .route("/api/pulse", get(handlers::pulse))
        .route("/api/stats", get(handlers::stats))
        .route(
            "/api/licenses",
            get(handlers::list_licenses).post(handlers::create_license),
        )
        .route(
            "/api/licenses/:index",
            axum::routing::put(handlers::update_license).delete(handlers::delete_license),
        )
        .route(
            "/api/licenses/id/:id",
            get(handlers::get_license_by_id)
                .put(handlers::update_license_by_id)
                .delete(handlers::delete_license_by_id),
        )
        .route("/api/export_csv", get(handlers::export_csv))
        .layer(axum::middleware::from_fn(middleware::log_requests))
        .with_state(state)
}
