//! `license-tracker` - A small license record service
//!
//! This library stores license records in a single JSON file and exposes
//! them over an HTTP API with CSV export, plus the pieces the `lictrack`
//! binary needs to run it.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod http;
pub mod license;
pub mod logging;
pub mod server;
pub mod store;
pub mod validation;

pub use config::{Config, CorruptPolicy};
pub use error::{Error, Result};
pub use http::{router, AppState};
pub use license::{Level, License, LicenseId, LicenseInput};
pub use logging::init_logging;
pub use store::{LicenseStore, StoreStats};
