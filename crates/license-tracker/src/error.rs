//! Error types for license-tracker.
//!
//! This module defines all error types used throughout the crate and the
//! classification the HTTP layer uses to pick a status code.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for license-tracker operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Client Errors ===
    /// The request body is missing, is not JSON, or has the wrong shape.
    #[error("invalid request body: {message}")]
    InvalidBody {
        /// Description of what is wrong with the body.
        message: String,
    },

    /// One or more required record fields are absent.
    #[error("missing required fields: {}", fields.join(", "))]
    MissingFields {
        /// The absent keys, in canonical field order.
        fields: Vec<&'static str>,
    },

    // === Addressing Errors ===
    /// A positional index is outside the current collection.
    #[error("index out of range: {index}")]
    IndexOutOfRange {
        /// The requested index, as received.
        index: String,
    },

    /// No record carries the requested id.
    #[error("license not found: {id}")]
    LicenseNotFound {
        /// The requested id, as received.
        id: String,
    },

    // === Storage Errors ===
    /// Failed to read the backing file.
    #[error("failed to read store at {path}: {source}")]
    StoreRead {
        /// Path to the backing file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the backing file.
    #[error("failed to write store at {path}: {source}")]
    StoreWrite {
        /// Path to the backing file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file does not hold a valid record collection.
    #[error("store at {path} is corrupt: {source}")]
    StoreCorrupt {
        /// Path to the backing file.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: serde_json::Error,
    },

    /// An entry of the stored collection is not a record object.
    #[error("entry {index} of store at {path} is not a record object")]
    StoreRecord {
        /// Path to the backing file.
        path: PathBuf,
        /// Position of the entry in the collection.
        index: usize,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for license-tracker operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new invalid body error.
    #[must_use]
    pub fn invalid_body(message: impl Into<String>) -> Self {
        Self::InvalidBody {
            message: message.into(),
        }
    }

    /// Create an index out of range error.
    #[must_use]
    pub fn index_out_of_range(index: impl Into<String>) -> Self {
        Self::IndexOutOfRange {
            index: index.into(),
        }
    }

    /// Create a license not found error.
    #[must_use]
    pub fn license_not_found(id: impl Into<String>) -> Self {
        Self::LicenseNotFound { id: id.into() }
    }

    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error was caused by the client's input.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidBody { .. } | Self::MissingFields { .. })
    }

    /// Check if this error means the addressed record does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::IndexOutOfRange { .. } | Self::LicenseNotFound { .. }
        )
    }

    /// HTTP status code for this error.
    ///
    /// Client input errors map to 400, addressing errors to 404 and
    /// everything else to 500.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else if self.is_not_found() {
            404
        } else {
            500
        }
    }
}
