//! Presence validation for submitted license bodies.
//!
//! Only the presence of the required keys is checked here; value types are
//! enforced when the body is decoded into [`LicenseInput`].

use serde_json::Value;

use crate::error::{Error, Result};
use crate::license::LicenseInput;

/// Keys every submitted record must carry, in canonical order.
pub const REQUIRED_FIELDS: [&str; 5] = ["name", "start_date", "end_date", "active", "level"];

/// Check that `body` is an object holding every required key.
///
/// # Errors
///
/// Returns [`Error::InvalidBody`] if the body is not a JSON object and
/// [`Error::MissingFields`] listing the absent keys otherwise.
pub fn validate(body: &Value) -> Result<()> {
    let Some(object) = body.as_object() else {
        return Err(Error::invalid_body("expected a JSON object"));
    };

    let missing: Vec<&'static str> = REQUIRED_FIELDS
        .iter()
        .copied()
        .filter(|field| !object.contains_key(*field))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingFields { fields: missing })
    }
}

/// Parse and validate a raw request body into a [`LicenseInput`].
///
/// # Errors
///
/// Returns a client error if the body is empty, is not JSON, misses a
/// required key, or carries a value of the wrong type.
pub fn parse_input(bytes: &[u8]) -> Result<LicenseInput> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::invalid_body("request body is empty"));
    }

    let body: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::invalid_body(format!("malformed JSON: {e}")))?;
    validate(&body)?;

    serde_json::from_value(body).map_err(|e| Error::invalid_body(e.to_string()))
}
