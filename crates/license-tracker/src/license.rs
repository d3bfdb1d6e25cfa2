//! Core record types for license-tracker.
//!
//! This module defines the license record, its stable identifier, the tier
//! value and the client-submitted input a record is built from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable identifier assigned to a license when it is created.
///
/// Unlike the positional index, the id never changes when other records
/// are inserted or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseId(Uuid);

impl LicenseId {
    /// Generate a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LicenseId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LicenseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for LicenseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The tier of a license.
///
/// Clients and older store files send integers, strings, floats or
/// `null` here. Every JSON value is accepted and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Level {
    /// Numeric tier (1 = low, 2 = medium, 3 = high).
    Tier(i64),
    /// Any other tier name.
    Named(String),
    /// Anything else, kept verbatim.
    Other(Value),
}

impl Level {
    /// The `null` level, as sent for an unselected tier.
    #[must_use]
    pub fn null() -> Self {
        Self::Other(Value::Null)
    }

    /// Human readable priority label, as shown on the dashboard.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Tier(1) => "Low Priority",
            Self::Tier(2) => "Medium Priority",
            Self::Tier(3) => "High Priority",
            _ => "Unknown Priority",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tier(tier) => write!(f, "{tier}"),
            Self::Named(name) => f.write_str(name),
            Self::Other(Value::Null) => Ok(()),
            Self::Other(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for Level {
    fn from(tier: i64) -> Self {
        Self::Tier(tier)
    }
}

impl From<&str> for Level {
    fn from(name: &str) -> Self {
        Self::Named(name.to_string())
    }
}

/// The record fields a client submits on create and update.
///
/// Any `id` in the submitted body is ignored; ids are owned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseInput {
    /// Display name of the license.
    pub name: String,
    /// Start of the validity window (not format checked).
    pub start_date: String,
    /// End of the validity window (not format checked).
    pub end_date: String,
    /// Whether the license is currently in use.
    pub active: bool,
    /// Tier of the license.
    pub level: Level,
}

/// A stored license record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct License {
    /// Stable identifier.
    pub id: LicenseId,
    /// Display name of the license.
    pub name: String,
    /// Start of the validity window.
    pub start_date: String,
    /// End of the validity window.
    pub end_date: String,
    /// Whether the license is currently in use.
    pub active: bool,
    /// Tier of the license.
    pub level: Level,
}

impl License {
    /// Build a new record with a fresh id.
    #[must_use]
    pub fn new(input: LicenseInput) -> Self {
        Self::with_id(LicenseId::new(), input)
    }

    /// Build a record with a known id.
    #[must_use]
    pub fn with_id(id: LicenseId, input: LicenseInput) -> Self {
        Self {
            id,
            name: input.name,
            start_date: input.start_date,
            end_date: input.end_date,
            active: input.active,
            level: input.level,
        }
    }

    /// Replace every field except the id.
    pub fn apply(&mut self, input: LicenseInput) {
        *self = Self::with_id(self.id, input);
    }

    /// The client-visible fields of this record.
    #[must_use]
    pub fn to_input(&self) -> LicenseInput {
        LicenseInput {
            name: self.name.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            active: self.active,
            level: self.level.clone(),
        }
    }
}
