//! Persistence layer for license-tracker.
//!
//! The whole collection lives in one JSON document. Every operation loads
//! the file, optionally mutates the collection, and rewrites the file, all
//! while holding the store's mutex. The mutex only serializes access within
//! one process; running several processes against the same file is unsafe.

pub(crate) mod file;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::CorruptPolicy;
use crate::error::{Error, Result};
use crate::license::{License, LicenseId, LicenseInput, Level};

/// Contents written to a freshly initialized store.
const EMPTY_COLLECTION: &[u8] = b"[]";

/// A record as found on disk.
///
/// Files written before ids existed lack one, and hand-edited or older
/// files may hold loosely typed values. Every field is optional here so a
/// single odd record never makes the whole collection unreadable.
#[derive(Debug, Deserialize)]
struct StoredLicense {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    name: Value,
    #[serde(default)]
    start_date: Value,
    #[serde(default)]
    end_date: Value,
    #[serde(default)]
    active: Value,
    #[serde(default)]
    level: Option<Level>,
}

/// One stored record after decoding.
struct Decoded {
    license: License,
    assigned_id: bool,
    coerced: bool,
}

impl StoredLicense {
    fn decode(self) -> Decoded {
        let existing = self.id.as_str().and_then(|raw| raw.parse::<LicenseId>().ok());
        let coerced = !(self.name.is_string()
            && self.start_date.is_string()
            && self.end_date.is_string()
            && self.active.is_boolean());

        let input = LicenseInput {
            name: text(self.name),
            start_date: text(self.start_date),
            end_date: text(self.end_date),
            active: truthy(&self.active),
            level: self.level.unwrap_or_else(Level::null),
        };
        Decoded {
            license: License::with_id(existing.unwrap_or_default(), input),
            assigned_id: existing.is_none(),
            coerced,
        }
    }
}

/// Text form of a stored value; `null` and absent values read as empty.
fn text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a stored `active` value, as the dashboard reads it.
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n.abs() > 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// JSON file store for the license collection.
#[derive(Debug)]
pub struct LicenseStore {
    /// Path to the backing file.
    path: PathBuf,
    /// Handling of an unreadable backing file.
    on_corrupt: CorruptPolicy,
    /// Serializes every load and save.
    lock: Mutex<()>,
}

impl LicenseStore {
    /// Open the store at `path`, creating an empty collection if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory or the initial file cannot
    /// be created.
    pub fn open(path: impl AsRef<Path>, on_corrupt: CorruptPolicy) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        file::ensure_parent(&path)?;

        let store = Self {
            path,
            on_corrupt,
            lock: Mutex::new(()),
        };
        if !store.path.exists() {
            store.initialize()?;
        }

        info!("License store opened at {}", store.path.display());
        Ok(store)
    }

    /// Get the path to the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the full collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, or if it is corrupt and
    /// the store is configured to fail on corruption.
    pub fn load(&self) -> Result<Vec<License>> {
        let _guard = self.guard();
        self.load_locked()
    }

    /// Overwrite the backing file with `records`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, records: &[License]) -> Result<()> {
        let _guard = self.guard();
        self.save_locked(records)
    }

    /// List every record in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn list(&self) -> Result<Vec<License>> {
        self.load()
    }

    /// Append a new record and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded or saved.
    pub fn create(&self, input: LicenseInput) -> Result<License> {
        self.modify(|records| {
            let license = License::new(input);
            records.push(license.clone());
            Ok(license)
        })
        .inspect(|license| info!("Created license {} ({})", license.id, license.name))
    }

    /// Replace the record at `index`, keeping its id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end, or a
    /// storage error.
    pub fn update_at(&self, index: usize, input: LicenseInput) -> Result<License> {
        self.modify(|records| {
            let license = records
                .get_mut(index)
                .ok_or_else(|| Error::index_out_of_range(index.to_string()))?;
            license.apply(input);
            Ok(license.clone())
        })
        .inspect(|license| info!("Updated license {} at index {}", license.id, index))
    }

    /// Remove the record at `index`; later records shift down by one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index` is past the end, or a
    /// storage error.
    pub fn delete_at(&self, index: usize) -> Result<License> {
        self.modify(|records| {
            if index >= records.len() {
                return Err(Error::index_out_of_range(index.to_string()));
            }
            Ok(records.remove(index))
        })
        .inspect(|license| info!("Deleted license {} at index {}", license.id, index))
    }

    /// Get the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LicenseNotFound`] if no record has that id, or a
    /// storage error.
    pub fn get(&self, id: LicenseId) -> Result<License> {
        self.load()?
            .into_iter()
            .find(|license| license.id == id)
            .ok_or_else(|| Error::license_not_found(id.to_string()))
    }

    /// Replace the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LicenseNotFound`] if no record has that id, or a
    /// storage error.
    pub fn update(&self, id: LicenseId, input: LicenseInput) -> Result<License> {
        self.modify(|records| {
            let license = records
                .iter_mut()
                .find(|license| license.id == id)
                .ok_or_else(|| Error::license_not_found(id.to_string()))?;
            license.apply(input);
            Ok(license.clone())
        })
        .inspect(|license| info!("Updated license {}", license.id))
    }

    /// Remove the record with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LicenseNotFound`] if no record has that id, or a
    /// storage error.
    pub fn delete(&self, id: LicenseId) -> Result<License> {
        self.modify(|records| {
            let position = records
                .iter()
                .position(|license| license.id == id)
                .ok_or_else(|| Error::license_not_found(id.to_string()))?;
            Ok(records.remove(position))
        })
        .inspect(|license| info!("Deleted license {}", license.id))
    }

    /// Get statistics about the stored collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded.
    pub fn stats(&self) -> Result<StoreStats> {
        self.view(|records| {
            let active = records.iter().filter(|license| license.active).count();
            let file_size_bytes = fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

            Ok(StoreStats {
                total: records.len(),
                active,
                inactive: records.len() - active,
                file_size_bytes,
            })
        })
    }

    /// Run `read` over the collection while holding the lock.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be loaded, or whatever
    /// `read` returns.
    pub fn view<T>(&self, read: impl FnOnce(&[License]) -> Result<T>) -> Result<T> {
        let _guard = self.guard();
        let records = self.load_locked()?;
        read(&records)
    }

    /// Load, mutate and save the collection under one lock.
    ///
    /// Nothing is written if `mutate` fails.
    fn modify<T>(&self, mutate: impl FnOnce(&mut Vec<License>) -> Result<T>) -> Result<T> {
        let _guard = self.guard();
        let mut records = self.load_locked()?;
        let output = mutate(&mut records)?;
        self.save_locked(&records)?;
        Ok(output)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The guarded value is (), so a poisoned lock carries no bad state
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn initialize(&self) -> Result<()> {
        debug!("Initializing empty store at {}", self.path.display());
        file::write_atomic(&self.path, EMPTY_COLLECTION)
    }

    fn load_locked(&self) -> Result<Vec<License>> {
        if !self.path.exists() {
            self.initialize()?;
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path).map_err(|source| Error::StoreRead {
            path: self.path.clone(),
            source,
        })?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        // Only unparseable JSON or a non-array document counts as corrupt
        let entries: Vec<Value> = match serde_json::from_str(&contents) {
            Ok(entries) => entries,
            Err(source) => return self.handle_corrupt(source),
        };

        let mut assigned = 0;
        let mut coerced = 0;
        let mut records = Vec::with_capacity(entries.len());
        for (index, entry) in entries.into_iter().enumerate() {
            if !entry.is_object() {
                return Err(Error::StoreRecord {
                    path: self.path.clone(),
                    index,
                });
            }
            let stored: StoredLicense = serde_json::from_value(entry)?;
            let decoded = stored.decode();
            assigned += usize::from(decoded.assigned_id);
            coerced += usize::from(decoded.coerced);
            records.push(decoded.license);
        }

        if coerced > 0 {
            warn!(
                "{} stored licenses in {} have loosely typed fields",
                coerced,
                self.path.display()
            );
        }
        if assigned > 0 {
            info!("Assigned ids to {} stored licenses", assigned);
            self.save_locked(&records)?;
        }

        debug!("Loaded {} licenses from {}", records.len(), self.path.display());
        Ok(records)
    }

    fn handle_corrupt(&self, source: serde_json::Error) -> Result<Vec<License>> {
        match self.on_corrupt {
            CorruptPolicy::Fail => Err(Error::StoreCorrupt {
                path: self.path.clone(),
                source,
            }),
            CorruptPolicy::Quarantine => {
                let moved = file::quarantine(&self.path)?;
                warn!(
                    "Store at {} is unreadable ({}); moved to {} and starting empty",
                    self.path.display(),
                    source,
                    moved.display()
                );
                self.initialize()?;
                Ok(Vec::new())
            }
        }
    }

    fn save_locked(&self, records: &[License]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;
        file::write_atomic(&self.path, &json)?;
        debug!("Saved {} licenses to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Statistics about the stored collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of records.
    pub total: usize,
    /// Number of records flagged active.
    pub active: usize,
    /// Number of records flagged inactive.
    pub inactive: usize,
    /// Size of the backing file in bytes.
    pub file_size_bytes: u64,
}
