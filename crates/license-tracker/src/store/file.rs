//! File helpers shared by the store and the CSV exporter.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{Error, Result};

/// Create the parent directory of `path` if it does not exist yet.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }
    Ok(())
}

/// Sibling path used to stage a write before it replaces `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Replace the contents of `path` with `bytes`.
///
/// The data is written to a sibling file first and renamed over the target,
/// so readers never observe a half-written file.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let to_store_error = |source| Error::StoreWrite {
        path: path.to_path_buf(),
        source,
    };

    let staging = staging_path(path);
    let mut file = fs::File::create(&staging).map_err(to_store_error)?;
    file.write_all(bytes).map_err(to_store_error)?;
    file.sync_all().map_err(to_store_error)?;
    drop(file);

    fs::rename(&staging, path).map_err(to_store_error)?;
    debug!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Name an unreadable file is moved to.
pub(crate) fn quarantine_path(path: &Path, now: DateTime<Utc>) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(format!(".corrupt-{}", now.format("%Y%m%dT%H%M%S%.3fZ")));
    path.with_file_name(name)
}

/// Move `path` aside under a timestamped name and return the new location.
pub(crate) fn quarantine(path: &Path) -> Result<PathBuf> {
    let target = quarantine_path(path, Utc::now());
    fs::rename(path, &target).map_err(|source| Error::StoreWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(target)
}
