//! Crash-safe file primitives.
//!
//! Every write lands in a temp file beside the target and is renamed over
//! it, so a reader never observes a half-written file. Parent directories
//! are created on demand.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use turboedit_core::{Error, Result, generate_id};

/// Temp path in the same directory as `path`, so the final rename never
/// crosses a filesystem boundary.
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    path.with_file_name(format!(".{}.{}.tmp", name, generate_id()))
}

/// Write `bytes` to `path` via temp file + rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).map_err(Error::io)?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = fs::write(&temp_path, bytes) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(e));
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(Error::io(e));
    }
    Ok(())
}

/// Remove `path`. Returns whether a file was actually removed.
pub fn remove_if_exists(path: &Path) -> Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::io(e)),
    }
}

/// Serialize `value` as pretty JSON and write it atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

/// Read a JSON record; `None` if the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(Error::io(e)),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Load every `*.json` record in `dir`. Unreadable or corrupt entries are
/// logged and skipped; a missing directory yields nothing.
pub fn read_json_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(e)),
    };

    let mut records = Vec::new();
    for entry in entries {
        let path = entry.map_err(Error::io)?.path();
        if path.extension().is_none_or(|ext| ext != "json") {
            continue;
        }
        match read_json(&path) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => log::warn!("Skipping unreadable record {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

/// Record ids become file names; reject anything that could escape the
/// store directory.
pub fn check_record_id(id: &str) -> Result<()> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::invalid_path(format!("invalid record id: {:?}", id)))
    }
}
