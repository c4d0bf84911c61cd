//! JSON file persistence
//!
//! Whole-document load/save used by both stores.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

/// Load a document, falling back to `T::default()` when the file is
/// missing or unreadable. Parse failures are logged, never fatal.
pub fn load_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    if !path.exists() {
        info!("[STORE] {} not found, starting empty", path.display());
        return T::default();
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str::<T>(&contents) {
            Ok(value) => value,
            Err(e) => {
                error!("[STORE] Failed to parse {}: {}", path.display(), e);
                T::default()
            }
        },
        Err(e) => {
            error!("[STORE] Failed to read {}: {}", path.display(), e);
            T::default()
        }
    }
}

/// Write a document as pretty-printed JSON.
///
/// The payload goes to a sibling `.tmp` file first and is renamed over the
/// target, so a crash mid-write leaves the previous document intact.
pub fn save<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize,
{
    let contents = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}
