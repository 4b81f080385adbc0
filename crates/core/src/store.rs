//! Whole-document JSON persistence shared by the library and settings stores.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Read `path` as JSON, falling back to `T::default()` when the file is
/// missing or cannot be parsed.
pub fn load_or_default<T>(path: impl AsRef<Path>) -> T
where
    T: DeserializeOwned + Default,
{
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "document missing; using defaults");
            return T::default();
        }
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to read document; using defaults");
            return T::default();
        }
    };

    match serde_json::from_str(&contents) {
        Ok(document) => document,
        Err(err) => {
            warn!(path = %path.display(), %err, "failed to parse document; using defaults");
            T::default()
        }
    }
}

/// Serialize `document` and replace `path` with it.
///
/// The bytes go to a temporary file next to the target which is then
/// renamed over it, so readers never observe a half-written document.
pub fn save<T>(path: impl AsRef<Path>, document: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let path = path.as_ref();
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create directory {}", parent.display()))?;

    let serialized =
        serde_json::to_vec_pretty(document).context("failed to serialize document")?;
    let mut temp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;
    temp.write_all(&serialized)
        .with_context(|| format!("failed to write {}", path.display()))?;
    temp.persist(path)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    Ok(())
}
