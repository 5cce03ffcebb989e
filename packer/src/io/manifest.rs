//! Package manifest (`package.json`) reader.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{PackError, PackResult};

pub const MANIFEST_FILE: &str = "package.json";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    dependencies: Option<Map<String, Value>>,
}

/// Names of the direct runtime dependencies declared by a manifest.
///
/// Version ranges are ignored; only the names matter for packaging. A manifest
/// without a `dependencies` object has none.
pub fn read_dependency_names(manifest_path: &Path) -> PackResult<Vec<String>> {
    let contents = fs::read_to_string(manifest_path)
        .map_err(|err| PackError::file_unavailable(manifest_path, err))?;
    let manifest: Manifest =
        serde_json::from_str(&contents).map_err(|err| PackError::ManifestInvalid {
            path: manifest_path.to_path_buf(),
            reason: err.to_string(),
        })?;
    Ok(manifest
        .dependencies
        .map(|deps| deps.into_iter().map(|(name, _)| name).collect())
        .unwrap_or_default())
}
