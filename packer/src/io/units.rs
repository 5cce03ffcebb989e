//! Deploy unit list stored in `packer.json`.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::core::types::DeployUnit;

/// Load the ordered unit list.
///
/// A missing file means there is nothing to deploy. Duplicate names keep their
/// first position.
pub fn load_units(path: &Path) -> Result<Vec<DeployUnit>> {
    if !path.exists() {
        debug!(path = %path.display(), "no unit list, nothing to deploy");
        return Ok(Vec::new());
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let names: Vec<String> =
        serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;

    let mut seen = HashSet::new();
    let mut units = Vec::with_capacity(names.len());
    for name in names {
        if name.trim().is_empty() {
            bail!("{}: unit names must be non-empty", path.display());
        }
        if seen.insert(name.clone()) {
            units.push(DeployUnit::new(name));
        }
    }
    debug!(count = units.len(), "units loaded");
    Ok(units)
}
