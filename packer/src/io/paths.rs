//! Canonical file locations within a project root.

use std::path::PathBuf;

pub const UNITS_FILE: &str = "packer.json";
pub const LOG_FILE: &str = "packer.log";
pub const CONFIG_FILE: &str = "packer.toml";

/// All packer-owned paths for a project root.
#[derive(Debug, Clone)]
pub struct PackerPaths {
    pub root: PathBuf,
    pub units_path: PathBuf,
    pub log_path: PathBuf,
    pub config_path: PathBuf,
}

impl PackerPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            units_path: root.join(UNITS_FILE),
            log_path: root.join(LOG_FILE),
            config_path: root.join(CONFIG_FILE),
            root,
        }
    }
}
