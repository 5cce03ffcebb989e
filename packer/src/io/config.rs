//! Packer configuration stored in `packer.toml` at the project root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

/// Packer configuration (TOML).
///
/// The file is optional and meant to be edited by humans. Missing fields
/// default to values that match a plain `zip` + AWS CLI setup.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PackerConfig {
    /// Root-relative module paths that are provided by the deploy environment
    /// and must never be packaged.
    pub excludes: Vec<String>,

    /// Truncate captured stdout/stderr of external commands beyond this many bytes.
    pub output_limit_bytes: usize,

    pub archive: ArchiveConfig,

    pub deploy: DeployConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Archiver command; the archive path and file list are appended.
    pub command: Vec<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DeployConfig {
    /// Deploy command; `{name}` is replaced by the unit name and the archive
    /// bytes are written to stdin.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    /// Extra attempts after a failed deploy call.
    pub retries: u32,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            command: vec!["zip".to_string(), "-r".to_string()],
            timeout_secs: 5 * 60,
        }
    }
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            command: [
                "aws",
                "lambda",
                "update-function-code",
                "--function-name",
                "{name}",
                "--zip-file",
                "fileb:///dev/stdin",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            timeout_secs: 5 * 60,
            retries: 2,
        }
    }
}

impl Default for PackerConfig {
    fn default() -> Self {
        Self {
            excludes: vec![
                "node_modules/aws-sdk".to_string(),
                "node_modules/imagemagick".to_string(),
            ],
            output_limit_bytes: 100_000,
            archive: ArchiveConfig::default(),
            deploy: DeployConfig::default(),
        }
    }
}

impl PackerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.archive.timeout_secs == 0 {
            return Err(anyhow!("archive.timeout_secs must be > 0"));
        }
        if self.deploy.timeout_secs == 0 {
            return Err(anyhow!("deploy.timeout_secs must be > 0"));
        }
        if self.archive.command.is_empty() || self.archive.command[0].trim().is_empty() {
            return Err(anyhow!("archive.command must be a non-empty array"));
        }
        if self.deploy.command.is_empty() || self.deploy.command[0].trim().is_empty() {
            return Err(anyhow!("deploy.command must be a non-empty array"));
        }
        Ok(())
    }

    /// Exclusions as root-relative paths.
    pub fn exclude_paths(&self) -> Vec<PathBuf> {
        self.excludes.iter().map(PathBuf::from).collect()
    }

    pub fn archive_timeout(&self) -> Duration {
        Duration::from_secs(self.archive.timeout_secs)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy.timeout_secs)
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PackerConfig::default()`.
pub fn load_config(path: &Path) -> Result<PackerConfig> {
    if !path.exists() {
        let cfg = PackerConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: PackerConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
