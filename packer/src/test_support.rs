//! Test-only helpers: scratch projects and scripted adapters.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::change_log::ChangeLog;
use crate::error::ExternalFailure;
use crate::io::archiver::Archiver;
use crate::io::deployer::Deployer;
use crate::io::log_store::load_log;
use crate::io::paths::PackerPaths;

/// Budget reported by scripted adapters that time out.
pub const SCRIPTED_TIMEOUT: Duration = Duration::from_secs(300);

/// A project root in a temp directory.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create tempdir")?,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn paths(&self) -> PackerPaths {
        PackerPaths::new(self.path())
    }

    /// Write a root-relative file, creating parent directories.
    pub fn write(&self, rel: &str, contents: &str) -> Result<()> {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))
    }

    /// Write `packer.json` with the given unit names.
    pub fn write_units(&self, names: &[&str]) -> Result<()> {
        let json = serde_json::to_string(names).context("serialize units")?;
        self.write(crate::io::paths::UNITS_FILE, &json)
    }

    /// Install a package directory with a manifest listing `deps`.
    pub fn write_package(&self, rel: &str, deps: &[&str]) -> Result<()> {
        let deps: serde_json::Map<String, serde_json::Value> = deps
            .iter()
            .map(|name| (name.to_string(), serde_json::Value::from("*")))
            .collect();
        let manifest = serde_json::json!({ "name": rel, "dependencies": deps });
        self.write(&format!("{rel}/package.json"), &manifest.to_string())
    }

    /// Set a file's modification time to `millis` since the Unix epoch.
    pub fn set_mtime(&self, rel: &str, millis: u64) -> Result<()> {
        let path = self.path().join(rel);
        fs::File::options()
            .write(true)
            .open(&path)
            .and_then(|file| file.set_modified(UNIX_EPOCH + Duration::from_millis(millis)))
            .with_context(|| format!("set mtime {}", path.display()))
    }

    pub fn read_log(&self) -> Result<ChangeLog> {
        load_log(&self.paths().log_path)
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.path().join(rel).exists()
    }

    pub fn read_to_string(&self, rel: &str) -> Result<String> {
        let path = self.path().join(rel);
        fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))
    }
}

/// One recorded archiver invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCall {
    pub archive: PathBuf,
    pub files: Vec<PathBuf>,
}

/// Archiver that writes the requested file list (one per line) as the archive.
#[derive(Debug, Default)]
pub struct ScriptedArchiver {
    calls: Mutex<Vec<ArchiveCall>>,
    fail: HashSet<PathBuf>,
    time_out: HashSet<PathBuf>,
    skip_output: HashSet<PathBuf>,
}

impl ScriptedArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with a non-zero exit when asked to produce `archive`.
    pub fn failing_on(mut self, archive: &str) -> Self {
        self.fail.insert(PathBuf::from(archive));
        self
    }

    /// Report a timeout when asked to produce `archive`.
    pub fn timing_out_on(mut self, archive: &str) -> Self {
        self.time_out.insert(PathBuf::from(archive));
        self
    }

    /// Report success for `archive` without writing it.
    pub fn silently_skipping(mut self, archive: &str) -> Self {
        self.skip_output.insert(PathBuf::from(archive));
        self
    }

    pub fn calls(&self) -> Vec<ArchiveCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

impl Archiver for ScriptedArchiver {
    fn create_archive(
        &self,
        root: &Path,
        archive: &Path,
        files: &[PathBuf],
    ) -> Result<(), ExternalFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(ArchiveCall {
                archive: archive.to_path_buf(),
                files: files.to_vec(),
            });
        }
        if self.fail.contains(archive) {
            return Err(ExternalFailure::Exit {
                code: Some(12),
                stderr: "zip error: scripted failure".to_string(),
            });
        }
        if self.time_out.contains(archive) {
            return Err(ExternalFailure::TimedOut {
                after: SCRIPTED_TIMEOUT,
            });
        }
        if self.skip_output.contains(archive) {
            return Ok(());
        }
        let listing: String = files
            .iter()
            .map(|file| format!("{}\n", crate::core::path::log_key(file)))
            .collect();
        fs::write(root.join(archive), listing)
            .map_err(|err| ExternalFailure::Launch(err.to_string()))
    }
}

/// One recorded deploy call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCall {
    pub name: String,
    pub code: Vec<u8>,
}

/// Deployer that records uploads and rejects configured unit names.
#[derive(Debug, Default)]
pub struct ScriptedDeployer {
    calls: Mutex<Vec<DeployCall>>,
    reject: HashSet<String>,
    time_out: HashSet<String>,
}

impl ScriptedDeployer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting(mut self, name: &str) -> Self {
        self.reject.insert(name.to_string());
        self
    }

    pub fn timing_out(mut self, name: &str) -> Self {
        self.time_out.insert(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<DeployCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn deployed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.calls().into_iter().map(|call| call.name).collect();
        names.sort();
        names
    }
}

impl Deployer for ScriptedDeployer {
    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<(), ExternalFailure> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(DeployCall {
                name: name.to_string(),
                code: code.to_vec(),
            });
        }
        if self.time_out.contains(name) {
            return Err(ExternalFailure::TimedOut {
                after: SCRIPTED_TIMEOUT,
            });
        }
        if self.reject.contains(name) {
            return Err(ExternalFailure::Exit {
                code: Some(254),
                stderr: format!("ResourceNotFoundException: Function not found: {name}"),
            });
        }
        Ok(())
    }
}
