//! Shared deterministic types for packer core logic.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::path::log_key;

/// How a module's dependencies are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModuleKind {
    /// A single `.js` source file, scanned for `require` calls.
    Script,
    /// An installed dependency directory, expanded via its `package.json`.
    Package,
}

/// A node in the dependency graph.
///
/// `path` is relative to the project root and lexically normalized; two modules
/// with the same path are the same module.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Module {
    pub path: PathBuf,
    pub kind: ModuleKind,
}

impl Module {
    pub fn script(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ModuleKind::Script,
        }
    }

    pub fn package(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            kind: ModuleKind::Package,
        }
    }

    pub fn is_script(&self) -> bool {
        self.kind == ModuleKind::Script
    }
}

/// One deployable named function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeployUnit {
    /// Unique unit name, also used as the remote function name.
    pub name: String,
}

impl DeployUnit {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Entry script, relative to the project root.
    pub fn entry_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.js", self.name))
    }

    /// Archive produced for this unit, relative to the project root.
    pub fn archive_file(&self) -> PathBuf {
        PathBuf::from(format!("{}.zip", self.name))
    }
}

/// A unit's entry script plus everything it transitively requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitClosure {
    pub entry: PathBuf,
    /// Deduplicated by path; never contains the entry itself.
    pub dependencies: BTreeSet<Module>,
}

impl UnitClosure {
    /// Paths handed to the archiver: the entry first, then every dependency.
    pub fn archive_paths(&self) -> Vec<PathBuf> {
        std::iter::once(self.entry.clone())
            .chain(self.dependencies.iter().map(|m| m.path.clone()))
            .collect()
    }

    /// Files whose modification times decide staleness: the entry and script
    /// dependencies. Package directories are not tracked.
    pub fn tracked_files(&self) -> Vec<PathBuf> {
        std::iter::once(self.entry.clone())
            .chain(
                self.dependencies
                    .iter()
                    .filter(|m| m.is_script())
                    .map(|m| m.path.clone()),
            )
            .collect()
    }
}

/// One observation of a file's modification time.
///
/// `mtime` is milliseconds since the Unix epoch; `path` is the `/`-separated
/// path relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogRecord {
    pub path: String,
    pub mtime: i64,
}

impl LogRecord {
    pub fn new(path: &Path, mtime: i64) -> Self {
        Self {
            path: log_key(path),
            mtime,
        }
    }
}
