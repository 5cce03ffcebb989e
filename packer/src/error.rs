//! Per-unit error taxonomy.
//!
//! Every failure that is scoped to a single deploy unit is a [`PackError`].
//! Run-level failures (unreadable config, corrupt log) stay `anyhow::Error`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::require_scan::ScanError;

/// Result type alias for unit-scoped operations.
pub type PackResult<T> = Result<T, PackError>;

/// Why an external call (archiver process, deploy backend) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalFailure {
    /// The command could not be spawned or waited on.
    Launch(String),
    /// The command ran and exited unsuccessfully.
    Exit { code: Option<i32>, stderr: String },
    /// The command exceeded its time budget and was killed.
    TimedOut { after: Duration },
}

impl ExternalFailure {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ExternalFailure::TimedOut { .. })
    }
}

impl fmt::Display for ExternalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExternalFailure::Launch(msg) => write!(f, "could not run command: {msg}"),
            ExternalFailure::Exit { code, stderr } => {
                match code {
                    Some(code) => write!(f, "exited with status {code}")?,
                    None => write!(f, "terminated by signal")?,
                }
                let stderr = stderr.trim();
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
            ExternalFailure::TimedOut { after } => {
                write!(f, "timed out after {}s", after.as_secs())
            }
        }
    }
}

/// Failure scoped to one deploy unit.
#[derive(Debug, Error)]
pub enum PackError {
    /// A `require` call whose argument cannot be read statically.
    #[error("malformed require in {file}: {reason}")]
    MalformedRequire { file: PathBuf, reason: ScanError },

    /// A package dependency was not found in any enclosing `node_modules`.
    #[error("dependency '{name}' of {from} not found below the project root")]
    DependencyNotFound { name: String, from: PathBuf },

    /// A file the unit needs could not be read or stat'ed.
    #[error("file unavailable: {path}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A package manifest exists but cannot be understood.
    #[error("invalid package manifest {path}: {reason}")]
    ManifestInvalid { path: PathBuf, reason: String },

    #[error("packaging {unit} failed: {cause}")]
    PackageFailed { unit: String, cause: ExternalFailure },

    #[error("archive {path} missing after packaging")]
    ArchiveMissing { path: PathBuf },

    #[error("deploying {unit} failed: {cause}")]
    DeployFailed { unit: String, cause: ExternalFailure },
}

impl PackError {
    /// Stable kind name used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PackError::MalformedRequire { .. } => "MalformedRequire",
            PackError::DependencyNotFound { .. } => "DependencyNotFound",
            PackError::FileUnavailable { .. } => "FileUnavailable",
            PackError::ManifestInvalid { .. } => "ManifestInvalid",
            PackError::PackageFailed { .. } => "PackageFailed",
            PackError::ArchiveMissing { .. } => "ArchiveMissing",
            PackError::DeployFailed { .. } => "DeployFailed",
        }
    }

    pub(crate) fn file_unavailable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackError::FileUnavailable {
            path: path.into(),
            source,
        }
    }
}
