//! Archiver abstraction for packaging a unit's closure.
//!
//! The [`Archiver`] trait decouples the pipeline from the actual archive tool
//! (`zip -r` by default). Tests use scripted archivers that write a manifest of
//! the requested paths instead of spawning processes.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::ExternalFailure;
use crate::io::config::PackerConfig;
use crate::io::process::run_command_with_timeout;

/// Produces an archive file containing a list of root-relative paths.
pub trait Archiver: Sync {
    /// Create `archive` (root-relative) from `files` (root-relative, directories
    /// included recursively).
    fn create_archive(
        &self,
        root: &Path,
        archive: &Path,
        files: &[PathBuf],
    ) -> Result<(), ExternalFailure>;
}

/// Archiver that runs an external command such as `zip -r`.
#[derive(Debug, Clone)]
pub struct CommandArchiver {
    /// Program and leading arguments; the archive path and files are appended.
    pub command: Vec<String>,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CommandArchiver {
    pub fn from_config(cfg: &PackerConfig) -> Self {
        Self {
            command: cfg.archive.command.clone(),
            timeout: cfg.archive_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }
}

impl Archiver for CommandArchiver {
    #[instrument(skip_all, fields(archive = %archive.display(), files = files.len()))]
    fn create_archive(
        &self,
        root: &Path,
        archive: &Path,
        files: &[PathBuf],
    ) -> Result<(), ExternalFailure> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ExternalFailure::Launch("empty archive command".to_string()))?;
        let mut cmd = Command::new(program);
        cmd.args(args).arg(archive).args(files).current_dir(root);

        let output = run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)
            .map_err(|err| ExternalFailure::Launch(format!("{err:#}")))?;
        if let Err(failure) = output.check(self.timeout) {
            warn!(%failure, "archiver failed");
            return Err(failure);
        }
        debug!("archive written");
        Ok(())
    }
}
