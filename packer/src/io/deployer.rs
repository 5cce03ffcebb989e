//! Remote deploy abstraction.
//!
//! The [`Deployer`] trait is the only way the pipeline talks to the function
//! registry. [`CommandDeployer`] shells out to a CLI (the AWS CLI by default)
//! with the archive on stdin.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::error::ExternalFailure;
use crate::io::config::PackerConfig;
use crate::io::process::run_command_with_timeout;

const NAME_PLACEHOLDER: &str = "{name}";

/// Replaces the code of a remote function.
pub trait Deployer: Sync {
    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<(), ExternalFailure>;
}

/// Deployer that runs a command per upload, writing the archive to stdin.
#[derive(Debug, Clone)]
pub struct CommandDeployer {
    /// Program and arguments; `{name}` in any argument is replaced by the unit name.
    pub command: Vec<String>,
    /// Working directory of the command (the project root).
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
}

impl CommandDeployer {
    pub fn from_config(cfg: &PackerConfig, root: &Path) -> Self {
        Self {
            command: cfg.deploy.command.clone(),
            workdir: root.to_path_buf(),
            timeout: cfg.deploy_timeout(),
            output_limit_bytes: cfg.output_limit_bytes,
        }
    }

    fn build_command(&self, name: &str) -> Result<Command, ExternalFailure> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ExternalFailure::Launch("empty deploy command".to_string()))?;
        let mut cmd = Command::new(program.replace(NAME_PLACEHOLDER, name));
        cmd.args(args.iter().map(|arg| arg.replace(NAME_PLACEHOLDER, name)))
            .current_dir(&self.workdir);
        Ok(cmd)
    }
}

impl Deployer for CommandDeployer {
    #[instrument(skip_all, fields(unit = %name, bytes = code.len()))]
    fn update_function_code(&self, name: &str, code: &[u8]) -> Result<(), ExternalFailure> {
        let cmd = self.build_command(name)?;
        let output =
            run_command_with_timeout(cmd, Some(code.to_vec()), self.timeout, self.output_limit_bytes)
                .map_err(|err| ExternalFailure::Launch(format!("{err:#}")))?;
        output.check(self.timeout)?;
        let response = String::from_utf8_lossy(&output.stdout);
        debug!(response = %response.trim(), "remote function updated");
        Ok(())
    }
}

/// Call the deployer up to `1 + retries` times, returning the last failure.
///
/// Timeouts are not retried: the call may still be in flight remotely.
pub fn deploy_with_retry<D: Deployer + ?Sized>(
    deployer: &D,
    name: &str,
    code: &[u8],
    retries: u32,
) -> Result<(), ExternalFailure> {
    let mut attempt = 0;
    loop {
        match deployer.update_function_code(name, code) {
            Ok(()) => return Ok(()),
            Err(failure) if attempt < retries && !failure.is_timeout() => {
                attempt += 1;
                warn!(unit = %name, attempt, %failure, "deploy failed, retrying");
            }
            Err(failure) => return Err(failure),
        }
    }
}
