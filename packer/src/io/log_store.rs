//! Change log persistence (`packer.log`) and on-disk observations.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::change_log::ChangeLog;
use crate::core::types::LogRecord;
use crate::error::{PackError, PackResult};

/// Load the change log. A missing file is an empty log.
///
/// Records are merged on load, so a hand-edited log with duplicate paths is
/// still usable.
pub fn load_log(path: &Path) -> Result<ChangeLog> {
    if !path.exists() {
        debug!(path = %path.display(), "no change log, starting empty");
        return Ok(ChangeLog::default());
    }
    let contents =
        fs::read_to_string(path).with_context(|| format!("read change log {}", path.display()))?;
    let records: Vec<LogRecord> = serde_json::from_str(&contents)
        .with_context(|| format!("parse change log {}", path.display()))?;
    let log = ChangeLog::from_records(records);
    debug!(records = log.len(), "change log loaded");
    Ok(log)
}

/// Atomically write the merged change log.
pub fn save_log(path: &Path, log: &ChangeLog) -> Result<()> {
    debug!(path = %path.display(), records = log.len(), "writing change log");
    let mut buf = serde_json::to_string_pretty(log.records()).context("serialize change log")?;
    buf.push('\n');
    super::write_atomic(path, &buf)
}

/// Observe the current modification time of a root-relative file.
pub fn current_record_for(root: &Path, relative: &Path) -> PackResult<LogRecord> {
    let full = root.join(relative);
    let modified = fs::metadata(&full)
        .and_then(|meta| meta.modified())
        .map_err(|err| PackError::file_unavailable(relative, err))?;
    Ok(LogRecord::new(relative, epoch_millis(modified)))
}

/// Observe every file in `files`, failing on the first one that is missing.
pub fn current_records(root: &Path, files: &[PathBuf]) -> PackResult<Vec<LogRecord>> {
    files
        .iter()
        .map(|file| current_record_for(root, file))
        .collect()
}

fn epoch_millis(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_millis()).unwrap_or(i64::MAX),
        Err(before) => -i64::try_from(before.duration().as_millis()).unwrap_or(i64::MAX),
    }
}
