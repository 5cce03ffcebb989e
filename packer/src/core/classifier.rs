//! Deterministic staleness classification for deploy units.

use crate::core::change_log::ChangeLog;
use crate::core::types::LogRecord;

/// Whether a unit needs to be rebuilt and redeployed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    /// Every tracked file matches the change log.
    Fresh,
    /// These tracked files changed (or were never recorded).
    Stale(Vec<LogRecord>),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

/// Classify a unit from the current records of its tracked files.
///
/// A file is changed when its exact `(path, mtime)` observation is absent from
/// the log. An empty change set means the unit is fresh.
pub fn classify(current: &[LogRecord], log: &ChangeLog) -> Staleness {
    let changed: Vec<LogRecord> = current
        .iter()
        .filter(|record| !log.contains(record))
        .cloned()
        .collect();
    if changed.is_empty() {
        Staleness::Fresh
    } else {
        Staleness::Stale(changed)
    }
}
