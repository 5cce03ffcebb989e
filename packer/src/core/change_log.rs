//! In-memory change log and its merge rule.
//!
//! A change log holds at most one record per path: the observation with the
//! greatest `mtime`. Persistence lives in `io::log_store`.

use std::collections::BTreeMap;

use crate::core::types::LogRecord;

/// Merged set of last-known file observations, ordered by path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeLog {
    records: Vec<LogRecord>,
}

impl ChangeLog {
    /// Build a log from arbitrary records, merging duplicates by path.
    pub fn from_records(records: impl IntoIterator<Item = LogRecord>) -> Self {
        merge(records)
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `record` was observed exactly, by path and mtime.
    pub fn contains(&self, record: &LogRecord) -> bool {
        self.records
            .binary_search_by(|probe| probe.path.cmp(&record.path))
            .is_ok_and(|idx| self.records[idx].mtime == record.mtime)
    }

    /// Fold newer observations into this log.
    pub fn merged_with(&self, records: impl IntoIterator<Item = LogRecord>) -> Self {
        merge(self.records.iter().cloned().chain(records))
    }

    pub fn into_records(self) -> Vec<LogRecord> {
        self.records
    }
}

/// Group records by path and keep the one with the maximum `mtime`.
///
/// On equal `mtime` the later record wins; equal observations are
/// interchangeable.
pub fn merge(records: impl IntoIterator<Item = LogRecord>) -> ChangeLog {
    let mut latest: BTreeMap<String, i64> = BTreeMap::new();
    for record in records {
        latest
            .entry(record.path)
            .and_modify(|mtime| *mtime = (*mtime).max(record.mtime))
            .or_insert(record.mtime);
    }
    ChangeLog {
        records: latest
            .into_iter()
            .map(|(path, mtime)| LogRecord { path, mtime })
            .collect(),
    }
}
