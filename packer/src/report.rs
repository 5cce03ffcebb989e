//! Per-unit outcomes of a packer run.

use std::fmt;

use crate::error::PackError;

/// What happened to one unit during a run.
#[derive(Debug)]
pub enum UnitOutcome {
    /// No tracked file changed since the last recorded deploy.
    Skipped,
    /// Packaged, uploaded, and recorded in the change log.
    Deployed { tracked_files: usize },
    /// Resolution, packaging, or deploy failed; nothing was recorded.
    Failed(PackError),
}

#[derive(Debug)]
pub struct UnitReport {
    pub name: String,
    pub outcome: UnitOutcome,
}

/// Outcome of a whole run, in unit list order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub units: Vec<UnitReport>,
    /// Whether the change log was rewritten.
    pub log_written: bool,
}

impl RunReport {
    pub fn outcome(&self, name: &str) -> Option<&UnitOutcome> {
        self.units
            .iter()
            .find(|unit| unit.name == name)
            .map(|unit| &unit.outcome)
    }

    pub fn deployed(&self) -> impl Iterator<Item = &str> {
        self.units
            .iter()
            .filter(|unit| matches!(unit.outcome, UnitOutcome::Deployed { .. }))
            .map(|unit| unit.name.as_str())
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &PackError)> {
        self.units.iter().filter_map(|unit| match &unit.outcome {
            UnitOutcome::Failed(err) => Some((unit.name.as_str(), err)),
            _ => None,
        })
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for unit in &self.units {
            match &unit.outcome {
                UnitOutcome::Skipped => writeln!(f, "{}: unchanged", unit.name)?,
                UnitOutcome::Deployed { tracked_files } => {
                    writeln!(f, "{}: deployed ({tracked_files} files)", unit.name)?;
                }
                UnitOutcome::Failed(err) => {
                    writeln!(f, "{}: failed [{}] {err}", unit.name, err.kind())?;
                }
            }
        }
        Ok(())
    }
}
