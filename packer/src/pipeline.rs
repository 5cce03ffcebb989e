//! Orchestration for one incremental `packer` run.
//!
//! Load units and the change log once, resolve and classify every unit, then
//! package and deploy the stale ones concurrently. The log is written once at
//! the end with the observations of every unit that fully succeeded; a failing
//! unit never holds back the others.

use std::fs;
use std::path::Path;
use std::thread;

use anyhow::Result;
use tracing::{debug, info, instrument, warn};

use crate::core::change_log::ChangeLog;
use crate::core::classifier::{Staleness, classify};
use crate::core::types::{DeployUnit, LogRecord, UnitClosure};
use crate::error::{PackError, PackResult};
use crate::io::archiver::Archiver;
use crate::io::config::PackerConfig;
use crate::io::deployer::{Deployer, deploy_with_retry};
use crate::io::log_store::{current_records, load_log, save_log};
use crate::io::paths::PackerPaths;
use crate::io::units::load_units;
use crate::report::{RunReport, UnitOutcome, UnitReport};
use crate::resolve::ModuleResolver;

/// Classification of one unit before any external call is made.
#[derive(Debug)]
pub enum UnitPlan {
    Fresh,
    Stale(UnitClosure),
    Failed(PackError),
}

/// Run the whole pipeline for the project at `paths.root`.
///
/// Returns `Err` only for run-level problems (unreadable unit list or change
/// log, failure to persist the log). Unit failures are reported in the
/// [`RunReport`].
#[instrument(skip_all, fields(root = %paths.root.display()))]
pub fn run_pipeline<A, D>(
    paths: &PackerPaths,
    cfg: &PackerConfig,
    archiver: &A,
    deployer: &D,
) -> Result<RunReport>
where
    A: Archiver + ?Sized,
    D: Deployer + ?Sized,
{
    let units = load_units(&paths.units_path)?;
    let log = load_log(&paths.log_path)?;
    let resolver = ModuleResolver::new(&paths.root, cfg.exclude_paths());

    let plans: Vec<UnitPlan> = units
        .iter()
        .map(|unit| plan_unit(&resolver, unit, &log))
        .collect();

    let stale: Vec<(usize, &UnitClosure)> = plans
        .iter()
        .enumerate()
        .filter_map(|(idx, plan)| match plan {
            UnitPlan::Stale(closure) => Some((idx, closure)),
            _ => None,
        })
        .collect();
    info!(units = units.len(), stale = stale.len(), "classified units");

    let settled: Vec<(usize, PackResult<Vec<LogRecord>>)> = thread::scope(|scope| {
        let handles: Vec<_> = stale
            .iter()
            .map(|&(idx, closure)| {
                let unit = &units[idx];
                let root = paths.root.as_path();
                let retries = cfg.deploy.retries;
                let handle = scope.spawn(move || {
                    package_and_deploy(root, unit, closure, archiver, deployer, retries)
                        .and_then(|()| current_records(root, &closure.tracked_files()))
                });
                (idx, handle)
            })
            .collect();
        handles
            .into_iter()
            .map(|(idx, handle)| match handle.join() {
                Ok(result) => (idx, result),
                Err(panic) => std::panic::resume_unwind(panic),
            })
            .collect()
    });

    let mut outcomes: Vec<Option<UnitOutcome>> = plans
        .into_iter()
        .map(|plan| match plan {
            UnitPlan::Fresh => Some(UnitOutcome::Skipped),
            UnitPlan::Failed(err) => Some(UnitOutcome::Failed(err)),
            UnitPlan::Stale(_) => None,
        })
        .collect();

    let mut observed = Vec::new();
    for (idx, result) in settled {
        let outcome = match result {
            Ok(records) => {
                let tracked_files = records.len();
                observed.extend(records);
                UnitOutcome::Deployed { tracked_files }
            }
            Err(err) => {
                warn!(unit = %units[idx].name, kind = err.kind(), %err, "unit failed");
                UnitOutcome::Failed(err)
            }
        };
        outcomes[idx] = Some(outcome);
    }

    let log_written = !observed.is_empty();
    if log_written {
        save_log(&paths.log_path, &log.merged_with(observed))?;
    }

    let units = units
        .into_iter()
        .zip(outcomes)
        .map(|(unit, outcome)| UnitReport {
            name: unit.name,
            outcome: outcome.unwrap_or(UnitOutcome::Skipped),
        })
        .collect();
    Ok(RunReport { units, log_written })
}

/// Resolve a unit and compare its tracked files against the change log.
pub fn plan_unit(resolver: &ModuleResolver, unit: &DeployUnit, log: &ChangeLog) -> UnitPlan {
    let planned = resolver.resolve_unit(unit).and_then(|closure| {
        let current = current_records(resolver.root(), &closure.tracked_files())?;
        Ok((closure, classify(&current, log)))
    });
    match planned {
        Ok((_, Staleness::Fresh)) => {
            debug!(unit = %unit.name, "unchanged, skipping");
            UnitPlan::Fresh
        }
        Ok((closure, Staleness::Stale(changed))) => {
            let changed: Vec<&str> = changed.iter().map(|record| record.path.as_str()).collect();
            debug!(unit = %unit.name, ?changed, "stale");
            UnitPlan::Stale(closure)
        }
        Err(err) => {
            warn!(unit = %unit.name, kind = err.kind(), %err, "resolution failed");
            UnitPlan::Failed(err)
        }
    }
}

/// Build the unit's archive and push it to the remote registry.
#[instrument(skip_all, fields(unit = %unit.name))]
pub fn package_and_deploy<A, D>(
    root: &Path,
    unit: &DeployUnit,
    closure: &UnitClosure,
    archiver: &A,
    deployer: &D,
    retries: u32,
) -> PackResult<()>
where
    A: Archiver + ?Sized,
    D: Deployer + ?Sized,
{
    let archive = unit.archive_file();
    let archive_path = root.join(&archive);
    // The archiver appends to an existing archive; start from scratch.
    if archive_path.exists() {
        fs::remove_file(&archive_path)
            .map_err(|err| PackError::file_unavailable(&archive, err))?;
    }

    let files = closure.archive_paths();
    info!(files = files.len(), "packaging");
    archiver
        .create_archive(root, &archive, &files)
        .map_err(|cause| PackError::PackageFailed {
            unit: unit.name.clone(),
            cause,
        })?;

    if !archive_path.is_file() {
        return Err(PackError::ArchiveMissing { path: archive });
    }
    let code = fs::read(&archive_path).map_err(|err| PackError::file_unavailable(&archive, err))?;

    info!(bytes = code.len(), "uploading");
    deploy_with_retry(deployer, &unit.name, &code, retries).map_err(|cause| {
        PackError::DeployFailed {
            unit: unit.name.clone(),
            cause,
        }
    })?;
    info!("deployed");
    Ok(())
}
