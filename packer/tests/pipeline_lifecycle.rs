//! Run-level tests for the incremental package/deploy pipeline.
//!
//! These tests drive `run_pipeline` over scratch projects with scripted
//! archiver and deployer adapters, across one or more runs, to verify
//! staleness decisions, per-unit failure isolation, and change log updates.

use std::path::PathBuf;

use packer::core::types::LogRecord;
use packer::error::{ExternalFailure, PackError};
use packer::io::config::PackerConfig;
use packer::pipeline::run_pipeline;
use packer::report::{RunReport, UnitOutcome};
use packer::test_support::{SCRIPTED_TIMEOUT, ScriptedArchiver, ScriptedDeployer, TestProject};

fn run(project: &TestProject, archiver: &ScriptedArchiver, deployer: &ScriptedDeployer) -> RunReport {
    run_pipeline(&project.paths(), &PackerConfig::default(), archiver, deployer).expect("run")
}

fn rec(path: &str, mtime: i64) -> LogRecord {
    LogRecord {
        path: path.to_string(),
        mtime,
    }
}

fn failure<'a>(report: &'a RunReport, name: &str) -> &'a PackError {
    match report.outcome(name) {
        Some(UnitOutcome::Failed(err)) => err,
        other => panic!("expected {name} to fail, got {other:?}"),
    }
}

/// One unit, no log, entry requiring nothing: the archive holds only the
/// entry, the upload carries the archive bytes, the log holds one record.
#[test]
fn first_run_packages_deploys_and_records_single_unit() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f"]).expect("units");
    project
        .write("f.js", "exports.handler = async () => 'ok';")
        .expect("write");
    project.set_mtime("f.js", 1_000).expect("mtime");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert!(matches!(
        report.outcome("f"),
        Some(UnitOutcome::Deployed { tracked_files: 1 })
    ));
    assert!(report.log_written);

    let calls = archiver.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].archive, PathBuf::from("f.zip"));
    assert_eq!(calls[0].files, vec![PathBuf::from("f.js")]);
    assert_eq!(project.read_to_string("f.zip").expect("zip"), "f.js\n");

    let uploads = deployer.calls();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, "f");
    assert_eq!(uploads[0].code, b"f.js\n");

    let log = project.read_log().expect("log");
    assert_eq!(log.records(), &[rec("f.js", 1_000)]);
}

#[test]
fn second_run_without_changes_does_nothing() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f", "g"]).expect("units");
    project.write("f.js", "require('./lib/util');").expect("write");
    project.write("g.js", "").expect("write");
    project.write("lib/util.js", "").expect("write");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    run(&project, &archiver, &deployer);
    let log_after_first = project.read_log().expect("log");

    let second = run(&project, &archiver, &deployer);
    assert!(matches!(second.outcome("f"), Some(UnitOutcome::Skipped)));
    assert!(matches!(second.outcome("g"), Some(UnitOutcome::Skipped)));
    assert!(!second.log_written);
    assert_eq!(archiver.calls().len(), 2);
    assert_eq!(deployer.calls().len(), 2);
    assert_eq!(project.read_log().expect("log"), log_after_first);
}

#[test]
fn changed_entry_makes_unit_stale() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f"]).expect("units");
    project.write("f.js", "require('./lib/util');").expect("write");
    project.write("lib/util.js", "").expect("write");
    project.set_mtime("f.js", 1_000).expect("mtime");
    project.set_mtime("lib/util.js", 1_000).expect("mtime");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    run(&project, &archiver, &deployer);

    project.set_mtime("f.js", 2_000).expect("mtime");
    let report = run(&project, &archiver, &deployer);

    assert!(matches!(
        report.outcome("f"),
        Some(UnitOutcome::Deployed { tracked_files: 2 })
    ));
    assert_eq!(deployer.calls().len(), 2);
    assert_eq!(
        project.read_log().expect("log").records(),
        &[rec("f.js", 2_000), rec("lib/util.js", 1_000)]
    );
}

#[test]
fn shared_dependency_change_redeploys_only_dependents() {
    let project = TestProject::new().expect("project");
    project.write_units(&["a", "b", "c"]).expect("units");
    project.write("a.js", "require('./lib/shared');").expect("write");
    project.write("b.js", "require('./lib/shared');").expect("write");
    project.write("c.js", "require('fs');").expect("write");
    project.write("lib/shared.js", "").expect("write");
    project.set_mtime("lib/shared.js", 5_000).expect("mtime");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    run(&project, &archiver, &deployer);

    project.set_mtime("lib/shared.js", 6_000).expect("mtime");
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert_eq!(deployer.deployed_names(), vec!["a", "b"]);
    assert!(matches!(report.outcome("c"), Some(UnitOutcome::Skipped)));
    let log = project.read_log().expect("log");
    assert!(log.contains(&rec("lib/shared.js", 6_000)));
}

/// A non-literal require fails that unit only; the independent unit in the
/// same run is still deployed and recorded.
#[test]
fn malformed_require_fails_only_its_unit() {
    let project = TestProject::new().expect("project");
    project.write_units(&["bad", "good"]).expect("units");
    project.write("bad.js", "const x = require(42);").expect("write");
    project.write("good.js", "").expect("write");
    project.set_mtime("good.js", 3_000).expect("mtime");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert_eq!(failure(&report, "bad").kind(), "MalformedRequire");
    assert!(matches!(
        report.outcome("good"),
        Some(UnitOutcome::Deployed { .. })
    ));
    assert_eq!(deployer.deployed_names(), vec!["good"]);
    assert_eq!(
        project.read_log().expect("log").records(),
        &[rec("good.js", 3_000)]
    );
}

#[test]
fn deploy_failure_does_not_block_other_units() {
    let project = TestProject::new().expect("project");
    project.write_units(&["a", "b"]).expect("units");
    project.write("a.js", "").expect("write");
    project.write("b.js", "").expect("write");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new().rejecting("b");
    let report = run(&project, &archiver, &deployer);

    assert!(matches!(report.outcome("a"), Some(UnitOutcome::Deployed { .. })));
    assert_eq!(failure(&report, "b").kind(), "DeployFailed");
    // Default config retries twice before giving up.
    assert_eq!(
        deployer.calls().iter().filter(|call| call.name == "b").count(),
        3
    );
    let log = project.read_log().expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log.records()[0].path, "a.js");

    // The failed unit is retried on the next run; the recorded one is not.
    let deployer = ScriptedDeployer::new();
    let retry = run(&project, &archiver, &deployer);
    assert!(matches!(retry.outcome("a"), Some(UnitOutcome::Skipped)));
    assert!(matches!(retry.outcome("b"), Some(UnitOutcome::Deployed { .. })));
    assert_eq!(project.read_log().expect("log").len(), 2);
}

#[test]
fn package_failure_skips_deploy_for_that_unit() {
    let project = TestProject::new().expect("project");
    project.write_units(&["a", "b"]).expect("units");
    project.write("a.js", "").expect("write");
    project.write("b.js", "").expect("write");

    let archiver = ScriptedArchiver::new().failing_on("a.zip");
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert_eq!(failure(&report, "a").kind(), "PackageFailed");
    assert_eq!(deployer.deployed_names(), vec!["b"]);
    assert!(report.has_failures());
}

/// A timed-out upload is reported once, without retries, and the units that
/// finished still advance the log.
#[test]
fn deploy_timeout_fails_unit_without_retry() {
    let project = TestProject::new().expect("project");
    project.write_units(&["slow", "fast"]).expect("units");
    project.write("slow.js", "").expect("write");
    project.write("fast.js", "").expect("write");
    project.set_mtime("fast.js", 4_000).expect("mtime");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new().timing_out("slow");
    let report = run(&project, &archiver, &deployer);

    match failure(&report, "slow") {
        PackError::DeployFailed { unit, cause } => {
            assert_eq!(unit, "slow");
            assert_eq!(
                cause,
                &ExternalFailure::TimedOut {
                    after: SCRIPTED_TIMEOUT
                }
            );
        }
        other => panic!("expected DeployFailed, got {other:?}"),
    }
    assert_eq!(
        deployer.calls().iter().filter(|call| call.name == "slow").count(),
        1
    );
    assert!(matches!(report.outcome("fast"), Some(UnitOutcome::Deployed { .. })));
    assert_eq!(
        project.read_log().expect("log").records(),
        &[rec("fast.js", 4_000)]
    );
}

#[test]
fn archive_timeout_fails_unit_before_upload() {
    let project = TestProject::new().expect("project");
    project.write_units(&["slow", "fast"]).expect("units");
    project.write("slow.js", "").expect("write");
    project.write("fast.js", "").expect("write");

    let archiver = ScriptedArchiver::new().timing_out_on("slow.zip");
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    let err = failure(&report, "slow");
    assert_eq!(err.kind(), "PackageFailed");
    assert!(matches!(
        err,
        PackError::PackageFailed { cause, .. } if cause.is_timeout()
    ));
    assert_eq!(deployer.deployed_names(), vec!["fast"]);
    let log = project.read_log().expect("log");
    assert_eq!(log.len(), 1);
    assert_eq!(log.records()[0].path, "fast.js");
}

#[test]
fn missing_archive_is_reported_before_upload() {
    let project = TestProject::new().expect("project");
    project.write_units(&["a"]).expect("units");
    project.write("a.js", "").expect("write");

    let archiver = ScriptedArchiver::new().silently_skipping("a.zip");
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert_eq!(failure(&report, "a").kind(), "ArchiveMissing");
    assert!(deployer.calls().is_empty());
    assert!(!report.log_written);
    assert!(!project.exists("packer.log"));
}

#[test]
fn archive_holds_closure_without_excluded_packages() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f"]).expect("units");
    project
        .write(
            "f.js",
            "require('./lib/a'); require('aws-sdk'); require('express'); require('path');",
        )
        .expect("write");
    project.write("lib/a.js", "").expect("write");
    project.write_package("node_modules/express", &["ms"]).expect("pkg");
    project.write_package("node_modules/ms", &[]).expect("pkg");
    project.write_package("node_modules/aws-sdk", &[]).expect("pkg");
    project.write("f.zip", "left over from an older build").expect("write");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert!(matches!(
        report.outcome("f"),
        Some(UnitOutcome::Deployed { tracked_files: 2 })
    ));
    assert_eq!(
        project.read_to_string("f.zip").expect("zip"),
        "f.js\nlib/a.js\nnode_modules/express\nnode_modules/ms\n"
    );
    let logged: Vec<String> = project
        .read_log()
        .expect("log")
        .into_records()
        .into_iter()
        .map(|record| record.path)
        .collect();
    assert_eq!(logged, vec!["f.js", "lib/a.js"]);
}

#[test]
fn missing_package_dependency_fails_unit() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f", "g"]).expect("units");
    project.write("f.js", "require('express');").expect("write");
    project.write("g.js", "").expect("write");
    project
        .write_package("node_modules/express", &["ghost"])
        .expect("pkg");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert_eq!(failure(&report, "f").kind(), "DependencyNotFound");
    assert_eq!(deployer.deployed_names(), vec!["g"]);
}

#[test]
fn missing_unit_list_is_an_empty_run() {
    let project = TestProject::new().expect("project");
    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let report = run(&project, &archiver, &deployer);

    assert!(report.units.is_empty());
    assert!(!report.log_written);
    assert!(archiver.calls().is_empty());
}

#[test]
fn corrupt_log_aborts_the_run() {
    let project = TestProject::new().expect("project");
    project.write_units(&["f"]).expect("units");
    project.write("f.js", "").expect("write");
    project.write("packer.log", "{not json").expect("write");

    let archiver = ScriptedArchiver::new();
    let deployer = ScriptedDeployer::new();
    let result = run_pipeline(
        &project.paths(),
        &PackerConfig::default(),
        &archiver,
        &deployer,
    );
    assert!(result.is_err());
    assert!(archiver.calls().is_empty());
}
