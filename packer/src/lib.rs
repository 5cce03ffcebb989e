//! Incremental packager and deployer for serverless function units.
//!
//! For every unit listed in `packer.json` the crate resolves the closure of
//! local scripts and installed packages the unit requires, compares the
//! modification times of its files against `packer.log`, and rebuilds and
//! redeploys only the units that changed. The architecture keeps a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (require scanning, change log
//!   merging, staleness). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config and log files, manifests,
//!   external archiver and deploy commands).
//!
//! Orchestration modules ([`resolve`], [`pipeline`]) coordinate core logic with
//! I/O to implement the `packer` command.

pub mod core;
pub mod error;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod report;
pub mod resolve;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
