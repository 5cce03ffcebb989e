//! Incremental serverless packager.
//!
//! Reads `packer.json` in the given project directory, rebuilds the archives
//! of units whose files changed since `packer.log` was last written, deploys
//! them, and records the new file state.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;

use packer::exit_codes;
use packer::io::archiver::CommandArchiver;
use packer::io::config::load_config;
use packer::io::deployer::CommandDeployer;
use packer::io::paths::PackerPaths;
use packer::logging;
use packer::pipeline::run_pipeline;

#[derive(Parser)]
#[command(
    name = "packer",
    version,
    about = "Incrementally package and deploy serverless function units"
)]
struct Cli {
    /// Project directory containing `packer.json`.
    dir: PathBuf,
}

fn main() {
    logging::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run(cli: &Cli) -> Result<i32> {
    if !cli.dir.is_dir() {
        bail!("{} is not a directory", cli.dir.display());
    }
    let paths = PackerPaths::new(&cli.dir);
    let cfg = load_config(&paths.config_path).context("load packer.toml")?;
    let archiver = CommandArchiver::from_config(&cfg);
    let deployer = CommandDeployer::from_config(&cfg, &paths.root);

    let report = run_pipeline(&paths, &cfg, &archiver, &deployer)?;
    print!("{report}");
    info!(log_written = report.log_written, "run finished");

    if report.has_failures() {
        Ok(exit_codes::UNIT_FAILED)
    } else {
        Ok(exit_codes::OK)
    }
}
