// src/lib.rs

pub mod cli;
pub mod commands;
pub mod config;
pub mod dag;
pub mod depends;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod types;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::{BuildArgs, CliArgs, Command};
use crate::config::{ConfigFile, default_config_path, load_and_validate};
use crate::dag::{FileSnapshotStore, NullUpdater};
use crate::engine::report::render_pipeline;
use crate::engine::{PackageRequest, Pipeline};
use crate::errors::Result;
use crate::exec::ParallelCoordinator;
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the dependency store for the requested platforms
/// - the selected subcommand
/// - Ctrl-C handling for `build`
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args
        .config
        .as_deref()
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;
    debug!(config = %config_path.display(), "configuration loaded");

    let fs = RealFileSystem;
    let output = match &args.command {
        Command::Depends(a) => commands::depends(&cfg, &fs, a)?,
        Command::Resolve(a) => commands::resolve(&cfg, &fs, a)?,
        Command::Check(a) => commands::check(&cfg, &fs, a)?,
        Command::Traverse(cmd) => {
            let snapshots = FileSnapshotStore::new(snapshot_dir(&cfg), Arc::new(RealFileSystem));
            commands::traverse(&cfg, &fs, &snapshots, cmd)?
        }
        Command::Build(a) => build(&cfg, &fs, a).await?,
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

fn snapshot_dir(cfg: &ConfigFile) -> PathBuf {
    cfg.config
        .snapshot_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir)
}

async fn build(cfg: &ConfigFile, fs: &dyn FileSystem, args: &BuildArgs) -> Result<String> {
    let coordinator = ParallelCoordinator::new(args.jobs.unwrap_or_else(|| cfg.effective_jobs()));
    coordinator.interrupt().listen_ctrl_c();

    let pipeline = Pipeline::new(cfg, fs, &NullUpdater).with_coordinator(coordinator);
    let request = PackageRequest {
        package: args.package.clone(),
        platforms: args.platform.list(),
        max_depth: args.depth,
    };
    info!(package = %request.package, platforms = %request.platforms.join(" "), "building package");

    let report = pipeline.run(&request).await?;
    println!("{}", render_pipeline(&report));
    report.into_result().map(|_| String::new())
}
