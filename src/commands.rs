// src/commands.rs

//! Subcommand implementations.
//!
//! Each command returns what it would print on stdout so callers (and
//! tests) decide where the text goes.

use std::collections::BTreeSet;

use tracing::error;

use crate::cli::{CheckArgs, DependsArgs, ResolveArgs, TraverseCommand};
use crate::config::ConfigFile;
use crate::dag::{
    Batch, BuildSetResolver, DependencyGraph, DependsCache, DependsRequest, NullUpdater,
    SnapshotStore, TraversalState, compute_depends,
};
use crate::depends::{DependencyStore, LoadOptions};
use crate::errors::{Result, SpkError};
use crate::fs::FileSystem;
use crate::types::{Direction, PlatformArch, ProjectName, normalize};

/// Load the store for `platforms` as configured.
pub fn load_store(cfg: &ConfigFile, fs: &dyn FileSystem, platforms: Vec<String>) -> Result<DependencyStore> {
    DependencyStore::load(
        fs,
        &cfg.paths.project_depends,
        &cfg.paths.source_dir,
        &LoadOptions {
            platforms,
            libc_project: cfg.config.libc_project.clone(),
        },
    )
}

fn uses_64bit(cfg: &ConfigFile, store: &DependencyStore) -> bool {
    PlatformArch::classify(store.platforms(), &cfg.platforms.arch64) == PlatformArch::Bits64
        && store.has_depends64()
}

pub fn depends(cfg: &ConfigFile, fs: &dyn FileSystem, args: &DependsArgs) -> Result<String> {
    let store = load_store(cfg, fs, args.platform.list())?;
    let expand = match (args.forward, args.reverse) {
        (Some(level), _) => Some((level, Direction::Forward)),
        (None, Some(level)) => Some((level, Direction::Backward)),
        (None, None) => None,
    };
    let request = DependsRequest {
        projects: args.projects.clone(),
        expand,
        header: args.header,
    };
    let out = compute_depends(&store, &cfg.platforms.arch64, &request)?;
    Ok(out.join(" "))
}

pub fn resolve(cfg: &ConfigFile, fs: &dyn FileSystem, args: &ResolveArgs) -> Result<String> {
    let store = load_store(cfg, fs, args.platform.list())?;
    let mut cache = DependsCache::new();
    let set = BuildSetResolver::new(&store, &NullUpdater)
        .with_conflict_check(cfg.config.check_conflict && !args.no_conflict_check)
        .resolve(std::slice::from_ref(&args.package), args.depth, &mut cache)?;

    if args.json {
        return Ok(serde_json::to_string_pretty(&set)?);
    }

    let order = set.build_order(&mut DependencyGraph::new(&store, uses_64bit(cfg, &store)))?;
    let line = |title: &str, names: &BTreeSet<ProjectName>| {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        format!("[{title}] {}", names.join(" "))
    };
    Ok([
        line("roots", &set.roots),
        line("branches", &set.branches),
        line("tags", &set.tags),
        line("refs", &set.refs),
        line("ref_tags", &set.ref_tags),
        format!("[order] {}", order.join(" ")),
    ]
    .join("\n"))
}

/// Every dependency cycle as an exact path, first project repeated last.
pub fn cycle_paths(store: &DependencyStore, use64: bool) -> Result<Vec<Vec<ProjectName>>> {
    let mut paths = Vec::new();
    for component in store.cycles(use64) {
        let mut graph = DependencyGraph::new(store, use64);
        match graph.traverse(&component[..1], 0, Direction::Forward) {
            Err(SpkError::CircularDependency { cycle }) => paths.push(cycle),
            Err(other) => return Err(other),
            Ok(_) => paths.push(vec![component[0].clone(), component[0].clone()]),
        }
    }
    Ok(paths)
}

/// Fails with the first cycle; any further cycles are logged.
pub fn check(cfg: &ConfigFile, fs: &dyn FileSystem, args: &CheckArgs) -> Result<String> {
    let store = load_store(cfg, fs, args.platform.list())?;
    let mut paths = cycle_paths(&store, args.arch64)?.into_iter();
    let Some(first) = paths.next() else {
        return Ok("No circular dependency found".to_string());
    };
    for cycle in paths {
        error!("Circular dependency found: {}", cycle.join(" -> "));
    }
    Err(SpkError::CircularDependency { cycle: first })
}

/// Session key of the driving process.
pub fn session_key(explicit: Option<&str>) -> String {
    match explicit {
        Some(key) => key.to_string(),
        None => std::os::unix::process::parent_id().to_string(),
    }
}

fn load_session(snapshots: &dyn SnapshotStore, key: &str) -> Result<TraversalState> {
    let snapshot = snapshots.load(key)?.ok_or_else(|| {
        SpkError::Snapshot(format!("no traversal session '{key}'; run `traverse init` first"))
    })?;
    TraversalState::from_snapshot(snapshot)
}

fn normalized(projects: &[String]) -> Vec<ProjectName> {
    projects
        .iter()
        .map(|p| normalize(p))
        .filter(|p| !p.is_empty())
        .collect()
}

pub fn traverse(
    cfg: &ConfigFile,
    fs: &dyn FileSystem,
    snapshots: &dyn SnapshotStore,
    cmd: &TraverseCommand,
) -> Result<String> {
    match cmd {
        TraverseCommand::Init {
            session,
            platform,
            reverse,
            projects,
        } => {
            let key = session_key(session.session.as_deref());
            let store = load_store(cfg, fs, platform.list())?;
            let direction = if *reverse {
                Direction::Backward
            } else {
                Direction::Forward
            };
            let queue = store.normalize_inputs(projects).projects;
            let nodes = DependencyGraph::new(&store, uses_64bit(cfg, &store)).materialize(&queue, direction)?;
            let state = TraversalState::initialize(direction, nodes, queue);
            snapshots.save(&key, &state.to_snapshot())?;
            Ok(String::new())
        }
        TraverseCommand::Next {
            session,
            count,
            projects,
        } => {
            let key = session_key(session.session.as_deref());
            let mut state = load_session(snapshots, &key)?;
            state.report_success(&normalized(projects));
            let batch = state.next_batch(*count);
            snapshots.save(&key, &state.to_snapshot())?;
            if let Batch::Ready(names) = &batch {
                tracing::debug!(session = %key, ready = names.len(), "next batch");
            }
            Ok(batch.to_string())
        }
        TraverseCommand::Failed { session, projects } => {
            let key = session_key(session.session.as_deref());
            let mut state = load_session(snapshots, &key)?;
            let report = state.report_failure(&normalized(projects));
            snapshots.save(&key, &state.to_snapshot())?;
            let lines: Vec<String> = report
                .into_iter()
                .map(|(root, skipped)| {
                    let skipped: Vec<&str> = skipped.iter().map(String::as_str).collect();
                    format!("{root}:{}", skipped.join(","))
                })
                .collect();
            Ok(lines.join("\n"))
        }
        TraverseCommand::Show { session } => {
            let key = session_key(session.session.as_deref());
            Ok(load_session(snapshots, &key)?.render_report())
        }
        TraverseCommand::Purge { session } => {
            let key = session_key(session.session.as_deref());
            if !snapshots.purge(&key)? {
                tracing::info!(session = %key, "no traversal session to purge");
            }
            Ok(String::new())
        }
    }
}
