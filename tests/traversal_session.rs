// tests/traversal_session.rs

mod common;
use crate::common::{StoreBuilder, init_tracing, names};

use spkforge::cli::{PlatformArgs, SessionArgs, TraverseCommand};
use spkforge::commands;
use spkforge::config::ConfigFile;
use spkforge::dag::{MemorySnapshotStore, SnapshotStore};
use spkforge::errors::SpkError;
use spkforge::fs::RealFileSystem;

/// P -> {A, B}, A -> C, B -> C, plus an unrelated Z.
fn workspace(dir: &std::path::Path) -> ConfigFile {
    StoreBuilder::new()
        .depends("P", &["A", "B"])
        .depends("A", &["C"])
        .depends("B", &["C"])
        .depends("C", &[])
        .depends("Z", &[])
        .write_workspace(dir, &[])
}

fn session() -> SessionArgs {
    SessionArgs {
        session: Some("test-session".to_string()),
    }
}

fn init(projects: &[&str], reverse: bool) -> TraverseCommand {
    TraverseCommand::Init {
        session: session(),
        platform: PlatformArgs::default(),
        reverse,
        projects: names(projects),
    }
}

fn next(count: usize, projects: &[&str]) -> TraverseCommand {
    TraverseCommand::Next {
        session: session(),
        count,
        projects: names(projects),
    }
}

fn failed(projects: &[&str]) -> TraverseCommand {
    TraverseCommand::Failed {
        session: session(),
        projects: names(projects),
    }
}

#[test]
fn batches_follow_dependency_order() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let cfg = workspace(dir.path());
    let snapshots = MemorySnapshotStore::new();
    let run = |cmd: TraverseCommand| commands::traverse(&cfg, &RealFileSystem, &snapshots, &cmd).unwrap();

    run(init(&["P", "A", "B", "C"], false));
    assert_eq!(run(next(0, &[])), "C");
    assert_eq!(run(next(0, &["C"])), "A B");
    assert_eq!(run(next(1, &["A"])), "B");
    assert_eq!(run(next(1, &["B"])), "P");
    assert_eq!(run(next(1, &["P"])), "NULL");
    assert_eq!(run(next(2, &[])), "NULL");
}

#[test]
fn failure_skips_queued_dependents() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = workspace(dir.path());
    let snapshots = MemorySnapshotStore::new();
    let run = |cmd: TraverseCommand| commands::traverse(&cfg, &RealFileSystem, &snapshots, &cmd).unwrap();

    run(init(&["P", "A", "B", "C"], false));
    assert_eq!(run(failed(&["C"])), "C:A,B,P");
    assert_eq!(run(next(0, &[])), "NULL");

    let show = run(TraverseCommand::Show { session: session() });
    assert!(show.contains("[Failed projects -> Skipped projects]"));
    assert!(show.contains("C -> A B P"));
}

#[test]
fn unqueued_dependencies_count_as_built() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = workspace(dir.path());
    let snapshots = MemorySnapshotStore::new();
    let run = |cmd: TraverseCommand| commands::traverse(&cfg, &RealFileSystem, &snapshots, &cmd).unwrap();

    // Only P is rebuilt; A, B and C are already there.
    run(init(&["P"], false));
    assert_eq!(run(next(0, &[])), "P");
}

#[test]
fn reverse_session_removes_dependents_first() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = workspace(dir.path());
    let snapshots = MemorySnapshotStore::new();
    let run = |cmd: TraverseCommand| commands::traverse(&cfg, &RealFileSystem, &snapshots, &cmd).unwrap();

    run(init(&["C", "A", "P"], true));
    assert_eq!(run(next(0, &[])), "P");
    assert_eq!(run(next(0, &["P"])), "A");
    assert_eq!(run(next(0, &["A"])), "C");
}

#[test]
fn purge_forgets_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = workspace(dir.path());
    let snapshots = MemorySnapshotStore::new();

    commands::traverse(&cfg, &RealFileSystem, &snapshots, &init(&["Z"], false)).unwrap();
    assert!(snapshots.load("test-session").unwrap().is_some());

    commands::traverse(
        &cfg,
        &RealFileSystem,
        &snapshots,
        &TraverseCommand::Purge { session: session() },
    )
    .unwrap();
    assert!(snapshots.load("test-session").unwrap().is_none());

    let err = commands::traverse(&cfg, &RealFileSystem, &snapshots, &next(0, &[])).unwrap_err();
    assert!(matches!(err, SpkError::Snapshot(_)));
}
