// src/dag/mod.rs

//! Dependency graph, build-set resolution and traversal sessions.
//!
//! - [`graph`] expands dependency closures over a [`crate::depends::DependencyStore`].
//! - [`query`] answers the `depends` command.
//! - [`resolver`] classifies the full build set of a package.
//! - [`traversal`] tracks build progress across invocations.
//! - [`snapshot`] persists traversal sessions.

pub mod graph;
pub mod node;
pub mod query;
pub mod resolver;
pub mod snapshot;
pub mod traversal;

pub use graph::{DependencyGraph, link_back_references};
pub use node::{NodeStatus, ProjectNode};
pub use query::{DependsRequest, compute_depends};
pub use resolver::{BuildSet, BuildSetResolver, DependsCache, NullUpdater, SourceUpdater};
pub use snapshot::{FileSnapshotStore, MemorySnapshotStore, Snapshot, SnapshotStore};
pub use traversal::{Batch, EXHAUSTED_SENTINEL, TraversalState};
