// src/dag/traversal.rs

//! Incremental build-progress tracking across driver invocations.
//!
//! A session is created once (`initialize`) from the materialized graph and
//! the projects that still need building, then advanced by outcome reports
//! until `next_batch` returns [`Batch::Exhausted`].

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{debug, info, warn};

use crate::dag::graph::link_back_references;
use crate::dag::node::{NodeStatus, ProjectNode};
use crate::dag::snapshot::{SNAPSHOT_VERSION, Snapshot, SnapshotNode};
use crate::errors::{Result, SpkError};
use crate::types::{Direction, ProjectName};

/// Printed in place of a batch once nothing is left to build.
pub const EXHAUSTED_SENTINEL: &str = "NULL";

/// Result of [`TraversalState::next_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Batch {
    /// Queued projects whose prerequisites all succeeded. May be empty while
    /// queued projects wait on builds in flight.
    Ready(Vec<ProjectName>),
    /// The queue is empty.
    Exhausted,
}

impl fmt::Display for Batch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Batch::Ready(names) => write!(f, "{}", names.join(" ")),
            Batch::Exhausted => write!(f, "{EXHAUSTED_SENTINEL}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalState {
    direction: Direction,
    nodes: BTreeMap<ProjectName, ProjectNode>,
    queue: BTreeSet<ProjectName>,
    success: Vec<ProjectName>,
    failed: Vec<ProjectName>,
    skipped: BTreeMap<ProjectName, BTreeSet<ProjectName>>,
}

impl TraversalState {
    /// Start a session.
    ///
    /// Every node whose prerequisite closure (itself included) holds no
    /// queued project is marked succeeded up front: nothing this session
    /// builds can affect it.
    pub fn initialize<I>(
        direction: Direction,
        mut nodes: BTreeMap<ProjectName, ProjectNode>,
        build_queue: I,
    ) -> Self
    where
        I: IntoIterator<Item = ProjectName>,
    {
        let queue: BTreeSet<ProjectName> = build_queue.into_iter().collect();
        for name in queue.iter() {
            if !nodes.contains_key(name) {
                warn!(project = %name, "queued project not in graph; tracking it without edges");
                nodes.insert(name.clone(), ProjectNode::new(name.clone()));
            }
        }

        let mut state = Self {
            direction,
            nodes,
            queue,
            success: Vec::new(),
            failed: Vec::new(),
            skipped: BTreeMap::new(),
        };

        let unblocked: Vec<ProjectName> = state
            .nodes
            .keys()
            .filter(|name| state.prerequisite_closure(name).is_disjoint(&state.queue))
            .cloned()
            .collect();
        for name in unblocked.iter() {
            state.set_status(name, NodeStatus::Succeeded);
        }

        info!(
            %direction,
            nodes = state.nodes.len(),
            queued = state.queue.len(),
            unblocked = unblocked.len(),
            "traversal session initialized"
        );
        state
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn queue(&self) -> impl Iterator<Item = &ProjectName> {
        self.queue.iter()
    }

    pub fn success(&self) -> &[ProjectName] {
        &self.success
    }

    pub fn failed(&self) -> &[ProjectName] {
        &self.failed
    }

    pub fn skipped_by(&self, root: &str) -> Option<&BTreeSet<ProjectName>> {
        self.skipped.get(root)
    }

    pub fn status(&self, name: &str) -> Option<NodeStatus> {
        self.nodes.get(name).map(|n| n.status)
    }

    /// Record successful builds and promote every waiting neighbour whose
    /// prerequisites are now all satisfied.
    ///
    /// Queued neighbours are never promoted: they still have to be built.
    pub fn report_success(&mut self, names: &[ProjectName]) {
        for name in names {
            self.queue.remove(name);
            if !self.settle(name, NodeStatus::Succeeded) {
                continue;
            }
            self.success.push(name.clone());

            let mut work: Vec<ProjectName> = self.infected(name);
            while let Some(next) = work.pop() {
                let visited = self.status(&next).is_none_or(NodeStatus::is_visited);
                if visited || self.queue.contains(&next) {
                    continue;
                }
                if self.is_ready(&next) {
                    debug!(project = %next, "promoted by success cascade");
                    self.set_status(&next, NodeStatus::Succeeded);
                    work.extend(self.infected(&next));
                }
            }
        }
    }

    /// Record failed builds. Everything downstream that has not settled yet
    /// fails too; queued projects among them are dropped from the queue and
    /// attributed to the failed root.
    ///
    /// Returns `(root, skipped)` pairs in report order.
    pub fn report_failure(&mut self, names: &[ProjectName]) -> Vec<(ProjectName, BTreeSet<ProjectName>)> {
        let mut report = Vec::new();

        for root in names {
            self.queue.remove(root);
            if !self.settle(root, NodeStatus::Failed) {
                continue;
            }
            self.failed.push(root.clone());

            let mut skipped = BTreeSet::new();
            let mut work: Vec<ProjectName> = self.infected(root);
            while let Some(next) = work.pop() {
                let visited = self.status(&next).is_none_or(NodeStatus::is_visited);
                if visited {
                    continue;
                }
                self.set_status(&next, NodeStatus::Failed);
                if self.queue.remove(&next) {
                    skipped.insert(next.clone());
                }
                work.extend(self.infected(&next));
            }

            if !skipped.is_empty() {
                warn!(project = %root, skipped = ?skipped, "build failed; skipping dependents");
            }
            self.skipped
                .entry(root.clone())
                .or_default()
                .extend(skipped.iter().cloned());
            report.push((root.clone(), skipped));
        }

        report
    }

    /// Up to `count` queued projects (`0` = no limit) ready to build, in
    /// name order.
    pub fn next_batch(&self, count: usize) -> Batch {
        if self.queue.is_empty() {
            return Batch::Exhausted;
        }

        let mut ready = Vec::new();
        for name in self.queue.iter() {
            if count != 0 && ready.len() >= count {
                break;
            }
            if self.is_ready(name) {
                ready.push(name.clone());
            }
        }
        Batch::Ready(ready)
    }

    /// Human-readable session summary.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        if !self.success.is_empty() {
            out.push_str("[Success projects]\n");
            out.push_str(&self.success.join(" "));
            out.push('\n');
        }
        if !self.failed.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("[Failed projects -> Skipped projects]\n");
            for root in self.failed.iter() {
                let skipped: Vec<&str> = self
                    .skipped
                    .get(root)
                    .map(|s| s.iter().map(String::as_str).collect())
                    .unwrap_or_default();
                out.push_str(&format!("{} -> {}\n", root, skipped.join(" ")));
            }
        }
        if !self.queue.is_empty() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str("[Remaining projects]\n");
            let remaining: Vec<&str> = self.queue.iter().map(String::as_str).collect();
            out.push_str(&remaining.join(" "));
            out.push('\n');
        }
        out
    }

    /// Apply a reported outcome to `name`. Returns false when the node had
    /// already settled, which leaves its status untouched.
    fn settle(&mut self, name: &ProjectName, status: NodeStatus) -> bool {
        match self.nodes.get_mut(name) {
            Some(node) if node.status.is_visited() && node.status != status => {
                warn!(project = %name, current = ?node.status, reported = ?status, "outcome ignored; project already settled");
                false
            }
            Some(node) => {
                node.status = status;
                true
            }
            None => {
                warn!(project = %name, "outcome for project outside the session graph");
                let mut node = ProjectNode::new(name.clone());
                node.status = status;
                self.nodes.insert(name.clone(), node);
                true
            }
        }
    }

    fn set_status(&mut self, name: &str, status: NodeStatus) {
        if let Some(node) = self.nodes.get_mut(name) {
            node.status = status;
        }
    }

    /// Neighbours that must finish before `name` can build.
    fn prerequisites(&self, name: &str) -> Vec<ProjectName> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let set = match self.direction {
            Direction::Forward => &node.depends_on,
            Direction::Backward => &node.depended_on_by,
        };
        set.iter().cloned().collect()
    }

    /// Neighbours affected by an outcome of `name`.
    fn infected(&self, name: &str) -> Vec<ProjectName> {
        let Some(node) = self.nodes.get(name) else {
            return Vec::new();
        };
        let set = match self.direction {
            Direction::Forward => &node.depended_on_by,
            Direction::Backward => &node.depends_on,
        };
        set.iter().cloned().collect()
    }

    fn is_ready(&self, name: &str) -> bool {
        self.prerequisites(name)
            .iter()
            .all(|p| self.status(p) == Some(NodeStatus::Succeeded))
    }

    fn prerequisite_closure(&self, name: &str) -> BTreeSet<ProjectName> {
        let mut seen = BTreeSet::new();
        let mut work = vec![name.to_string()];
        while let Some(next) = work.pop() {
            if seen.insert(next.clone()) {
                work.extend(self.prerequisites(&next));
            }
        }
        seen
    }

    pub fn to_snapshot(&self) -> Snapshot {
        Snapshot {
            version: SNAPSHOT_VERSION,
            direction: self.direction,
            queue: self.queue.iter().cloned().collect(),
            success: self.success.clone(),
            failed: self.failed.clone(),
            skipped: self
                .skipped
                .iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect(),
            nodes: self
                .nodes
                .values()
                .map(|n| {
                    (
                        n.name.clone(),
                        SnapshotNode {
                            depends_on: n.depends_on.iter().cloned().collect(),
                            status: n.status,
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Result<Self> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SpkError::Snapshot(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }

        let mut nodes: BTreeMap<ProjectName, ProjectNode> = snapshot
            .nodes
            .into_iter()
            .map(|(name, n)| {
                let mut node = ProjectNode::new(name.clone());
                node.depends_on = n.depends_on.into_iter().collect();
                node.status = n.status;
                (name, node)
            })
            .collect();
        link_back_references(&mut nodes);

        Ok(Self {
            direction: snapshot.direction,
            nodes,
            queue: snapshot.queue.into_iter().collect(),
            success: snapshot.success,
            failed: snapshot.failed,
            skipped: snapshot
                .skipped
                .into_iter()
                .map(|(k, v)| (k, v.into_iter().collect()))
                .collect(),
        })
    }
}
