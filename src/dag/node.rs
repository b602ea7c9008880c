// src/dag/node.rs

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::ProjectName;

/// Build status of a project within one traversal session.
///
/// Only [`crate::dag::TraversalState`] moves a node out of `Unvisited`, and
/// it never moves it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Unvisited,
    Failed,
    Succeeded,
}

impl NodeStatus {
    pub fn is_visited(self) -> bool {
        self != NodeStatus::Unvisited
    }
}

/// Graph vertex for one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectNode {
    pub name: ProjectName,
    /// Direct forward edges.
    pub depends_on: BTreeSet<ProjectName>,
    /// Back references: projects whose `depends_on` names this one.
    pub depended_on_by: BTreeSet<ProjectName>,
    /// Depth at which this node was expanded -> everything discovered
    /// below it during that expansion.
    pub depth_levels: BTreeMap<usize, BTreeSet<ProjectName>>,
    pub status: NodeStatus,
}

impl ProjectNode {
    pub fn new(name: impl Into<ProjectName>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Downstream set from the deepest recorded expansion.
    pub fn downstream(&self) -> Option<&BTreeSet<ProjectName>> {
        self.depth_levels.last_key_value().map(|(_, set)| set)
    }
}
