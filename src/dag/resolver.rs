// src/dag/resolver.rs

//! Build set resolution: which projects a package build checks out from
//! the live branch, which are pinned to tags, and which are only
//! referenced.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;

use serde::Serialize;
use tracing::{debug, info};

use crate::dag::graph::DependencyGraph;
use crate::depends::DependencyStore;
use crate::errors::{Result, SpkError};
use crate::types::{EdgeKind, ProjectName, normalize};

/// Resolved projects of one package build.
///
/// `roots` are the requested projects; the projects to build are
/// `roots ∪ branches`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildSet {
    pub roots: BTreeSet<ProjectName>,
    pub branches: BTreeSet<ProjectName>,
    pub tags: BTreeSet<ProjectName>,
    pub refs: BTreeSet<ProjectName>,
    pub ref_tags: BTreeSet<ProjectName>,
}

impl BuildSet {
    /// Projects that get built: roots and branch-tracked dependencies.
    pub fn projects(&self) -> BTreeSet<ProjectName> {
        self.roots.union(&self.branches).cloned().collect()
    }

    /// [`BuildSet::projects`] in dependency order.
    pub fn build_order(&self, graph: &mut DependencyGraph<'_>) -> Result<Vec<ProjectName>> {
        let projects: Vec<ProjectName> = self.projects().into_iter().collect();
        graph.reorder(&projects)
    }

    fn check_conflicts(&self) -> Result<()> {
        let built = self.projects();

        let conflict: Vec<ProjectName> = built.intersection(&self.tags).cloned().collect();
        if !conflict.is_empty() {
            return Err(SpkError::Conflict {
                projects: conflict,
                first: EdgeKind::Build.section(),
                second: EdgeKind::BuildTag.section(),
            });
        }

        let conflict: Vec<ProjectName> = built.intersection(&self.ref_tags).cloned().collect();
        if !conflict.is_empty() {
            return Err(SpkError::Conflict {
                projects: conflict,
                first: EdgeKind::Build.section(),
                second: EdgeKind::ReferenceTag.section(),
            });
        }

        Ok(())
    }
}

/// The four dependency categories declared by a set of projects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Categories {
    pub branches: BTreeSet<ProjectName>,
    pub tags: BTreeSet<ProjectName>,
    pub refs: BTreeSet<ProjectName>,
    pub ref_tags: BTreeSet<ProjectName>,
}

/// Tag-pass category lookups, keyed by the exact frontier.
///
/// Entries hold declarations before placeholder expansion, so one cache can
/// serve resolutions for different platform groups.
#[derive(Debug, Clone, Default)]
pub struct DependsCache {
    entries: BTreeMap<BTreeSet<ProjectName>, Categories>,
}

impl DependsCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, frontier: &BTreeSet<ProjectName>) -> Option<&Categories> {
        self.entries.get(frontier)
    }

    pub fn insert(&mut self, frontier: BTreeSet<ProjectName>, categories: Categories) {
        self.entries.insert(frontier, categories);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Hook told about every tag frontier before it is expanded, e.g. to check
/// out the pinned revisions.
///
/// [`NullUpdater`] is the do-nothing implementation and a complete
/// configuration on its own.
pub trait SourceUpdater: Send + Sync + Debug {
    fn update_tags(&self, projects: &BTreeSet<ProjectName>) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullUpdater;

impl SourceUpdater for NullUpdater {
    fn update_tags(&self, _projects: &BTreeSet<ProjectName>) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
pub struct BuildSetResolver<'a> {
    store: &'a DependencyStore,
    updater: &'a dyn SourceUpdater,
    check_conflict: bool,
}

impl<'a> BuildSetResolver<'a> {
    pub fn new(store: &'a DependencyStore, updater: &'a dyn SourceUpdater) -> Self {
        Self {
            store,
            updater,
            check_conflict: true,
        }
    }

    pub fn with_conflict_check(mut self, enabled: bool) -> Self {
        self.check_conflict = enabled;
        self
    }

    /// Resolve `roots` to `max_depth` levels (`0` = unlimited).
    pub fn resolve(
        &self,
        roots: &[ProjectName],
        max_depth: usize,
        cache: &mut DependsCache,
    ) -> Result<BuildSet> {
        let mut set = BuildSet {
            roots: roots
                .iter()
                .map(|r| normalize(r))
                .filter(|r| !r.is_empty())
                .collect(),
            ..BuildSet::default()
        };

        let mut pending_tags: Vec<(BTreeSet<ProjectName>, usize)> = Vec::new();
        let mut frontier = set.roots.clone();
        let mut level = 1;

        while !frontier.is_empty() {
            set.branches
                .extend(frontier.iter().filter(|p| !set.roots.contains(*p)).cloned());
            self.check(&set)?;

            if level == max_depth {
                break;
            }

            let found = self.expand(self.raw_categories(&frontier))?;
            set.refs.extend(found.refs);
            set.ref_tags.extend(found.ref_tags);

            let new_tags: BTreeSet<ProjectName> =
                found.tags.difference(&set.tags).cloned().collect();
            pending_tags.push((new_tags, level + 1));

            frontier = found
                .branches
                .into_iter()
                .filter(|p| !set.branches.contains(p) && !set.roots.contains(p))
                .collect();
            level += 1;
        }

        // Deepest branch level first, like unwinding nested expansions.
        while let Some((tags, level)) = pending_tags.pop() {
            self.tag_pass(&mut set, tags, level, max_depth, cache)?;
        }

        info!(
            roots = set.roots.len(),
            branches = set.branches.len(),
            tags = set.tags.len(),
            refs = set.refs.len(),
            ref_tags = set.ref_tags.len(),
            "build set resolved"
        );
        Ok(set)
    }

    /// Expand a tag frontier. Everything found here stays a tag.
    fn tag_pass(
        &self,
        set: &mut BuildSet,
        frontier: BTreeSet<ProjectName>,
        mut level: usize,
        max_depth: usize,
        cache: &mut DependsCache,
    ) -> Result<()> {
        let mut frontier: BTreeSet<ProjectName> =
            frontier.difference(&set.tags).cloned().collect();

        while !frontier.is_empty() {
            let raw = match cache.get(&frontier) {
                Some(hit) => {
                    debug!(frontier = frontier.len(), "tag frontier served from cache");
                    hit.clone()
                }
                None => {
                    self.updater.update_tags(&frontier)?;
                    let raw = self.raw_categories(&frontier);
                    cache.insert(frontier.clone(), raw.clone());
                    raw
                }
            };

            set.tags.extend(frontier.iter().cloned());
            self.check(set)?;

            if level == max_depth {
                break;
            }

            let found = self.expand(raw)?;
            set.refs.extend(found.refs);
            set.ref_tags.extend(found.ref_tags);

            frontier = found
                .branches
                .union(&found.tags)
                .filter(|p| !set.tags.contains(*p))
                .cloned()
                .collect();
            level += 1;
        }

        Ok(())
    }

    fn check(&self, set: &BuildSet) -> Result<()> {
        if self.check_conflict {
            set.check_conflicts()?;
        }
        Ok(())
    }

    /// Categories declared by `frontier`, before placeholder expansion.
    ///
    /// A project without its own declaration file contributes its central
    /// entry as tags.
    fn raw_categories(&self, frontier: &BTreeSet<ProjectName>) -> Categories {
        let mut out = Categories::default();
        for project in frontier {
            match self.store.declaration(project) {
                Some(decl) => {
                    out.branches.extend(decl.edges(EdgeKind::Build).iter().cloned());
                    out.tags.extend(decl.edges(EdgeKind::BuildTag).iter().cloned());
                    out.refs.extend(decl.edges(EdgeKind::Reference).iter().cloned());
                    out.ref_tags.extend(decl.edges(EdgeKind::ReferenceTag).iter().cloned());
                }
                None => {
                    if let Some(entry) = self.store.central_entry(project) {
                        out.tags.extend(entry.iter().cloned());
                    }
                }
            }
        }
        out
    }

    fn expand(&self, mut categories: Categories) -> Result<Categories> {
        for set in [
            &mut categories.branches,
            &mut categories.tags,
            &mut categories.refs,
            &mut categories.ref_tags,
        ] {
            self.store.substitute_category(set)?;
        }
        Ok(categories)
    }
}
