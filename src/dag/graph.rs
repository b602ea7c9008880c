// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, trace};

use crate::dag::node::ProjectNode;
use crate::depends::DependencyStore;
use crate::errors::{Result, SpkError};
use crate::types::{Direction, ProjectName};

/// Directed graph of projects, built lazily from a [`DependencyStore`].
///
/// Nodes are created the first time a traversal reaches them and live for
/// the lifetime of the graph. A new resolution builds a new graph.
#[derive(Debug)]
pub struct DependencyGraph<'s> {
    store: &'s DependencyStore,
    use64: bool,
    nodes: BTreeMap<ProjectName, ProjectNode>,
    /// Reverse edges found by scanning the store, per project.
    reverse_cache: BTreeMap<ProjectName, Vec<ProjectName>>,
}

/// One entry of the explicit DFS stack.
#[derive(Debug)]
struct Frame {
    name: ProjectName,
    depth: usize,
    children: Vec<ProjectName>,
    next: usize,
    downstream: BTreeSet<ProjectName>,
}

/// Mutable state of a single `traverse` call.
#[derive(Debug)]
struct TraversalRun {
    direction: Direction,
    max_depth: usize,
    /// Deepest depth each project has been expanded at.
    depths: BTreeMap<ProjectName, usize>,
    stack: Vec<Frame>,
    on_stack: BTreeSet<ProjectName>,
}

impl TraversalRun {
    fn new(direction: Direction, max_depth: usize, roots: Vec<ProjectName>) -> Self {
        // Depth 0 is the synthetic root; it is never reported.
        let root = Frame {
            name: ProjectName::new(),
            depth: 0,
            children: roots,
            next: 0,
            downstream: BTreeSet::new(),
        };
        Self {
            direction,
            max_depth,
            depths: BTreeMap::new(),
            stack: vec![root],
            on_stack: BTreeSet::new(),
        }
    }

    fn may_expand(&self, depth: usize) -> bool {
        self.max_depth == 0 || depth < self.max_depth
    }

    /// Stack contents from the first occurrence of `name`, closed by `name`.
    fn cycle_path(&self, name: &str) -> Vec<ProjectName> {
        let mut path: Vec<ProjectName> = self
            .stack
            .iter()
            .skip(1)
            .map(|f| f.name.clone())
            .skip_while(|n| n != name)
            .collect();
        path.push(name.to_string());
        path
    }

    /// Group projects by their recorded depth, deepest first.
    fn levels(&self) -> BTreeMap<usize, BTreeSet<ProjectName>> {
        let mut levels: BTreeMap<usize, BTreeSet<ProjectName>> = BTreeMap::new();
        for (name, depth) in self.depths.iter() {
            levels.entry(*depth).or_default().insert(name.clone());
        }
        levels
    }
}

impl<'s> DependencyGraph<'s> {
    /// Empty graph over `store`. `use64` selects the 64-bit dependency
    /// entries where they exist.
    pub fn new(store: &'s DependencyStore, use64: bool) -> Self {
        Self {
            store,
            use64,
            nodes: BTreeMap::new(),
            reverse_cache: BTreeMap::new(),
        }
    }

    pub fn store(&self) -> &'s DependencyStore {
        self.store
    }

    pub fn uses_64bit(&self) -> bool {
        self.use64
    }

    /// Expand `roots` and return every reached project, deepest level first.
    ///
    /// `max_depth == 0` is unlimited; otherwise roots sit at depth 1 and
    /// nothing below `max_depth` is reported. A project revisited while it is
    /// still on the DFS stack aborts the whole traversal with
    /// [`SpkError::CircularDependency`].
    pub fn traverse(
        &mut self,
        roots: &[ProjectName],
        max_depth: usize,
        direction: Direction,
    ) -> Result<Vec<ProjectName>> {
        let mut run = TraversalRun::new(direction, max_depth, roots.to_vec());
        self.run(&mut run)?;

        let levels = run.levels();
        let ordered: Vec<ProjectName> = levels
            .into_iter()
            .rev()
            .flat_map(|(_, names)| names.into_iter())
            .collect();

        debug!(
            roots = roots.len(),
            reached = ordered.len(),
            max_depth,
            %direction,
            "traversal finished"
        );
        Ok(ordered)
    }

    /// Reorder mode: expand `inputs` fully forward, then keep only the
    /// inputs, in dependency order.
    pub fn reorder(&mut self, inputs: &[ProjectName]) -> Result<Vec<ProjectName>> {
        let full = self.traverse(inputs, 0, Direction::Forward)?;
        let wanted: BTreeSet<&ProjectName> = inputs.iter().collect();
        Ok(full.into_iter().filter(|p| wanted.contains(p)).collect())
    }

    fn run(&mut self, run: &mut TraversalRun) -> Result<()> {
        loop {
            let Some(top) = run.stack.last_mut() else {
                return Ok(());
            };

            if top.next < top.children.len() {
                let child = top.children[top.next].clone();
                top.next += 1;
                let depth = top.depth + 1;

                if run.on_stack.contains(&child) {
                    let cycle = run.cycle_path(&child);
                    debug!(cycle = ?cycle, "circular dependency");
                    return Err(SpkError::CircularDependency { cycle });
                }

                if let Some(&seen) = run.depths.get(&child) {
                    if seen >= depth {
                        let below = self
                            .nodes
                            .get(&child)
                            .and_then(|n| n.depth_levels.get(&seen))
                            .cloned()
                            .unwrap_or_default();
                        if let Some(top) = run.stack.last_mut() {
                            top.downstream.insert(child);
                            top.downstream.extend(below);
                        }
                        continue;
                    }
                    trace!(project = %child, from = seen, to = depth, "re-expanding at greater depth");
                }

                run.depths.insert(child.clone(), depth);
                self.ensure_node(&child);
                let children = if run.may_expand(depth) {
                    self.neighbours(&child, run.direction)
                } else {
                    Vec::new()
                };

                run.on_stack.insert(child.clone());
                run.stack.push(Frame {
                    name: child,
                    depth,
                    children,
                    next: 0,
                    downstream: BTreeSet::new(),
                });
            } else {
                let Some(frame) = run.stack.pop() else {
                    return Ok(());
                };
                let Some(parent) = run.stack.last_mut() else {
                    // Synthetic root finished.
                    return Ok(());
                };

                run.on_stack.remove(&frame.name);
                if let Some(node) = self.nodes.get_mut(&frame.name) {
                    node.depth_levels.insert(frame.depth, frame.downstream.clone());
                }
                parent.downstream.insert(frame.name);
                parent.downstream.extend(frame.downstream);
            }
        }
    }

    /// Direction-relevant neighbours used for expansion.
    fn neighbours(&mut self, name: &str, direction: Direction) -> Vec<ProjectName> {
        match direction {
            Direction::Forward => self.store.forward_edges(name, self.use64).to_vec(),
            Direction::Backward => self.dependents(name),
        }
    }

    /// Reverse edges of `name`, scanned once and cached.
    pub fn dependents(&mut self, name: &str) -> Vec<ProjectName> {
        if let Some(cached) = self.reverse_cache.get(name) {
            return cached.clone();
        }
        let found = self.store.scan_dependents(name, self.use64);
        self.reverse_cache.insert(name.to_string(), found.clone());
        found
    }

    fn ensure_node(&mut self, name: &str) {
        if self.nodes.contains_key(name) {
            return;
        }
        let mut node = ProjectNode::new(name);
        node.depends_on = self
            .store
            .forward_edges(name, self.use64)
            .iter()
            .cloned()
            .collect();
        self.nodes.insert(name.to_string(), node);
    }

    pub fn node(&self, name: &str) -> Option<&ProjectNode> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ProjectNode> {
        self.nodes.values()
    }

    /// Expand `roots` without a depth limit in `direction` and hand out the
    /// reached nodes with adjacency restricted to themselves.
    ///
    /// This is the node set a [`crate::dag::TraversalState`] session works on.
    pub fn materialize(
        mut self,
        roots: &[ProjectName],
        direction: Direction,
    ) -> Result<BTreeMap<ProjectName, ProjectNode>> {
        self.traverse(roots, 0, direction)?;
        for root in roots {
            self.ensure_node(root);
        }

        let mut nodes = self.nodes;
        let names: BTreeSet<ProjectName> = nodes.keys().cloned().collect();
        for node in nodes.values_mut() {
            node.depends_on.retain(|d| names.contains(d));
            node.depended_on_by.clear();
        }
        link_back_references(&mut nodes);
        Ok(nodes)
    }
}

/// Rebuild every `depended_on_by` from the `depends_on` sets.
pub fn link_back_references(nodes: &mut BTreeMap<ProjectName, ProjectNode>) {
    let edges: Vec<(ProjectName, ProjectName)> = nodes
        .values()
        .flat_map(|n| n.depends_on.iter().map(move |d| (n.name.clone(), d.clone())))
        .collect();
    for (from, to) in edges {
        if let Some(target) = nodes.get_mut(&to) {
            target.depended_on_by.insert(from);
        }
    }
}
