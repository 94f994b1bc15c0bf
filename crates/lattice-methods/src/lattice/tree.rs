//! Arena of lattice nodes with forward and backward traversal.
//!
//! A [`LatticeTree`] owns every [`Node`] of a recombining lattice in one flat
//! vector addressed by [`LatticeIndex`]. Parent and child relationships are
//! never stored; they are contiguous index ranges computed on demand, and the
//! traversals hand them to callbacks as slices.

use std::ops::Range;

use lattice_core::{ensure, Error, Result, Settings};

use super::LatticeIndex;

/// A lattice node: its coordinates and an optional state payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<T> {
    index: usize,
    depth: usize,
    position: usize,
    state: Option<T>,
}

impl<T> Node<T> {
    /// Index in the arena.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Level, 0 at the root.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Offset within the level, 0 at the lowest node.
    pub fn position(&self) -> usize {
        self.position
    }

    /// State written by the last traversal, if any.
    pub fn state(&self) -> Option<&T> {
        self.state.as_ref()
    }

    /// State, or a runtime error naming the node if it was never written.
    pub fn try_state(&self) -> Result<&T> {
        self.state.as_ref().ok_or_else(|| {
            Error::Runtime(format!(
                "node {} (depth {}, position {}) has no state",
                self.index, self.depth, self.position
            ))
        })
    }

    /// Branch leading from `parent` to this node.
    ///
    /// Only meaningful when `parent` is one of this node's parents.
    pub fn branch_from(&self, parent: &Node<T>) -> usize {
        self.position - parent.position
    }
}

/// A recombining lattice of `steps + 1` levels and `branches` branches per
/// node.
///
/// Node states start unset. [`traverse_down`](Self::traverse_down) and
/// [`traverse_up`](Self::traverse_up) write each state exactly once per
/// pass; both take `&mut self`, so one tree is never traversed by two
/// callers at once.
#[derive(Debug, Clone)]
pub struct LatticeTree<T> {
    index: LatticeIndex,
    nodes: Vec<Node<T>>,
}

impl<T> LatticeTree<T> {
    /// Build a tree using the node ceiling from the global [`Settings`].
    ///
    /// # Errors
    /// `InvalidArgument` for `branches < 2` or `steps < 1`;
    /// `ResourceLimit` if the tree would exceed the ceiling.
    pub fn new(branches: usize, steps: usize) -> Result<Self> {
        Self::with_node_limit(branches, steps, Settings::instance().max_lattice_nodes())
    }

    /// Build a tree with an explicit node ceiling.
    pub fn with_node_limit(branches: usize, steps: usize, max_nodes: usize) -> Result<Self> {
        ensure!(steps >= 1, "lattice needs at least one step, got {steps}");
        let levels = steps.checked_add(1).ok_or(Error::ResourceLimit {
            requested: usize::MAX,
            limit: max_nodes,
        })?;
        let index = LatticeIndex::new(branches, levels).map_err(|e| match e {
            Error::ResourceLimit { requested, .. } => Error::ResourceLimit {
                requested,
                limit: max_nodes,
            },
            other => other,
        })?;
        let capacity = index.capacity();
        if capacity > max_nodes {
            tracing::warn!(
                branches,
                steps,
                nodes = capacity,
                limit = max_nodes,
                "lattice exceeds node limit"
            );
            return Err(Error::ResourceLimit {
                requested: capacity,
                limit: max_nodes,
            });
        }

        let mut nodes = Vec::with_capacity(capacity);
        for depth in 0..=steps {
            for position in 0..index.level_size(depth) {
                nodes.push(Node {
                    index: nodes.len(),
                    depth,
                    position,
                    state: None,
                });
            }
        }
        tracing::debug!(branches, steps, nodes = capacity, "lattice allocated");
        Ok(Self { index, nodes })
    }

    /// Index arithmetic of this tree.
    pub fn index(&self) -> &LatticeIndex {
        &self.index
    }

    /// Branch factor.
    pub fn branches(&self) -> usize {
        self.index.branches()
    }

    /// Number of steps (levels − 1).
    pub fn steps(&self) -> usize {
        self.index.levels() - 1
    }

    /// Total number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a tree has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Result<&Node<T>> {
        self.nodes.get(index).ok_or(Error::IndexOutOfRange {
            index,
            size: self.nodes.len(),
        })
    }

    /// The root node.
    pub fn root(&self) -> &Node<T> {
        &self.nodes[0]
    }

    /// All nodes of level `depth`, lowest first.
    pub fn level(&self, depth: usize) -> Result<&[Node<T>]> {
        ensure!(
            depth <= self.steps(),
            "depth {depth} beyond last level {}",
            self.steps()
        );
        let first = self.index.first_index_of_level(depth);
        Ok(&self.nodes[first..first + self.index.level_size(depth)])
    }

    /// Parent indices of the node at `index`.
    pub fn parents(&self, index: usize) -> Result<Range<usize>> {
        self.index.parent_range(index)
    }

    /// Child indices of the node at `index`.
    pub fn children(&self, index: usize) -> Result<Range<usize>> {
        self.index.child_range(index)
    }

    /// Clear every state.
    pub fn reset(&mut self) {
        for node in &mut self.nodes {
            node.state = None;
        }
    }

    /// Visit nodes root first, in ascending index order.
    ///
    /// For each node, `enter` is called, then `process` with the node and
    /// its parents (whose states this pass has already written), then
    /// `exit`. The state returned by `process` is stored in the node. The
    /// root receives an empty parent slice.
    ///
    /// The first error returned by `process` aborts the pass; nodes already
    /// visited keep their new state.
    pub fn traverse_down<Enter, Process, Exit>(
        &mut self,
        mut enter: Enter,
        mut process: Process,
        mut exit: Exit,
    ) -> Result<()>
    where
        Enter: FnMut(&Node<T>),
        Process: FnMut(&Node<T>, &[Node<T>]) -> Result<T>,
        Exit: FnMut(&Node<T>),
    {
        for i in 0..self.nodes.len() {
            let parents = self.index.parent_range(i)?;
            let (visited, rest) = self.nodes.split_at_mut(i);
            let node = &mut rest[0];
            enter(node);
            let state = process(node, &visited[parents])?;
            node.state = Some(state);
            exit(node);
        }
        Ok(())
    }

    /// Visit nodes leaves first, in descending index order.
    ///
    /// For each node, `enter` is called, then `process` with the node and
    /// its children (whose states this pass has already written). Leaves
    /// receive an empty child slice; every other node receives exactly
    /// `branches` children.
    ///
    /// # Panics
    /// Panics if an interior node does not see exactly `branches` children,
    /// which would mean the index arithmetic is broken.
    pub fn traverse_up<Enter, Process>(&mut self, mut enter: Enter, mut process: Process) -> Result<()>
    where
        Enter: FnMut(&Node<T>),
        Process: FnMut(&Node<T>, &[Node<T>]) -> Result<T>,
    {
        let branches = self.index.branches();
        let last_level = self.steps();
        for i in (0..self.nodes.len()).rev() {
            let range = self.index.child_range(i)?;
            let (head, visited) = self.nodes.split_at_mut(i + 1);
            let node = &mut head[i];
            let children = if range.is_empty() {
                &visited[..0]
            } else {
                &visited[range.start - (i + 1)..range.end - (i + 1)]
            };
            if node.depth < last_level {
                assert_eq!(
                    children.len(),
                    branches,
                    "interior node {i} must have exactly {branches} children"
                );
            }
            enter(node);
            let state = process(node, children)?;
            node.state = Some(state);
        }
        Ok(())
    }
}

impl<T: Clone> LatticeTree<T> {
    /// States of level `depth`, lowest first; `None` for unset states.
    pub fn level_states(&self, depth: usize) -> Result<Vec<Option<T>>> {
        Ok(self.level(depth)?.iter().map(|n| n.state.clone()).collect())
    }
}
