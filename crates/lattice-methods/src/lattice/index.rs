//! Closed-form index arithmetic for recombining lattices.
//!
//! Nodes are numbered level by level, root first: level `d` holds
//! `1 + d·(b − 1)` nodes for branch factor `b`, so the first index of level
//! `d` is the cumulative count
//!
//! ```text
//! first(d) = d + (b − 1)·d·(d − 1)/2
//! ```
//!
//! The `k`-th child of the node at position `p` of level `d` is
//! `first(d + 1) + p + k`. Neighbouring nodes therefore share children
//! (`child(p, k) == child(p + 1, k − 1)`), which is what keeps the node
//! count quadratic in the number of steps. Every child index is strictly
//! greater than its parent's, so ascending index order is a topological
//! order from root to leaves.

use std::ops::Range;

use lattice_core::{ensure, Error, Result};

/// Index arithmetic for a lattice with `branches` branches per node and
/// `levels` levels (`levels = steps + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatticeIndex {
    branches: usize,
    levels: usize,
    capacity: usize,
}

impl LatticeIndex {
    /// Create the index arithmetic for `branches ≥ 2` and `levels ≥ 1`.
    ///
    /// # Errors
    /// `InvalidArgument` for a branch factor below two or zero levels;
    /// `ResourceLimit` if the node count does not fit in `usize`.
    pub fn new(branches: usize, levels: usize) -> Result<Self> {
        ensure!(branches >= 2, "branch factor must be at least 2, got {branches}");
        ensure!(levels >= 1, "lattice needs at least one level, got {levels}");
        let capacity = checked_first_index(branches, levels).ok_or(Error::ResourceLimit {
            requested: usize::MAX,
            limit: usize::MAX,
        })?;
        Ok(Self {
            branches,
            levels,
            capacity,
        })
    }

    /// Branch factor.
    pub fn branches(&self) -> usize {
        self.branches
    }

    /// Number of levels (root level included).
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// Total number of nodes across all levels.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Index of the first node of level `depth`; equivalently the number of
    /// nodes in levels `0..depth`. Saturates at `usize::MAX`.
    pub fn first_index_of_level(&self, depth: usize) -> usize {
        checked_first_index(self.branches, depth).unwrap_or(usize::MAX)
    }

    /// Number of nodes on level `depth`.
    /// Saturates at `usize::MAX`.
    pub fn level_size(&self, depth: usize) -> usize {
        depth.saturating_mul(self.branches - 1).saturating_add(1)
    }

    /// Number of nodes in the first `levels` levels.
    pub fn node_count(&self, levels: usize) -> usize {
        self.first_index_of_level(levels)
    }

    /// Level of the node at `index`.
    ///
    /// Exact integer search: doubles an upper bound on the depth, then
    /// bisects between the last two candidates.
    ///
    /// # Errors
    /// `IndexOutOfRange` if `index ≥ capacity`.
    pub fn depth(&self, index: usize) -> Result<usize> {
        self.check(index)?;
        let mut hi = 1;
        while self.first_index_of_level(hi) <= index {
            hi *= 2;
        }
        // first(lo) <= index < first(hi)
        let mut lo = hi / 2;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.first_index_of_level(mid) <= index {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Offset of the node at `index` within its level.
    pub fn position_in_level(&self, index: usize) -> Result<usize> {
        let depth = self.depth(index)?;
        Ok(index - self.first_index_of_level(depth))
    }

    /// Index of the node at (`depth`, `position`).
    pub fn index_of(&self, depth: usize, position: usize) -> Result<usize> {
        ensure!(
            depth < self.levels,
            "depth {depth} beyond last level {}",
            self.levels - 1
        );
        ensure!(
            position < self.level_size(depth),
            "position {position} beyond level {depth} of size {}",
            self.level_size(depth)
        );
        Ok(self.first_index_of_level(depth) + position)
    }

    /// Index of the child reached from `index` through `branch`.
    ///
    /// # Errors
    /// `InvalidArgument` if `branch ≥ branches`; `IndexOutOfRange` if
    /// `index` is out of range or lies on the last level.
    pub fn child_index(&self, index: usize, branch: usize) -> Result<usize> {
        ensure!(
            branch < self.branches,
            "branch {branch} out of range for branch factor {}",
            self.branches
        );
        let depth = self.depth(index)?;
        let position = index - self.first_index_of_level(depth);
        let child = self.first_index_of_level(depth + 1) + position + branch;
        self.check(child)?;
        Ok(child)
    }

    /// Contiguous range of child indices; empty on the last level.
    pub fn child_range(&self, index: usize) -> Result<Range<usize>> {
        let depth = self.depth(index)?;
        if depth + 1 == self.levels {
            return Ok(index..index);
        }
        let position = index - self.first_index_of_level(depth);
        let first = self.first_index_of_level(depth + 1) + position;
        Ok(first..first + self.branches)
    }

    /// Contiguous range of parent indices; empty for the root.
    ///
    /// Interior nodes have between one and `branches` parents.
    pub fn parent_range(&self, index: usize) -> Result<Range<usize>> {
        let depth = self.depth(index)?;
        if depth == 0 {
            return Ok(0..0);
        }
        let position = index - self.first_index_of_level(depth);
        let above = self.first_index_of_level(depth - 1);
        let lowest = position.saturating_sub(self.branches - 1);
        let highest = position.min(self.level_size(depth - 1) - 1);
        Ok(above + lowest..above + highest + 1)
    }

    fn check(&self, index: usize) -> Result<()> {
        if index < self.capacity {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                size: self.capacity,
            })
        }
    }
}

/// `d + (b − 1)·d·(d − 1)/2`, or `None` on overflow.
fn checked_first_index(branches: usize, depth: usize) -> Option<usize> {
    let pairs = depth.checked_mul(depth.saturating_sub(1))? / 2;
    (branches - 1).checked_mul(pairs)?.checked_add(depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn binomial_node_counts_are_triangular() {
        let idx = LatticeIndex::new(2, 5).unwrap();
        let counts: Vec<usize> = (1..=5).map(|l| idx.node_count(l)).collect();
        assert_eq!(counts, vec![1, 3, 6, 10, 15]);
        assert_eq!(idx.capacity(), 15);
    }

    #[test]
    fn trinomial_node_counts_are_squares() {
        let idx = LatticeIndex::new(3, 6).unwrap();
        let counts: Vec<usize> = (1..=6).map(|l| idx.node_count(l)).collect();
        assert_eq!(counts, vec![1, 4, 9, 16, 25, 36]);
    }

    #[test]
    fn depth_matches_first_index_of_level() {
        for b in 2..=5 {
            let idx = LatticeIndex::new(b, 40).unwrap();
            for d in 1..40 {
                let first = idx.first_index_of_level(d);
                assert_eq!(idx.depth(first).unwrap(), d, "b={b} d={d}");
                assert_eq!(idx.depth(first - 1).unwrap(), d - 1, "b={b} d={d}");
            }
        }
    }

    #[test]
    fn depth_and_position_agree_with_enumeration() {
        for b in 2..=5 {
            let levels = 12;
            let idx = LatticeIndex::new(b, levels).unwrap();
            let mut index = 0;
            for d in 0..levels {
                for p in 0..idx.level_size(d) {
                    assert_eq!(idx.depth(index).unwrap(), d);
                    assert_eq!(idx.position_in_level(index).unwrap(), p);
                    assert_eq!(idx.index_of(d, p).unwrap(), index);
                    index += 1;
                }
            }
            assert_eq!(index, idx.capacity());
        }
    }

    #[test]
    fn depth_is_non_decreasing() {
        let idx = LatticeIndex::new(2, 30).unwrap();
        let depths: Vec<usize> = (0..idx.capacity())
            .map(|i| idx.depth(i).unwrap())
            .collect();
        assert!(depths.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn binomial_recombination() {
        let idx = LatticeIndex::new(2, 8).unwrap();
        for d in 1..7 {
            for p in 0..idx.level_size(d) - 1 {
                let a = idx.index_of(d, p).unwrap();
                let b = idx.index_of(d, p + 1).unwrap();
                assert_eq!(idx.child_index(a, 1).unwrap(), idx.child_index(b, 0).unwrap());
            }
        }
    }

    #[test]
    fn trinomial_recombination() {
        let idx = LatticeIndex::new(3, 6).unwrap();
        for d in 0..5 {
            for p in 0..idx.level_size(d) - 1 {
                let a = idx.index_of(d, p).unwrap();
                let b = idx.index_of(d, p + 1).unwrap();
                for k in 1..3 {
                    assert_eq!(
                        idx.child_index(a, k).unwrap(),
                        idx.child_index(b, k - 1).unwrap()
                    );
                }
            }
        }
    }

    #[test]
    fn root_children_in_binomial_and_trinomial() {
        let bin = LatticeIndex::new(2, 3).unwrap();
        assert_eq!(bin.child_range(0).unwrap(), 1..3);
        assert_eq!(bin.child_range(1).unwrap(), 3..5);
        assert_eq!(bin.child_range(2).unwrap(), 4..6);

        let tri = LatticeIndex::new(3, 3).unwrap();
        assert_eq!(tri.child_range(0).unwrap(), 1..4);
        assert_eq!(tri.child_range(2).unwrap(), 5..8);
    }

    #[test]
    fn leaves_have_no_children() {
        let idx = LatticeIndex::new(2, 3).unwrap();
        for leaf in 3..6 {
            assert!(idx.child_range(leaf).unwrap().is_empty());
            assert!(matches!(
                idx.child_index(leaf, 0),
                Err(Error::IndexOutOfRange { size: 6, .. })
            ));
        }
    }

    #[test]
    fn parents_are_inverse_of_children() {
        for b in 2..=4 {
            let idx = LatticeIndex::new(b, 7).unwrap();
            for node in 0..idx.capacity() {
                let parents = idx.parent_range(node).unwrap();
                if node == 0 {
                    assert!(parents.is_empty());
                    continue;
                }
                assert!(!parents.is_empty() && parents.len() <= b);
                for parent in parents {
                    assert!(idx.child_range(parent).unwrap().contains(&node));
                }
            }
        }
    }

    #[test]
    fn level_size_saturates() {
        let idx = LatticeIndex::new(3, 2).unwrap();
        assert_eq!(idx.level_size(usize::MAX), usize::MAX);
        assert_eq!(idx.level_size(usize::MAX / 2 + 1), usize::MAX);
        assert_eq!(idx.first_index_of_level(usize::MAX), usize::MAX);
    }

    #[test]
    fn overflow_error_reports_unrepresentable_count() {
        let err = LatticeIndex::new(4, usize::MAX).unwrap_err();
        assert!(matches!(err, Error::ResourceLimit { requested: usize::MAX, .. }));
        assert!(err.to_string().contains("does not fit in usize"), "{err}");
    }

    #[test]
    fn rejects_invalid_construction() {
        assert!(matches!(LatticeIndex::new(1, 5), Err(Error::InvalidArgument(_))));
        assert!(matches!(LatticeIndex::new(2, 0), Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn rejects_out_of_range_queries() {
        let idx = LatticeIndex::new(2, 3).unwrap();
        assert_eq!(
            idx.depth(6),
            Err(Error::IndexOutOfRange { index: 6, size: 6 })
        );
        assert!(matches!(idx.child_index(0, 2), Err(Error::InvalidArgument(_))));
        assert!(idx.index_of(3, 0).is_err());
        assert!(idx.index_of(1, 2).is_err());
    }

    #[test]
    fn overflowing_lattice_is_a_resource_limit() {
        assert!(matches!(
            LatticeIndex::new(2, usize::MAX / 2),
            Err(Error::ResourceLimit { .. })
        ));
    }

    proptest! {
        #[test]
        fn depth_brackets_index(b in 2usize..8, levels in 1usize..300, seed in any::<u64>()) {
            let idx = LatticeIndex::new(b, levels).unwrap();
            let index = (seed % idx.capacity() as u64) as usize;
            let d = idx.depth(index).unwrap();
            prop_assert!(idx.first_index_of_level(d) <= index);
            prop_assert!(index < idx.first_index_of_level(d + 1));
        }

        #[test]
        fn children_follow_parent(b in 2usize..8, levels in 2usize..200, seed in any::<u64>()) {
            let idx = LatticeIndex::new(b, levels).unwrap();
            let interior = idx.first_index_of_level(levels - 1);
            let index = (seed % interior as u64) as usize;
            let children = idx.child_range(index).unwrap();
            prop_assert_eq!(children.len(), b);
            prop_assert!(children.start > index);
            prop_assert_eq!(idx.depth(children.start).unwrap(), idx.depth(index).unwrap() + 1);
            prop_assert_eq!(idx.depth(children.end - 1).unwrap(), idx.depth(index).unwrap() + 1);
        }
    }
}
