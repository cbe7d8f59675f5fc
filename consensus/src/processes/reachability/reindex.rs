use std::collections::{HashMap, VecDeque};

use super::{extensions::ReachabilityStoreIntervalExtensions, ReachabilityError, Result};
use crate::model::stores::reachability::ReachabilityStore;
use kaspad_hashes::Hash;

pub(super) struct ReindexOperationContext<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
    subtree_sizes: HashMap<Hash, u64>,
}

impl<'a, T: ReachabilityStore + ?Sized> ReindexOperationContext<'a, T> {
    pub(super) fn new(store: &'a mut T) -> Self {
        Self { store, subtree_sizes: HashMap::new() }
    }

    /// Traverses the tree from the new leaf upwards until finding an ancestor
    /// whose interval can contain its current subtree, then repropagates the
    /// ancestor's interval through the subtree
    pub(super) fn reindex_intervals(&mut self, new_leaf: Hash) -> Result<()> {
        let mut current = new_leaf;
        loop {
            let current_interval = self.store.get_interval(current)?;
            self.count_subtrees(current)?;

            if current_interval.size() >= self.subtree_sizes[&current] {
                break;
            }

            let parent = self.store.get_parent(current)?;

            if parent.is_zero() {
                // The tree root has a 2^64 capacity so this is unreachable
                // unless intervals were corrupted
                return Err(ReachabilityError::DataOverflow(format!(
                    "tree root out of capacity during reindexing of {}",
                    new_leaf
                )));
            }

            current = parent
        }

        self.propagate_interval(current)
    }

    /// count_subtrees counts the size of each subtree under this block,
    /// and populates self.subtree_sizes with the results.
    /// It is equivalent to the following recursive implementation:
    ///
    /// ```text
    /// fn count_subtrees(&mut self, block: Hash) -> Result<u64> {
    ///     let mut subtree_size = 0u64;
    ///     for child in self.store.get_children(block)?.iter().cloned() {
    ///         subtree_size += self.count_subtrees(child)?;
    ///     }
    ///     self.subtree_sizes.insert(block, subtree_size + 1);
    ///     Ok(subtree_size + 1)
    /// }
    /// ```
    ///
    /// However, we are expecting (linearly) deep trees, and so a
    /// recursive stack-based approach is inefficient and will hit
    /// recursion limits. Instead, the same logic was implemented
    /// using a (queue-based) BFS method. At a high level, the
    /// algorithm uses BFS for reaching all leaves and pushes
    /// intermediate updates from leaves via parent chains until all
    /// size information is gathered at the root of the operation.
    fn count_subtrees(&mut self, block: Hash) -> Result<()> {
        if self.subtree_sizes.contains_key(&block) {
            return Ok(());
        }

        let mut queue = VecDeque::<Hash>::from([block]);
        let mut counts = HashMap::<Hash, u64>::new();

        while let Some(mut current) = queue.pop_front() {
            let children = self.store.get_children(current)?;
            if children.is_empty() {
                // We reached a leaf
                self.subtree_sizes.insert(current, 1);
            } else if !self.subtree_sizes.contains_key(&current) {
                // We haven't yet calculated the subtree size of
                // the current block. Add all its children to the
                // queue
                queue.extend(children.iter());
                continue;
            }

            // We reached a leaf or a pre-calculated subtree. Push information up
            while current != block {
                current = self.store.get_parent(current)?;

                let count = counts.entry(current).or_insert(0);
                let children = self.store.get_children(current)?;

                *count += 1;
                if *count < children.len() as u64 {
                    // Not all subtrees of the current block are ready
                    break;
                }

                // All children of `current` have calculated their subtree
                // sizes. Sum them all together and add 1 to get the subtree
                // size of `current`
                let subtree_sum: u64 = children.iter().map(|c| self.subtree_sizes[c]).sum();
                self.subtree_sizes.insert(current, subtree_sum + 1);
            }
        }

        Ok(())
    }

    /// propagate_interval propagates a new interval using a BFS traversal.
    /// Subtree intervals are recursively allocated according to subtree sizes
    /// and the proportional allocation rule in `Interval::split_proportional`.
    fn propagate_interval(&mut self, block: Hash) -> Result<()> {
        // Make sure subtrees are counted before propagating
        self.count_subtrees(block)?;

        let mut queue = VecDeque::<Hash>::from([block]);
        while let Some(current) = queue.pop_front() {
            let children = self.store.get_children(current)?;
            if !children.is_empty() {
                let sizes: Vec<u64> = children.iter().map(|c| self.subtree_sizes[c]).collect();
                let capacity = self.store.interval_children_capacity(current)?;
                let intervals = capacity.split_proportional(&sizes);
                for (c, ci) in children.iter().copied().zip(intervals) {
                    self.store.set_interval(c, ci)?;
                }
                queue.extend(children.iter());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::StoreBuilder;
    use super::*;
    use crate::{
        model::stores::reachability::MemoryReachabilityStore, processes::reachability::interval::Interval,
        processes::reachability::tests::StoreValidationExtensions,
    };

    #[test]
    fn test_count_subtrees() {
        let mut store: Box<dyn ReachabilityStore> = Box::new(MemoryReachabilityStore::new());

        // Arrange
        let root: Hash = 1.into();
        StoreBuilder::new(store.as_mut())
            .add_block(root, Hash::default())
            .add_block(2.into(), root)
            .add_block(3.into(), 2.into())
            .add_block(4.into(), 2.into())
            .add_block(5.into(), 3.into())
            .add_block(6.into(), 5.into())
            .add_block(7.into(), 1.into())
            .add_block(8.into(), 6.into());

        // Act
        let mut ctx = ReindexOperationContext::new(store.as_mut());
        ctx.count_subtrees(root).unwrap();

        // Assert
        let expected = [(1u64, 8u64), (2, 6), (3, 4), (4, 1), (5, 3), (6, 2), (7, 1), (8, 1)]
            .iter()
            .cloned()
            .map(|(h, c)| (Hash::from(h), c))
            .collect::<HashMap<Hash, u64>>();

        assert_eq!(expected, ctx.subtree_sizes);

        // Act
        ctx.store.set_interval(root, Interval::new(1, 100)).unwrap();
        ctx.propagate_interval(root).unwrap();

        // Assert intervals follow the general rules
        store.validate_intervals(root).unwrap();
    }
}
