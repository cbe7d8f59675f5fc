use super::{interval::Interval, tree::add_tree_block, ReachabilityError, Result};
use crate::model::stores::reachability::{ReachabilityStore, ReachabilityStoreReader};
use kaspad_consensus_core::blockhash::ORIGIN;
use kaspad_hashes::Hash;

/// Initializes the reachability tree with the virtual origin block which
/// serves as the universal tree root, preceding genesis itself
pub fn init(store: &mut (impl ReachabilityStore + ?Sized)) -> Result<()> {
    if store.has(ORIGIN)? {
        return Ok(());
    }
    store.init(ORIGIN, Interval::maximal())?;
    Ok(())
}

/// Adds a block to the reachability structures: appends it to the tree under
/// its selected parent and registers it within the future covering sets of its
/// merge set
pub fn add_block(
    store: &mut (impl ReachabilityStore + ?Sized),
    new_block: Hash,
    selected_parent: Hash,
    mergeset_iterator: &mut impl Iterator<Item = Hash>,
) -> Result<()> {
    add_tree_block(store, new_block, selected_parent)?;

    // Update the future covering sets of all blocks in the new block's merge set
    for merged_block in mergeset_iterator {
        insert_to_future_covering_set(store, merged_block, new_block)?;
    }

    Ok(())
}

/// Returns whether `this` is a chain ancestor of `queried` (i.e. it is on the
/// selected-parent path of `queried`). The relation is reflexive: a block is
/// a chain ancestor of itself.
pub fn is_chain_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    Ok(store.get_interval(this)?.contains(store.get_interval(queried)?))
}

/// Returns whether `this` is a strict chain ancestor of `queried` (exclusive)
pub fn is_strict_chain_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    Ok(this != queried && is_chain_ancestor_of(store, this, queried)?)
}

/// Returns whether `this` is a DAG ancestor of `queried` (reflexive). `this`
/// is in the past of `queried` iff it is a chain ancestor of `queried` or one
/// of its future covering blocks is a chain ancestor of `queried`.
pub fn is_dag_ancestor_of(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    if is_chain_ancestor_of(store, this, queried)? {
        return Ok(true);
    }
    let queried_interval = store.get_interval(queried)?;
    let fcs = store.get_future_covering_set(this)?;
    Ok(matches!(binary_search_descendant(store, &fcs, queried_interval)?, SearchOutput::Found(_, _)))
}

/// Returns whether the two blocks are in the anticone of each other
pub fn are_anticone(store: &(impl ReachabilityStoreReader + ?Sized), this: Hash, queried: Hash) -> Result<bool> {
    Ok(!is_dag_ancestor_of(store, this, queried)? && !is_dag_ancestor_of(store, queried, this)?)
}

/// Returns the child of `ancestor` which is also a chain ancestor of
/// `descendant` - i.e. the next block on the chain path from `ancestor`
/// towards `descendant`
pub fn get_next_chain_ancestor(store: &(impl ReachabilityStoreReader + ?Sized), descendant: Hash, ancestor: Hash) -> Result<Hash> {
    if descendant == ancestor {
        return Err(ReachabilityError::DataInconsistency);
    }
    if !is_chain_ancestor_of(store, ancestor, descendant)? {
        return Err(ReachabilityError::DataInconsistency);
    }
    get_next_chain_ancestor_unchecked(store, descendant, ancestor)
}

/// Like `get_next_chain_ancestor` but without assertions. The caller must
/// guarantee that `ancestor` is a strict chain ancestor of `descendant`.
pub fn get_next_chain_ancestor_unchecked(
    store: &(impl ReachabilityStoreReader + ?Sized),
    descendant: Hash,
    ancestor: Hash,
) -> Result<Hash> {
    let children = store.get_children(ancestor)?;
    let descendant_interval = store.get_interval(descendant)?;
    match binary_search_descendant(store, &children, descendant_interval)? {
        SearchOutput::Found(child, _) => Ok(child),
        SearchOutput::NotFound(_) => Err(ReachabilityError::DataInconsistency),
    }
}

/// Returns an iterator walking up the selected-parent chain from `from_descendant`
/// (exclusive) down to `to_ancestor` (exclusive), yielding the chain blocks between them
pub fn default_chain_path_iterator<'a, T: ReachabilityStoreReader + ?Sized>(
    store: &'a T,
    from_descendant: Hash,
    to_ancestor: Hash,
) -> impl Iterator<Item = Result<Hash>> + 'a {
    let mut current = Some(from_descendant);
    std::iter::from_fn(move || {
        let block = current?;
        match store.get_parent(block) {
            Ok(parent) => {
                if parent == to_ancestor || parent == ORIGIN {
                    current = None;
                } else {
                    current = Some(parent);
                }
                current.map(Ok)
            }
            Err(e) => {
                current = None;
                Some(Err(ReachabilityError::StoreError(e)))
            }
        }
    })
}

enum SearchOutput {
    NotFound(usize), // `usize` is the position to insert at
    Found(Hash, usize),
}

/// Binary searches an interval-ordered list of hashes for a chain ancestor of
/// the block owning `target_interval`
fn binary_search_descendant(
    store: &(impl ReachabilityStoreReader + ?Sized),
    ordered_hashes: &[Hash],
    target_interval: Interval,
) -> Result<SearchOutput> {
    // `point` is the number of entries starting at or before the target
    let point = binary_search_start_point(store, ordered_hashes, target_interval.start)?;
    if point == 0 {
        return Ok(SearchOutput::NotFound(0));
    }
    let candidate = ordered_hashes[point - 1];
    if store.get_interval(candidate)?.contains(target_interval) {
        Ok(SearchOutput::Found(candidate, point - 1))
    } else {
        Ok(SearchOutput::NotFound(point))
    }
}

fn binary_search_start_point(
    store: &(impl ReachabilityStoreReader + ?Sized),
    ordered_hashes: &[Hash],
    target_start: u64,
) -> Result<usize> {
    let mut low = 0usize;
    let mut high = ordered_hashes.len();
    while low < high {
        let mid = (low + high) / 2;
        if store.get_interval(ordered_hashes[mid])?.start <= target_start {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    Ok(low)
}

fn insert_to_future_covering_set(store: &mut (impl ReachabilityStore + ?Sized), block: Hash, fci: Hash) -> Result<()> {
    let fci_interval = store.get_interval(fci)?;
    let fcs = store.get_future_covering_set(block)?;
    match binary_search_descendant(store, &fcs, fci_interval)? {
        // An existing entry already covers the new block's chain, nothing to do
        SearchOutput::Found(_, _) => Ok(()),
        SearchOutput::NotFound(insertion_index) => {
            store.insert_future_covering_item(block, fci, insertion_index)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::{BruteForceAncestryExtensions, DagBlock, DagBuilder, StoreValidationExtensions, TreeBuilder};
    use super::*;
    use crate::model::stores::{reachability::MemoryReachabilityStore, relations::MemoryRelationsStore};

    #[test]
    fn test_add_tree_blocks() {
        // Arrange
        let mut store = MemoryReachabilityStore::new();

        // Act
        let root: Hash = 1.into();
        TreeBuilder::new(&mut store)
            .init_with_params(root, Interval::new(1, 15))
            .add_block(2.into(), root)
            .add_block(3.into(), 2.into())
            .add_block(4.into(), 2.into())
            .add_block(5.into(), 3.into())
            .add_block(6.into(), 5.into())
            .add_block(7.into(), 1.into())
            .add_block(8.into(), 6.into())
            .add_block(9.into(), 6.into())
            .add_block(10.into(), 6.into())
            .add_block(11.into(), 6.into());

        // Assert
        store.validate_intervals(root).unwrap();
    }

    #[test]
    fn test_add_early_blocks() {
        // Arrange: trigger reindexing by exhausting a tiny root capacity
        let mut store = MemoryReachabilityStore::new();

        // Act
        let root: Hash = 1.into();
        let mut builder = TreeBuilder::new(&mut store);
        builder.init_with_params(root, Interval::maximal());
        for i in 2u64..100 {
            builder.add_block(i.into(), (i / 2).into());
        }

        // The dense tree must have caused at least one interval reindex by now
        builder.add_block(100.into(), 2.into());
        store.validate_intervals(root).unwrap();
    }

    #[test]
    fn test_reachability_queries_vs_bfs() {
        // Arrange
        let mut reachability = MemoryReachabilityStore::new();
        let mut relations = MemoryRelationsStore::new();

        // A DAG forming a couple of forks and merges
        let genesis: Hash = 1.into();
        let blocks = vec![
            DagBlock::new(2.into(), vec![1.into()]),
            DagBlock::new(3.into(), vec![1.into()]),
            DagBlock::new(4.into(), vec![2.into(), 3.into()]),
            DagBlock::new(5.into(), vec![4.into()]),
            DagBlock::new(6.into(), vec![1.into()]),
            DagBlock::new(7.into(), vec![5.into(), 6.into()]),
            DagBlock::new(8.into(), vec![1.into()]),
            DagBlock::new(9.into(), vec![1.into()]),
            DagBlock::new(10.into(), vec![7.into(), 8.into(), 9.into()]),
            DagBlock::new(11.into(), vec![1.into()]),
            DagBlock::new(12.into(), vec![11.into(), 10.into()]),
        ];

        // Act
        let mut builder = DagBuilder::new(&mut reachability, &mut relations);
        builder.init();
        builder.add_block(DagBlock::new(genesis, vec![ORIGIN]));
        for block in blocks.iter().cloned() {
            builder.add_block(block);
        }

        // Assert: compare the reachability oracle against brute-force BFS over
        // parent pointers for all pairs
        let all_hashes: Vec<Hash> = std::iter::once(genesis).chain(blocks.iter().map(|b| b.hash)).collect();
        for &this in all_hashes.iter() {
            for &queried in all_hashes.iter() {
                let oracle = is_dag_ancestor_of(&reachability, this, queried).unwrap();
                let brute_force = relations.bfs_is_ancestor(this, queried);
                assert_eq!(oracle, brute_force, "oracle disagrees with BFS for ({this}, {queried})");
            }
        }

        store_validate(&reachability);
    }

    fn store_validate(store: &MemoryReachabilityStore) {
        store.validate_intervals(ORIGIN).unwrap();
    }

    #[test]
    fn test_chain_path_queries() {
        let mut store = MemoryReachabilityStore::new();
        let root: Hash = 1.into();
        TreeBuilder::new(&mut store)
            .init_with_params(root, Interval::maximal())
            .add_block(2.into(), 1.into())
            .add_block(3.into(), 2.into())
            .add_block(4.into(), 3.into())
            .add_block(5.into(), 3.into());

        assert!(is_chain_ancestor_of(&store, 2.into(), 4.into()).unwrap());
        assert!(is_chain_ancestor_of(&store, 4.into(), 4.into()).unwrap());
        assert!(!is_strict_chain_ancestor_of(&store, 4.into(), 4.into()).unwrap());
        assert!(!is_chain_ancestor_of(&store, 4.into(), 5.into()).unwrap());

        // The next chain ancestor from 1 towards 5 is 2
        assert_eq!(get_next_chain_ancestor(&store, 5.into(), 1.into()).unwrap(), Hash::from(2u64));
        assert_eq!(get_next_chain_ancestor(&store, 5.into(), 3.into()).unwrap(), Hash::from(5u64));
        assert!(get_next_chain_ancestor(&store, 5.into(), 4.into()).is_err());
    }
}
