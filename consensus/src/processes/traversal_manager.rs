use crate::model::{
    services::reachability::MTReachabilityService,
    stores::{ghostdag::GhostdagStoreReader, relations::RelationsStoreReader},
};
use kaspad_consensus_core::BlockHashSet;
use kaspad_hashes::Hash;
use std::collections::VecDeque;
use std::sync::Arc;

use super::ghostdag::ordering::SortableBlock;

/// DAG traversal queries serving the sync (IBD) protocol: block locators and
/// ordered hash ranges
#[derive(Clone)]
pub struct DagTraversalManager<T: GhostdagStoreReader, S: RelationsStoreReader> {
    genesis_hash: Hash,
    ghostdag_store: Arc<T>,
    relations_store: Arc<S>,
    reachability_service: MTReachabilityService,
}

impl<T: GhostdagStoreReader, S: RelationsStoreReader> DagTraversalManager<T, S> {
    pub fn new(
        genesis_hash: Hash,
        ghostdag_store: Arc<T>,
        relations_store: Arc<S>,
        reachability_service: MTReachabilityService,
    ) -> Self {
        Self { genesis_hash, ghostdag_store, relations_store, reachability_service }
    }

    /// Creates a block locator: exponentially spaced hashes walking the
    /// selected-parent chain from `high` down to genesis. The spacing doubles
    /// after each of the first few steps so that the locator length is
    /// logarithmic in the chain length.
    pub fn create_block_locator(&self, high: Hash) -> Vec<Hash> {
        let mut locator = Vec::new();
        let mut current = high;
        let mut step = 1u64;
        loop {
            locator.push(current);
            if current == self.genesis_hash {
                break;
            }
            // Walk `step` blocks down the selected chain, clamping at genesis
            for _ in 0..step {
                if current == self.genesis_hash {
                    break;
                }
                current = self.ghostdag_store.get_selected_parent(current).expect("chain blocks must have ghostdag data");
            }
            if locator.len() > 10 {
                step *= 2;
            }
        }
        locator
    }

    /// Returns all blocks in the future of `low` and the past of `high`
    /// (both exclusive of `low`, inclusive of `high`), in topological order,
    /// bounded by `max_blocks`
    pub fn get_hashes_between(&self, low: Hash, high: Hash, max_blocks: usize) -> Vec<Hash> {
        let mut collected = Vec::new();
        let mut visited = BlockHashSet::new();
        let mut queue = VecDeque::from([low]);
        visited.insert(low);

        while let Some(current) = queue.pop_front() {
            let children = match self.relations_store.get_children(current) {
                Ok(children) => children,
                Err(_) => continue,
            };
            for child in children.iter().copied() {
                if !visited.insert(child) {
                    continue;
                }
                // Bound the traversal to the past cone of `high`
                if child != high && !self.reachability_service.is_dag_ancestor_of(child, high).unwrap_or(false) {
                    continue;
                }
                collected.push(SortableBlock {
                    hash: child,
                    blue_work: self.ghostdag_store.get_blue_work(child).expect("traversed blocks must have ghostdag data"),
                });
                queue.push_back(child);
            }
        }

        // Blue work order is topologically consistent
        collected.sort();
        collected.into_iter().take(max_blocks).map(|block| block.hash).collect()
    }
}
