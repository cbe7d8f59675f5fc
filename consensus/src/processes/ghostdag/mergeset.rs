use crate::model::services::reachability::MTReachabilityService;
use crate::model::stores::relations::RelationsStoreReader;
use kaspad_consensus_core::BlockHashSet;
use kaspad_hashes::Hash;
use std::collections::VecDeque;

/// Computes the merge set of a block with the given parents, excluding the
/// selected parent: all blocks in the past of the block which are not in the
/// past of the selected parent. The search walks backwards from the
/// non-selected parents, bounding itself by reachability queries.
pub fn unordered_mergeset_without_selected_parent(
    relations: &impl RelationsStoreReader,
    reachability: &MTReachabilityService,
    selected_parent: Hash,
    parents: &[Hash],
) -> BlockHashSet {
    let mut queue: VecDeque<Hash> = parents.iter().copied().filter(|p| *p != selected_parent).collect();
    let mut mergeset: BlockHashSet = queue.iter().copied().collect();
    let mut selected_parent_past = BlockHashSet::new();

    while let Some(current) = queue.pop_front() {
        let current_parents = relations.get_parents(current).expect("block in mergeset must have known relations");

        // For each parent of the current block we check whether it is in the
        // past of the selected parent. If not, we add it to the resulting
        // merge-set and queue it for further processing.
        for parent in current_parents.iter().copied() {
            if mergeset.contains(&parent) || selected_parent_past.contains(&parent) {
                continue;
            }

            if reachability.is_dag_ancestor_of(parent, selected_parent).expect("reachability covers all known blocks") {
                selected_parent_past.insert(parent);
                continue;
            }

            mergeset.insert(parent);
            queue.push_back(parent);
        }
    }

    mergeset
}
