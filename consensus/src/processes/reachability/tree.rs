//!
//! Tree-related functions internal to the module
//!
use super::{extensions::ReachabilityStoreIntervalExtensions, reindex::ReindexOperationContext, Result};
use crate::model::stores::reachability::ReachabilityStore;
use kaspad_hashes::Hash;

/// Adds `new_block` as a child of `parent` within the selected-parent tree,
/// allocating it half of the remaining interval capacity. When capacity is
/// exhausted a reindex operation widens the enclosing subtree.
pub fn add_tree_block(store: &mut (impl ReachabilityStore + ?Sized), new_block: Hash, parent: Hash) -> Result<()> {
    // Get the remaining interval capacity
    let remaining = store.interval_remaining_after(parent)?;
    // Append the new child to `parent.children`
    let parent_height = store.append_child(parent, new_block)?;
    if remaining.is_empty() {
        // Init with the empty interval.
        // Note: internal logic relies on interval being this specific interval
        //       which comes exactly at the end of current capacity
        store.insert(new_block, parent, remaining, parent_height + 1)?;

        let mut ctx = ReindexOperationContext::new(store);
        ctx.reindex_intervals(new_block)?;
    } else {
        let allocated = remaining.split_half().0;
        store.insert(new_block, parent, allocated, parent_height + 1)?;
    };
    Ok(())
}
