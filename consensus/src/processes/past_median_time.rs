use crate::model::stores::{ghostdag::GhostdagStoreReader, headers::HeaderStoreReader};
use kaspad_hashes::Hash;
use std::sync::Arc;

/// Computes the median timestamp of the last `window_size` selected-chain
/// blocks, used for contextual timestamp validation
#[derive(Clone)]
pub struct PastMedianTimeManager<T: HeaderStoreReader, U: GhostdagStoreReader> {
    headers_store: Arc<T>,
    ghostdag_store: Arc<U>,
    genesis_hash: Hash,
    window_size: usize,
}

impl<T: HeaderStoreReader, U: GhostdagStoreReader> PastMedianTimeManager<T, U> {
    pub fn new(headers_store: Arc<T>, ghostdag_store: Arc<U>, genesis_hash: Hash, window_size: usize) -> Self {
        Self { headers_store, ghostdag_store, genesis_hash, window_size }
    }

    /// Returns the past median time as seen from the block whose selected
    /// parent is the given block
    pub fn calc_past_median_time(&self, selected_parent: Hash) -> u64 {
        let mut timestamps = Vec::with_capacity(self.window_size);
        let mut current = selected_parent;
        loop {
            timestamps.push(self.headers_store.get_timestamp(current).expect("chain blocks must have known headers"));
            if timestamps.len() == self.window_size || current == self.genesis_hash {
                break;
            }
            current = self.ghostdag_store.get_selected_parent(current).expect("chain blocks must have ghostdag data");
        }
        timestamps.sort_unstable();
        timestamps[timestamps.len() / 2]
    }
}
