use crate::model::stores::{ghostdag::GhostdagStoreReader, headers::HeaderStoreReader};
use kaspad_consensus_core::BlueWorkType;
use kaspad_hashes::Hash;
use kaspad_math::{Uint256, Uint320};
use std::cmp::max;
use std::sync::Arc;

/// Work is defined as the expected number of hash attempts the target
/// requires, i.e. 2^256 / (target + 1)
pub fn calc_work(bits: u32) -> BlueWorkType {
    let target = Uint256::from_compact_target_bits(bits);
    // We need to compute 2**256 / (target+1), but we can't represent 2**256
    // as it's too large for Uint256. However, as 2**256 is at least as large
    // as target+1, it is equal to ((2**256 - target - 1) / (target+1)) + 1,
    // or ~target / (target+1) + 1.
    let res = (!target / (target + Uint256::from_u64(1))) + Uint256::from_u64(1);
    res.try_into().expect("work should not exceed 2**192")
}

/// Computes the expected difficulty of a block from the timestamps of the
/// `difficulty_adjustment_window_size` blocks preceding it on its selected
/// chain. Until a full window exists the difficulty stays at the genesis bits.
#[derive(Clone)]
pub struct DifficultyManager<T: HeaderStoreReader, U: GhostdagStoreReader> {
    headers_store: Arc<T>,
    ghostdag_store: Arc<U>,
    genesis_hash: Hash,
    genesis_bits: u32,
    max_difficulty_target: Uint320,
    difficulty_adjustment_window_size: usize,
    target_time_per_block: u64,
}

struct DifficultyBlock {
    timestamp: u64,
    bits: u32,
}

impl<T: HeaderStoreReader, U: GhostdagStoreReader> DifficultyManager<T, U> {
    pub fn new(
        headers_store: Arc<T>,
        ghostdag_store: Arc<U>,
        genesis_hash: Hash,
        genesis_bits: u32,
        max_difficulty_target: Uint256,
        difficulty_adjustment_window_size: usize,
        target_time_per_block: u64,
    ) -> Self {
        Self {
            headers_store,
            ghostdag_store,
            genesis_hash,
            genesis_bits,
            max_difficulty_target: max_difficulty_target.into(),
            difficulty_adjustment_window_size,
            target_time_per_block,
        }
    }

    /// Collects the difficulty window: up to `window_size` blocks walking the
    /// selected-parent chain from `selected_parent` downwards (inclusive)
    fn difficulty_window(&self, selected_parent: Hash) -> Vec<DifficultyBlock> {
        let mut window = Vec::with_capacity(self.difficulty_adjustment_window_size);
        let mut current = selected_parent;
        loop {
            let data = self.headers_store.get_compact_header_data(current).expect("chain blocks must have known headers");
            window.push(DifficultyBlock { timestamp: data.timestamp, bits: data.bits });
            if window.len() == self.difficulty_adjustment_window_size || current == self.genesis_hash {
                break;
            }
            current = self.ghostdag_store.get_selected_parent(current).expect("chain blocks must have ghostdag data");
        }
        window
    }

    /// Returns the difficulty bits required from a block whose selected
    /// parent is the given block
    pub fn calculate_difficulty_bits(&self, selected_parent: Hash) -> u32 {
        let mut window = self.difficulty_window(selected_parent);

        // Until there are enough blocks for a valid calculation the difficulty
        // remains at its genesis value
        if window.len() < self.difficulty_adjustment_window_size {
            return self.genesis_bits;
        }

        let (min_ts_index, _) = window
            .iter()
            .enumerate()
            .min_by_key(|(_, block)| block.timestamp)
            .expect("the window was verified to be non-empty");
        let min_ts = window[min_ts_index].timestamp;
        let max_ts = window.iter().map(|block| block.timestamp).max().expect("the window was verified to be non-empty");

        // We remove the minimal-timestamp block so the average covers the
        // internal window only
        window.swap_remove(min_ts_index);

        // Uint320 avoids overflow when summing and multiplying 256-bit targets
        let difficulty_blocks_len = window.len() as u64;
        let targets_sum: Uint320 =
            window.into_iter().map(|block| Uint320::from(Uint256::from_compact_target_bits(block.bits))).sum();
        let average_target = targets_sum / difficulty_blocks_len;
        let measured_duration = max(max_ts - min_ts, 1);
        let expected_duration = self.target_time_per_block * difficulty_blocks_len;
        let new_target = average_target * measured_duration / expected_duration;

        Uint256::try_from(new_target.min(self.max_difficulty_target)).expect("max target < Uint256::MAX").compact_target_bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calc_work_monotonic() {
        // A harder (smaller) target must represent more work
        let easy = calc_work(0x207fffff);
        let hard = calc_work(0x1e7fffff);
        assert!(hard > easy);
        assert!(easy > BlueWorkType::from_u64(0));
    }
}
