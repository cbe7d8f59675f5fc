use kaspad_consensus_core::BlueWorkType;
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Sorting of DAG blocks is performed by blue work, with the block hash as a
/// lexicographic tie breaker. Note blue work is monotonic with respect to DAG
/// topology, making this order a valid topological order as well.
#[derive(Eq, Clone, Serialize, Deserialize)]
pub struct SortableBlock {
    pub hash: Hash,
    pub blue_work: BlueWorkType,
}

impl SortableBlock {
    pub fn new(hash: Hash, blue_work: BlueWorkType) -> Self {
        Self { hash, blue_work }
    }
}

impl PartialEq for SortableBlock {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl PartialOrd for SortableBlock {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortableBlock {
    fn cmp(&self, other: &Self) -> Ordering {
        self.blue_work.cmp(&other.blue_work).then_with(|| self.hash.cmp(&other.hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_ties_break_by_hash() {
        let work = BlueWorkType::from_u64(100);
        let a = SortableBlock::new(1.into(), work);
        let b = SortableBlock::new(2.into(), work);
        assert!(a < b);

        let heavier = SortableBlock::new(1.into(), BlueWorkType::from_u64(101));
        assert!(heavier > b);
    }
}
