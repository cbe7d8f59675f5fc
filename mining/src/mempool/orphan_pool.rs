use super::config::MempoolConfig;
use kaspad_consensus_core::tx::{MutableTransaction, TransactionId};
use kaspad_mining_errors::mempool::{RuleError, RuleResult};
use std::collections::HashMap;
use std::sync::Arc;

struct OrphanEntry {
    mtx: MutableTransaction,
    added_at_blue_score: u64,
}

/// Holds transactions whose inputs reference unknown outpoints, waiting for
/// the missing parents to show up (in the mempool or in a block)
pub struct OrphanPool {
    config: Arc<MempoolConfig>,
    orphans: HashMap<TransactionId, OrphanEntry>,
    current_blue_score: u64,
}

impl OrphanPool {
    pub fn new(config: Arc<MempoolConfig>) -> Self {
        Self { config, orphans: HashMap::new(), current_blue_score: 0 }
    }

    pub fn len(&self) -> usize {
        self.orphans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orphans.is_empty()
    }

    pub fn has(&self, transaction_id: &TransactionId) -> bool {
        self.orphans.contains_key(transaction_id)
    }

    pub fn set_current_blue_score(&mut self, blue_score: u64) {
        self.current_blue_score = blue_score;
    }

    pub fn insert(&mut self, mtx: MutableTransaction) -> RuleResult<()> {
        if self.orphans.len() as u64 >= self.config.maximum_orphan_transaction_count {
            return Err(RuleError::RejectOrphanPoolIsFull(self.config.maximum_orphan_transaction_count));
        }
        let id = mtx.id();
        self.orphans.insert(id, OrphanEntry { mtx, added_at_blue_score: self.current_blue_score });
        Ok(())
    }

    pub fn remove(&mut self, transaction_id: &TransactionId) -> Option<MutableTransaction> {
        self.orphans.remove(transaction_id).map(|entry| entry.mtx)
    }

    /// Extracts all orphans with at least one input referencing the given
    /// redeeming transaction
    pub fn take_redeemable(&mut self, parent_id: &TransactionId) -> Vec<MutableTransaction> {
        let ids: Vec<TransactionId> = self
            .orphans
            .iter()
            .filter(|(_, entry)| entry.mtx.has_parent(*parent_id))
            .map(|(id, _)| *id)
            .collect();
        ids.into_iter().filter_map(|id| self.remove(&id)).collect()
    }

    /// Drops orphans which overstayed the configured interval
    pub fn expire(&mut self, virtual_blue_score: u64, expire_interval: u64) {
        self.orphans.retain(|_, entry| virtual_blue_score <= entry.added_at_blue_score + expire_interval);
    }
}
