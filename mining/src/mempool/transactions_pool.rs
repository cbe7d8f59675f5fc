use super::config::MempoolConfig;
use kaspad_consensus_core::tx::{MutableTransaction, Transaction, TransactionId, TransactionOutpoint};
use kaspad_mining_errors::mempool::{RuleError, RuleResult};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// A transaction placed in the mempool along with insertion metadata
#[derive(Clone)]
pub struct MempoolTransaction {
    pub mtx: MutableTransaction,
    pub added_at_blue_score: u64,
}

impl MempoolTransaction {
    pub fn new(mtx: MutableTransaction) -> Self {
        Self { mtx, added_at_blue_score: 0 }
    }

    pub fn id(&self) -> TransactionId {
        self.mtx.id()
    }

    pub fn fee_rate(&self) -> f64 {
        self.mtx.calculated_feerate().unwrap_or(0.0)
    }
}

/// The primary pool: transactions whose inputs are all available either in
/// the virtual UTXO set or as outputs of other pool members
pub struct TransactionsPool {
    config: Arc<MempoolConfig>,
    all_transactions: HashMap<TransactionId, MempoolTransaction>,
    /// Maps an outpoint to the pool transaction spending it
    outpoint_index: HashMap<TransactionOutpoint, TransactionId>,
    /// Maps a transaction to the set of pool transactions depending on it
    depends: HashMap<TransactionId, HashSet<TransactionId>>,
    current_blue_score: u64,
}

impl TransactionsPool {
    pub fn new(config: Arc<MempoolConfig>) -> Self {
        Self {
            config,
            all_transactions: HashMap::new(),
            outpoint_index: HashMap::new(),
            depends: HashMap::new(),
            current_blue_score: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.all_transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all_transactions.is_empty()
    }

    pub fn has(&self, transaction_id: &TransactionId) -> bool {
        self.all_transactions.contains_key(transaction_id)
    }

    pub fn get(&self, transaction_id: &TransactionId) -> Option<&MempoolTransaction> {
        self.all_transactions.get(transaction_id)
    }

    pub fn all_ids(&self) -> Vec<TransactionId> {
        self.all_transactions.keys().copied().collect()
    }

    pub fn all_transactions(&self) -> Vec<Arc<Transaction>> {
        self.all_transactions.values().map(|mempool_tx| mempool_tx.mtx.tx.clone()).collect()
    }

    pub fn set_current_blue_score(&mut self, blue_score: u64) {
        self.current_blue_score = blue_score;
    }

    /// Returns the pool transaction spending the given outpoint, if any
    pub fn spending_transaction(&self, outpoint: &TransactionOutpoint) -> Option<TransactionId> {
        self.outpoint_index.get(outpoint).copied()
    }

    pub fn insert(&mut self, mut mempool_tx: MempoolTransaction) -> RuleResult<Arc<Transaction>> {
        let transaction_id = mempool_tx.id();
        if self.has(&transaction_id) {
            return Err(RuleError::RejectDuplicate(transaction_id));
        }
        mempool_tx.added_at_blue_score = self.current_blue_score;

        for input in mempool_tx.mtx.tx.inputs.iter() {
            self.outpoint_index.insert(input.previous_outpoint, transaction_id);
            // Track dependencies on other pool members
            let parent_id = input.previous_outpoint.transaction_id;
            if self.all_transactions.contains_key(&parent_id) {
                self.depends.entry(parent_id).or_default().insert(transaction_id);
            }
        }

        let tx = mempool_tx.mtx.tx.clone();
        self.all_transactions.insert(transaction_id, mempool_tx);
        Ok(tx)
    }

    pub fn remove(&mut self, transaction_id: &TransactionId) -> Option<MempoolTransaction> {
        let mempool_tx = self.all_transactions.remove(transaction_id)?;
        for input in mempool_tx.mtx.tx.inputs.iter() {
            self.outpoint_index.remove(&input.previous_outpoint);
            if let Some(dependents) = self.depends.get_mut(&input.previous_outpoint.transaction_id) {
                dependents.remove(transaction_id);
            }
        }
        self.depends.remove(transaction_id);
        Some(mempool_tx)
    }

    /// IDs of pool transactions which directly depend on the given transaction
    pub fn direct_dependents(&self, transaction_id: &TransactionId) -> Vec<TransactionId> {
        self.depends.get(transaction_id).map(|set| set.iter().copied().collect()).unwrap_or_default()
    }

    pub fn collect_expired(&self, virtual_blue_score: u64, expire_interval: u64) -> Vec<TransactionId> {
        self.all_transactions
            .values()
            .filter(|mempool_tx| virtual_blue_score > mempool_tx.added_at_blue_score + expire_interval)
            .map(|mempool_tx| mempool_tx.id())
            .collect()
    }

    /// Returns all pool transactions ordered by fee rate, highest first
    pub fn candidates_by_fee_rate(&self) -> Vec<MempoolTransaction> {
        let mut candidates: Vec<MempoolTransaction> = self.all_transactions.values().cloned().collect();
        candidates.sort_by(|a, b| b.fee_rate().partial_cmp(&a.fee_rate()).expect("fee rates are finite"));
        candidates
    }

    /// True if every input of the given member is satisfied either by the
    /// virtual UTXO set or a member of `selected`
    pub fn is_topologically_ready(&self, mempool_tx: &MempoolTransaction, selected: &HashSet<TransactionId>) -> bool {
        mempool_tx.mtx.tx.inputs.iter().all(|input| {
            let parent = input.previous_outpoint.transaction_id;
            !self.all_transactions.contains_key(&parent) || selected.contains(&parent)
        })
    }
}
