pub mod config;
mod orphan_pool;
mod transactions_pool;

pub use orphan_pool::OrphanPool;
pub use transactions_pool::{MempoolTransaction, TransactionsPool};

use self::config::MempoolConfig;
use kaspad_consensus::consensus::Consensus;
use kaspad_consensus_core::{
    constants::UNACCEPTED_BLUE_SCORE,
    tx::{MutableTransaction, Transaction, TransactionId, UtxoEntry},
};
use kaspad_mining_errors::mempool::{RuleError, RuleResult};
use log::debug;
use std::sync::Arc;

/// The transaction memory pool: admitted transactions awaiting block
/// inclusion (`transactions_pool`) and transactions with missing inputs
/// (`orphan_pool`)
pub struct Mempool {
    config: Arc<MempoolConfig>,
    transactions_pool: TransactionsPool,
    orphan_pool: OrphanPool,
}

impl Mempool {
    pub fn new(config: Arc<MempoolConfig>) -> Self {
        Self {
            transactions_pool: TransactionsPool::new(config.clone()),
            orphan_pool: OrphanPool::new(config.clone()),
            config,
        }
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions_pool.len()
    }

    pub fn orphan_count(&self) -> usize {
        self.orphan_pool.len()
    }

    pub fn get_transaction(&self, transaction_id: &TransactionId) -> Option<Arc<Transaction>> {
        self.transactions_pool.get(transaction_id).map(|mempool_tx| mempool_tx.mtx.tx.clone())
    }

    pub fn has_transaction(&self, transaction_id: &TransactionId) -> bool {
        self.transactions_pool.has(transaction_id) || self.orphan_pool.has(transaction_id)
    }

    pub fn get_all_transaction_ids(&self) -> Vec<TransactionId> {
        self.transactions_pool.all_ids()
    }

    pub fn get_all_transactions(&self) -> Vec<Arc<Transaction>> {
        self.transactions_pool.all_transactions()
    }

    /// Main admission flow. On success returns the IDs of all transactions
    /// accepted into the pool, which includes previously orphaned
    /// transactions redeemed by this one.
    pub fn validate_and_insert_transaction(
        &mut self,
        consensus: &Consensus,
        transaction: Transaction,
        allow_orphans: bool,
    ) -> RuleResult<Vec<Arc<Transaction>>> {
        let transaction_id = transaction.id();

        if transaction.is_coinbase() {
            return Err(RuleError::RejectCoinbase(transaction_id));
        }
        if self.has_transaction(&transaction_id) {
            return Err(RuleError::RejectDuplicate(transaction_id));
        }
        if !self.config.accept_non_standard {
            self.check_transaction_standard(&transaction)?;
        }

        // An outpoint already spent by another mempool transaction is a double spend
        for input in transaction.inputs.iter() {
            if let Some(spending_id) = self.transactions_pool.spending_transaction(&input.previous_outpoint) {
                return Err(RuleError::RejectDoubleSpendInMempool(input.previous_outpoint, spending_id));
            }
        }

        let mut mutable_tx = MutableTransaction::from_tx(transaction);
        // Fill inputs referencing other mempool transactions before consulting
        // the virtual UTXO set
        self.populate_mempool_entries(&mut mutable_tx);

        match consensus.validate_mempool_transaction(&mut mutable_tx) {
            Ok(()) => {}
            Err(kaspad_consensus_core::errors::tx::TxRuleError::MissingTxOutpoints) => {
                return self.insert_orphan(mutable_tx, allow_orphans).map(|_| Vec::new());
            }
            Err(err) => return Err(err.into()),
        }

        self.check_fee_policy(&mutable_tx)?;

        let accepted = self.transactions_pool.insert(MempoolTransaction::new(mutable_tx))?;
        debug!("Accepted transaction {transaction_id} into the mempool");

        // The new transaction may redeem orphans waiting on its outputs
        let mut all_accepted = vec![accepted];
        all_accepted.extend(self.process_orphans_after_accepted(consensus, transaction_id)?);
        Ok(all_accepted)
    }

    /// Standardness policy: every output must pay to a recognized script form
    fn check_transaction_standard(&self, transaction: &Transaction) -> RuleResult<()> {
        for output in transaction.outputs.iter() {
            if kaspad_txscript::classify_script(output.script_public_key.script()) == kaspad_txscript::ScriptClass::NonStandard {
                return Err(RuleError::RejectNonStandard(transaction.id()));
            }
        }
        Ok(())
    }

    fn check_fee_policy(&self, mutable_tx: &MutableTransaction) -> RuleResult<()> {
        let mass = mutable_tx.calculated_mass.expect("mass is calculated during contextual validation");
        let fee = mutable_tx.calculated_fee.expect("fee is calculated during contextual validation");
        if mass > self.config.maximum_transaction_mass {
            return Err(RuleError::RejectMassTooHigh(mutable_tx.id(), mass, self.config.maximum_transaction_mass));
        }
        // Integer fee-rate floor keeps the policy deterministic
        let fee_rate = fee * 1000 / mass;
        if fee_rate < self.config.minimum_relay_transaction_fee {
            return Err(RuleError::RejectInsufficientFee(mutable_tx.id(), fee_rate, self.config.minimum_relay_transaction_fee));
        }
        Ok(())
    }

    /// Populates inputs spending outputs of other mempool transactions with
    /// synthetic unaccepted entries
    fn populate_mempool_entries(&self, mutable_tx: &mut MutableTransaction) {
        for (i, input) in mutable_tx.tx.inputs.iter().enumerate() {
            if mutable_tx.entries[i].is_some() {
                continue;
            }
            if let Some(parent) = self.transactions_pool.get(&input.previous_outpoint.transaction_id) {
                if let Some(output) = parent.mtx.tx.outputs.get(input.previous_outpoint.index as usize) {
                    mutable_tx.entries[i] =
                        Some(UtxoEntry::new(output.value, output.script_public_key.clone(), UNACCEPTED_BLUE_SCORE, false));
                }
            }
        }
    }

    fn insert_orphan(&mut self, mutable_tx: MutableTransaction, allow_orphans: bool) -> RuleResult<()> {
        if !allow_orphans {
            return Err(RuleError::RejectDisallowedOrphan(mutable_tx.id()));
        }
        self.orphan_pool.insert(mutable_tx)
    }

    /// Attempts to move orphans whose dependencies were satisfied by the newly
    /// accepted transaction into the transactions pool
    fn process_orphans_after_accepted(
        &mut self,
        consensus: &Consensus,
        accepted_id: TransactionId,
    ) -> RuleResult<Vec<Arc<Transaction>>> {
        let mut accepted = Vec::new();
        let mut queue = vec![accepted_id];
        while let Some(parent_id) = queue.pop() {
            for orphan in self.orphan_pool.take_redeemable(&parent_id) {
                let orphan_id = orphan.id();
                let mut mutable_tx = orphan;
                mutable_tx.clear_entries();
                self.populate_mempool_entries(&mut mutable_tx);
                match consensus.validate_mempool_transaction(&mut mutable_tx) {
                    Ok(()) => {
                        if self.check_fee_policy(&mutable_tx).is_ok() {
                            if let Ok(tx) = self.transactions_pool.insert(MempoolTransaction::new(mutable_tx)) {
                                debug!("Orphan transaction {orphan_id} graduated into the mempool");
                                accepted.push(tx);
                                queue.push(orphan_id);
                            }
                        }
                    }
                    Err(kaspad_consensus_core::errors::tx::TxRuleError::MissingTxOutpoints) => {
                        // Still an orphan; put it back
                        let _ = self.orphan_pool.insert(mutable_tx);
                    }
                    Err(_) => {
                        debug!("Orphan transaction {orphan_id} became invalid and was dropped");
                    }
                }
            }
        }
        Ok(accepted)
    }

    /// Called when a new block is accepted: removes included transactions and
    /// any mempool double spends of the block's inputs
    pub fn handle_new_block_transactions(&mut self, block_txs: &[Transaction]) -> Vec<Arc<Transaction>> {
        let mut removed = Vec::new();
        for tx in block_txs.iter().skip(1) {
            let tx_id = tx.id();
            if let Some(mempool_tx) = self.transactions_pool.remove(&tx_id) {
                removed.push(mempool_tx.mtx.tx);
            }
            self.orphan_pool.remove(&tx_id);
            // Evict mempool transactions double spending the block's inputs
            for input in tx.inputs.iter() {
                if let Some(spending_id) = self.transactions_pool.spending_transaction(&input.previous_outpoint) {
                    if let Some(conflict) = self.transactions_pool.remove(&spending_id) {
                        debug!("Removed mempool transaction {spending_id} double spending a block input");
                        removed.push(conflict.mtx.tx);
                    }
                }
            }
        }
        removed
    }

    /// Revalidates the whole pool against the (possibly reorged) virtual
    /// state, returning the evicted transactions. Transactions whose inputs
    /// disappeared are demoted to orphans.
    pub fn revalidate_pool(&mut self, consensus: &Consensus) -> Vec<Arc<Transaction>> {
        let mut evicted = Vec::new();
        let ids = self.transactions_pool.all_ids();
        for id in ids {
            let Some(mempool_tx) = self.transactions_pool.remove(&id) else { continue };
            let mut mutable_tx = mempool_tx.mtx;
            mutable_tx.clear_entries();
            self.populate_mempool_entries(&mut mutable_tx);
            match consensus.validate_mempool_transaction(&mut mutable_tx) {
                Ok(()) => {
                    let _ = self.transactions_pool.insert(MempoolTransaction::new(mutable_tx));
                }
                Err(kaspad_consensus_core::errors::tx::TxRuleError::MissingTxOutpoints) => {
                    let tx = mutable_tx.tx.clone();
                    if self.orphan_pool.insert(mutable_tx).is_err() {
                        evicted.push(tx);
                    }
                }
                Err(_) => {
                    debug!("Mempool transaction {id} became invalid after a virtual change and was evicted");
                    evicted.push(mutable_tx.tx);
                }
            }
        }
        evicted
    }

    /// Evicts transactions which stayed in the pool over the configured
    /// expiration period, measured in virtual blue score units
    pub fn expire_old_transactions(&mut self, virtual_blue_score: u64) -> Vec<Arc<Transaction>> {
        let expired =
            self.transactions_pool.collect_expired(virtual_blue_score, self.config.transaction_expire_blue_score_interval);
        let mut removed = Vec::new();
        for id in expired {
            if let Some(mempool_tx) = self.transactions_pool.remove(&id) {
                removed.push(mempool_tx.mtx.tx);
            }
        }
        self.orphan_pool.expire(virtual_blue_score, self.config.orphan_expire_blue_score_interval);
        removed
    }

    /// Returns candidate transactions for a block template, ordered by
    /// fee rate (fee per mass gram) from highest to lowest
    pub fn block_candidate_transactions(&self) -> Vec<MempoolTransaction> {
        self.transactions_pool.candidates_by_fee_rate()
    }

    pub fn record_insertion_score(&mut self, virtual_blue_score: u64) {
        self.transactions_pool.set_current_blue_score(virtual_blue_score);
        self.orphan_pool.set_current_blue_score(virtual_blue_score);
    }
}
