use crate::{
    block_template::BlockTemplateBuilder,
    mempool::{config::MempoolConfig, Mempool},
};
use kaspad_consensus::consensus::Consensus;
use kaspad_consensus_core::{
    block::Block,
    coinbase::MinerData,
    config::params::Params,
    errors::block::BlockProcessResult,
    tx::{Transaction, TransactionId},
};
use kaspad_mining_errors::mempool::RuleResult;
use parking_lot::RwLock;
use std::sync::Arc;

/// The entry point to the mining domain: owns the mempool behind a lock and
/// drives block template assembly
pub struct MiningManager {
    mempool: RwLock<Mempool>,
    block_template_builder: BlockTemplateBuilder,
}

impl MiningManager {
    pub fn new(params: &Params, config: MempoolConfig) -> Self {
        let config = Arc::new(config);
        Self {
            mempool: RwLock::new(Mempool::new(config)),
            block_template_builder: BlockTemplateBuilder::new(params.max_block_mass, params.max_subnetwork_gas_limit),
        }
    }

    pub fn new_with_defaults(params: &Params) -> Self {
        Self::new(params, MempoolConfig::build_default(params))
    }

    /// Validates the transaction against the current virtual state and admits
    /// it (or orphans it). Returns the accepted transactions, including any
    /// redeemed orphans; an orphaned submission yields an empty list.
    pub fn validate_and_insert_transaction(
        &self,
        consensus: &Consensus,
        transaction: Transaction,
        allow_orphans: bool,
    ) -> RuleResult<Vec<Arc<Transaction>>> {
        self.mempool.write().validate_and_insert_transaction(consensus, transaction, allow_orphans)
    }

    pub fn get_transaction(&self, transaction_id: &TransactionId) -> Option<Arc<Transaction>> {
        self.mempool.read().get_transaction(transaction_id)
    }

    pub fn has_transaction(&self, transaction_id: &TransactionId) -> bool {
        self.mempool.read().has_transaction(transaction_id)
    }

    pub fn get_all_transaction_ids(&self) -> Vec<TransactionId> {
        self.mempool.read().get_all_transaction_ids()
    }

    pub fn get_all_transactions(&self) -> Vec<Arc<Transaction>> {
        self.mempool.read().get_all_transactions()
    }

    pub fn transaction_count(&self) -> usize {
        self.mempool.read().transaction_count()
    }

    pub fn orphan_count(&self) -> usize {
        self.mempool.read().orphan_count()
    }

    /// Builds a block template with the highest-paying ready mempool transactions
    pub fn get_block_template(&self, consensus: &Consensus, miner_data: MinerData) -> BlockProcessResult<Block> {
        let mempool = self.mempool.read();
        self.block_template_builder.build(consensus, &mempool, miner_data)
    }

    /// Handles a newly accepted block: prunes included and conflicting
    /// transactions and re-evaluates the rest of the pool against the new
    /// virtual state. Returns the transactions removed from the pool.
    pub fn handle_new_block_transactions(&self, consensus: &Consensus, block_txs: &[Transaction]) -> Vec<Arc<Transaction>> {
        let mut mempool = self.mempool.write();
        let mut removed = mempool.handle_new_block_transactions(block_txs);
        removed.extend(mempool.revalidate_pool(consensus));
        let virtual_blue_score = consensus.get_virtual_state_snapshot().blue_score();
        mempool.record_insertion_score(virtual_blue_score);
        removed.extend(mempool.expire_old_transactions(virtual_blue_score));
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus::consensus::test_consensus::TestConsensus;
    use kaspad_consensus_core::{
        config::params::SIMNET_PARAMS,
        subnets::SUBNETWORK_ID_NATIVE,
        tx::{ScriptPublicKey, TransactionInput, TransactionOutpoint, TransactionOutput},
    };
    use kaspad_hashes::Hash;
    use kaspad_mining_errors::mempool::RuleError;

    fn spendable_params() -> kaspad_consensus_core::config::params::Params {
        let mut params = SIMNET_PARAMS.clone();
        params.coinbase_maturity = 0;
        params
    }

    /// Mines two blocks so the first block's coinbase is spendable, returning
    /// its outpoint and value
    fn setup_consensus_with_spendable_output(tc: &TestConsensus) -> (TransactionOutpoint, u64) {
        let genesis = tc.genesis_hash();
        let b1 = tc.add_block_with_parents(vec![genesis]).unwrap();
        let _b2 = tc.add_block_with_parents(vec![b1]).unwrap();
        let coinbase_id = tc.consensus.get_block(b1).unwrap().transactions[0].id();
        let outpoint = TransactionOutpoint::new(coinbase_id, 0);
        let entry = tc.consensus.get_virtual_utxo(&outpoint).expect("coinbase must be in the virtual utxo set");
        (outpoint, entry.amount)
    }

    fn spend_tx(outpoint: TransactionOutpoint, value: u64) -> Transaction {
        Transaction::new(
            0,
            vec![TransactionInput::new(outpoint, vec![], 0)],
            // The spent scripts are OpTrue so empty signature scripts suffice;
            // the difference is the fee
            vec![TransactionOutput::new(value, ScriptPublicKey::from_vec(0, vec![0x51]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    }

    #[test]
    fn test_double_spend_rejected() {
        let tc = TestConsensus::new(spendable_params());
        let (outpoint, amount) = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_minimum_relay_fee(0).with_accept_non_standard(true));

        let first = spend_tx(outpoint, amount - 1000);
        let first_id = first.id();
        let accepted = manager.validate_and_insert_transaction(&tc.consensus, first, true).unwrap();
        assert_eq!(accepted.len(), 1);
        assert_eq!(accepted[0].id(), first_id);

        // A second spend of the same outpoint must be rejected as a double spend
        let second = spend_tx(outpoint, amount - 2000);
        let result = manager.validate_and_insert_transaction(&tc.consensus, second, true);
        assert!(matches!(result, Err(RuleError::RejectDoubleSpendInMempool(spent, spender))
            if spent == outpoint && spender == first_id));

        // Only the first transaction made it in
        assert_eq!(manager.transaction_count(), 1);
        assert!(manager.has_transaction(&first_id));
    }

    #[test]
    fn test_block_spending_same_input_evicts_mempool_tx() {
        let tc = TestConsensus::new(spendable_params());
        let (outpoint, amount) = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_minimum_relay_fee(0).with_accept_non_standard(true));

        // T sits in our mempool
        let t = spend_tx(outpoint, amount - 1000);
        let t_id = t.id();
        manager.validate_and_insert_transaction(&tc.consensus, t, true).unwrap();
        assert!(manager.has_transaction(&t_id));

        // A block arrives (mined elsewhere) spending the same input via a
        // different transaction
        let conflicting = spend_tx(outpoint, amount - 5000);
        let tip = tc.consensus.get_selected_tip_hash();
        let block_hash = tc.add_block_with_parents_and_transactions(vec![tip], vec![conflicting]).unwrap();

        let block = tc.consensus.get_block(block_hash).unwrap();
        let removed = manager.handle_new_block_transactions(&tc.consensus, &block.transactions);

        // T was evicted and no longer listed
        assert!(removed.iter().any(|tx| tx.id() == t_id));
        assert!(!manager.has_transaction(&t_id));
        assert!(!manager.get_all_transaction_ids().contains(&t_id));
    }

    #[test]
    fn test_orphan_graduates_when_parent_arrives() {
        let tc = TestConsensus::new(spendable_params());
        let (outpoint, amount) = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_minimum_relay_fee(0).with_accept_non_standard(true));

        let parent = spend_tx(outpoint, amount - 1000);
        let parent_id = parent.id();
        let child = spend_tx(TransactionOutpoint::new(parent_id, 0), amount - 2000);
        let child_id = child.id();

        // The child arrives first and is orphaned
        let accepted = manager.validate_and_insert_transaction(&tc.consensus, child, true).unwrap();
        assert!(accepted.is_empty());
        assert_eq!(manager.orphan_count(), 1);
        assert_eq!(manager.transaction_count(), 0);

        // Once the parent arrives, both become primary
        let accepted = manager.validate_and_insert_transaction(&tc.consensus, parent, true).unwrap();
        assert_eq!(accepted.len(), 2);
        assert_eq!(manager.transaction_count(), 2);
        assert_eq!(manager.orphan_count(), 0);
        assert!(manager.has_transaction(&child_id));
    }

    #[test]
    fn test_block_template_includes_mempool_txs_and_mines() {
        let tc = TestConsensus::new(spendable_params());
        let (outpoint, amount) = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_minimum_relay_fee(0).with_accept_non_standard(true));

        let spend = spend_tx(outpoint, amount - 1000);
        let spend_id = spend.id();
        manager.validate_and_insert_transaction(&tc.consensus, spend, true).unwrap();

        let miner_data = MinerData::new(ScriptPublicKey::from_vec(0, vec![0x51]), vec![]);
        let template = manager.get_block_template(&tc.consensus, miner_data).unwrap();
        assert!(template.transactions.iter().any(|tx| tx.id() == spend_id));
        assert!(template.transactions[0].is_coinbase());

        // The template must be acceptable by consensus as-is (pow is skipped)
        let status = tc.consensus.validate_and_insert_block(template).unwrap();
        assert!(status.is_valid());

        // After inclusion, the mempool drops the transaction
        let tip = tc.consensus.get_selected_tip_hash();
        let block = tc.consensus.get_block(tip).unwrap();
        manager.handle_new_block_transactions(&tc.consensus, &block.transactions);
        assert!(!manager.has_transaction(&spend_id));
    }

    #[test]
    fn test_low_fee_rejected() {
        let tc = TestConsensus::new(spendable_params());
        let (outpoint, amount) = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_accept_non_standard(true));

        // Spend the full amount, paying zero fee
        let zero_fee = spend_tx(outpoint, amount);
        let result = manager.validate_and_insert_transaction(&tc.consensus, zero_fee, true);
        assert!(matches!(result, Err(RuleError::RejectInsufficientFee(_, 0, _))));
    }

    #[test]
    fn test_unknown_hash_is_orphaned_not_erred() {
        let tc = TestConsensus::new(spendable_params());
        let _ = setup_consensus_with_spendable_output(&tc);
        let manager = MiningManager::new(&tc.params, MempoolConfig::build_default(&tc.params).with_minimum_relay_fee(0).with_accept_non_standard(true));

        let missing_parent = TransactionOutpoint::new(Hash::from_u64_word(0xbeef), 0);
        let orphan = spend_tx(missing_parent, 1000);
        let accepted = manager.validate_and_insert_transaction(&tc.consensus, orphan, true).unwrap();
        assert!(accepted.is_empty());
        assert_eq!(manager.orphan_count(), 1);

        // With orphans disallowed the same submission errors out
        let orphan2 = spend_tx(TransactionOutpoint::new(Hash::from_u64_word(0xbeef), 1), 900);
        let result = manager.validate_and_insert_transaction(&tc.consensus, orphan2, false);
        assert!(matches!(result, Err(RuleError::RejectDisallowedOrphan(_))));
    }
}
