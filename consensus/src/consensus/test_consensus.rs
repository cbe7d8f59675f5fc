use super::Consensus;
use crate::model::stores::{ghostdag::GhostdagStoreReader, utxo_multisets::UtxoMultisetsStoreReader};
use kaspad_consensus_core::{
    block::Block,
    blockstatus::BlockStatus,
    coinbase::MinerData,
    config::{params::Params, Config},
    constants::BLOCK_VERSION,
    errors::block::BlockProcessResult,
    header::Header,
    merkle::{calc_accepted_id_merkle_root, calc_hash_merkle_root},
    tx::{ScriptPublicKey, Transaction},
};
use kaspad_database::prelude::{create_temp_db, TempDbLifetime};
use kaspad_hashes::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// A self-contained consensus instance over temporary storage, with helpers
/// for building valid blocks on top of arbitrary parents. Proof of work is
/// skipped so block production is deterministic.
pub struct TestConsensus {
    pub consensus: Arc<Consensus>,
    pub params: Params,
    nonce_counter: AtomicU64,
    _db_lifetime: TempDbLifetime,
    _appdir_lifetime: TempDir,
}

impl TestConsensus {
    pub fn new(params: Params) -> Self {
        let (db_lifetime, db) = create_temp_db();
        let appdir = tempfile::tempdir().expect("creating a temp dir should succeed");
        let config = Config { params: params.clone(), skip_proof_of_work: true };
        let consensus = Consensus::new(db, appdir.path(), Arc::new(config)).expect("test consensus creation should succeed");
        Self { consensus, params, nonce_counter: AtomicU64::new(1), _db_lifetime: db_lifetime, _appdir_lifetime: appdir }
    }

    pub fn genesis_hash(&self) -> Hash {
        self.consensus.genesis_hash()
    }

    /// Builds a fully valid block with the given parents and transactions:
    /// computes GHOSTDAG, the acceptance state and all header commitments the
    /// way an honest miner would
    pub fn build_block_with_parents(&self, parents: Vec<Hash>, txs: Vec<Transaction>) -> Block {
        self.build_block_with_miner_data(parents, txs, MinerData::new(ScriptPublicKey::from_vec(0, vec![0x51]), Vec::new()))
    }

    pub fn build_block_with_miner_data(&self, parents: Vec<Hash>, txs: Vec<Transaction>, miner_data: MinerData) -> Block {
        let consensus = &self.consensus;
        let ghostdag_data = consensus.ghostdag_manager.ghostdag(&parents);
        let selected_parent = ghostdag_data.selected_parent;
        let past_median_time = consensus.past_median_time_manager.calc_past_median_time(selected_parent);

        let (base_collection, _, _) = consensus.restore_utxo_at(selected_parent).expect("utxo restoration should succeed");
        let acceptance =
            consensus.calculate_mergeset_acceptance(&base_collection, &ghostdag_data, past_median_time).expect("acceptance");

        let coinbase =
            consensus.coinbase_manager.expected_coinbase_transaction(ghostdag_data.blue_score, acceptance.total_fees, miner_data);
        let transactions: Vec<Transaction> = std::iter::once(coinbase).chain(txs).collect();

        let mut multiset =
            consensus.utxo_multisets_store.get(selected_parent).expect("selected parent must have a multiset");
        multiset.combine(&acceptance.multiset);

        let bits = consensus.difficulty_manager.calculate_difficulty_bits(selected_parent);
        // A running nonce keeps sibling blocks with identical content distinct
        let nonce = self.nonce_counter.fetch_add(1, Ordering::SeqCst);
        let mut header =
            Header::new(BLOCK_VERSION, parents, calc_hash_merkle_root(transactions.iter()), past_median_time + 1, bits, nonce);
        header.accepted_id_merkle_root = calc_accepted_id_merkle_root(acceptance.accepted_tx_ids.iter().copied());
        header.utxo_commitment = multiset.finalize();
        header.finalize();

        Block::new(header, transactions)
    }

    /// Builds and inserts a block, returning its hash
    pub fn add_block_with_parents(&self, parents: Vec<Hash>) -> BlockProcessResult<Hash> {
        self.add_block_with_parents_and_transactions(parents, vec![])
    }

    pub fn add_block_with_parents_and_transactions(
        &self,
        parents: Vec<Hash>,
        txs: Vec<Transaction>,
    ) -> BlockProcessResult<Hash> {
        let block = self.build_block_with_parents(parents, txs);
        let hash = block.hash();
        let status = self.consensus.validate_and_insert_block(block)?;
        assert_eq!(status, BlockStatus::StatusUTXOValid);
        Ok(hash)
    }

    /// Mines a chain of `length` empty blocks over `start`, returning the tip
    pub fn add_chain(&self, start: Hash, length: usize) -> Hash {
        let mut tip = start;
        for _ in 0..length {
            tip = self.add_block_with_parents(vec![tip]).expect("chain blocks should be valid");
        }
        tip
    }

    pub fn blue_score_of(&self, hash: Hash) -> u64 {
        self.consensus.ghostdag_store.get_blue_score(hash).expect("block must have ghostdag data")
    }
}
