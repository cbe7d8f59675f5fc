pub mod test_consensus;
#[cfg(test)]
mod tests;
mod virtual_processor;

use crate::{
    constants::{BLOCK_FILE_MAX_SIZE, BLOCK_STORE_NAME},
    model::{
        services::reachability::MTReachabilityService,
        stores::{
            acceptance_data::{AcceptanceDataStore, DbAcceptanceDataStore},
            block_locations::{BlockLocationsStore, BlockLocationsStoreReader, DbBlockLocationsStore},
            ghostdag::{DbGhostdagStore, GhostdagStore, GhostdagStoreReader},
            headers::{DbHeadersStore, HeaderStore, HeaderStoreReader},
            pruning::{DbPruningStore, PruningStore, PruningStoreReader},
            reachability::DbReachabilityStore,
            relations::DbRelationsStore,
            statuses::{DbStatusesStore, StatusesStore, StatusesStoreReader},
            tips::{DbTipsStore, TipsStore, TipsStoreReader},
            utxo_diffs::{DbUtxoDiffsStore, UtxoDiffsStore},
            utxo_multisets::{DbUtxoMultisetsStore, UtxoMultisetsStore},
            utxo_set::{DbVirtualUtxoSetStore, VirtualUtxoSetStoreReader},
            virtual_state::{DbVirtualStateStore, VirtualState, VirtualStateStore, VirtualStateStoreReader},
            StoreResultExtensions,
        },
    },
    processes::{
        coinbase::CoinbaseManager,
        difficulty::DifficultyManager,
        ghostdag::protocol::GhostdagManager,
        mass,
        past_median_time::PastMedianTimeManager,
        reachability::inquirer as reachability,
        transaction_validator::TransactionValidator,
        traversal_manager::DagTraversalManager,
    },
};
use kaspad_consensus_core::{
    block::Block,
    blockhash::{BlockHashes, ORIGIN},
    blockstatus::BlockStatus,
    config::Config,
    constants::BLOCK_VERSION,
    errors::{
        block::{BlockProcessResult, RuleError},
        consensus::{ConsensusError, ConsensusResult},
        tx::TxRuleError,
    },
    events::ConsensusEvent,
    header::Header,
    merkle::calc_hash_merkle_root,
    tx::{MutableTransaction, Transaction, TransactionOutpoint, UtxoEntry, COINBASE_TRANSACTION_INDEX},
    utxo::utxo_collection::UtxoCollection,
};
use kaspad_database::prelude::{BatchDbWriter, CachedDbItem, DatabaseStorePrefixes, FlatFileStore, DB};
use kaspad_hashes::Hash;
use kaspad_muhash::MuHash;
use kaspad_txscript::caches::Cache;
use log::{debug, info};
use parking_lot::RwLock;
use rocksdb::WriteBatch;
use std::{collections::HashSet, path::Path, sync::Arc};

/// The number of signature-cache entries shared between the mempool and block
/// validation paths
const SIG_CACHE_SIZE: u64 = 10_000;

/// The central consensus engine: validates and inserts blocks, maintains the
/// virtual block state, and answers DAG queries. All mutations are serialized
/// through a single writer lock, while readers observe consistent snapshots.
pub struct Consensus {
    db: Arc<DB>,
    pub(super) config: Arc<Config>,
    genesis_hash: Hash,

    // The single writer lock over all DAG state
    pub(super) virtual_lock: RwLock<()>,

    // Stores
    pub(super) statuses_store: Arc<DbStatusesStore>,
    pub(super) relations_store: Arc<DbRelationsStore>,
    pub(super) reachability_store: Arc<RwLock<DbReachabilityStore>>,
    pub(super) ghostdag_store: Arc<DbGhostdagStore>,
    pub(super) headers_store: Arc<DbHeadersStore>,
    pub(super) tips_store: RwLock<DbTipsStore>,
    pub(super) utxo_diffs_store: Arc<DbUtxoDiffsStore>,
    pub(super) utxo_multisets_store: Arc<DbUtxoMultisetsStore>,
    pub(super) acceptance_data_store: Arc<DbAcceptanceDataStore>,
    pub(super) virtual_state_store: RwLock<DbVirtualStateStore>,
    pub(super) virtual_utxo_store: Arc<DbVirtualUtxoSetStore>,
    pub(super) block_locations_store: Arc<DbBlockLocationsStore>,
    pub(super) pruning_store: RwLock<DbPruningStore>,
    block_count_item: RwLock<CachedDbItem<u64>>,

    // Append-only storage of raw block bytes
    pub(super) block_files: FlatFileStore,

    // In-memory mirror of the virtual UTXO set
    pub(super) virtual_utxo_cache: RwLock<UtxoCollection>,

    // Services and managers
    pub(super) reachability_service: MTReachabilityService,
    pub(super) ghostdag_manager: GhostdagManager<DbGhostdagStore, DbRelationsStore, DbHeadersStore>,
    pub(super) difficulty_manager: DifficultyManager<DbHeadersStore, DbGhostdagStore>,
    pub(super) past_median_time_manager: PastMedianTimeManager<DbHeadersStore, DbGhostdagStore>,
    pub(super) coinbase_manager: CoinbaseManager,
    pub(super) transaction_validator: TransactionValidator,
    pub(super) traversal_manager: DagTraversalManager<DbGhostdagStore, DbRelationsStore>,

    // Consensus event broadcasting
    events_sender: async_channel::Sender<ConsensusEvent>,
    events_receiver: async_channel::Receiver<ConsensusEvent>,
}

impl Consensus {
    pub fn new(db: Arc<DB>, app_dir: &Path, config: Arc<Config>) -> ConsensusResult<Arc<Self>> {
        let params = &config.params;
        let genesis_hash = params.genesis_hash();

        let statuses_store = Arc::new(DbStatusesStore::new(db.clone()));
        let relations_store = Arc::new(DbRelationsStore::new(db.clone()));
        let reachability_store = Arc::new(RwLock::new(DbReachabilityStore::new(db.clone())));
        let ghostdag_store = Arc::new(DbGhostdagStore::new(db.clone()));
        let headers_store = Arc::new(DbHeadersStore::new(db.clone()));
        let tips_store = RwLock::new(DbTipsStore::new(db.clone()));
        let utxo_diffs_store = Arc::new(DbUtxoDiffsStore::new(db.clone()));
        let utxo_multisets_store = Arc::new(DbUtxoMultisetsStore::new(db.clone()));
        let acceptance_data_store = Arc::new(DbAcceptanceDataStore::new(db.clone()));
        let virtual_state_store = RwLock::new(DbVirtualStateStore::new(db.clone()));
        let virtual_utxo_store = Arc::new(DbVirtualUtxoSetStore::new(db.clone()));
        let block_locations_store = Arc::new(DbBlockLocationsStore::new(db.clone()));
        let pruning_store = RwLock::new(DbPruningStore::new(db.clone()));
        let block_count_item = RwLock::new(CachedDbItem::new(db.clone(), DatabaseStorePrefixes::Metadata.into()));

        let block_files = FlatFileStore::open(db.clone(), app_dir, BLOCK_STORE_NAME, params.net.magic(), BLOCK_FILE_MAX_SIZE)
            .map_err(|_| ConsensusError::General("the block flat-file store could not be opened"))?;

        let reachability_service = MTReachabilityService::new(reachability_store.clone());
        let ghostdag_manager = GhostdagManager::new(
            genesis_hash,
            params.ghostdag_k,
            ghostdag_store.clone(),
            relations_store.clone(),
            headers_store.clone(),
            reachability_service.clone(),
        );
        let difficulty_manager = DifficultyManager::new(
            headers_store.clone(),
            ghostdag_store.clone(),
            genesis_hash,
            params.genesis.bits,
            params.max_difficulty_target,
            params.difficulty_adjustment_window_size,
            params.target_time_per_block,
        );
        let past_median_time_manager = PastMedianTimeManager::new(
            headers_store.clone(),
            ghostdag_store.clone(),
            genesis_hash,
            params.past_median_time_window_size(),
        );
        let coinbase_manager = CoinbaseManager::new(params);
        let sig_cache = Cache::new(SIG_CACHE_SIZE);
        let transaction_validator = TransactionValidator::new(params, sig_cache);
        let traversal_manager =
            DagTraversalManager::new(genesis_hash, ghostdag_store.clone(), relations_store.clone(), reachability_service.clone());

        let (events_sender, events_receiver) = async_channel::unbounded();

        let consensus = Arc::new(Self {
            db,
            config,
            genesis_hash,
            virtual_lock: RwLock::new(()),
            statuses_store,
            relations_store,
            reachability_store,
            ghostdag_store,
            headers_store,
            tips_store,
            utxo_diffs_store,
            utxo_multisets_store,
            acceptance_data_store,
            virtual_state_store,
            virtual_utxo_store,
            block_locations_store,
            pruning_store,
            block_count_item,
            block_files,
            virtual_utxo_cache: RwLock::new(UtxoCollection::new()),
            reachability_service,
            ghostdag_manager,
            difficulty_manager,
            past_median_time_manager,
            coinbase_manager,
            transaction_validator,
            traversal_manager,
            events_sender,
            events_receiver,
        });

        consensus.init()?;
        Ok(consensus)
    }

    /// Subscribes to consensus events (block added, virtual changed)
    pub fn subscribe(&self) -> async_channel::Receiver<ConsensusEvent> {
        self.events_receiver.clone()
    }

    pub fn genesis_hash(&self) -> Hash {
        self.genesis_hash
    }

    /// Initializes the store set with the genesis state on first run, or
    /// reloads the virtual UTXO mirror on a restart
    fn init(&self) -> ConsensusResult<()> {
        if self.tips_store.read().is_initialized() {
            let collection = self
                .virtual_utxo_store
                .iterate_all()
                .map_err(|_| ConsensusError::General("virtual utxo set could not be loaded"))?;
            info!("Consensus resumed: loaded {} virtual UTXO entries", collection.len());
            *self.virtual_utxo_cache.write() = collection;
            return Ok(());
        }

        info!("Initializing consensus with the {} genesis block", self.config.params.net);
        let genesis_block = self.config.params.genesis.build_genesis_block();
        let genesis_hash = genesis_block.hash();

        let mut batch = WriteBatch::default();

        self.headers_store.insert(BatchDbWriter::new(&mut batch), genesis_hash, genesis_block.header.clone()).unwrap();
        self.statuses_store.set(BatchDbWriter::new(&mut batch), genesis_hash, BlockStatus::StatusUTXOValid).unwrap();
        self.ghostdag_store
            .insert(BatchDbWriter::new(&mut batch), genesis_hash, Arc::new(self.ghostdag_manager.genesis_ghostdag_data()))
            .unwrap();
        self.relations_store.insert_batch(&mut batch, genesis_hash, BlockHashes::new(vec![ORIGIN])).unwrap();

        // Init reachability with ORIGIN and insert genesis under it
        {
            let mut staging = crate::model::stores::reachability::StagingReachabilityStore::new(self.reachability_store.upgradable_read());
            reachability::init(&mut staging).unwrap();
            reachability::add_block(&mut staging, genesis_hash, ORIGIN, &mut std::iter::empty()).unwrap();
            let write_guard = staging.commit(&mut batch).unwrap();
            drop(write_guard);
        }

        self.tips_store.write().init(BatchDbWriter::new(&mut batch), genesis_hash).unwrap();
        self.utxo_diffs_store.insert(BatchDbWriter::new(&mut batch), genesis_hash, Default::default()).unwrap();
        self.utxo_multisets_store.insert(BatchDbWriter::new(&mut batch), genesis_hash, MuHash::new()).unwrap();
        self.acceptance_data_store.insert(BatchDbWriter::new(&mut batch), genesis_hash, Arc::new(Vec::new())).unwrap();
        self.pruning_store
            .write()
            .set(
                BatchDbWriter::new(&mut batch),
                crate::model::stores::pruning::PruningPointInfo { pruning_point: genesis_hash, blue_score: 0 },
            )
            .unwrap();
        self.block_count_item.write().write(BatchDbWriter::new(&mut batch), &1).unwrap();

        // Persist raw genesis bytes to the flat-file store, committing the
        // write cursor within the same keyed batch as the location metadata
        let raw = bincode::serialize(&(genesis_block.header.as_ref(), genesis_block.transactions.as_ref())).unwrap();
        let location = self.block_files.append(&raw).unwrap();
        self.block_locations_store.insert(BatchDbWriter::new(&mut batch), genesis_hash, location).unwrap();
        self.block_files.commit_cursor(BatchDbWriter::new(&mut batch)).unwrap();

        // Build the initial virtual state on top of genesis
        let virtual_parents = vec![genesis_hash];
        let virtual_gd = self.ghostdag_manager.ghostdag(&virtual_parents);
        let accepted_tx_ids = vec![genesis_block.transactions[COINBASE_TRANSACTION_INDEX].id()];
        let virtual_state = VirtualState {
            parents: virtual_parents,
            bits: self.config.params.genesis.bits,
            past_median_time: genesis_block.header.timestamp,
            accepted_tx_ids,
            mergeset_fees: 0,
            utxo_diff: Default::default(),
            multiset: MuHash::new(),
            ghostdag_data: virtual_gd,
        };
        self.virtual_state_store.write().set(BatchDbWriter::new(&mut batch), Arc::new(virtual_state)).unwrap();

        self.db.write(batch).map_err(|_| ConsensusError::General("genesis commit failed"))?;
        Ok(())
    }

    /// Validates the block and inserts it into the DAG, updating the virtual
    /// state. This is the single entry point for new blocks, whether mined
    /// locally or received from peers. Returns the resulting block status;
    /// already-known blocks return their current status silently.
    pub fn validate_and_insert_block(&self, block: Block) -> BlockProcessResult<BlockStatus> {
        let _write_guard = self.virtual_lock.write();
        let hash = block.hash();

        if let Some(status) = self.statuses_store.get(hash).unwrap_option() {
            if status.is_invalid() {
                return Err(RuleError::KnownInvalid);
            }
            debug!("Block {hash} is already known, ignoring");
            return Ok(status);
        }

        if block.header.is_genesis() {
            return Err(RuleError::UnexpectedGenesis);
        }

        match self.validate_and_insert_block_impl(&block, hash) {
            Ok(status) => {
                let _ = self.events_sender.try_send(ConsensusEvent::BlockAdded(Arc::new(
                    kaspad_consensus_core::events::BlockAddedEvent { block: block.clone() },
                )));
                Ok(status)
            }
            Err(rule_error) => {
                // Persist the invalid status so the block is never revalidated.
                // Missing-parent (orphan) errors are not verdicts on validity.
                if !matches!(rule_error, RuleError::MissingParents(_)) {
                    self.statuses_store
                        .set(
                            kaspad_database::prelude::DirectDbWriter::new(&self.db),
                            hash,
                            BlockStatus::StatusInvalid,
                        )
                        .unwrap();
                }
                Err(rule_error)
            }
        }
    }

    fn validate_and_insert_block_impl(&self, block: &Block, hash: Hash) -> BlockProcessResult<BlockStatus> {
        // ---- Phase A: context free validation ----
        self.validate_block_in_isolation(block)?;

        // ---- Phase B: contextual validation ----
        let parents = block.header.direct_parents();

        // All parents must be known and valid
        let missing: Vec<Hash> =
            parents.iter().copied().filter(|parent| !self.statuses_store.has(*parent).unwrap_or(false)).collect();
        if !missing.is_empty() {
            return Err(RuleError::MissingParents(missing));
        }
        for parent in parents.iter().copied() {
            if self.statuses_store.get(parent).unwrap().is_invalid() {
                return Err(RuleError::InvalidParent(parent));
            }
        }
        // No parent may be in the past of another parent
        for &a in parents.iter() {
            for &b in parents.iter() {
                if a != b && self.reachability_service.is_dag_ancestor_of(a, b).unwrap() {
                    return Err(RuleError::InvalidParentsRelation(a, b));
                }
            }
        }

        // GHOSTDAG
        let ghostdag_data = Arc::new(self.ghostdag_manager.ghostdag(parents));
        if ghostdag_data.mergeset_size() as u64 > self.config.params.mergeset_size_limit {
            return Err(RuleError::MergeSetTooBig(ghostdag_data.mergeset_size() as u64, self.config.params.mergeset_size_limit));
        }

        // Timestamp must exceed the past median time of the selected parent window
        let past_median_time = self.past_median_time_manager.calc_past_median_time(ghostdag_data.selected_parent);
        if block.header.timestamp <= past_median_time {
            return Err(RuleError::TimeTooOld(block.header.timestamp, past_median_time));
        }

        // The committed difficulty must exactly match our re-computation
        let expected_bits = self.difficulty_manager.calculate_difficulty_bits(ghostdag_data.selected_parent);
        if block.header.bits != expected_bits {
            return Err(RuleError::UnexpectedDifficulty(hash, block.header.bits, expected_bits));
        }

        // Contextual coinbase check: committed blue score and subsidy
        self.coinbase_manager
            .validate_coinbase_payload(&block.transactions[COINBASE_TRANSACTION_INDEX], ghostdag_data.blue_score)?;

        // Full UTXO verification of the block: mergeset acceptance, commitment
        // checks and body validation against the block's own past state
        let utxo_verification = self.verify_block_utxo_state(block, &ghostdag_data, past_median_time)?;

        // ---- Commit ----
        let mut batch = WriteBatch::default();

        self.headers_store.insert(BatchDbWriter::new(&mut batch), hash, block.header.clone()).unwrap();
        self.ghostdag_store.insert(BatchDbWriter::new(&mut batch), hash, ghostdag_data.clone()).unwrap();
        self.relations_store.insert_batch(&mut batch, hash, BlockHashes::new(parents.to_vec())).unwrap();
        self.statuses_store.set(BatchDbWriter::new(&mut batch), hash, BlockStatus::StatusUTXOValid).unwrap();
        self.utxo_diffs_store.insert(BatchDbWriter::new(&mut batch), hash, Arc::new(utxo_verification.utxo_diff)).unwrap();
        self.utxo_multisets_store.insert(BatchDbWriter::new(&mut batch), hash, utxo_verification.multiset).unwrap();
        self.acceptance_data_store.insert(BatchDbWriter::new(&mut batch), hash, Arc::new(utxo_verification.acceptance_data)).unwrap();
        self.block_count_item.write().update(BatchDbWriter::new(&mut batch), |count| count + 1).unwrap();

        {
            let mut staging =
                crate::model::stores::reachability::StagingReachabilityStore::new(self.reachability_store.upgradable_read());
            reachability::add_block(
                &mut staging,
                hash,
                ghostdag_data.selected_parent,
                &mut ghostdag_data.unordered_mergeset_without_selected_parent(),
            )
            .unwrap();
            let write_guard = staging.commit(&mut batch).unwrap();
            drop(write_guard);
        }

        // Raw block bytes go to the flat-file store; the write cursor commits
        // atomically with the referencing location metadata
        let raw = bincode::serialize(&(block.header.as_ref(), block.transactions.as_ref())).unwrap();
        let location = self.block_files.append(&raw).unwrap();
        self.block_locations_store.insert(BatchDbWriter::new(&mut batch), hash, location).unwrap();
        self.block_files.commit_cursor(BatchDbWriter::new(&mut batch)).unwrap();

        self.tips_store.write().add_tip(BatchDbWriter::new(&mut batch), hash, parents).unwrap();

        self.db.write(batch).unwrap();
        debug!("Accepted block {hash} with blue score {}", ghostdag_data.blue_score);

        // Rebuild the virtual over the new tip set and emit the change event
        self.update_virtual_state()?;

        Ok(BlockStatus::StatusUTXOValid)
    }

    /// Phase A validation: everything which requires no DAG context
    fn validate_block_in_isolation(&self, block: &Block) -> BlockProcessResult<()> {
        let header = &block.header;

        if header.version != BLOCK_VERSION && header.version != 0 {
            return Err(RuleError::WrongBlockVersion(header.version));
        }

        if header.parents.is_empty() {
            return Err(RuleError::NoParents);
        }
        if header.parents.len() > self.config.params.max_block_parents as usize {
            return Err(RuleError::TooManyParents(header.parents.len(), self.config.params.max_block_parents as usize));
        }
        if header.parents.contains(&ORIGIN) {
            return Err(RuleError::OriginParent);
        }

        // Timestamp must not be too far in the future
        let now = kaspad_core::time::unix_now();
        let max_allowed = now + self.config.params.max_allowed_timestamp_offset();
        if header.timestamp > max_allowed {
            return Err(RuleError::TimeTooFarIntoTheFuture(header.timestamp, max_allowed));
        }

        // Proof of work (hash must meet the committed target)
        if !self.config.skip_proof_of_work && !kaspad_pow::check_pow_of_header(header) {
            return Err(RuleError::InvalidPoW);
        }

        self.validate_body_in_isolation(block)?;
        Ok(())
    }

    fn validate_body_in_isolation(&self, block: &Block) -> BlockProcessResult<()> {
        let params = &self.config.params;

        if block.transactions.is_empty() {
            return Err(RuleError::NoTransactions);
        }
        if !block.transactions[COINBASE_TRANSACTION_INDEX].is_coinbase() {
            return Err(RuleError::FirstTxNotCoinbase);
        }
        if let Some(i) = block.transactions[1..].iter().position(|tx| tx.is_coinbase()) {
            return Err(RuleError::MultipleCoinbases(i + 1));
        }

        // The header must commit to the transactions via the hash merkle root
        let calculated = calc_hash_merkle_root(block.transactions.iter());
        if calculated != block.header.hash_merkle_root {
            return Err(RuleError::BadMerkleRoot(block.header.hash_merkle_root, calculated));
        }

        let mut ids = HashSet::with_capacity(block.transactions.len());
        let mut total_mass: u64 = 0;
        let mut gas_per_subnetwork: std::collections::HashMap<_, u64> = Default::default();
        for tx in block.transactions.iter() {
            if !ids.insert(tx.id()) {
                return Err(RuleError::DuplicateTransactions(tx.id()));
            }
            self.transaction_validator
                .validate_tx_in_isolation(tx)
                .map_err(|e| RuleError::TxInIsolationValidationFailed(tx.id(), e))?;

            total_mass += mass::calc_tx_mass_standalone(tx);
            if total_mass > params.max_block_mass {
                return Err(RuleError::ExceedsMassLimit(total_mass, params.max_block_mass));
            }

            if !tx.subnetwork_id.is_builtin_or_native() {
                let gas = gas_per_subnetwork.entry(tx.subnetwork_id).or_default();
                *gas += tx.gas;
                if *gas > params.max_subnetwork_gas_limit {
                    return Err(RuleError::ExceedsGasLimit(*gas, params.max_subnetwork_gas_limit, tx.subnetwork_id));
                }
            }
        }

        // Double spends and chained spends within the same block
        let mut spent = HashSet::new();
        let mut created = HashSet::new();
        for tx in block.transactions.iter() {
            for (i, _) in tx.outputs.iter().enumerate() {
                created.insert(TransactionOutpoint::new(tx.id(), i as u32));
            }
        }
        for tx in block.transactions.iter() {
            for input in tx.inputs.iter() {
                if !spent.insert(input.previous_outpoint) {
                    return Err(RuleError::DoubleSpendInSameBlock(input.previous_outpoint));
                }
                if created.contains(&input.previous_outpoint) {
                    return Err(RuleError::ChainedTransaction(input.previous_outpoint));
                }
            }
        }

        Ok(())
    }

    // ---- Read API ----

    pub fn get_block_status(&self, hash: Hash) -> Option<BlockStatus> {
        self.statuses_store.get(hash).unwrap_option()
    }

    pub fn block_exists(&self, hash: Hash) -> bool {
        matches!(self.get_block_status(hash), Some(status) if status.is_valid())
    }

    pub fn get_header(&self, hash: Hash) -> ConsensusResult<Arc<Header>> {
        self.headers_store.get_header(hash).map_err(|_| ConsensusError::BlockNotFound(hash))
    }

    /// Reads the full block back from the flat-file store
    pub fn get_block(&self, hash: Hash) -> ConsensusResult<Block> {
        let location = self.block_locations_store.get(hash).map_err(|_| ConsensusError::BlockNotFound(hash))?;
        let raw = self.block_files.read(location).map_err(|_| ConsensusError::MissingBlockBody(hash))?;
        let (header, transactions): (Header, Vec<Transaction>) =
            bincode::deserialize(&raw).map_err(|_| ConsensusError::MissingBlockBody(hash))?;
        Ok(Block::new(header, transactions))
    }

    pub fn get_block_transactions(&self, hash: Hash) -> ConsensusResult<Arc<Vec<Transaction>>> {
        Ok(self.get_block(hash)?.transactions)
    }

    pub fn get_block_count(&self) -> u64 {
        self.block_count_item.read().read().unwrap_or(0)
    }

    pub fn get_tips(&self) -> Vec<Hash> {
        self.tips_store.read().get().map(|tips| tips.to_vec()).unwrap_or_default()
    }

    pub fn get_virtual_state_snapshot(&self) -> Arc<VirtualState> {
        self.virtual_state_store.read().get().expect("virtual state must be initialized")
    }

    pub fn get_virtual_utxo(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        self.virtual_utxo_cache.read().get(outpoint).cloned()
    }

    pub fn get_virtual_utxo_count(&self) -> usize {
        self.virtual_utxo_cache.read().len()
    }

    pub fn get_ghostdag_blue_score(&self, hash: Hash) -> ConsensusResult<u64> {
        self.ghostdag_store.get_blue_score(hash).map_err(|_| ConsensusError::MissingData(hash))
    }

    pub fn get_ghostdag_data(&self, hash: Hash) -> ConsensusResult<Arc<crate::model::stores::ghostdag::GhostdagData>> {
        self.ghostdag_store.get_data(hash).map_err(|_| ConsensusError::MissingData(hash))
    }

    pub fn get_pruning_point(&self) -> Hash {
        self.pruning_store.read().pruning_point().unwrap_or(self.genesis_hash)
    }

    /// The hash of the current virtual selected parent (the selected tip)
    pub fn get_selected_tip_hash(&self) -> Hash {
        self.get_virtual_state_snapshot().selected_parent()
    }

    pub fn create_block_locator(&self) -> Vec<Hash> {
        self.traversal_manager.create_block_locator(self.get_selected_tip_hash())
    }

    /// Given a peer block locator, returns the highest block we both know
    pub fn find_highest_shared_block(&self, locator: &[Hash]) -> Hash {
        locator.iter().copied().find(|hash| self.block_exists(*hash)).unwrap_or(self.genesis_hash)
    }

    /// Returns up to `max_blocks` hashes which are in the future of `low` and
    /// within the past of our selected tip, in topological order
    pub fn get_hashes_between(&self, low: Hash, high: Hash, max_blocks: usize) -> ConsensusResult<Vec<Hash>> {
        if !self.block_exists(low) || !self.block_exists(high) {
            return Err(ConsensusError::BlockNotFound(if self.block_exists(low) { high } else { low }));
        }
        Ok(self.traversal_manager.get_hashes_between(low, high, max_blocks))
    }

    /// Assembles a block template over the current virtual state: the header
    /// carries all commitments a valid block must have, leaving only the
    /// nonce for the miner to grind
    pub fn build_block_template(
        &self,
        miner_data: kaspad_consensus_core::coinbase::MinerData,
        txs: Vec<Transaction>,
    ) -> BlockProcessResult<Block> {
        let virtual_state = self.get_virtual_state_snapshot();
        let coinbase = self.coinbase_manager.expected_coinbase_transaction(
            virtual_state.blue_score(),
            virtual_state.mergeset_fees,
            miner_data,
        );
        let transactions: Vec<Transaction> = std::iter::once(coinbase).chain(txs).collect();

        let timestamp = std::cmp::max(virtual_state.past_median_time + 1, kaspad_core::time::unix_now());
        let mut header = Header::new(
            BLOCK_VERSION,
            virtual_state.parents.clone(),
            calc_hash_merkle_root(transactions.iter()),
            timestamp,
            virtual_state.bits,
            0,
        );
        header.accepted_id_merkle_root =
            kaspad_consensus_core::merkle::calc_accepted_id_merkle_root(virtual_state.accepted_tx_ids.iter().copied());
        header.utxo_commitment = virtual_state.multiset.clone().finalize();
        header.finalize();

        let block = Block::new(header, transactions);
        // The template must pass the isolated phase so miners never grind on garbage
        self.validate_block_in_isolation(&block)?;
        Ok(block)
    }

    /// Populates a mempool transaction with UTXO entries from the current
    /// virtual set, validates it contextually and computes fee and mass
    pub fn validate_mempool_transaction(&self, mutable_tx: &mut MutableTransaction) -> Result<(), TxRuleError> {
        self.transaction_validator.validate_tx_in_isolation(&mutable_tx.tx)?;

        // Populate entries from the virtual UTXO set
        {
            let utxo_cache = self.virtual_utxo_cache.read();
            for (i, input) in mutable_tx.tx.inputs.iter().enumerate() {
                if mutable_tx.entries[i].is_none() {
                    if let Some(entry) = utxo_cache.get(&input.previous_outpoint) {
                        mutable_tx.entries[i] = Some(entry.clone());
                    }
                }
            }
        }
        if !mutable_tx.is_verifiable() {
            return Err(TxRuleError::MissingTxOutpoints);
        }

        let virtual_state = self.get_virtual_state_snapshot();
        let fee = self.transaction_validator.validate_populated_transaction_and_get_fee(
            &mutable_tx.as_verifiable(),
            virtual_state.blue_score(),
            virtual_state.past_median_time,
        )?;
        mutable_tx.calculated_fee = Some(fee);
        mutable_tx.calculated_mass = Some(mass::calc_tx_mass(&mutable_tx.as_verifiable()));
        Ok(())
    }
}
