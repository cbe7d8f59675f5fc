use crate::model::stores::ghostdag::GhostdagData;
use kaspad_consensus_core::{tx::TransactionId, utxo::utxo_diff::UtxoDiff};
use kaspad_database::prelude::{CachedDbItem, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use kaspad_muhash::MuHash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The full state of the virtual block, recomputed whenever the tip set changes
#[derive(Clone, Serialize, Deserialize)]
pub struct VirtualState {
    pub parents: Vec<Hash>,
    pub ghostdag_data: GhostdagData,
    /// The difficulty bits a new block building on current virtual must carry
    pub bits: u32,
    /// The past median time of the virtual block
    pub past_median_time: u64,
    /// IDs of transactions accepted by the virtual from its merge set
    pub accepted_tx_ids: Vec<TransactionId>,
    /// Total fees of the accepted transactions, paid out by the next coinbase
    pub mergeset_fees: u64,
    /// UTXO diff of the virtual relative to its selected parent
    pub utxo_diff: UtxoDiff,
    /// The muhash commitment a new block building on current virtual must carry
    pub multiset: MuHash,
}

impl VirtualState {
    pub fn selected_parent(&self) -> Hash {
        self.ghostdag_data.selected_parent
    }

    pub fn blue_score(&self) -> u64 {
        self.ghostdag_data.blue_score
    }
}

pub trait VirtualStateStoreReader {
    fn get(&self) -> Result<Arc<VirtualState>, StoreError>;
}

pub trait VirtualStateStore: VirtualStateStoreReader {
    fn set(&mut self, writer: impl DbWriter, state: Arc<VirtualState>) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbVirtualStateStore {
    db: Arc<DB>,
    access: CachedDbItem<Arc<VirtualState>>,
}

impl DbVirtualStateStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::VirtualState.into()) }
    }

    pub fn is_initialized(&self) -> Result<bool, StoreError> {
        match self.access.read() {
            Ok(_) => Ok(true),
            Err(StoreError::KeyNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl VirtualStateStoreReader for DbVirtualStateStore {
    fn get(&self) -> Result<Arc<VirtualState>, StoreError> {
        self.access.read()
    }
}

impl VirtualStateStore for DbVirtualStateStore {
    fn set(&mut self, writer: impl DbWriter, state: Arc<VirtualState>) -> Result<(), StoreError> {
        self.access.write(writer, &state)
    }
}
