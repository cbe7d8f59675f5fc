use kaspad_consensus_core::utxo::utxo_diff::UtxoDiff;
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use std::sync::Arc;

use crate::constants::perf::LARGE_DATA_CACHE_SIZE;

/// Store for holding the UTXO difference (delta) of a block relative to its
/// selected parent. The collection of diffs along a chain path allows
/// restoring the UTXO state of any block.
pub trait UtxoDiffsStoreReader {
    fn get(&self, hash: Hash) -> Result<Arc<UtxoDiff>, StoreError>;
}

pub trait UtxoDiffsStore: UtxoDiffsStoreReader {
    fn insert(&self, writer: impl DbWriter, hash: Hash, diff: Arc<UtxoDiff>) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbUtxoDiffsStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<UtxoDiff>>,
}

impl DbUtxoDiffsStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, LARGE_DATA_CACHE_SIZE, DatabaseStorePrefixes::UtxoDiffs.into()) }
    }
}

impl UtxoDiffsStoreReader for DbUtxoDiffsStore {
    fn get(&self, hash: Hash) -> Result<Arc<UtxoDiff>, StoreError> {
        self.access.read(hash)
    }
}

impl UtxoDiffsStore for DbUtxoDiffsStore {
    fn insert(&self, writer: impl DbWriter, hash: Hash, diff: Arc<UtxoDiff>) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.access.write(writer, hash, diff)
    }
}
