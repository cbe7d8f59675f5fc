use kaspad_consensus_core::acceptance_data::AcceptanceData;
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use std::sync::Arc;

use crate::constants::perf::LARGE_DATA_CACHE_SIZE;

/// Records, per block, which merge-set transactions it accepted. Feeds the
/// accepted-ID merkle root and the chain-change notifications.
pub trait AcceptanceDataStoreReader {
    fn get(&self, hash: Hash) -> Result<Arc<AcceptanceData>, StoreError>;
}

pub trait AcceptanceDataStore: AcceptanceDataStoreReader {
    fn insert(&self, writer: impl DbWriter, hash: Hash, acceptance_data: Arc<AcceptanceData>) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbAcceptanceDataStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<AcceptanceData>>,
}

impl DbAcceptanceDataStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(db, LARGE_DATA_CACHE_SIZE, DatabaseStorePrefixes::AcceptanceData.into()),
        }
    }
}

impl AcceptanceDataStoreReader for DbAcceptanceDataStore {
    fn get(&self, hash: Hash) -> Result<Arc<AcceptanceData>, StoreError> {
        self.access.read(hash)
    }
}

impl AcceptanceDataStore for DbAcceptanceDataStore {
    fn insert(&self, writer: impl DbWriter, hash: Hash, acceptance_data: Arc<AcceptanceData>) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.access.write(writer, hash, acceptance_data)
    }
}
