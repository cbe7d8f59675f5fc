use kaspad_consensus_core::blockstatus::BlockStatus;
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use std::sync::Arc;

use crate::constants::perf::DEFAULT_CACHE_SIZE;

/// Reader API for `StatusesStore`
pub trait StatusesStoreReader {
    fn get(&self, hash: Hash) -> Result<BlockStatus, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

/// Write API for `StatusesStore`. Statuses are the only consensus data which
/// can be updated in place (a block may transition between valid statuses).
pub trait StatusesStore: StatusesStoreReader {
    fn set(&self, writer: impl DbWriter, hash: Hash, status: BlockStatus) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbStatusesStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, BlockStatus>,
}

impl DbStatusesStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::Statuses.into()) }
    }
}

impl StatusesStoreReader for DbStatusesStore {
    fn get(&self, hash: Hash) -> Result<BlockStatus, StoreError> {
        self.access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

impl StatusesStore for DbStatusesStore {
    fn set(&self, writer: impl DbWriter, hash: Hash, status: BlockStatus) -> Result<(), StoreError> {
        self.access.write(writer, hash, status)
    }
}
