use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, FlatFileLocation, StoreError, DB};
use kaspad_hashes::Hash;
use std::sync::Arc;

use crate::constants::perf::DEFAULT_CACHE_SIZE;

/// Maps a block hash to the flat-file location of its raw serialized bytes
pub trait BlockLocationsStoreReader {
    fn get(&self, hash: Hash) -> Result<FlatFileLocation, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

pub trait BlockLocationsStore: BlockLocationsStoreReader {
    fn insert(&self, writer: impl DbWriter, hash: Hash, location: FlatFileLocation) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbBlockLocationsStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, FlatFileLocation>,
}

impl DbBlockLocationsStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::BlockLocations.into()),
        }
    }
}

impl BlockLocationsStoreReader for DbBlockLocationsStore {
    fn get(&self, hash: Hash) -> Result<FlatFileLocation, StoreError> {
        self.access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

impl BlockLocationsStore for DbBlockLocationsStore {
    fn insert(&self, writer: impl DbWriter, hash: Hash, location: FlatFileLocation) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.access.write(writer, hash, location)
    }
}
