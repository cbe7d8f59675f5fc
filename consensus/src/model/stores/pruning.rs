use kaspad_database::prelude::{CachedDbItem, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct PruningPointInfo {
    pub pruning_point: Hash,
    /// The blue score at which this pruning point was determined
    pub blue_score: u64,
}

pub trait PruningStoreReader {
    fn get(&self) -> Result<PruningPointInfo, StoreError>;
    fn pruning_point(&self) -> Result<Hash, StoreError>;
}

pub trait PruningStore: PruningStoreReader {
    fn set(&mut self, writer: impl DbWriter, info: PruningPointInfo) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbPruningStore {
    db: Arc<DB>,
    access: CachedDbItem<PruningPointInfo>,
}

impl DbPruningStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::PruningPoint.into()) }
    }
}

impl PruningStoreReader for DbPruningStore {
    fn get(&self) -> Result<PruningPointInfo, StoreError> {
        self.access.read()
    }

    fn pruning_point(&self) -> Result<Hash, StoreError> {
        Ok(self.access.read()?.pruning_point)
    }
}

impl PruningStore for DbPruningStore {
    fn set(&mut self, writer: impl DbWriter, info: PruningPointInfo) -> Result<(), StoreError> {
        self.access.write(writer, &info)
    }
}
