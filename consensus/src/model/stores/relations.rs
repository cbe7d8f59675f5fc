use kaspad_consensus_core::blockhash::BlockHashes;
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbKey, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use std::collections::HashMap;
use std::sync::Arc;

use crate::constants::perf::DEFAULT_CACHE_SIZE;

/// Reader API for `RelationsStore`.
pub trait RelationsStoreReader {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

/// Write API for `RelationsStore`. The insert function is deliberately `mut`
/// since it modifies the children arrays of the given parents
pub trait RelationsStore: RelationsStoreReader {
    fn insert(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError>;
}

/// A DB + cache implementation of `RelationsStore` trait
#[derive(Clone)]
pub struct DbRelationsStore {
    db: Arc<DB>,
    parents_access: CachedDbAccess<Hash, BlockHashes>,
    children_access: CachedDbAccess<Hash, BlockHashes>,
}

impl DbRelationsStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: Arc::clone(&db),
            parents_access: CachedDbAccess::new(Arc::clone(&db), DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::Relations.into()),
            children_access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::RelationsChildren.into()),
        }
    }

    pub fn insert_batch(&self, batch: &mut rocksdb::WriteBatch, hash: Hash, parents: BlockHashes) -> Result<(), StoreError> {
        use kaspad_database::prelude::BatchDbWriter;
        if self.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        // Insert a new entry for `hash`
        self.parents_access.write(BatchDbWriter::new(batch), hash, parents.clone())?;
        // The new hash has no children yet
        self.children_access.write(BatchDbWriter::new(batch), hash, BlockHashes::new(Vec::new()))?;
        // Update `children` for each parent
        for parent in parents.iter().cloned() {
            let mut children = (*self.get_children(parent)?).clone();
            children.push(hash);
            self.children_access.write(BatchDbWriter::new(batch), parent, BlockHashes::new(children))?;
        }
        Ok(())
    }
}

impl RelationsStoreReader for DbRelationsStore {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        self.parents_access.read(hash)
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.children_access.read(hash) {
            Ok(children) => Ok(children),
            Err(StoreError::KeyNotFound(_)) => Ok(BlockHashes::new(Vec::new())),
            Err(e) => Err(e),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.parents_access.has(hash)
    }
}

impl RelationsStore for DbRelationsStore {
    /// See `insert_batch` for a batched version. The direct version writes
    /// parents and children updates non-atomically.
    fn insert(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError> {
        use kaspad_database::prelude::DirectDbWriter;
        if self.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.parents_access.write(DirectDbWriter::new(&self.db), hash, parents.clone())?;
        self.children_access.write(DirectDbWriter::new(&self.db), hash, BlockHashes::new(Vec::new()))?;
        for parent in parents.iter().cloned() {
            let mut children = (*self.get_children(parent)?).clone();
            children.push(hash);
            self.children_access.write(DirectDbWriter::new(&self.db), parent, BlockHashes::new(children))?;
        }
        Ok(())
    }
}

/// An in-memory implementation for tests
pub struct MemoryRelationsStore {
    parents_map: HashMap<Hash, BlockHashes>,
    children_map: HashMap<Hash, BlockHashes>,
}

impl MemoryRelationsStore {
    pub fn new() -> Self {
        Self { parents_map: HashMap::new(), children_map: HashMap::new() }
    }
}

impl Default for MemoryRelationsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationsStoreReader for MemoryRelationsStore {
    fn get_parents(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.parents_map.get(&hash) {
            Some(parents) => Ok(BlockHashes::clone(parents)),
            None => Err(StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::Relations.as_ref(), hash))),
        }
    }

    fn get_children(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        match self.children_map.get(&hash) {
            Some(children) => Ok(BlockHashes::clone(children)),
            None => Ok(BlockHashes::new(Vec::new())),
        }
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.parents_map.contains_key(&hash))
    }
}

impl RelationsStore for MemoryRelationsStore {
    fn insert(&mut self, hash: Hash, parents: BlockHashes) -> Result<(), StoreError> {
        if self.parents_map.contains_key(&hash) {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        for parent in parents.iter().cloned() {
            let mut children = match self.children_map.get(&parent) {
                Some(children) => (**children).clone(),
                None => Vec::new(),
            };
            children.push(hash);
            self.children_map.insert(parent, BlockHashes::new(children));
        }
        self.parents_map.insert(hash, parents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_relations() {
        let mut store = MemoryRelationsStore::new();
        store.insert(2.into(), BlockHashes::new(vec![1.into()])).unwrap();
        store.insert(3.into(), BlockHashes::new(vec![1.into(), 2.into()])).unwrap();

        assert_eq!(store.get_parents(3.into()).unwrap().as_slice(), &[Hash::from(1u64), Hash::from(2u64)]);
        assert_eq!(store.get_children(1.into()).unwrap().as_slice(), &[Hash::from(2u64), Hash::from(3u64)]);
        assert!(store.insert(2.into(), BlockHashes::new(vec![])).is_err());
    }
}
