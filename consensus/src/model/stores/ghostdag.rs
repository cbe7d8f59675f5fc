use kaspad_consensus_core::{blockhash::BlockHashes, BlockHashMap, BlueWorkType};
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbKey, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::perf::DEFAULT_CACHE_SIZE;

pub type HashKTypeMap = Arc<BlockHashMap<KType>>;

/// K is bounded from above by the mergeset size limit, which comfortably fits a u8
pub type KType = u8;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct GhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
    /// The ordered merge-set blues. The selected parent is always the first entry
    pub mergeset_blues: BlockHashes,
    pub mergeset_reds: BlockHashes,
    pub blues_anticone_sizes: HashKTypeMap,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompactGhostdagData {
    pub blue_score: u64,
    pub blue_work: BlueWorkType,
    pub selected_parent: Hash,
}

impl From<&GhostdagData> for CompactGhostdagData {
    fn from(value: &GhostdagData) -> Self {
        Self { blue_score: value.blue_score, blue_work: value.blue_work, selected_parent: value.selected_parent }
    }
}

impl GhostdagData {
    pub fn new(
        blue_score: u64,
        blue_work: BlueWorkType,
        selected_parent: Hash,
        mergeset_blues: BlockHashes,
        mergeset_reds: BlockHashes,
        blues_anticone_sizes: HashKTypeMap,
    ) -> Self {
        Self { blue_score, blue_work, selected_parent, mergeset_blues, mergeset_reds, blues_anticone_sizes }
    }

    pub fn new_with_selected_parent(selected_parent: Hash, k: KType) -> Self {
        let mut mergeset_blues: Vec<Hash> = Vec::with_capacity(k as usize + 1);
        let mut blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(k as usize);
        mergeset_blues.push(selected_parent);
        blues_anticone_sizes.insert(selected_parent, 0);

        Self {
            blue_score: Default::default(),
            blue_work: Default::default(),
            selected_parent,
            mergeset_blues: BlockHashes::new(mergeset_blues),
            mergeset_reds: Default::default(),
            blues_anticone_sizes: HashKTypeMap::new(blues_anticone_sizes),
        }
    }

    /// The number of blocks in this block's merge set, i.e. blues (sans the
    /// selected parent) plus reds plus the selected parent itself
    pub fn mergeset_size(&self) -> usize {
        self.mergeset_blues.len() + self.mergeset_reds.len()
    }

    /// Returns an iterator over the merge set in no particular order
    pub fn unordered_mergeset(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().cloned().chain(self.mergeset_reds.iter().cloned())
    }

    pub fn unordered_mergeset_without_selected_parent(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().skip(1).cloned().chain(self.mergeset_reds.iter().cloned())
    }

    /// Returns the merge set in consensus order: blues first (selected parent
    /// leading), then reds
    pub fn consensus_ordered_mergeset(&self) -> impl Iterator<Item = Hash> + '_ {
        self.mergeset_blues.iter().cloned().chain(self.mergeset_reds.iter().cloned())
    }

    pub fn add_blue(self: &mut Arc<Self>, block: Hash, blue_anticone_size: KType, block_anticone_sizes: &BlockHashMap<KType>) {
        let data = Arc::make_mut(self);
        Arc::make_mut(&mut data.mergeset_blues).push(block);
        let anticone_sizes = Arc::make_mut(&mut data.blues_anticone_sizes);
        anticone_sizes.insert(block, blue_anticone_size);
        // All existing blues with the new block in their anticone gain one
        for (blue, size) in block_anticone_sizes {
            anticone_sizes.insert(*blue, size + 1);
        }
    }

    pub fn add_red(self: &mut Arc<Self>, block: Hash) {
        let data = Arc::make_mut(self);
        Arc::make_mut(&mut data.mergeset_reds).push(block);
    }

    pub fn finalize_score_and_work(self: &mut Arc<Self>, blue_score: u64, blue_work: BlueWorkType) {
        let data = Arc::make_mut(self);
        data.blue_score = blue_score;
        data.blue_work = blue_work;
    }
}

pub trait GhostdagStoreReader {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError>;
    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError>;
    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError>;
    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError>;
    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError>;
    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError>;
    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

pub trait GhostdagStore: GhostdagStoreReader {
    /// Insert GHOSTDAG data for block `hash`. The data is expected to be
    /// immutable so errors if the hash was already inserted.
    fn insert(&self, writer: impl DbWriter, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError>;
}

/// A DB + cache implementation of `GhostdagStore` trait, with concurrency support
#[derive(Clone)]
pub struct DbGhostdagStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<GhostdagData>>,
    compact_access: CachedDbAccess<Hash, CompactGhostdagData>,
}

impl DbGhostdagStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(Arc::clone(&db), DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::Ghostdag.into()),
            compact_access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::GhostdagCompact.into()),
        }
    }
}

impl GhostdagStoreReader for DbGhostdagStore {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError> {
        Ok(self.compact_access.read(hash)?.blue_score)
    }

    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError> {
        Ok(self.compact_access.read(hash)?.blue_work)
    }

    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.compact_access.read(hash)?.selected_parent)
    }

    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.access.read(hash)?.mergeset_blues))
    }

    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.access.read(hash)?.mergeset_reds))
    }

    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError> {
        Ok(HashKTypeMap::clone(&self.access.read(hash)?.blues_anticone_sizes))
    }

    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError> {
        self.access.read(hash)
    }

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError> {
        self.compact_access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.access.has(hash)
    }
}

impl GhostdagStore for DbGhostdagStore {
    fn insert(&self, mut writer: impl DbWriter, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError> {
        if self.access.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.access.write(&mut writer, hash, data.clone())?;
        self.compact_access.write(&mut writer, hash, CompactGhostdagData::from(data.as_ref()))?;
        Ok(())
    }
}

/// An in-memory implementation of `GhostdagStore` suitable for tests
pub struct MemoryGhostdagStore {
    map: parking_lot::RwLock<BlockHashMap<Arc<GhostdagData>>>,
}

impl MemoryGhostdagStore {
    pub fn new() -> Self {
        Self { map: parking_lot::RwLock::new(BlockHashMap::new()) }
    }
}

impl Default for MemoryGhostdagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GhostdagStoreReader for MemoryGhostdagStore {
    fn get_blue_score(&self, hash: Hash) -> Result<u64, StoreError> {
        Ok(self.get_data(hash)?.blue_score)
    }

    fn get_blue_work(&self, hash: Hash) -> Result<BlueWorkType, StoreError> {
        Ok(self.get_data(hash)?.blue_work)
    }

    fn get_selected_parent(&self, hash: Hash) -> Result<Hash, StoreError> {
        Ok(self.get_data(hash)?.selected_parent)
    }

    fn get_mergeset_blues(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.get_data(hash)?.mergeset_blues))
    }

    fn get_mergeset_reds(&self, hash: Hash) -> Result<BlockHashes, StoreError> {
        Ok(BlockHashes::clone(&self.get_data(hash)?.mergeset_reds))
    }

    fn get_blues_anticone_sizes(&self, hash: Hash) -> Result<HashKTypeMap, StoreError> {
        Ok(HashKTypeMap::clone(&self.get_data(hash)?.blues_anticone_sizes))
    }

    fn get_data(&self, hash: Hash) -> Result<Arc<GhostdagData>, StoreError> {
        self.map
            .read()
            .get(&hash)
            .cloned()
            .ok_or_else(|| StoreError::KeyNotFound(DbKey::new(DatabaseStorePrefixes::Ghostdag.as_ref(), hash)))
    }

    fn get_compact_data(&self, hash: Hash) -> Result<CompactGhostdagData, StoreError> {
        Ok(CompactGhostdagData::from(self.get_data(hash)?.as_ref()))
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        Ok(self.map.read().contains_key(&hash))
    }
}

impl GhostdagStore for MemoryGhostdagStore {
    fn insert(&self, _writer: impl DbWriter, hash: Hash, data: Arc<GhostdagData>) -> Result<(), StoreError> {
        if self.map.read().contains_key(&hash) {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.map.write().insert(hash, data);
        Ok(())
    }
}
