use kaspad_consensus_core::header::Header;
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::constants::perf::{DEFAULT_CACHE_SIZE, LARGE_DATA_CACHE_SIZE};

/// A subset of header fields hot consensus paths read repeatedly
#[derive(Clone, Copy, Serialize, Deserialize)]
pub struct CompactHeaderData {
    pub timestamp: u64,
    pub bits: u32,
    pub version: u16,
}

pub trait HeaderStoreReader {
    fn get_timestamp(&self, hash: Hash) -> Result<u64, StoreError>;
    fn get_bits(&self, hash: Hash) -> Result<u32, StoreError>;
    fn get_header(&self, hash: Hash) -> Result<Arc<Header>, StoreError>;
    fn get_compact_header_data(&self, hash: Hash) -> Result<CompactHeaderData, StoreError>;
    fn has(&self, hash: Hash) -> Result<bool, StoreError>;
}

pub trait HeaderStore: HeaderStoreReader {
    fn insert(&self, writer: impl DbWriter, hash: Hash, header: Arc<Header>) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbHeadersStore {
    db: Arc<DB>,
    access: CachedDbAccess<Hash, Arc<Header>>,
    compact_access: CachedDbAccess<Hash, CompactHeaderData>,
}

impl DbHeadersStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: Arc::clone(&db),
            access: CachedDbAccess::new(Arc::clone(&db), LARGE_DATA_CACHE_SIZE, DatabaseStorePrefixes::Headers.into()),
            compact_access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::HeadersCompact.into()),
        }
    }
}

impl HeaderStoreReader for DbHeadersStore {
    fn get_timestamp(&self, hash: Hash) -> Result<u64, StoreError> {
        Ok(self.compact_access.read(hash)?.timestamp)
    }

    fn get_bits(&self, hash: Hash) -> Result<u32, StoreError> {
        Ok(self.compact_access.read(hash)?.bits)
    }

    fn get_header(&self, hash: Hash) -> Result<Arc<Header>, StoreError> {
        self.access.read(hash)
    }

    fn get_compact_header_data(&self, hash: Hash) -> Result<CompactHeaderData, StoreError> {
        self.compact_access.read(hash)
    }

    fn has(&self, hash: Hash) -> Result<bool, StoreError> {
        self.compact_access.has(hash)
    }
}

impl HeaderStore for DbHeadersStore {
    fn insert(&self, mut writer: impl DbWriter, hash: Hash, header: Arc<Header>) -> Result<(), StoreError> {
        if self.compact_access.has(hash)? {
            return Err(StoreError::KeyAlreadyExists(hash.to_string()));
        }
        self.compact_access.write(
            &mut writer,
            hash,
            CompactHeaderData { timestamp: header.timestamp, bits: header.bits, version: header.version },
        )?;
        self.access.write(&mut writer, hash, header)?;
        Ok(())
    }
}
