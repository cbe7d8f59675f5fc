use kaspad_consensus_core::{
    tx::{TransactionOutpoint, UtxoEntry},
    utxo::{utxo_collection::UtxoCollection, utxo_diff::UtxoDiff},
};
use kaspad_database::prelude::{CachedDbAccess, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::{Hash, HASH_SIZE};
use std::sync::Arc;

use crate::constants::perf::DEFAULT_CACHE_SIZE;

/// The fixed-width DB key of a UTXO entry: transaction id followed by the
/// big-endian output index (BE keeps entries of a transaction consecutive)
#[derive(Clone, Copy, Hash, PartialEq, Eq)]
struct UtxoKey([u8; HASH_SIZE + 4]);

impl AsRef<[u8]> for UtxoKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<TransactionOutpoint> for UtxoKey {
    fn from(outpoint: TransactionOutpoint) -> Self {
        let mut bytes = [0u8; HASH_SIZE + 4];
        bytes[..HASH_SIZE].copy_from_slice(&outpoint.transaction_id.as_bytes());
        bytes[HASH_SIZE..].copy_from_slice(&outpoint.index.to_be_bytes());
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for UtxoKey {
    type Error = std::array::TryFromSliceError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        Ok(Self(<[u8; HASH_SIZE + 4]>::try_from(value)?))
    }
}

impl From<UtxoKey> for TransactionOutpoint {
    fn from(key: UtxoKey) -> Self {
        let transaction_id = Hash::from_slice(&key.0[..HASH_SIZE]);
        let index = u32::from_be_bytes(key.0[HASH_SIZE..].try_into().expect("slice is exactly 4 bytes"));
        Self::new(transaction_id, index)
    }
}

/// Persists the full virtual UTXO set
pub trait VirtualUtxoSetStoreReader {
    fn get(&self, outpoint: &TransactionOutpoint) -> Result<UtxoEntry, StoreError>;
    fn iterate_all(&self) -> Result<UtxoCollection, StoreError>;
}

pub trait VirtualUtxoSetStore: VirtualUtxoSetStoreReader {
    /// Applies the given diff to the persisted set
    fn write_diff(&self, writer: impl DbWriter, diff: &UtxoDiff) -> Result<(), StoreError>;
    fn write_many(&self, writer: impl DbWriter, collection: &UtxoCollection) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbVirtualUtxoSetStore {
    db: Arc<DB>,
    access: CachedDbAccess<UtxoKey, UtxoEntry>,
}

impl DbVirtualUtxoSetStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbAccess::new(db, DEFAULT_CACHE_SIZE, DatabaseStorePrefixes::VirtualUtxoset.into()) }
    }
}

impl VirtualUtxoSetStoreReader for DbVirtualUtxoSetStore {
    fn get(&self, outpoint: &TransactionOutpoint) -> Result<UtxoEntry, StoreError> {
        self.access.read(UtxoKey::from(*outpoint))
    }

    fn iterate_all(&self) -> Result<UtxoCollection, StoreError> {
        let mut collection = UtxoCollection::new();
        for pair in self.access.iterator() {
            let (key, entry) = pair?;
            collection.insert(key.into(), entry);
        }
        Ok(collection)
    }
}

impl VirtualUtxoSetStore for DbVirtualUtxoSetStore {
    fn write_diff(&self, mut writer: impl DbWriter, diff: &UtxoDiff) -> Result<(), StoreError> {
        for outpoint in diff.remove.keys() {
            self.access.delete(&mut writer, UtxoKey::from(*outpoint))?;
        }
        for (outpoint, entry) in diff.add.iter() {
            self.access.write(&mut writer, UtxoKey::from(*outpoint), entry.clone())?;
        }
        Ok(())
    }

    fn write_many(&self, mut writer: impl DbWriter, collection: &UtxoCollection) -> Result<(), StoreError> {
        for (outpoint, entry) in collection.iter() {
            self.access.write(&mut writer, UtxoKey::from(*outpoint), entry.clone())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utxo_key_round_trip() {
        let outpoint = TransactionOutpoint::new(Hash::from_u64_word(0xabcdef), 0x01020304);
        let key = UtxoKey::from(outpoint);
        assert_eq!(TransactionOutpoint::from(key), outpoint);
    }
}
