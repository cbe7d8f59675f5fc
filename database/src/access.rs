use crate::{
    cache::Cache,
    db::DB,
    errors::{StoreError, StoreResult},
};

use super::prelude::{DbKey, DbWriter};
use rocksdb::{Direction, IteratorMode, ReadOptions};
use serde::{de::DeserializeOwned, Serialize};
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

type KeyDataResult<TKey, TData> = StoreResult<(TKey, TData)>;

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_size: u64, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_size), prefix }
    }

    pub fn read_from_cache(&self, key: TKey) -> Option<TData>
    where
        TKey: Copy + AsRef<[u8]>,
    {
        self.cache.get(&key)
    }

    pub fn has(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
    {
        Ok(self.cache.contains_key(&key) || self.db.get_pinned(DbKey::new(&self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> Result<TData, StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
        TData: DeserializeOwned, // We need `DeserializeOwned` since the slice coming from `db.get_pinned` has a short lifetime
    {
        if let Some(data) = self.cache.get(&key) {
            Ok(data)
        } else {
            let db_key = DbKey::new(&self.prefix, key.clone());
            if let Some(slice) = self.db.get_pinned(&db_key)? {
                let data: TData = bincode::deserialize(&slice)?;
                self.cache.insert(key, data.clone());
                Ok(data)
            } else {
                Err(StoreError::KeyNotFound(db_key))
            }
        }
    }

    pub fn iterator(&self) -> impl Iterator<Item = KeyDataResult<TKey, TData>> + '_
    where
        TKey: Clone + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>,
        TData: DeserializeOwned,
    {
        let prefix_key = DbKey::prefix_only(&self.prefix);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix_key.as_ref()));
        self.db.iterator_opt(IteratorMode::From(prefix_key.as_ref(), Direction::Forward), read_opts).map(move |iter_result| {
            match iter_result {
                Ok((key_bytes, data_bytes)) => match TKey::try_from(&key_bytes[self.prefix.len()..]) {
                    Ok(key) => match bincode::deserialize(&data_bytes) {
                        Ok(data) => Ok((key, data)),
                        Err(e) => Err(StoreError::DeserializationError(e)),
                    },
                    Err(_) => Err(StoreError::ConversionError(format!("failed to deserialize key: {:?}", key_bytes))),
                },
                Err(e) => Err(StoreError::DbError(e)),
            }
        })
    }

    /// A dynamic iterator seeking from a start point within the bucket
    pub fn seek_iterator(
        &self,
        seek_from: Option<TKey>, // iter whole range if None
        limit: usize,            // amount to take.
        skip_first: bool,        // skips the first value, (useful in conjunction with the seek-key, as to not re-retrieve).
    ) -> impl Iterator<Item = KeyDataResult<TKey, TData>> + '_
    where
        TKey: Clone + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>,
        TData: DeserializeOwned,
    {
        let prefix_key = DbKey::prefix_only(&self.prefix);
        let mut read_opts = ReadOptions::default();
        read_opts.set_iterate_range(rocksdb::PrefixRange(prefix_key.as_ref()));

        let mut db_iterator = match seek_from {
            Some(seek_key) => {
                self.db.iterator_opt(IteratorMode::From(DbKey::new(&self.prefix, seek_key).as_ref(), Direction::Forward), read_opts)
            }
            None => self.db.iterator_opt(IteratorMode::Start, read_opts),
        };

        if skip_first {
            db_iterator.next();
        }

        db_iterator.take(limit).map(move |item| match item {
            Ok((ref key_bytes, ref data_bytes)) => match bincode::deserialize::<TData>(data_bytes.as_ref()) {
                Ok(data) => Ok((
                    TKey::try_from(&key_bytes[self.prefix.len()..])
                        .map_err(|_e| StoreError::ConversionError(format!("failed to deserialize key: {:?}", &key_bytes)))?,
                    data,
                )),
                Err(e) => Err(StoreError::DeserializationError(e)),
            },
            Err(e) => Err(StoreError::DbError(e)),
        })
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: TData) -> Result<(), StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        self.cache.insert(key.clone(), data);
        writer.put(DbKey::new(&self.prefix, key), bin_data)?;
        Ok(())
    }

    pub fn write_many(
        &self,
        mut writer: impl DbWriter,
        iter: &mut (impl Iterator<Item = (TKey, TData)> + Clone),
    ) -> Result<(), StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
        TData: Serialize,
    {
        let iter_clone = iter.clone();
        self.cache.insert_many(iter);
        for (key, data) in iter_clone {
            let bin_data = bincode::serialize(&data)?;
            writer.put(DbKey::new(&self.prefix, key.clone()), bin_data)?;
        }
        Ok(())
    }

    pub fn delete(&self, mut writer: impl DbWriter, key: TKey) -> Result<(), StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
    {
        self.cache.remove(&key);
        writer.delete(DbKey::new(&self.prefix, key))?;
        Ok(())
    }

    pub fn delete_many(&self, mut writer: impl DbWriter, key_iter: &mut (impl Iterator<Item = TKey> + Clone)) -> Result<(), StoreError>
    where
        TKey: Clone + AsRef<[u8]>,
    {
        let key_iter_clone = key_iter.clone();
        self.cache.remove_many(key_iter);
        for key in key_iter_clone {
            writer.delete(DbKey::new(&self.prefix, key.clone()))?;
        }
        Ok(())
    }

    pub fn prefix(&self) -> &[u8] {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{create_temp_db, BatchDbWriter, DirectDbWriter};
    use kaspad_hashes::Hash;
    use rocksdb::WriteBatch;

    #[test]
    fn test_write_read_delete() {
        let (_lifetime, db) = create_temp_db();
        let access = CachedDbAccess::<Hash, u64>::new(db.clone(), 2, vec![1, 2]);

        access.write_many(DirectDbWriter::new(&db), &mut (0..16u64).map(|i| (i.into(), i))).unwrap();
        assert_eq!(16, access.iterator().count());
        assert!(access.has(3.into()).unwrap());
        assert_eq!(access.read(7.into()).unwrap(), 7);

        access.delete(DirectDbWriter::new(&db), 7.into()).unwrap();
        assert!(matches!(access.read(7.into()), Err(StoreError::KeyNotFound(_))));
        assert_eq!(15, access.iterator().count());
    }

    #[test]
    fn test_batch_writes_are_atomic() {
        let (_lifetime, db) = create_temp_db();
        let access = CachedDbAccess::<Hash, u64>::new(db.clone(), 0, vec![7]);

        // Uncommitted batch writes must not be visible to reads
        let mut batch = WriteBatch::default();
        access.write(BatchDbWriter::new(&mut batch), 1.into(), 100).unwrap();
        assert!(!access.has(1.into()).unwrap());

        db.write(batch).unwrap();
        assert_eq!(access.read(1.into()).unwrap(), 100);
    }

    #[test]
    fn test_seek_iterator() {
        let (_lifetime, db) = create_temp_db();
        let access = CachedDbAccess::<Hash, u64>::new(db.clone(), 0, vec![9]);
        access.write_many(DirectDbWriter::new(&db), &mut (0..8u64).map(|i| (i.into(), i))).unwrap();

        let all: Vec<_> = access.seek_iterator(None, usize::MAX, false).collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), 8);

        let limited: Vec<_> = access.seek_iterator(None, 3, false).collect::<Result<_, _>>().unwrap();
        assert_eq!(limited.len(), 3);
    }
}
