use crate::{
    db::DB,
    errors::{StoreError, StoreResult},
    key::DbKey,
    writer::DbWriter,
};
use parking_lot::RwLock;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// A cached DB item with concurrency support
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: Vec<u8>,
    cached_item: Arc<RwLock<Option<T>>>,
}

impl<T> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: Vec<u8>) -> Self {
        Self { db, key, cached_item: Arc::new(RwLock::new(None)) }
    }

    pub fn read(&self) -> StoreResult<T>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        if let Some(slice) = self.db.get_pinned(&self.key)? {
            let item: T = bincode::deserialize(&slice)?;
            *self.cached_item.write() = Some(item.clone());
            Ok(item)
        } else {
            Err(StoreError::KeyNotFound(DbKey::prefix_only(&self.key)))
        }
    }

    pub fn write(&mut self, mut writer: impl DbWriter, item: &T) -> StoreResult<()>
    where
        T: Clone + Serialize,
    {
        *self.cached_item.write() = Some(item.clone());
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        Ok(())
    }

    pub fn remove(&mut self, mut writer: impl DbWriter) -> StoreResult<()> {
        *self.cached_item.write() = None;
        writer.delete(&self.key)?;
        Ok(())
    }

    /// Updates the item by applying `op` to the current value, writing the
    /// result back through `writer` and returning it
    pub fn update<F>(&mut self, mut writer: impl DbWriter, op: F) -> StoreResult<T>
    where
        T: Clone + Serialize + DeserializeOwned,
        F: Fn(T) -> T,
    {
        let mut guard = self.cached_item.write();
        let item = if let Some(item) = guard.take() {
            item
        } else if let Some(slice) = self.db.get_pinned(&self.key)? {
            bincode::deserialize(&slice)?
        } else {
            return Err(StoreError::KeyNotFound(DbKey::prefix_only(&self.key)));
        };

        let new_item = op(item);
        *guard = Some(new_item.clone());
        let bin_data = bincode::serialize(&new_item)?;
        writer.put(&self.key, bin_data)?;
        Ok(new_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::{create_temp_db, DirectDbWriter};

    #[test]
    fn test_item_read_write_update() {
        let (_lifetime, db) = create_temp_db();
        let mut item = CachedDbItem::<u64>::new(db.clone(), b"test-item".to_vec());

        assert!(matches!(item.read(), Err(StoreError::KeyNotFound(_))));
        item.write(DirectDbWriter::new(&db), &5).unwrap();
        assert_eq!(item.read().unwrap(), 5);

        let updated = item.update(DirectDbWriter::new(&db), |v| v + 10).unwrap();
        assert_eq!(updated, 15);

        // A fresh accessor sees the persisted value
        let fresh = CachedDbItem::<u64>::new(db.clone(), b"test-item".to_vec());
        assert_eq!(fresh.read().unwrap(), 15);
    }
}
