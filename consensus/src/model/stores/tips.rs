use kaspad_consensus_core::blockhash::BlockHashes;
use kaspad_database::prelude::{CachedDbItem, DatabaseStorePrefixes, DbWriter, StoreError, DB};
use kaspad_hashes::Hash;
use std::sync::Arc;

/// Reader API for the current DAG tips (blocks with no children)
pub trait TipsStoreReader {
    fn get(&self) -> Result<BlockHashes, StoreError>;
}

pub trait TipsStore: TipsStoreReader {
    /// Adds a new tip, removing any of its direct parents from the tip set
    fn add_tip(&mut self, writer: impl DbWriter, new_tip: Hash, new_tip_parents: &[Hash]) -> Result<BlockHashes, StoreError>;
    fn init(&mut self, writer: impl DbWriter, initial_tip: Hash) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct DbTipsStore {
    db: Arc<DB>,
    access: CachedDbItem<BlockHashes>,
}

impl DbTipsStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self { db: Arc::clone(&db), access: CachedDbItem::new(db, DatabaseStorePrefixes::Tips.into()) }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.access.read(), Ok(_))
    }
}

impl TipsStoreReader for DbTipsStore {
    fn get(&self) -> Result<BlockHashes, StoreError> {
        self.access.read()
    }
}

impl TipsStore for DbTipsStore {
    fn add_tip(&mut self, writer: impl DbWriter, new_tip: Hash, new_tip_parents: &[Hash]) -> Result<BlockHashes, StoreError> {
        let current = self.access.read()?;
        let mut new_tips: Vec<Hash> = current.iter().copied().filter(|tip| !new_tip_parents.contains(tip)).collect();
        new_tips.push(new_tip);
        let new_tips = BlockHashes::new(new_tips);
        self.access.write(writer, &new_tips)?;
        Ok(new_tips)
    }

    fn init(&mut self, writer: impl DbWriter, initial_tip: Hash) -> Result<(), StoreError> {
        self.access.write(writer, &BlockHashes::new(vec![initial_tip]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_database::prelude::{create_temp_db, DirectDbWriter};

    #[test]
    fn test_add_tip_replaces_parents() {
        let (_lifetime, db) = create_temp_db();
        let mut store = DbTipsStore::new(db.clone());
        assert!(!store.is_initialized());

        store.init(DirectDbWriter::new(&db), 1.into()).unwrap();
        store.add_tip(DirectDbWriter::new(&db), 2.into(), &[1.into()]).unwrap();
        store.add_tip(DirectDbWriter::new(&db), 3.into(), &[1.into()]).unwrap();
        let tips = store.add_tip(DirectDbWriter::new(&db), 4.into(), &[2.into(), 3.into()]).unwrap();
        assert_eq!(tips.as_slice(), &[Hash::from(4u64)]);
    }
}
