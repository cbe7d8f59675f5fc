use indexmap::IndexMap;
use parking_lot::RwLock;
use rand::Rng;
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A bounded cache evicting a random entry when full. We use IndexMap and not
/// HashMap because it makes it cheap to remove a random element.
#[derive(Clone)]
pub struct Cache<TKey: Clone + std::hash::Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S = RandomState> {
    map: Arc<RwLock<IndexMap<TKey, TData, S>>>,
    size: usize,
}

impl<TKey: Clone + std::hash::Hash + Eq + Send + Sync, TData: Clone + Send + Sync, S: BuildHasher + Default> Cache<TKey, TData, S> {
    pub fn new(size: u64) -> Self {
        Self { map: Arc::new(RwLock::new(IndexMap::with_capacity_and_hasher(size as usize, S::default()))), size: size as usize }
    }

    pub fn clear(&self) {
        self.map.write().clear();
    }

    pub(crate) fn get(&self, key: &TKey) -> Option<TData> {
        self.map.read().get(key).cloned()
    }

    pub(crate) fn insert(&self, key: TKey, data: TData) {
        if self.size == 0 {
            return;
        }
        let mut write_guard = self.map.write();
        if write_guard.len() == self.size {
            write_guard.swap_remove_index(rand::thread_rng().gen_range(0..self.size));
        }
        write_guard.insert(key, data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_size() {
        let cache: Cache<u64, u64> = Cache::new(4);
        for i in 0..100 {
            cache.insert(i, i * 10);
        }
        let present = (0..100).filter(|i| cache.get(i).is_some()).count();
        assert_eq!(present, 4);
    }

    #[test]
    fn test_zero_size_is_noop() {
        let cache: Cache<u64, u64> = Cache::new(0);
        cache.insert(1, 1);
        assert!(cache.get(&1).is_none());
    }
}
