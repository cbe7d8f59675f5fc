use std::sync::Arc;

use crate::model::stores::reachability::{DbReachabilityStore, ReachabilityStoreReader};
use crate::processes::reachability::{inquirer, Result};
use kaspad_hashes::Hash;
use parking_lot::RwLock;

/// Multi-threaded reachability service wrapping the shared store lock
#[derive(Clone)]
pub struct MTReachabilityService {
    store: Arc<RwLock<DbReachabilityStore>>,
}

impl MTReachabilityService {
    pub fn new(store: Arc<RwLock<DbReachabilityStore>>) -> Self {
        Self { store }
    }

    pub fn has(&self, hash: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        Ok(read_guard.has(hash)?)
    }

    pub fn is_chain_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::is_chain_ancestor_of(&*read_guard, this, queried)
    }

    pub fn is_strict_chain_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::is_strict_chain_ancestor_of(&*read_guard, this, queried)
    }

    pub fn is_dag_ancestor_of(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::is_dag_ancestor_of(&*read_guard, this, queried)
    }

    pub fn are_anticone(&self, this: Hash, queried: Hash) -> Result<bool> {
        let read_guard = self.store.read();
        inquirer::are_anticone(&*read_guard, this, queried)
    }

    pub fn get_next_chain_ancestor(&self, descendant: Hash, ancestor: Hash) -> Result<Hash> {
        let read_guard = self.store.read();
        inquirer::get_next_chain_ancestor(&*read_guard, descendant, ancestor)
    }
}
