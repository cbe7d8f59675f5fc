//!
//! Test utils for reachability
//!
use super::{inquirer::*, interval::Interval, tree::add_tree_block};
use crate::model::stores::{
    reachability::{MemoryReachabilityStore, ReachabilityStore, ReachabilityStoreReader},
    relations::{MemoryRelationsStore, RelationsStore, RelationsStoreReader},
};
use kaspad_consensus_core::blockhash::{BlockHashes, ORIGIN};
use kaspad_database::prelude::StoreError;
use kaspad_hashes::Hash;
use std::collections::{HashSet, VecDeque};
use thiserror::Error;

/// A struct with fluent API to streamline reachability store building
pub struct StoreBuilder<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
}

impl<'a, T: ReachabilityStore + ?Sized> StoreBuilder<'a, T> {
    pub fn new(store: &'a mut T) -> Self {
        Self { store }
    }

    pub fn add_block(&mut self, hash: Hash, parent: Hash) -> &mut Self {
        let parent_height = if !parent.is_zero() { self.store.append_child(parent, hash).unwrap() } else { 0 };
        self.store.insert(hash, parent, Interval::empty(), parent_height + 1).unwrap();
        self
    }
}

/// A struct with fluent API to streamline tree building
pub struct TreeBuilder<'a, T: ReachabilityStore + ?Sized> {
    store: &'a mut T,
}

impl<'a, T: ReachabilityStore + ?Sized> TreeBuilder<'a, T> {
    pub fn new(store: &'a mut T) -> Self {
        Self { store }
    }

    pub fn init(&mut self) -> &mut Self {
        init(self.store).unwrap();
        self
    }

    pub fn init_with_params(&mut self, root: Hash, capacity: Interval) -> &mut Self {
        self.store.init(root, capacity).unwrap();
        self
    }

    pub fn add_block(&mut self, hash: Hash, parent: Hash) -> &mut Self {
        add_tree_block(self.store, hash, parent).unwrap();
        self
    }

    pub fn store(&self) -> &&'a mut T {
        &self.store
    }
}

#[derive(Clone)]
pub struct DagBlock {
    pub hash: Hash,
    pub parents: Vec<Hash>,
}

impl DagBlock {
    pub fn new(hash: Hash, parents: Vec<Hash>) -> Self {
        Self { hash, parents }
    }
}

/// A struct with fluent API to streamline DAG building
pub struct DagBuilder<'a> {
    reachability: &'a mut MemoryReachabilityStore,
    relations: &'a mut MemoryRelationsStore,
}

impl<'a> DagBuilder<'a> {
    pub fn new(reachability: &'a mut MemoryReachabilityStore, relations: &'a mut MemoryRelationsStore) -> Self {
        Self { reachability, relations }
    }

    pub fn init(&mut self) -> &mut Self {
        init(self.reachability).unwrap();
        self
    }

    pub fn add_block(&mut self, block: DagBlock) -> &mut Self {
        // Select by height (longest chain) just for the sake of internal isolated tests
        let selected_parent = block
            .parents
            .iter()
            .copied()
            .max_by_key(|p| self.reachability.get_height(*p).unwrap())
            .expect("expecting at least one parent");
        let mergeset = self.mergeset(&block, selected_parent);
        add_block(self.reachability, block.hash, selected_parent, &mut mergeset.into_iter()).unwrap();
        self.relations.insert(block.hash, BlockHashes::new(block.parents)).unwrap();
        self
    }

    fn mergeset(&self, block: &DagBlock, selected_parent: Hash) -> Vec<Hash> {
        let mut queue: VecDeque<Hash> = block.parents.iter().copied().filter(|p| *p != selected_parent).collect();
        let mut mergeset: HashSet<Hash> = queue.iter().copied().collect();
        let mut past = HashSet::new();

        while let Some(current) = queue.pop_front() {
            let parents = match self.relations.get_parents(current) {
                Ok(parents) => parents,
                Err(StoreError::KeyNotFound(_)) => continue, // Genesis or origin
                Err(e) => panic!("unexpected store error: {e:?}"),
            };
            for parent in parents.iter().copied() {
                if mergeset.contains(&parent) || past.contains(&parent) {
                    continue;
                }
                if is_dag_ancestor_of(self.reachability, parent, selected_parent).unwrap() {
                    past.insert(parent);
                    continue;
                }
                mergeset.insert(parent);
                queue.push_back(parent);
            }
        }
        mergeset.into_iter().collect()
    }
}

/// Brute-force ancestry helper for validating the reachability oracle
pub trait BruteForceAncestryExtensions {
    fn bfs_is_ancestor(&self, this: Hash, queried: Hash) -> bool;
}

impl BruteForceAncestryExtensions for MemoryRelationsStore {
    fn bfs_is_ancestor(&self, this: Hash, queried: Hash) -> bool {
        // `this` is an ancestor of `queried` iff a parent-walk from `queried` reaches it
        if this == queried {
            return true;
        }
        let mut queue = VecDeque::from([queried]);
        let mut visited = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if current == this {
                return true;
            }
            let parents = match self.get_parents(current) {
                Ok(parents) => parents,
                Err(_) => continue,
            };
            for parent in parents.iter().copied() {
                if visited.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }
        false
    }
}

#[derive(Error, Debug)]
pub enum TestError {
    #[error("data store error")]
    StoreError(#[from] StoreError),

    #[error("empty interval")]
    EmptyInterval(Hash, Interval),

    #[error("sibling intervals are expected to be consecutive")]
    NonConsecutiveSiblingIntervals(Interval, Interval),

    #[error("child interval out of parent bounds")]
    IntervalOutOfParentBounds { parent: Hash, child: Hash, parent_interval: Interval, child_interval: Interval },
}

pub trait StoreValidationExtensions {
    /// Checks if `block` is in the past of `other` (creates hashes from the u64 numbers)
    fn in_past_of(&self, block: u64, other: u64) -> bool;

    /// Checks if `block` and `other` are in the anticone of each other
    /// (creates hashes from the u64 numbers)
    fn are_anticone(&self, block: u64, other: u64) -> bool;

    /// Validates that all tree intervals match the expected interval relations
    fn validate_intervals(&self, root: Hash) -> std::result::Result<(), TestError>;
}

impl<T: ReachabilityStoreReader + ?Sized> StoreValidationExtensions for T {
    fn in_past_of(&self, block: u64, other: u64) -> bool {
        if block == other {
            return false;
        }
        let res = is_dag_ancestor_of(self, block.into(), other.into()).unwrap();
        if res {
            // Assert that the `future` relation is indeed asymmetric
            assert!(!is_dag_ancestor_of(self, other.into(), block.into()).unwrap())
        }
        res
    }

    fn are_anticone(&self, block: u64, other: u64) -> bool {
        !is_dag_ancestor_of(self, block.into(), other.into()).unwrap()
            && !is_dag_ancestor_of(self, other.into(), block.into()).unwrap()
    }

    fn validate_intervals(&self, root: Hash) -> std::result::Result<(), TestError> {
        let mut queue = VecDeque::<Hash>::from([root]);
        while let Some(parent) = queue.pop_front() {
            let children = self.get_children(parent)?;
            queue.extend(children.iter());

            let parent_interval = self.get_interval(parent)?;
            if parent_interval.is_empty() {
                return Err(TestError::EmptyInterval(parent, parent_interval));
            }

            // Verify parent-child strict relation
            for child in children.iter().cloned() {
                let child_interval = self.get_interval(child)?;
                if !parent_interval.strictly_contains(child_interval) {
                    return Err(TestError::IntervalOutOfParentBounds { parent, child, parent_interval, child_interval });
                }
            }

            // Iterate over consecutive siblings
            for siblings in children.windows(2) {
                let sibling_interval = self.get_interval(siblings[0])?;
                let current_interval = self.get_interval(siblings[1])?;
                if sibling_interval.end + 1 != current_interval.start {
                    return Err(TestError::NonConsecutiveSiblingIntervals(sibling_interval, current_interval));
                }
            }
        }
        Ok(())
    }
}
