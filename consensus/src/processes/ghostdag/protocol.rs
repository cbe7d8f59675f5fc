use std::sync::Arc;

use kaspad_consensus_core::{blockhash::ORIGIN, BlockHashMap, BlueWorkType};
use kaspad_hashes::Hash;

use crate::{
    model::{
        services::reachability::MTReachabilityService,
        stores::{
            ghostdag::{GhostdagData, GhostdagStoreReader, HashKTypeMap, KType},
            headers::HeaderStoreReader,
            relations::RelationsStoreReader,
        },
    },
    processes::difficulty::calc_work,
};

use super::{mergeset::unordered_mergeset_without_selected_parent, ordering::SortableBlock};

/// Runs the GHOSTDAG coloring protocol: given the parents of a block it
/// selects the parent with the highest accumulated blue work, computes the
/// ordered merge set, and colors each merge-set block blue as long as the
/// k-cluster rule is maintained.
#[derive(Clone)]
pub struct GhostdagManager<T: GhostdagStoreReader, S: RelationsStoreReader, U: HeaderStoreReader> {
    genesis_hash: Hash,
    pub(super) k: KType,
    ghostdag_store: Arc<T>,
    relations_store: Arc<S>,
    headers_store: Arc<U>,
    reachability_service: MTReachabilityService,
}

impl<T: GhostdagStoreReader, S: RelationsStoreReader, U: HeaderStoreReader> GhostdagManager<T, S, U> {
    pub fn new(
        genesis_hash: Hash,
        k: KType,
        ghostdag_store: Arc<T>,
        relations_store: Arc<S>,
        headers_store: Arc<U>,
        reachability_service: MTReachabilityService,
    ) -> Self {
        Self { genesis_hash, k, ghostdag_store, relations_store, headers_store, reachability_service }
    }

    pub fn genesis_ghostdag_data(&self) -> GhostdagData {
        GhostdagData::new(
            0,
            Default::default(),
            ORIGIN,
            Default::default(),
            Default::default(),
            Default::default(),
        )
    }

    pub fn find_selected_parent(&self, parents: impl IntoIterator<Item = Hash>) -> Hash {
        parents
            .into_iter()
            .map(|parent| SortableBlock {
                hash: parent,
                blue_work: self.ghostdag_store.get_blue_work(parent).expect("parent must have ghostdag data"),
            })
            .max()
            .expect("expecting a non-empty parents list")
            .hash
    }

    /// Runs the GHOSTDAG protocol and calculates the block GhostdagData by the given parents.
    /// The function calculates mergeset blues by iterating over the blocks in
    /// the anticone of the new block selected parent (which is the parent with the
    /// highest blue work) and adds any block to the blue set if by adding
    /// it these conditions will not be violated:
    ///
    /// 1) |anticone-of-candidate-block ∩ blue-set-of-new-block| ≤ K
    ///
    /// 2) For every blue block in blue-set-of-new-block:
    ///    |(anticone-of-blue-block ∩ blue-set-new-block) ∪ {candidate-block}| ≤ K.
    ///    We validate this condition by maintaining a map blues_anticone_sizes for
    ///    each block which holds all the blue anticone sizes that were affected by
    ///    the new added blue blocks.
    pub fn ghostdag(&self, parents: &[Hash]) -> GhostdagData {
        assert!(!parents.is_empty(), "genesis must be added via a call to init");

        // Run the GHOSTDAG parent selection algorithm
        let selected_parent = self.find_selected_parent(parents.iter().copied());
        // Initialize new GHOSTDAG block data with the selected parent
        let mut new_block_data = Arc::new(GhostdagData::new_with_selected_parent(selected_parent, self.k));
        // Get the mergeset in consensus-agreed topological order (topological here means forward in time from blocks to children)
        let ordered_mergeset = self.ordered_mergeset_without_selected_parent(selected_parent, parents);

        for blue_candidate in ordered_mergeset.iter().copied() {
            let coloring = self.check_blue_candidate(&new_block_data, blue_candidate);

            if let ColoringOutput::Blue(blue_anticone_size, blues_anticone_sizes) = coloring {
                // No k-cluster violation found, we can now set the candidate block as blue
                new_block_data.add_blue(blue_candidate, blue_anticone_size, &blues_anticone_sizes);
            } else {
                new_block_data.add_red(blue_candidate);
            }
        }

        let blue_score = self
            .ghostdag_store
            .get_blue_score(selected_parent)
            .expect("selected parent must have ghostdag data")
            + new_block_data.mergeset_blues.len() as u64;

        let added_blue_work: BlueWorkType = new_block_data
            .mergeset_blues
            .iter()
            .copied()
            .map(|hash| calc_work(self.headers_store.get_bits(hash).expect("blue block must have a known header")))
            .sum();

        let blue_work = self.ghostdag_store.get_blue_work(selected_parent).expect("selected parent must have ghostdag data")
            + added_blue_work;

        new_block_data.finalize_score_and_work(blue_score, blue_work);

        // The GhostdagData instance is expected to be created by a single
        // instantiator so we should be the sole owner
        Arc::try_unwrap(new_block_data).unwrap_or_else(|arc| (*arc).clone())
    }

    pub fn ordered_mergeset_without_selected_parent(&self, selected_parent: Hash, parents: &[Hash]) -> Vec<Hash> {
        let mergeset = unordered_mergeset_without_selected_parent(
            self.relations_store.as_ref(),
            &self.reachability_service,
            selected_parent,
            parents,
        );
        self.sort_blocks(mergeset)
    }

    pub fn sort_blocks(&self, blocks: impl IntoIterator<Item = Hash>) -> Vec<Hash> {
        let mut sorted_blocks: Vec<SortableBlock> = blocks
            .into_iter()
            .map(|block| SortableBlock {
                hash: block,
                blue_work: self.ghostdag_store.get_blue_work(block).expect("mergeset blocks must have ghostdag data"),
            })
            .collect();
        sorted_blocks.sort();
        sorted_blocks.into_iter().map(|block| block.hash).collect()
    }

    fn check_blue_candidate_with_chain_block(
        &self,
        new_block_data: &GhostdagData,
        chain_block: &ChainBlock,
        blue_candidate: Hash,
        candidate_blues_anticone_sizes: &mut BlockHashMap<KType>,
        candidate_blue_anticone_size: &mut KType,
    ) -> ColoringState {
        // If blue_candidate is in the future of chain_block, it means
        // that all remaining blues are in the past of chain_block and thus
        // in the past of blue_candidate. In this case we know for sure that
        // the anticone of blue_candidate will not exceed K, and we can mark
        // it as blue.
        //
        // The new block is always in the future of blue_candidate, so there's
        // no point in checking it.

        // We check if chain_block is not the new block by checking if it has a hash.
        if let Some(hash) = chain_block.hash {
            if self.reachability_service.is_dag_ancestor_of(hash, blue_candidate).expect("reachability covers all known blocks") {
                return ColoringState::Blue;
            }
        }

        for &block in chain_block.data.mergeset_blues.iter() {
            // Skip blocks that exist in the past of blue_candidate
            if self.reachability_service.is_dag_ancestor_of(block, blue_candidate).expect("reachability covers all known blocks") {
                continue;
            }

            candidate_blues_anticone_sizes.insert(block, self.blue_anticone_size(block, new_block_data));

            *candidate_blue_anticone_size += 1;
            if *candidate_blue_anticone_size > self.k {
                // k-cluster violation: the candidate's blue anticone exceeded k
                return ColoringState::Red;
            }

            if *candidate_blues_anticone_sizes.get(&block).expect("inserted above") == self.k {
                // k-cluster violation: a block in candidate's blue anticone already
                // has k blue blocks in its own anticone
                return ColoringState::Red;
            }

            // This is a sanity check that validates that a blue
            // block's blue anticone is not already larger than K
            assert!(
                *candidate_blues_anticone_sizes.get(&block).expect("inserted above") <= self.k,
                "found blue anticone larger than K"
            );
        }

        ColoringState::Pending
    }

    /// Returns the blue anticone size of `block` from the worldview of
    /// `context`. Expects `block` to be in the blue set of `context`.
    fn blue_anticone_size(&self, block: Hash, context: &GhostdagData) -> KType {
        let mut current_blues_anticone_sizes = HashKTypeMap::clone(&context.blues_anticone_sizes);
        let mut current_selected_parent = context.selected_parent;
        loop {
            if let Some(size) = current_blues_anticone_sizes.get(&block) {
                return *size;
            }

            assert!(
                current_selected_parent != self.genesis_hash && current_selected_parent != ORIGIN,
                "block {block} is not in blue set of the given context"
            );

            current_blues_anticone_sizes = self
                .ghostdag_store
                .get_blues_anticone_sizes(current_selected_parent)
                .expect("chain ancestors must have ghostdag data");

            current_selected_parent = self
                .ghostdag_store
                .get_selected_parent(current_selected_parent)
                .expect("chain ancestors must have ghostdag data");
        }
    }

    fn check_blue_candidate(&self, new_block_data: &Arc<GhostdagData>, blue_candidate: Hash) -> ColoringOutput {
        // The maximum length of new_block_data.mergeset_blues can be K+1 because
        // it contains the selected parent
        if new_block_data.mergeset_blues.len() as KType == self.k + 1 {
            return ColoringOutput::Red;
        }

        let mut candidate_blues_anticone_sizes: BlockHashMap<KType> = BlockHashMap::with_capacity(self.k as usize);
        // Iterate over all blocks in the blue past of the new block that are not
        // in the past of blue_candidate, and check for each one of them if
        // blue_candidate potentially enlarges their blue anticone to be over K,
        // or that they enlarge the blue anticone of blue_candidate to be over K
        let mut chain_block = ChainBlock { hash: None, data: new_block_data.clone() };
        let mut candidate_blue_anticone_size: KType = 0;

        loop {
            let state = self.check_blue_candidate_with_chain_block(
                new_block_data,
                &chain_block,
                blue_candidate,
                &mut candidate_blues_anticone_sizes,
                &mut candidate_blue_anticone_size,
            );

            match state {
                ColoringState::Blue => return ColoringOutput::Blue(candidate_blue_anticone_size, candidate_blues_anticone_sizes),
                ColoringState::Red => return ColoringOutput::Red,
                ColoringState::Pending => (), // continue looping
            }

            chain_block = ChainBlock {
                hash: Some(chain_block.data.selected_parent),
                data: self
                    .ghostdag_store
                    .get_data(chain_block.data.selected_parent)
                    .expect("chain ancestors must have ghostdag data"),
            }
        }
    }
}

/// Chain block with attached ghostdag data
struct ChainBlock {
    hash: Option<Hash>, // When None, it means this is the new block
    data: Arc<GhostdagData>,
}

/// The result of the blue candidate coloring check
enum ColoringOutput {
    /// Contains the candidate's blue anticone size and the changes to the
    /// blue anticone sizes of affected existing blues
    Blue(KType, BlockHashMap<KType>),
    Red,
}

/// An intermediate coloring state of a chain-block iteration
enum ColoringState {
    Blue,
    Red,
    Pending,
}
