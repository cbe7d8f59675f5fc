use super::Consensus;
use crate::model::stores::{
    ghostdag::{GhostdagData, GhostdagStoreReader},
    pruning::{PruningStore, PruningStoreReader},
    tips::TipsStoreReader,
    utxo_diffs::UtxoDiffsStoreReader,
    utxo_multisets::UtxoMultisetsStoreReader,
    utxo_set::VirtualUtxoSetStore,
    virtual_state::{VirtualState, VirtualStateStore, VirtualStateStoreReader},
};
use crate::processes::ghostdag::ordering::SortableBlock;
use kaspad_consensus_core::{
    acceptance_data::{AcceptanceData, AcceptedTxEntry, MergesetBlockAcceptanceData},
    block::Block,
    blockhash::BlockHashes,
    errors::block::{BlockProcessResult, RuleError},
    events::{ConsensusEvent, VirtualChangedEvent},
    merkle::calc_accepted_id_merkle_root,
    tx::{PopulatedTransaction, Transaction, TransactionId, UtxoEntry, ValidatedTransaction, COINBASE_TRANSACTION_INDEX},
    utxo::{
        utxo_collection::UtxoCollection,
        utxo_diff::UtxoDiff,
        utxo_view::{compose, UtxoView},
    },
};
use kaspad_database::prelude::BatchDbWriter;
use kaspad_hashes::{Hash, HasherBase};
use kaspad_muhash::MuHash;
use log::debug;
use rocksdb::WriteBatch;
use std::sync::Arc;

/// The outcome of verifying a block against the UTXO state of its own past
pub(super) struct UtxoVerificationOutput {
    pub utxo_diff: UtxoDiff,
    pub multiset: MuHash,
    pub acceptance_data: AcceptanceData,
    pub accepted_tx_ids: Vec<TransactionId>,
    pub total_fees: u64,
}

impl Consensus {
    /// Serializes a UTXO (outpoint + entry) into the muhash element builder
    /// in a canonical byte layout
    fn muhash_update(multiset: &mut MuHash, add: bool, outpoint: &kaspad_consensus_core::tx::TransactionOutpoint, entry: &UtxoEntry) {
        let mut builder = if add { multiset.add_element_builder() } else { multiset.remove_element_builder() };
        builder.update(outpoint.transaction_id);
        builder.update(outpoint.index.to_le_bytes());
        builder.update(entry.amount.to_le_bytes());
        builder.update(entry.script_public_key.version().to_le_bytes());
        builder.update((entry.script_public_key.script().len() as u64).to_le_bytes());
        builder.update(entry.script_public_key.script());
        builder.update(entry.block_blue_score.to_le_bytes());
        builder.update([entry.is_coinbase as u8]);
        builder.finalize();
    }

    fn muhash_apply_diff(multiset: &mut MuHash, diff: &UtxoDiff) {
        for (outpoint, entry) in diff.add.iter() {
            Self::muhash_update(multiset, true, outpoint, entry);
        }
        for (outpoint, entry) in diff.remove.iter() {
            Self::muhash_update(multiset, false, outpoint, entry);
        }
    }

    /// Restores the UTXO collection of the given chain block by walking diffs
    /// from the current virtual selected parent. The target may be on a side
    /// chain, in which case diffs are unapplied down to the common chain
    /// ancestor and side-chain diffs applied upwards from there.
    ///
    /// Returns the collection along with the chain blocks which were
    /// (removed, added) relative to the previous virtual selected parent.
    pub(super) fn restore_utxo_at(&self, target: Hash) -> BlockProcessResult<(UtxoCollection, Vec<Hash>, Vec<Hash>)> {
        let virtual_state = self.virtual_state_store.read().get().expect("virtual state must be initialized");
        let mut collection = self.virtual_utxo_cache.read().clone();

        // Roll the virtual's own diff back, reaching the state of its selected parent
        virtual_state.utxo_diff.unapply_from(&mut collection).expect("virtual diff must unapply cleanly");

        let mut current = virtual_state.selected_parent();
        let mut removed_chain_blocks = Vec::new();

        // Walk down the selected chain until reaching a chain ancestor of the target
        while !self.reachability_service.is_chain_ancestor_of(current, target).expect("reachability covers all known blocks") {
            let diff = self.utxo_diffs_store.get(current).expect("chain blocks must have stored diffs");
            diff.unapply_from(&mut collection).expect("chain diffs must unapply cleanly");
            removed_chain_blocks.push(current);
            current = self.ghostdag_store.get_selected_parent(current).expect("chain blocks must have ghostdag data");
        }

        // Collect the path from the target down to the common ancestor and
        // apply the diffs forward
        let mut path = Vec::new();
        let mut walker = target;
        while walker != current {
            path.push(walker);
            walker = self.ghostdag_store.get_selected_parent(walker).expect("chain blocks must have ghostdag data");
        }
        path.reverse();
        for block in path.iter().copied() {
            let diff = self.utxo_diffs_store.get(block).expect("chain blocks must have stored diffs");
            diff.apply_to(&mut collection).expect("chain diffs must apply cleanly");
        }

        Ok((collection, removed_chain_blocks, path))
    }

    /// Computes the acceptance state of a merge set over the given base UTXO
    /// collection: each merge-set transaction is validated against the
    /// accumulating state and either accepted into the diff or skipped
    pub(super) fn calculate_mergeset_acceptance(
        &self,
        base: &UtxoCollection,
        ghostdag_data: &GhostdagData,
        past_median_time: u64,
    ) -> BlockProcessResult<UtxoVerificationOutput> {
        let mut diff = UtxoDiff::default();
        let mut acceptance_data = AcceptanceData::new();
        let mut accepted_tx_ids = Vec::new();
        let mut total_fees = 0u64;

        for merged_block in ghostdag_data.consensus_ordered_mergeset() {
            let txs = self
                .get_block_transactions(merged_block)
                .map_err(|_| RuleError::MissingParents(vec![merged_block]))?;
            let mut accepted_transactions = Vec::new();

            for (index_within_block, tx) in txs.iter().enumerate() {
                let accepted = if tx.is_coinbase() {
                    // A coinbase has no inputs so it is accepted unconditionally
                    let validated = ValidatedTransaction::new_coinbase(tx);
                    diff.add_transaction(&validated, ghostdag_data.blue_score).expect("merge set txs are conflict free");
                    true
                } else {
                    match self.try_accept_transaction(tx, base, &mut diff, ghostdag_data.blue_score, past_median_time) {
                        Some(fee) => {
                            total_fees += fee;
                            true
                        }
                        None => false,
                    }
                };
                if accepted {
                    accepted_tx_ids.push(tx.id());
                    accepted_transactions
                        .push(AcceptedTxEntry { transaction_id: tx.id(), index_within_block: index_within_block as u32 });
                }
            }

            acceptance_data.push(MergesetBlockAcceptanceData { block_hash: merged_block, accepted_transactions });
        }

        let mut multiset = MuHash::new();
        Self::muhash_apply_diff(&mut multiset, &diff);

        Ok(UtxoVerificationOutput { utxo_diff: diff, multiset, acceptance_data, accepted_tx_ids, total_fees })
    }

    /// Attempts to accept a single merge-set transaction over the accumulated
    /// state; returns its fee when accepted
    fn try_accept_transaction(
        &self,
        tx: &Transaction,
        base: &UtxoCollection,
        diff: &mut UtxoDiff,
        ctx_blue_score: u64,
        ctx_past_median_time: u64,
    ) -> Option<u64> {
        let entries: Option<Vec<UtxoEntry>> = {
            let view = compose(base, diff);
            tx.inputs.iter().map(|input| view.get(&input.previous_outpoint)).collect()
        };
        let entries = entries?;
        let populated = PopulatedTransaction::new(tx, entries);
        match self.transaction_validator.validate_populated_transaction_and_get_fee(&populated, ctx_blue_score, ctx_past_median_time)
        {
            Ok(fee) => {
                diff.add_transaction(&populated, ctx_blue_score).expect("double spends are rejected by the composed view");
                Some(fee)
            }
            Err(_) => None,
        }
    }

    /// Verifies the new block's committed UTXO state: restores its selected
    /// parent's state, applies merge-set acceptance, compares the resulting
    /// commitments, and finally validates the block's own transactions against
    /// the block's resulting UTXO view
    pub(super) fn verify_block_utxo_state(
        &self,
        block: &Block,
        ghostdag_data: &GhostdagData,
        past_median_time: u64,
    ) -> BlockProcessResult<UtxoVerificationOutput> {
        let hash = block.hash();
        let (base_collection, _, _) = self.restore_utxo_at(ghostdag_data.selected_parent)?;

        let mut output = self.calculate_mergeset_acceptance(&base_collection, ghostdag_data, past_median_time)?;

        // The accepted-ID merkle root commits to the IDs of accepted merge-set transactions
        let calculated_accepted_root = calc_accepted_id_merkle_root(output.accepted_tx_ids.iter().copied());
        if calculated_accepted_root != block.header.accepted_id_merkle_root {
            return Err(RuleError::BadAcceptedIDMerkleRoot(hash, block.header.accepted_id_merkle_root, calculated_accepted_root));
        }

        // The UTXO commitment is the muhash of the resulting set: the selected
        // parent's multiset adjusted by the acceptance diff
        let mut multiset = self.utxo_multisets_store.get(ghostdag_data.selected_parent).expect("selected parent must have a multiset");
        multiset.combine(&output.multiset);
        let commitment = multiset.finalize();
        if commitment != block.header.utxo_commitment {
            return Err(RuleError::BadUTXOCommitment(hash, block.header.utxo_commitment, commitment));
        }
        output.multiset = multiset;

        // Validate the block's own transactions against its resulting state
        for tx in block.transactions.iter().skip(COINBASE_TRANSACTION_INDEX + 1) {
            let entries: Option<Vec<UtxoEntry>> = {
                let view = compose(&base_collection, &output.utxo_diff);
                tx.inputs.iter().map(|input| view.get(&input.previous_outpoint)).collect()
            };
            let Some(entries) = entries else {
                return Err(RuleError::TxInContextFailed(tx.id(), kaspad_consensus_core::errors::tx::TxRuleError::MissingTxOutpoints));
            };
            let populated = PopulatedTransaction::new(tx, entries);
            self.transaction_validator
                .validate_populated_transaction_and_get_fee(&populated, ghostdag_data.blue_score, past_median_time)
                .map_err(|e| RuleError::TxInContextFailed(tx.id(), e))?;
        }

        Ok(output)
    }

    /// Selects the virtual parents from the current tip set: the highest
    /// blue-work tips, capped by the max parents consensus parameter
    fn pick_virtual_parents(&self, tips: BlockHashes) -> Vec<Hash> {
        let mut sortable: Vec<SortableBlock> = tips
            .iter()
            .copied()
            .map(|tip| SortableBlock {
                hash: tip,
                blue_work: self.ghostdag_store.get_blue_work(tip).expect("tips must have ghostdag data"),
            })
            .collect();
        // Highest blue work first
        sortable.sort_by(|a, b| b.cmp(a));
        sortable.into_iter().take(self.config.params.max_block_parents as usize).map(|block| block.hash).collect()
    }

    /// Rebuilds the virtual block over the current tips: recomputes GHOSTDAG,
    /// migrates the virtual UTXO set to the new selected parent, recomputes
    /// merge-set acceptance, and persists + publishes the state change
    pub(super) fn update_virtual_state(&self) -> BlockProcessResult<()> {
        let tips = self.tips_store.read().get().expect("tips must be initialized");
        let virtual_parents = self.pick_virtual_parents(tips);
        let virtual_gd = self.ghostdag_manager.ghostdag(&virtual_parents);
        let new_selected_parent = virtual_gd.selected_parent;

        let (base_collection, removed_chain_blocks, added_chain_blocks) = self.restore_utxo_at(new_selected_parent)?;

        let past_median_time = self.past_median_time_manager.calc_past_median_time(new_selected_parent);
        let output = self.calculate_mergeset_acceptance(&base_collection, &virtual_gd, past_median_time)?;

        // New virtual UTXO set = state at selected parent ⊕ the virtual diff
        let mut new_virtual_utxo = base_collection;
        output.utxo_diff.apply_to(&mut new_virtual_utxo).expect("virtual diff must apply cleanly");

        // Virtual multiset = selected parent multiset adjusted by the virtual diff
        let mut multiset = self.utxo_multisets_store.get(new_selected_parent).expect("selected parent must have a multiset");
        multiset.combine(&output.multiset);

        let bits = self.difficulty_manager.calculate_difficulty_bits(new_selected_parent);

        let new_state = Arc::new(VirtualState {
            parents: virtual_parents,
            bits,
            past_median_time,
            accepted_tx_ids: output.accepted_tx_ids,
            mergeset_fees: output.total_fees,
            utxo_diff: output.utxo_diff,
            multiset,
            ghostdag_data: virtual_gd,
        });

        // Persist: replace the stored virtual UTXO set with the new one by
        // writing the net difference, and store the new virtual state
        let mut batch = WriteBatch::default();
        {
            let old_collection = self.virtual_utxo_cache.read();
            let net_diff = collection_net_diff(&old_collection, &new_virtual_utxo);
            self.virtual_utxo_store.write_diff(BatchDbWriter::new(&mut batch), &net_diff).expect("net diff matches the stored set");
        }
        self.virtual_state_store.write().set(BatchDbWriter::new(&mut batch), new_state.clone()).unwrap();
        self.db.write(batch).unwrap();

        *self.virtual_utxo_cache.write() = new_virtual_utxo;

        debug!(
            "Virtual updated: selected parent {new_selected_parent}, blue score {}, {} tips",
            new_state.blue_score(),
            new_state.parents.len()
        );

        self.advance_pruning_point(&new_state);

        let added_with_acceptance = added_chain_blocks
            .iter()
            .copied()
            .map(|block| (block, self.acceptance_data_store.get(block).expect("chain blocks must have acceptance data")))
            .collect();
        let _ = self.events_sender.try_send(ConsensusEvent::VirtualChanged(Arc::new(VirtualChangedEvent {
            selected_parent: new_selected_parent,
            tips: new_state.parents.clone(),
            blue_score: new_state.blue_score(),
            added_chain_blocks: added_with_acceptance,
            removed_chain_blocks,
            accepted_transaction_ids: new_state.accepted_tx_ids.clone(),
        })));

        Ok(())
    }

    /// Advances the pruning point to the deepest chain block whose blue score
    /// is at least `pruning_depth` below the virtual. The point only ever
    /// moves forward along the selected chain.
    fn advance_pruning_point(&self, virtual_state: &VirtualState) {
        let pruning_depth = self.config.params.pruning_depth;
        if virtual_state.blue_score() <= pruning_depth {
            return;
        }
        let target_blue_score = virtual_state.blue_score() - pruning_depth;

        let mut pruning_store = self.pruning_store.write();
        let mut current = pruning_store.get().expect("pruning info is initialized with genesis");
        let selected_parent = virtual_state.selected_parent();
        let mut advanced = false;
        loop {
            // The pruning point must stay on the virtual selected chain; a deep
            // reorg past it would violate finality and cannot be followed
            if !self.reachability_service.is_chain_ancestor_of(current.pruning_point, selected_parent).unwrap_or(false) {
                break;
            }
            if current.pruning_point == selected_parent {
                break;
            }
            let next = self
                .reachability_service
                .get_next_chain_ancestor(selected_parent, current.pruning_point)
                .expect("the chain between the pruning point and the selected parent is intact");
            let next_blue_score = self.ghostdag_store.get_blue_score(next).expect("chain blocks must have ghostdag data");
            if next_blue_score > target_blue_score {
                break;
            }
            current =
                crate::model::stores::pruning::PruningPointInfo { pruning_point: next, blue_score: next_blue_score };
            advanced = true;
        }
        if advanced {
            use kaspad_database::prelude::DirectDbWriter;
            pruning_store.set(DirectDbWriter::new(&self.db), current).expect("pruning point write must succeed");
            log::info!("Pruning point advanced to {} (blue score {})", current.pruning_point, current.blue_score);
        }
    }
}

/// Computes the diff transforming `old` into `new` (entries to remove and add)
fn collection_net_diff(old: &UtxoCollection, new: &UtxoCollection) -> UtxoDiff {
    let mut diff = UtxoDiff::default();
    for (outpoint, entry) in old.iter() {
        if !new.contains_key(outpoint) {
            diff.remove.insert(*outpoint, entry.clone());
        }
    }
    for (outpoint, entry) in new.iter() {
        if !old.contains_key(outpoint) {
            diff.add.insert(*outpoint, entry.clone());
        }
    }
    diff
}
