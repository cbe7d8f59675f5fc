use crate::mempool::{Mempool, MempoolTransaction};
use kaspad_consensus::consensus::Consensus;
use kaspad_consensus_core::{
    block::Block,
    coinbase::MinerData,
    errors::block::BlockProcessResult,
    subnets::SubnetworkId,
    tx::{Transaction, TransactionId},
};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Selects mempool transactions into a block candidate: ordered by fee rate,
/// bounded by the block mass limit and per-subnetwork gas limits, and
/// respecting in-pool dependencies (a child is only selected after its parent)
pub struct BlockTemplateBuilder {
    max_block_mass: u64,
    max_subnetwork_gas_limit: u64,
    /// Mass reserved for the coinbase transaction
    coinbase_mass_reserve: u64,
}

impl BlockTemplateBuilder {
    pub fn new(max_block_mass: u64, max_subnetwork_gas_limit: u64) -> Self {
        Self { max_block_mass, max_subnetwork_gas_limit, coinbase_mass_reserve: 10_000 }
    }

    /// Picks transactions for the next block template
    pub fn select_transactions(&self, mempool: &Mempool) -> Vec<Transaction> {
        let candidates = mempool.block_candidate_transactions();
        let mut selected_ids: HashSet<TransactionId> = HashSet::new();
        let mut selected: Vec<&MempoolTransaction> = Vec::new();
        let mut total_mass = self.coinbase_mass_reserve;
        let mut gas_usage: HashMap<SubnetworkId, u64> = HashMap::new();

        // Candidates are pre-sorted by fee rate; a candidate whose in-pool
        // parent was not selected yet is deferred to a later template
        let mut deferred: Vec<&MempoolTransaction> = Vec::new();
        let mut pending: Vec<&MempoolTransaction> = candidates.iter().collect();

        while !pending.is_empty() {
            let mut progressed = false;
            for candidate in std::mem::take(&mut pending) {
                let mass = candidate.mtx.calculated_mass.expect("pool members have calculated mass");
                if total_mass + mass > self.max_block_mass {
                    continue;
                }
                if !candidate.mtx.tx.subnetwork_id.is_builtin_or_native() {
                    let gas = gas_usage.entry(candidate.mtx.tx.subnetwork_id).or_default();
                    if *gas + candidate.mtx.tx.gas > self.max_subnetwork_gas_limit {
                        continue;
                    }
                }
                // Topological readiness: all in-pool parents must come first
                if !candidate_ready(candidate, &selected_ids) {
                    deferred.push(candidate);
                    continue;
                }

                total_mass += mass;
                if !candidate.mtx.tx.subnetwork_id.is_builtin_or_native() {
                    *gas_usage.entry(candidate.mtx.tx.subnetwork_id).or_default() += candidate.mtx.tx.gas;
                }
                selected_ids.insert(candidate.id());
                selected.push(candidate);
                progressed = true;
            }
            if !progressed {
                break;
            }
            // Deferred candidates get another chance now that parents may be in
            pending = std::mem::take(&mut deferred);
        }

        debug!("Block template selection: {} transactions, {} mass", selected.len(), total_mass);
        selected.into_iter().map(|candidate| (*candidate.mtx.tx).clone()).collect()
    }

    /// Builds a full block template over the current virtual state
    pub fn build(&self, consensus: &Consensus, mempool: &Mempool, miner_data: MinerData) -> BlockProcessResult<Block> {
        let txs = self.select_transactions(mempool);
        consensus.build_block_template(miner_data, txs)
    }
}

fn candidate_ready(candidate: &MempoolTransaction, selected: &HashSet<TransactionId>) -> bool {
    candidate.mtx.entries.iter().zip(candidate.mtx.tx.inputs.iter()).all(|(entry, input)| {
        match entry {
            Some(entry) if entry.block_blue_score == kaspad_consensus_core::constants::UNACCEPTED_BLUE_SCORE => {
                selected.contains(&input.previous_outpoint.transaction_id)
            }
            _ => true,
        }
    })
}
