use crate::{acceptance_data::ArcAcceptanceData, block::Block, tx::TransactionId};
use kaspad_hashes::Hash;
use std::sync::Arc;

/// Events emitted by the consensus engine on state changes. Consumers (the
/// relay flows, the mempool resweep, RPC notifications) subscribe via an
/// async channel owned by the node assembly.
#[derive(Debug, Clone)]
pub enum ConsensusEvent {
    BlockAdded(Arc<BlockAddedEvent>),
    VirtualChanged(Arc<VirtualChangedEvent>),
}

#[derive(Debug, Clone)]
pub struct BlockAddedEvent {
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct VirtualChangedEvent {
    pub selected_parent: Hash,
    pub tips: Vec<Hash>,
    pub blue_score: u64,
    /// Chain blocks added on the selected chain with their acceptance data,
    /// ordered from the split point upward
    pub added_chain_blocks: Vec<(Hash, ArcAcceptanceData)>,
    /// Chain blocks removed from the selected chain (reorg), ordered from the
    /// previous tip downward
    pub removed_chain_blocks: Vec<Hash>,
    /// IDs of transactions accepted by the added chain blocks
    pub accepted_transaction_ids: Vec<TransactionId>,
}
