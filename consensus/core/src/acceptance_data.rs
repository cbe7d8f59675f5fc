use crate::tx::TransactionId;
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type AcceptanceData = Vec<MergesetBlockAcceptanceData>;

/// Records which transactions of a specific merge-set block were accepted
/// by the accepting chain block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergesetBlockAcceptanceData {
    pub block_hash: Hash,
    pub accepted_transactions: Vec<AcceptedTxEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedTxEntry {
    pub transaction_id: TransactionId,
    pub index_within_block: u32,
}

pub type ArcAcceptanceData = Arc<AcceptanceData>;
