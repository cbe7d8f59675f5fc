use crate::model::RpcBlock;
use kaspad_consensus_core::tx::TransactionId;
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};

/// The notification classes a client may subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationScope {
    Blocks,
    NewTransactions,
    ChainChanges,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum Notification {
    BlockAdded { block: RpcBlock },
    NewTransaction { transaction_id: TransactionId },
    TransactionRemoved { transaction_id: TransactionId },
    ChainChanged { removed_chain_block_hashes: Vec<Hash>, added_chain_block_hashes: Vec<Hash>, accepted_transaction_ids: Vec<TransactionId> },
}

impl Notification {
    pub fn scope(&self) -> NotificationScope {
        match self {
            Notification::BlockAdded { .. } => NotificationScope::Blocks,
            Notification::NewTransaction { .. } | Notification::TransactionRemoved { .. } => NotificationScope::NewTransactions,
            Notification::ChainChanged { .. } => NotificationScope::ChainChanges,
        }
    }
}
