use kaspad_consensus_core::{
    block::Block,
    header::Header,
    tx::{Transaction, TransactionId, TransactionOutpoint, UtxoEntry},
};
use kaspad_hashes::Hash;
use kaspad_utils::networking::NetAddress;
use serde::{Deserialize, Serialize};

/// A block as exposed over RPC, with verbose consensus annotations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub header: Header,
    pub transactions: Vec<Transaction>,
    pub verbose_data: Option<RpcBlockVerboseData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockVerboseData {
    pub hash: Hash,
    pub blue_score: u64,
    pub selected_parent_hash: Hash,
    pub is_chain_block: bool,
}

impl RpcBlock {
    pub fn from_block(block: &Block) -> Self {
        Self { header: (*block.header).clone(), transactions: (*block.transactions).clone(), verbose_data: None }
    }

    pub fn to_block(&self) -> Block {
        Block::new(self.header.clone(), self.transactions.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlockDagInfo {
    pub network_name: String,
    pub block_count: u64,
    pub tip_hashes: Vec<Hash>,
    pub virtual_parent_hashes: Vec<Hash>,
    pub selected_tip_hash: Hash,
    pub virtual_blue_score: u64,
    pub difficulty_bits: u32,
    pub past_median_time: u64,
    pub pruning_point_hash: Hash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcMempoolEntry {
    pub transaction: Transaction,
    pub fee: Option<u64>,
    pub mass: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcPeerInfo {
    pub address: NetAddress,
    pub user_agent: String,
    pub protocol_version: u32,
    pub is_outbound: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcNetTotals {
    pub connection_count: usize,
    pub known_address_count: usize,
    pub banned_address_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcNodeInfo {
    pub version: String,
    pub network_name: String,
    pub is_synced: bool,
    pub mempool_size: usize,
    pub virtual_blue_score: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcChainFromBlock {
    pub removed_chain_block_hashes: Vec<Hash>,
    pub added_chain_block_hashes: Vec<Hash>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTxOut {
    pub outpoint: TransactionOutpoint,
    pub utxo_entry: UtxoEntry,
}

/// The client-side filter for transaction rescans: any transaction spending
/// one of the outpoints or paying to one of the script public keys matches
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTxFilter {
    pub outpoints: Vec<TransactionOutpoint>,
    pub script_public_keys: Vec<kaspad_consensus_core::tx::ScriptPublicKey>,
}

impl RpcTxFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        tx.inputs.iter().any(|input| self.outpoints.contains(&input.previous_outpoint))
            || tx.outputs.iter().any(|output| self.script_public_keys.contains(&output.script_public_key))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcRescanMatch {
    pub block_hash: Hash,
    pub transaction_ids: Vec<TransactionId>,
}
