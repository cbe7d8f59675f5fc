use crate::{error::RpcResult, model::*, notify::NotificationScope};
use kaspad_addresses::Address;
use kaspad_consensus_core::tx::{Transaction, TransactionId, TransactionOutpoint};
use kaspad_hashes::Hash;

/// The RPC-facing façade of the node core. Transports (gRPC, websockets)
/// consume this trait; the node assembly provides the implementation.
#[async_trait::async_trait]
pub trait RpcApi: Send + Sync {
    async fn get_selected_tip_hash(&self) -> RpcResult<Hash>;
    async fn get_block(&self, hash: Hash, include_transactions: bool) -> RpcResult<RpcBlock>;
    async fn get_blocks(&self, low_hash: Option<Hash>, limit: usize, include_transactions: bool) -> RpcResult<Vec<RpcBlock>>;
    async fn get_block_count(&self) -> RpcResult<u64>;
    async fn get_block_header(&self, hash: Hash) -> RpcResult<kaspad_consensus_core::header::Header>;
    async fn get_block_template(&self, pay_address: Address, extra_data: Vec<u8>) -> RpcResult<RpcBlock>;
    async fn submit_block(&self, block: RpcBlock) -> RpcResult<()>;
    async fn get_block_dag_info(&self) -> RpcResult<RpcBlockDagInfo>;
    async fn get_chain_from_block(&self, start_hash: Hash) -> RpcResult<RpcChainFromBlock>;
    async fn get_mempool_entry(&self, transaction_id: TransactionId) -> RpcResult<RpcMempoolEntry>;
    async fn get_raw_mempool(&self) -> RpcResult<Vec<TransactionId>>;
    async fn get_raw_transaction(&self, transaction_id: TransactionId) -> RpcResult<Transaction>;
    async fn send_raw_transaction(&self, transaction: Transaction) -> RpcResult<TransactionId>;
    async fn get_subnetwork(&self, subnetwork_id: kaspad_consensus_core::subnets::SubnetworkId) -> RpcResult<u64>;
    async fn get_tx_out(&self, outpoint: TransactionOutpoint) -> RpcResult<Option<RpcTxOut>>;
    async fn get_peer_info(&self) -> RpcResult<Vec<RpcPeerInfo>>;
    async fn get_connection_count(&self) -> RpcResult<usize>;
    async fn get_net_totals(&self) -> RpcResult<RpcNetTotals>;
    async fn get_info(&self) -> RpcResult<RpcNodeInfo>;

    /// Subscription management for the notification scopes
    async fn start_notify(&self, listener_id: u64, scope: NotificationScope) -> RpcResult<()>;
    async fn stop_notify(&self, listener_id: u64, scope: NotificationScope) -> RpcResult<()>;

    /// Loads the transaction filter applied by rescans for this listener
    async fn load_tx_filter(&self, listener_id: u64, filter: RpcTxFilter) -> RpcResult<()>;
    /// Scans the given blocks for transactions matching the loaded filter
    async fn rescan_blocks(&self, listener_id: u64, block_hashes: Vec<Hash>) -> RpcResult<Vec<RpcRescanMatch>>;

    async fn ping(&self) -> RpcResult<()>;
    async fn stop(&self) -> RpcResult<()>;
}
