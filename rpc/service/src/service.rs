use kaspad_addresses::Address;
use kaspad_consensus_core::{
    coinbase::MinerData,
    events::ConsensusEvent,
    subnets::SubnetworkId,
    tx::{Transaction, TransactionId, TransactionOutpoint},
};
use kaspad_hashes::Hash;
use kaspad_p2p_flows::FlowContext;
use kaspad_rpc_core::{
    Notification, NotificationScope, RpcApi, RpcBlock, RpcBlockDagInfo, RpcBlockVerboseData, RpcChainFromBlock, RpcError,
    RpcMempoolEntry, RpcNetTotals, RpcNodeInfo, RpcPeerInfo, RpcRescanMatch, RpcResult, RpcTxFilter, RpcTxOut,
};
use log::debug;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

struct Listener {
    scopes: HashSet<NotificationScope>,
    tx_filter: RpcTxFilter,
    channel: async_channel::Sender<Notification>,
}

/// The concrete [`RpcApi`] implementation: a façade over the consensus
/// engine, the mempool and the peer hub, plus the notification dispatcher
pub struct RpcCoreService {
    flow_context: Arc<FlowContext>,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: Mutex<u64>,
    shutdown_requester: triggered::Trigger,
}

impl RpcCoreService {
    pub fn new(flow_context: Arc<FlowContext>, shutdown_requester: triggered::Trigger) -> Arc<Self> {
        Arc::new(Self {
            flow_context,
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: Mutex::new(1),
            shutdown_requester,
        })
    }

    /// Registers a notification listener, returning its id and channel
    pub fn register_listener(&self) -> (u64, async_channel::Receiver<Notification>) {
        let (sender, receiver) = async_channel::unbounded();
        let mut next_id = self.next_listener_id.lock();
        let id = *next_id;
        *next_id += 1;
        self.listeners.lock().insert(id, Listener { scopes: HashSet::new(), tx_filter: Default::default(), channel: sender });
        (id, receiver)
    }

    pub fn unregister_listener(&self, listener_id: u64) {
        self.listeners.lock().remove(&listener_id);
    }

    fn notify(&self, notification: Notification) {
        let scope = notification.scope();
        let listeners = self.listeners.lock();
        for listener in listeners.values() {
            if listener.scopes.contains(&scope) {
                let _ = listener.channel.try_send(notification.clone());
            }
        }
    }

    /// Translates consensus events into client notifications. Must be called
    /// from within the node's async runtime.
    pub fn start_notification_dispatcher(self: &Arc<Self>) {
        let this = self.clone();
        let receiver = self.flow_context.consensus.subscribe();
        tokio::spawn(async move {
            let self_ = this;
            while let Ok(event) = receiver.recv().await {
                match event {
                    ConsensusEvent::BlockAdded(event) => {
                        self_.notify(Notification::BlockAdded { block: RpcBlock::from_block(&event.block) });
                    }
                    ConsensusEvent::VirtualChanged(event) => {
                        self_.notify(Notification::ChainChanged {
                            removed_chain_block_hashes: event.removed_chain_blocks.clone(),
                            added_chain_block_hashes: event.added_chain_blocks.iter().map(|(hash, _)| *hash).collect(),
                            accepted_transaction_ids: event.accepted_transaction_ids.clone(),
                        });
                    }
                }
            }
            debug!("Notification dispatcher exiting");
        });
    }

    fn consensus(&self) -> &kaspad_consensus::consensus::Consensus {
        &self.flow_context.consensus
    }
}

#[async_trait::async_trait]
impl RpcApi for RpcCoreService {
    async fn get_selected_tip_hash(&self) -> RpcResult<Hash> {
        Ok(self.consensus().get_selected_tip_hash())
    }

    async fn get_block(&self, hash: Hash, include_transactions: bool) -> RpcResult<RpcBlock> {
        let block = self.consensus().get_block(hash).map_err(|err| RpcError::NotFound(err.to_string()))?;
        let mut rpc_block = RpcBlock::from_block(&block);
        if !include_transactions {
            rpc_block.transactions.clear();
        }
        if let Ok(data) = self.consensus().get_ghostdag_data(hash) {
            rpc_block.verbose_data = Some(RpcBlockVerboseData {
                hash,
                blue_score: data.blue_score,
                selected_parent_hash: data.selected_parent,
                is_chain_block: false,
            });
        }
        Ok(rpc_block)
    }

    async fn get_blocks(&self, low_hash: Option<Hash>, limit: usize, include_transactions: bool) -> RpcResult<Vec<RpcBlock>> {
        let low = low_hash.unwrap_or_else(|| self.consensus().genesis_hash());
        let high = self.consensus().get_selected_tip_hash();
        let hashes = self.consensus().get_hashes_between(low, high, limit).map_err(|err| RpcError::NotFound(err.to_string()))?;
        let mut blocks = Vec::with_capacity(hashes.len());
        for hash in hashes {
            blocks.push(self.get_block(hash, include_transactions).await?);
        }
        Ok(blocks)
    }

    async fn get_block_count(&self) -> RpcResult<u64> {
        Ok(self.consensus().get_block_count())
    }

    async fn get_block_header(&self, hash: Hash) -> RpcResult<kaspad_consensus_core::header::Header> {
        self.consensus().get_header(hash).map(|header| (*header).clone()).map_err(|err| RpcError::NotFound(err.to_string()))
    }

    async fn get_block_template(&self, pay_address: Address, extra_data: Vec<u8>) -> RpcResult<RpcBlock> {
        let script_public_key = kaspad_txscript::pay_to_address_script(&pay_address);
        let miner_data = MinerData::new(script_public_key, extra_data);
        let template = self
            .flow_context
            .mining_manager
            .get_block_template(self.consensus(), miner_data)
            .map_err(|err| RpcError::General(err.to_string()))?;
        Ok(RpcBlock::from_block(&template))
    }

    async fn submit_block(&self, block: RpcBlock) -> RpcResult<()> {
        self.flow_context.add_block(block.to_block(), None).map_err(|err| RpcError::BlockRejected(err.to_string()))
    }

    async fn get_block_dag_info(&self) -> RpcResult<RpcBlockDagInfo> {
        let virtual_state = self.consensus().get_virtual_state_snapshot();
        Ok(RpcBlockDagInfo {
            network_name: self.flow_context.config.params.net.name().to_string(),
            block_count: self.consensus().get_block_count(),
            tip_hashes: self.consensus().get_tips(),
            virtual_parent_hashes: virtual_state.parents.clone(),
            selected_tip_hash: virtual_state.selected_parent(),
            virtual_blue_score: virtual_state.blue_score(),
            difficulty_bits: virtual_state.bits,
            past_median_time: virtual_state.past_median_time,
            pruning_point_hash: self.consensus().get_pruning_point(),
        })
    }

    async fn get_chain_from_block(&self, start_hash: Hash) -> RpcResult<RpcChainFromBlock> {
        if !self.consensus().block_exists(start_hash) {
            return Err(RpcError::NotFound(format!("block {start_hash} is unknown")));
        }
        let tip = self.consensus().get_selected_tip_hash();
        let added = self
            .consensus()
            .get_hashes_between(start_hash, tip, usize::MAX)
            .map_err(|err| RpcError::General(err.to_string()))?;
        Ok(RpcChainFromBlock { removed_chain_block_hashes: Vec::new(), added_chain_block_hashes: added })
    }

    async fn get_mempool_entry(&self, transaction_id: TransactionId) -> RpcResult<RpcMempoolEntry> {
        let transaction = self
            .flow_context
            .mining_manager
            .get_transaction(&transaction_id)
            .ok_or_else(|| RpcError::NotFound(format!("transaction {transaction_id} is not in the mempool")))?;
        Ok(RpcMempoolEntry { transaction: (*transaction).clone(), fee: None, mass: None })
    }

    async fn get_raw_mempool(&self) -> RpcResult<Vec<TransactionId>> {
        Ok(self.flow_context.mining_manager.get_all_transaction_ids())
    }

    async fn get_raw_transaction(&self, transaction_id: TransactionId) -> RpcResult<Transaction> {
        self.flow_context
            .mining_manager
            .get_transaction(&transaction_id)
            .map(|tx| (*tx).clone())
            .ok_or_else(|| RpcError::NotFound(format!("transaction {transaction_id} is not in the mempool")))
    }

    async fn send_raw_transaction(&self, transaction: Transaction) -> RpcResult<TransactionId> {
        let transaction_id = transaction.id();
        self.flow_context.add_transaction(transaction, None).map_err(|err| RpcError::TransactionRejected(err.to_string()))?;
        self.notify(Notification::NewTransaction { transaction_id });
        Ok(transaction_id)
    }

    async fn get_subnetwork(&self, subnetwork_id: SubnetworkId) -> RpcResult<u64> {
        if subnetwork_id.is_builtin_or_native() {
            // Built-in subnetworks always carry a zero gas limit
            Ok(0)
        } else {
            Ok(self.flow_context.config.params.max_subnetwork_gas_limit)
        }
    }

    async fn get_tx_out(&self, outpoint: TransactionOutpoint) -> RpcResult<Option<RpcTxOut>> {
        Ok(self.consensus().get_virtual_utxo(&outpoint).map(|utxo_entry| RpcTxOut { outpoint, utxo_entry }))
    }

    async fn get_peer_info(&self) -> RpcResult<Vec<RpcPeerInfo>> {
        Ok(self
            .flow_context
            .adaptor()
            .active_peers()
            .into_iter()
            .map(|router| {
                let properties = router.properties();
                RpcPeerInfo {
                    address: router.peer_address(),
                    user_agent: properties.as_ref().map(|p| p.user_agent.clone()).unwrap_or_default(),
                    protocol_version: properties.as_ref().map(|p| p.protocol_version).unwrap_or_default(),
                    is_outbound: router.is_outbound(),
                }
            })
            .collect())
    }

    async fn get_connection_count(&self) -> RpcResult<usize> {
        Ok(self.flow_context.adaptor().peer_count())
    }

    async fn get_net_totals(&self) -> RpcResult<RpcNetTotals> {
        let address_manager = self.flow_context.address_manager.lock();
        Ok(RpcNetTotals {
            connection_count: self.flow_context.adaptor().peer_count(),
            known_address_count: address_manager.address_count(),
            banned_address_count: address_manager.banned_count(),
        })
    }

    async fn get_info(&self) -> RpcResult<RpcNodeInfo> {
        let virtual_state = self.consensus().get_virtual_state_snapshot();
        Ok(RpcNodeInfo {
            version: env!("CARGO_PKG_VERSION").to_string(),
            network_name: self.flow_context.config.params.net.name().to_string(),
            is_synced: !self.flow_context.is_ibd_running(),
            mempool_size: self.flow_context.mining_manager.transaction_count(),
            virtual_blue_score: virtual_state.blue_score(),
        })
    }

    async fn start_notify(&self, listener_id: u64, scope: NotificationScope) -> RpcResult<()> {
        let mut listeners = self.listeners.lock();
        let listener = listeners.get_mut(&listener_id).ok_or(RpcError::InvalidRequest("unknown listener".to_string()))?;
        listener.scopes.insert(scope);
        Ok(())
    }

    async fn stop_notify(&self, listener_id: u64, scope: NotificationScope) -> RpcResult<()> {
        let mut listeners = self.listeners.lock();
        let listener = listeners.get_mut(&listener_id).ok_or(RpcError::InvalidRequest("unknown listener".to_string()))?;
        listener.scopes.remove(&scope);
        Ok(())
    }

    async fn load_tx_filter(&self, listener_id: u64, filter: RpcTxFilter) -> RpcResult<()> {
        let mut listeners = self.listeners.lock();
        let listener = listeners.get_mut(&listener_id).ok_or(RpcError::InvalidRequest("unknown listener".to_string()))?;
        listener.tx_filter = filter;
        Ok(())
    }

    async fn rescan_blocks(&self, listener_id: u64, block_hashes: Vec<Hash>) -> RpcResult<Vec<RpcRescanMatch>> {
        let filter = {
            let listeners = self.listeners.lock();
            listeners.get(&listener_id).ok_or(RpcError::InvalidRequest("unknown listener".to_string()))?.tx_filter.clone()
        };
        let mut matches = Vec::new();
        for block_hash in block_hashes {
            let block = self.consensus().get_block(block_hash).map_err(|err| RpcError::NotFound(err.to_string()))?;
            let transaction_ids: Vec<TransactionId> =
                block.transactions.iter().filter(|tx| filter.matches(tx)).map(|tx| tx.id()).collect();
            if !transaction_ids.is_empty() {
                matches.push(RpcRescanMatch { block_hash, transaction_ids });
            }
        }
        Ok(matches)
    }

    async fn ping(&self) -> RpcResult<()> {
        Ok(())
    }

    async fn stop(&self) -> RpcResult<()> {
        self.shutdown_requester.trigger();
        Ok(())
    }
}
