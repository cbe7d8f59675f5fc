use crate::flows;
use kaspad_addressmanager::AddressManager;
use kaspad_consensus::consensus::Consensus;
use kaspad_consensus_core::{block::Block, config::Config, errors::block::RuleError, tx::Transaction};
use kaspad_hashes::Hash;
use kaspad_mining::MiningManager;
use kaspad_p2p_lib::{
    connection::{Adaptor, ConnectionInitializer},
    ProtocolError, Message, SharedRouter,
};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{
    collections::HashMap,
    sync::{Arc, OnceLock},
};

/// Maximum relay blocks held while waiting for their missing parents
const MAX_ORPHAN_BLOCKS: usize = 512;

/// The shared context of all protocol flows: the consensus engine, the
/// mempool, the address directory and the peer hub
pub struct FlowContext {
    pub config: Arc<Config>,
    pub consensus: Arc<Consensus>,
    pub mining_manager: Arc<MiningManager>,
    pub address_manager: Arc<Mutex<AddressManager>>,
    /// Identifies this node across the p2p network
    pub node_id: [u8; 16],
    adaptor: OnceLock<Arc<Adaptor>>,
    /// Relay blocks whose parents are missing, keyed by block hash
    orphan_blocks: Mutex<HashMap<Hash, Block>>,
    /// Whether an IBD run is currently in progress (a single peer at a time)
    ibd_in_progress: Mutex<bool>,
}

impl FlowContext {
    pub fn new(
        config: Arc<Config>,
        consensus: Arc<Consensus>,
        mining_manager: Arc<MiningManager>,
        address_manager: Arc<Mutex<AddressManager>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            consensus,
            mining_manager,
            address_manager,
            node_id: *uuid::Uuid::new_v4().as_bytes(),
            adaptor: OnceLock::new(),
            orphan_blocks: Mutex::new(HashMap::new()),
            ibd_in_progress: Mutex::new(false),
        })
    }

    /// Binds the peer hub once constructed (the hub itself requires this
    /// context as its connection initializer)
    pub fn set_adaptor(&self, adaptor: Arc<Adaptor>) {
        self.adaptor.set(adaptor).map_err(|_| ()).expect("the adaptor is set exactly once");
    }

    pub fn adaptor(&self) -> &Arc<Adaptor> {
        self.adaptor.get().expect("the adaptor must be set during node assembly")
    }

    /// Attempts to start an IBD run; returns false if one is already running
    pub fn try_set_ibd_running(&self) -> bool {
        let mut running = self.ibd_in_progress.lock();
        if *running {
            false
        } else {
            *running = true;
            true
        }
    }

    pub fn unset_ibd_running(&self) {
        *self.ibd_in_progress.lock() = false;
    }

    pub fn is_ibd_running(&self) -> bool {
        *self.ibd_in_progress.lock()
    }

    /// The shared block insertion path for relay, IBD and RPC submission.
    /// Accepted blocks are relayed to all peers except the originating one,
    /// and the mempool is re-evaluated against the new virtual state.
    pub fn add_block(&self, block: Block, origin: Option<SharedRouter>) -> Result<(), ProtocolError> {
        let hash = block.hash();
        match self.consensus.validate_and_insert_block(block.clone()) {
            Ok(_status) => {
                self.on_block_added(&block, origin.as_ref().map(|router| router.peer_address()));
                Ok(())
            }
            Err(RuleError::MissingParents(missing)) => {
                debug!("Block {hash} is an orphan with {} missing parents", missing.len());
                self.hold_orphan_block(block);
                // Ask the originator for the missing parents
                if let Some(router) = origin {
                    for parent in missing {
                        router.try_enqueue(Message::RequestIbdBlocks { low: parent, high: parent })?;
                    }
                }
                Ok(())
            }
            Err(err) => Err(ProtocolError::Misbehavior(format!("invalid block {hash}: {err}"))),
        }
    }

    fn on_block_added(&self, block: &Block, origin: Option<kaspad_utils::networking::NetAddress>) {
        // Relay the inventory to everyone but the originator
        self.adaptor().broadcast(Message::InvBlock { hash: block.hash() }, origin);

        // Re-evaluate the mempool against the updated virtual state
        let removed = self.mining_manager.handle_new_block_transactions(&self.consensus, &block.transactions);
        if !removed.is_empty() {
            debug!("{} mempool transactions were removed following block {}", removed.len(), block.hash());
        }

        // Any orphan waiting on this block can be retried now
        self.try_unorphan_children(block.hash());
    }

    fn hold_orphan_block(&self, block: Block) {
        let mut orphans = self.orphan_blocks.lock();
        if orphans.len() >= MAX_ORPHAN_BLOCKS {
            // Evict an arbitrary entry to keep the pool bounded
            if let Some(evicted) = orphans.keys().next().copied() {
                orphans.remove(&evicted);
            }
        }
        orphans.insert(block.hash(), block);
    }

    fn try_unorphan_children(&self, parent: Hash) {
        let candidates: Vec<Block> = {
            let orphans = self.orphan_blocks.lock();
            orphans.values().filter(|block| block.header.parents.contains(&parent)).cloned().collect()
        };
        for block in candidates {
            let hash = block.hash();
            if block.header.parents.iter().all(|p| self.consensus.block_exists(*p)) {
                self.orphan_blocks.lock().remove(&hash);
                match self.consensus.validate_and_insert_block(block.clone()) {
                    Ok(_) => {
                        info!("Unorphaned block {hash}");
                        self.on_block_added(&block, None);
                    }
                    Err(err) => debug!("Unorphaning block {hash} failed: {err}"),
                }
            }
        }
    }

    /// The shared transaction insertion path for relay and RPC submission
    pub fn add_transaction(&self, transaction: Transaction, origin: Option<SharedRouter>) -> Result<(), ProtocolError> {
        let accepted = self
            .mining_manager
            .validate_and_insert_transaction(&self.consensus, transaction, true)
            .map_err(|err| ProtocolError::Rejected(err.to_string()))?;
        if !accepted.is_empty() {
            let ids = accepted.iter().map(|tx| tx.id()).collect();
            self.adaptor().broadcast(Message::InvTransaction(ids), origin.map(|router| router.peer_address()));
        }
        Ok(())
    }

    /// Handles a terminal flow error for a peer: protocol violations flagged
    /// with should-ban add the peer to the banned set before disconnecting
    pub fn handle_flow_error(&self, router: &SharedRouter, err: &ProtocolError) {
        if err.should_ban() {
            warn!("Banning peer {} due to protocol violation: {err}", router.peer_address());
            self.address_manager.lock().ban(router.peer_address().ip);
        }
        router.close();
    }
}

#[async_trait::async_trait]
impl ConnectionInitializer for FlowContext {
    async fn initialize_connection(self: Arc<Self>, router: SharedRouter) -> Result<(), ProtocolError> {
        flows::handshake::perform_handshake(&self, &router).await?;
        flows::register_flows(self.clone(), router.clone());
        // Replay any messages buffered while flows were being registered
        router.start()?;
        // A fresh peer is a fresh chance to catch up
        router.enqueue(Message::RequestSelectedTip).await?;
        Ok(())
    }
}
