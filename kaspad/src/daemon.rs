use crate::args::Args;
use kaspad_addressmanager::AddressManager;
use kaspad_connectionmanager::ConnectionManager;
use kaspad_consensus::consensus::Consensus;
use kaspad_consensus_core::{
    config::{params::Params, Config},
    network::NetworkType,
};
use kaspad_core::{
    core::Core,
    task::{
        runtime::AsyncRuntime,
        service::{AsyncService, AsyncServiceFuture},
    },
};
use kaspad_database::prelude::open_db;
use kaspad_mining::{mempool::config::MempoolConfig, MiningManager};
use kaspad_p2p_flows::FlowContext;
use kaspad_p2p_lib::connection::Adaptor;
use kaspad_rpc_service::RpcCoreService;
use kaspad_utils::networking::NetAddress;
use log::{info, warn};
use parking_lot::Mutex;
use std::{sync::Arc, time::Duration};

/// Interval of the periodic address directory snapshot
const ADDRESS_STORE_INTERVAL: Duration = Duration::from_secs(10 * 60);

const DEFAULT_TARGET_OUTBOUND: usize = 8;
const DEFAULT_INBOUND_CAP: usize = 117;

pub struct Daemon {
    pub core: Arc<Core>,
    pub rpc_service: Arc<RpcCoreService>,
}

/// Wires the whole node together: storage, consensus, mempool, p2p and the
/// RPC façade, all hosted on the shared runtime
pub fn create_daemon(args: Args) -> Result<Daemon, String> {
    let network = args.network();
    let mut params: Params = network.into();
    if let Some(block_max_mass) = args.block_max_mass {
        params.max_block_mass = block_max_mass;
    }
    let config = Arc::new(Config::new(params));

    let app_dir = args.app_dir();
    std::fs::create_dir_all(&app_dir).map_err(|err| format!("cannot create app dir {}: {err}", app_dir.display()))?;
    info!("Application directory: {}", app_dir.display());

    // Storage and consensus
    let db = open_db(&app_dir.join("db"), true, num_cpus_capped());
    let consensus = Consensus::new(db, &app_dir, config.clone()).map_err(|err| format!("consensus init: {err}"))?;

    // Mempool
    let mut mempool_config = MempoolConfig::build_default(&config.params);
    if let Some(fee) = args.min_relay_tx_fee {
        mempool_config = mempool_config.with_minimum_relay_fee(fee);
    }
    if let Some(max_orphans) = args.max_orphan_tx {
        mempool_config = mempool_config.with_maximum_orphans(max_orphans);
    }
    let mining_manager = Arc::new(MiningManager::new(&config.params, mempool_config));

    if args.acceptance_index {
        info!("Transaction acceptance data is maintained for every chain block");
    }
    if let Some(mining_addr) = &args.mining_addr {
        match mining_addr.parse::<kaspad_addresses::Address>() {
            Ok(address) => info!("Mining address: {address}"),
            Err(err) => warn!("The configured mining address does not parse: {err}"),
        }
    }

    // Networking
    let address_manager = Arc::new(Mutex::new(AddressManager::new(app_dir.clone())));
    let flow_context = FlowContext::new(config.clone(), consensus.clone(), mining_manager, address_manager.clone());
    let adaptor = Adaptor::new(config.params.net.magic(), flow_context.clone());
    flow_context.set_adaptor(adaptor.clone());

    let mut requested_peers = args.connect.clone();
    requested_peers.extend(args.add_peers.iter().copied());
    let target_outbound = if args.connect.is_empty() { DEFAULT_TARGET_OUTBOUND } else { 0 };
    let connection_manager =
        ConnectionManager::new(adaptor.clone(), address_manager.clone(), target_outbound, DEFAULT_INBOUND_CAP, requested_peers);

    let listen_address = args
        .listen
        .unwrap_or_else(|| NetAddress::new("0.0.0.0".parse().expect("valid any-address"), network_default_port(network)));

    // Core assembly: the async runtime hosts the p2p service; ctrl-c and the
    // RPC stop command both funnel into the core shutdown sequence
    let core = Core::new();
    let (shutdown_trigger, shutdown_listener) = triggered::trigger();
    let rpc_service = RpcCoreService::new(flow_context.clone(), shutdown_trigger);

    let p2p_service = Arc::new(P2pService {
        adaptor,
        connection_manager,
        address_manager,
        rpc_service: rpc_service.clone(),
        listen_address,
        shutdown: kaspad_utils::triggers::SingleTrigger::new(),
    });

    let runtime = Arc::new(AsyncRuntime::default());
    runtime.register(p2p_service);
    core.bind(runtime);

    // Bridge the RPC stop request into the core lifecycle
    let shutdown_core = core.clone();
    std::thread::spawn(move || {
        shutdown_listener.wait();
        shutdown_core.shutdown();
    });

    Ok(Daemon { core, rpc_service })
}

fn num_cpus_capped() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(8)
}

fn network_default_port(network: NetworkType) -> u16 {
    network.default_p2p_port()
}

/// The p2p async service: the accept loop, the connection maintenance worker
/// and the periodic address snapshot
struct P2pService {
    adaptor: Arc<Adaptor>,
    connection_manager: Arc<ConnectionManager>,
    address_manager: Arc<Mutex<AddressManager>>,
    rpc_service: Arc<RpcCoreService>,
    listen_address: NetAddress,
    shutdown: kaspad_utils::triggers::SingleTrigger,
}

impl AsyncService for P2pService {
    fn ident(self: Arc<Self>) -> &'static str {
        "p2p-service"
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            self.rpc_service.start_notification_dispatcher();
            let listen_handle = match self.adaptor.clone().listen(self.listen_address).await {
                Ok(handle) => handle,
                Err(err) => {
                    return Err(kaspad_core::task::service::AsyncServiceError::Service(format!("p2p listen failed: {err}")));
                }
            };

            let connection_worker = tokio::spawn(self.connection_manager.clone().worker());

            // Periodic address persistence until shutdown
            let shutdown = self.shutdown.listener.clone();
            let mut ticker = tokio::time::interval(ADDRESS_STORE_INTERVAL);
            loop {
                tokio::select! {
                    _ = ticker.tick() => self.address_manager.lock().store(),
                    _ = shutdown.clone() => break,
                }
            }

            listen_handle.abort();
            connection_worker.abort();
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        self.shutdown.trigger.trigger();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            self.connection_manager.stop();
            self.adaptor.terminate_all_peers();
            // Final address directory snapshot
            self.address_manager.lock().store();
            Ok(())
        })
    }
}
