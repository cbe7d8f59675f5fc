use kaspad_addressmanager::AddressManager;
use kaspad_core::time::unix_now;
use kaspad_p2p_lib::connection::Adaptor;
use kaspad_utils::networking::NetAddress;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Duration,
};

/// Interval of the connection maintenance tick
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(30);

/// Base dial backoff; doubles per consecutive failure
const DIAL_BACKOFF_BASE: u64 = 30_000;
const DIAL_BACKOFF_MAX: u64 = 30 * 60 * 1000;

struct DialState {
    failures: u32,
    next_attempt: u64,
}

/// Keeps the node connected: maintains a target number of outbound peers
/// honoring bans and per-address exponential dial backoff, enforces the
/// inbound cap, and holds permanently-requested peers connected
pub struct ConnectionManager {
    adaptor: Arc<Adaptor>,
    address_manager: Arc<Mutex<AddressManager>>,
    target_outbound: usize,
    inbound_cap: usize,
    /// Addresses the operator explicitly asked to stay connected to
    requested_peers: Mutex<Vec<NetAddress>>,
    dial_states: Mutex<HashMap<NetAddress, DialState>>,
    shutdown: kaspad_utils::triggers::SingleTrigger,
}

impl ConnectionManager {
    pub fn new(
        adaptor: Arc<Adaptor>,
        address_manager: Arc<Mutex<AddressManager>>,
        target_outbound: usize,
        inbound_cap: usize,
        requested_peers: Vec<NetAddress>,
    ) -> Arc<Self> {
        Arc::new(Self {
            adaptor,
            address_manager,
            target_outbound,
            inbound_cap,
            requested_peers: Mutex::new(requested_peers),
            dial_states: Mutex::new(HashMap::new()),
            shutdown: kaspad_utils::triggers::SingleTrigger::new(),
        })
    }

    /// Adds a peer requested at runtime (e.g. through RPC)
    pub fn add_requested_peer(&self, address: NetAddress) {
        self.requested_peers.lock().push(address);
    }

    pub fn stop(&self) {
        self.shutdown.trigger.trigger();
    }

    /// Runs the maintenance loop until shutdown
    pub async fn worker(self: Arc<Self>) {
        let shutdown = self.shutdown.listener.clone();
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.maintenance_tick().await,
                _ = shutdown.clone() => break,
            }
        }
        debug!("Connection manager worker exiting");
    }

    async fn maintenance_tick(&self) {
        self.connect_requested_peers().await;
        self.fill_outbound_slots().await;
        self.enforce_inbound_cap();
    }

    async fn connect_requested_peers(&self) {
        let requested = self.requested_peers.lock().clone();
        for address in requested {
            if !self.adaptor.has_peer(address) && self.may_dial(address) {
                self.dial(address).await;
            }
        }
    }

    async fn fill_outbound_slots(&self) {
        let outbound_count = self.adaptor.active_peers().iter().filter(|router| router.is_outbound()).count();
        if outbound_count >= self.target_outbound {
            return;
        }
        let missing = self.target_outbound - outbound_count;
        debug!("Connection manager: {outbound_count}/{} outbound peers, dialing up to {missing}", self.target_outbound);

        let connected: HashSet<NetAddress> = self.adaptor.active_peers().iter().map(|router| router.peer_address()).collect();
        for _ in 0..missing {
            let candidate = self.address_manager.lock().select_outbound(&connected);
            match candidate {
                Some(address) if self.may_dial(address) => self.dial(address).await,
                _ => break,
            }
        }
    }

    /// Returns whether the address is past its dial backoff window
    fn may_dial(&self, address: NetAddress) -> bool {
        match self.dial_states.lock().get(&address) {
            Some(state) => state.next_attempt <= unix_now(),
            None => true,
        }
    }

    async fn dial(&self, address: NetAddress) {
        match self.adaptor.connect_peer(address).await {
            Ok(()) => {
                self.dial_states.lock().remove(&address);
                self.address_manager.lock().good(address);
                info!("Connected to peer {address}");
            }
            Err(err) => {
                warn!("Dialing {address} failed: {err}");
                self.address_manager.lock().attempted(address);
                let mut states = self.dial_states.lock();
                let state = states.entry(address).or_insert(DialState { failures: 0, next_attempt: 0 });
                state.failures += 1;
                let backoff = (DIAL_BACKOFF_BASE << state.failures.min(16)).min(DIAL_BACKOFF_MAX);
                state.next_attempt = unix_now() + backoff;
            }
        }
    }

    fn enforce_inbound_cap(&self) {
        let inbound: Vec<_> = self.adaptor.active_peers().into_iter().filter(|router| !router.is_outbound()).collect();
        if inbound.len() <= self.inbound_cap {
            return;
        }
        // Drop the newest connections over the cap
        for router in inbound.into_iter().skip(self.inbound_cap) {
            info!("Disconnecting inbound peer {} (inbound cap of {} exceeded)", router.peer_address(), self.inbound_cap);
            router.close();
        }
    }
}
