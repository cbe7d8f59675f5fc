use crate::{
    errors::ProtocolError,
    wire::{Command, Message, VersionMessage},
};
use kaspad_utils::networking::NetAddress;
use log::{debug, trace};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::mpsc;

/// Size of a per-flow incoming queue. A flow which cannot keep up causes a
/// protocol error for the peer rather than unbounded buffering.
pub const INCOMING_ROUTE_CAPACITY: usize = 256;

/// Size of the shared outgoing queue per peer
pub const OUTGOING_ROUTE_CAPACITY: usize = 1024;

pub type SharedRouter = Arc<Router>;

/// Peer metadata captured during the handshake
#[derive(Debug, Clone)]
pub struct PeerProperties {
    pub id: [u8; 16],
    pub user_agent: String,
    pub protocol_version: u32,
    pub disable_relay_tx: bool,
    pub selected_tip_hash: kaspad_hashes::Hash,
}

impl From<&VersionMessage> for PeerProperties {
    fn from(msg: &VersionMessage) -> Self {
        Self {
            id: msg.id,
            user_agent: msg.user_agent.clone(),
            protocol_version: msg.protocol_version,
            disable_relay_tx: msg.disable_relay_tx,
            selected_tip_hash: msg.selected_tip_hash,
        }
    }
}

/// A bounded queue of messages belonging to a single flow
pub struct IncomingRoute {
    receiver: mpsc::Receiver<Message>,
}

impl IncomingRoute {
    /// Waits for the next message of this flow. Returns `ConnectionClosed`
    /// once the router shuts down.
    pub async fn dequeue(&mut self) -> Result<Message, ProtocolError> {
        self.receiver.recv().await.ok_or(ProtocolError::ConnectionClosed)
    }

    /// Waits for the next message with the protocol-level timeout applied
    pub async fn dequeue_with_timeout(&mut self, timeout: Duration, what: &'static str) -> Result<Message, ProtocolError> {
        match tokio::time::timeout(timeout, self.receiver.recv()).await {
            Ok(Some(message)) => Ok(message),
            Ok(None) => Err(ProtocolError::ConnectionClosed),
            Err(_) => Err(ProtocolError::Timeout(what)),
        }
    }
}

/// The per-peer message router: demultiplexes incoming frames into per-flow
/// bounded queues and funnels all flow output into the shared outgoing queue.
/// The router also owns the flow task handles and cancels them on disconnect.
pub struct Router {
    peer_address: NetAddress,
    is_outbound: bool,
    incoming_routes: Mutex<HashMap<Command, mpsc::Sender<Message>>>,
    outgoing: mpsc::Sender<Message>,
    flow_handles: Mutex<Vec<tokio::task::JoinHandle<()>>>,
    properties: Mutex<Option<PeerProperties>>,
    /// Messages arriving before all flows were registered are held here so
    /// the registration gap cannot drop or fail them
    started: std::sync::atomic::AtomicBool,
    pending: Mutex<Vec<Message>>,
    shutdown: kaspad_utils::triggers::SingleTrigger,
}

impl Router {
    pub fn new(peer_address: NetAddress, is_outbound: bool, outgoing: mpsc::Sender<Message>) -> SharedRouter {
        Arc::new(Self {
            peer_address,
            is_outbound,
            incoming_routes: Mutex::new(HashMap::new()),
            outgoing,
            flow_handles: Mutex::new(Vec::new()),
            properties: Mutex::new(None),
            started: std::sync::atomic::AtomicBool::new(false),
            pending: Mutex::new(Vec::new()),
            shutdown: kaspad_utils::triggers::SingleTrigger::new(),
        })
    }

    pub fn peer_address(&self) -> NetAddress {
        self.peer_address
    }

    pub fn is_outbound(&self) -> bool {
        self.is_outbound
    }

    pub fn properties(&self) -> Option<PeerProperties> {
        self.properties.lock().clone()
    }

    pub fn set_properties(&self, properties: PeerProperties) {
        *self.properties.lock() = Some(properties);
    }

    /// Registers a flow route for the given commands, returning its queue.
    /// Each command may only be subscribed once per peer.
    pub fn subscribe(self: &Arc<Self>, commands: Vec<Command>) -> IncomingRoute {
        let (sender, receiver) = mpsc::channel(INCOMING_ROUTE_CAPACITY);
        let mut routes = self.incoming_routes.lock();
        for command in commands {
            assert!(routes.insert(command, sender.clone()).is_none(), "command {command:?} was already subscribed");
        }
        IncomingRoute { receiver }
    }

    /// Completes flow registration: buffered early messages are replayed into
    /// the now-complete route set, and subsequent unroutable commands become
    /// protocol errors
    pub fn start(&self) -> Result<(), ProtocolError> {
        self.started.store(true, std::sync::atomic::Ordering::SeqCst);
        let pending = std::mem::take(&mut *self.pending.lock());
        for message in pending {
            self.route_incoming(message)?;
        }
        Ok(())
    }

    /// Routes a received message to its flow queue. Oversubscription or an
    /// unexpected command are protocol errors which close the connection.
    pub fn route_incoming(&self, message: Message) -> Result<(), ProtocolError> {
        let command = message.command();
        let sender = self.incoming_routes.lock().get(&command).cloned();
        match sender {
            Some(sender) => match sender.try_send(message) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => Err(ProtocolError::IncomingRouteOverflow(command)),
                Err(mpsc::error::TrySendError::Closed(_)) => Err(ProtocolError::ConnectionClosed),
            },
            None if !self.started.load(std::sync::atomic::Ordering::SeqCst) => {
                // Flow registration is still in progress; hold the message
                let mut pending = self.pending.lock();
                if pending.len() >= INCOMING_ROUTE_CAPACITY {
                    return Err(ProtocolError::IncomingRouteOverflow(command));
                }
                trace!("Peer {} sent {command:?} before flow registration completed, buffering", self.peer_address);
                pending.push(message);
                Ok(())
            }
            None => {
                trace!("Peer {} sent a message with no registered flow: {:?}", self.peer_address, command);
                Err(ProtocolError::Misbehavior(format!("unexpected message command {command:?}")))
            }
        }
    }

    /// Sends a message through the shared outgoing route, applying
    /// backpressure by awaiting queue capacity
    pub async fn enqueue(&self, message: Message) -> Result<(), ProtocolError> {
        self.outgoing.send(message).await.map_err(|_| ProtocolError::ConnectionClosed)
    }

    /// Non-blocking enqueue used by broadcast paths; a persistently full
    /// queue is an oversubscribed-peer protocol error
    pub fn try_enqueue(&self, message: Message) -> Result<(), ProtocolError> {
        match self.outgoing.try_send(message) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(ProtocolError::OutgoingRouteOverflow),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ProtocolError::ConnectionClosed),
        }
    }

    pub fn register_flow_handle(&self, handle: tokio::task::JoinHandle<()>) {
        self.flow_handles.lock().push(handle);
    }

    pub fn shutdown_listener(&self) -> triggered::Listener {
        self.shutdown.listener.clone()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.listener.is_triggered()
    }

    /// Terminates the peer: cancels all flow tasks and drops the routes so
    /// the reader and writer loops exit at their next suspension point
    pub fn close(&self) {
        if self.is_shutdown() {
            return;
        }
        debug!("Closing the router of peer {}", self.peer_address);
        self.shutdown.trigger.trigger();
        self.incoming_routes.lock().clear();
        for handle in self.flow_handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribe_and_route() {
        let (outgoing_tx, _outgoing_rx) = mpsc::channel(8);
        let router = Router::new("127.0.0.1:16111".parse().unwrap(), true, outgoing_tx);
        let mut route = router.subscribe(vec![Command::Ping]);
        router.start().unwrap();

        router.route_incoming(Message::Ping { nonce: 5 }).unwrap();
        match route.dequeue().await.unwrap() {
            Message::Ping { nonce } => assert_eq!(nonce, 5),
            other => panic!("unexpected message {other:?}"),
        }

        // A command with no subscribed flow is a protocol violation
        assert!(matches!(router.route_incoming(Message::VerAck), Err(ProtocolError::Misbehavior(_))));
    }

    #[tokio::test]
    async fn test_pre_start_messages_are_buffered() {
        let (outgoing_tx, _outgoing_rx) = mpsc::channel(8);
        let router = Router::new("127.0.0.1:16111".parse().unwrap(), true, outgoing_tx);

        // No route yet - the message is held rather than treated as a violation
        router.route_incoming(Message::Ping { nonce: 9 }).unwrap();

        let mut route = router.subscribe(vec![Command::Ping]);
        router.start().unwrap();
        assert!(matches!(route.dequeue().await.unwrap(), Message::Ping { nonce: 9 }));
    }

    #[tokio::test]
    async fn test_incoming_route_overflow() {
        let (outgoing_tx, _outgoing_rx) = mpsc::channel(8);
        let router = Router::new("127.0.0.1:16111".parse().unwrap(), true, outgoing_tx);
        let _route = router.subscribe(vec![Command::Ping]);
        router.start().unwrap();

        for _ in 0..INCOMING_ROUTE_CAPACITY {
            router.route_incoming(Message::Ping { nonce: 0 }).unwrap();
        }
        assert!(matches!(
            router.route_incoming(Message::Ping { nonce: 0 }),
            Err(ProtocolError::IncomingRouteOverflow(Command::Ping))
        ));
    }
}
