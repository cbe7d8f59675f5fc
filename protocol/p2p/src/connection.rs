use crate::{
    errors::ProtocolError,
    router::{Router, SharedRouter, OUTGOING_ROUTE_CAPACITY},
    wire::{FrameCodec, Message},
};
use futures::{SinkExt, StreamExt};
use kaspad_utils::networking::NetAddress;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::{collections::HashMap, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use tokio_util::codec::Framed;

/// Performs the application-level initialization of a fresh connection:
/// the handshake and flow registration. Implemented by the flows layer.
#[async_trait::async_trait]
pub trait ConnectionInitializer: Send + Sync {
    async fn initialize_connection(self: Arc<Self>, router: SharedRouter) -> Result<(), ProtocolError>;
}

/// Owns all active peer connections: accepts inbound sockets, dials outbound
/// ones, and tears peers down on protocol errors
pub struct Adaptor {
    magic: u32,
    initializer: Arc<dyn ConnectionInitializer>,
    /// Active routers keyed by peer address
    peers: Mutex<HashMap<NetAddress, SharedRouter>>,
}

impl Adaptor {
    pub fn new(magic: u32, initializer: Arc<dyn ConnectionInitializer>) -> Arc<Self> {
        Arc::new(Self { magic, initializer, peers: Mutex::new(HashMap::new()) })
    }

    pub fn active_peers(&self) -> Vec<SharedRouter> {
        self.peers.lock().values().cloned().collect()
    }

    pub fn has_peer(&self, address: NetAddress) -> bool {
        self.peers.lock().contains_key(&address)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.lock().len()
    }

    /// Broadcasts a message to every active peer except the optional origin
    pub fn broadcast(&self, message: Message, skip: Option<NetAddress>) {
        for (address, router) in self.peers.lock().iter() {
            if Some(*address) == skip {
                continue;
            }
            if let Err(err) = router.try_enqueue(message.clone()) {
                debug!("Broadcast to {address} failed: {err}");
            }
        }
    }

    /// Starts the server accept loop on the given address
    pub async fn listen(self: Arc<Self>, listen_address: NetAddress) -> Result<tokio::task::JoinHandle<()>, ProtocolError> {
        let listener = TcpListener::bind(std::net::SocketAddr::from(listen_address)).await?;
        info!("P2P server listening on {listen_address}");
        Ok(tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, socket_address)) => {
                        let this = self.clone();
                        tokio::spawn(async move {
                            this.handle_connection(stream, socket_address.into(), false).await;
                        });
                    }
                    Err(err) => {
                        warn!("P2P accept loop error: {err}");
                        break;
                    }
                }
            }
        }))
    }

    /// Dials a peer and runs the connection to completion in the background
    pub async fn connect_peer(self: &Arc<Self>, address: NetAddress) -> Result<(), ProtocolError> {
        if self.has_peer(address) {
            return Ok(());
        }
        let stream = TcpStream::connect(std::net::SocketAddr::from(address)).await?;
        let this = self.clone();
        tokio::spawn(async move {
            this.handle_connection(stream, address, true).await;
        });
        Ok(())
    }

    async fn handle_connection(self: &Arc<Self>, stream: TcpStream, address: NetAddress, is_outbound: bool) {
        debug!("New {} connection with {address}", if is_outbound { "outbound" } else { "inbound" });
        let framed = Framed::new(stream, FrameCodec::new(self.magic));
        let (mut sink, mut stream) = framed.split();

        let (outgoing_tx, mut outgoing_rx) = mpsc::channel::<Message>(OUTGOING_ROUTE_CAPACITY);
        let router = Router::new(address, is_outbound, outgoing_tx);

        // Poll the initializer once before the reader starts, guaranteeing the
        // handshake routes are subscribed ahead of the first incoming frame
        let mut init_fut = Box::pin(self.initializer.clone().initialize_connection(router.clone()));
        let first_poll = futures::poll!(&mut init_fut);

        // Writer loop: drains the shared outgoing route into the socket
        let writer_router = router.clone();
        let writer = tokio::spawn(async move {
            while let Some(message) = outgoing_rx.recv().await {
                if sink.send(message).await.is_err() {
                    break;
                }
            }
            writer_router.close();
        });

        // Reader loop: surfaces frames into the per-flow queues in order
        let reader_router = router.clone();
        let reader = tokio::spawn(async move {
            loop {
                match stream.next().await {
                    Some(Ok(message)) => {
                        if let Err(err) = reader_router.route_incoming(message) {
                            debug!("Routing error for peer {}: {err} (ban: {})", reader_router.peer_address(), err.should_ban());
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        debug!("Framing error for peer {}: {err} (ban: {})", reader_router.peer_address(), err.should_ban());
                        break;
                    }
                    None => break,
                }
            }
            reader_router.close();
        });

        // Application-level initialization: handshake + flow registration
        let init_result = match first_poll {
            std::task::Poll::Ready(result) => result,
            std::task::Poll::Pending => init_fut.await,
        };
        match init_result {
            Ok(()) => {
                self.peers.lock().insert(address, router.clone());
            }
            Err(err) => {
                debug!("Connection initialization with {address} failed: {err}");
                router.close();
            }
        }

        // Wait for connection termination and clean up
        let shutdown = router.shutdown_listener();
        shutdown.await;
        self.peers.lock().remove(&address);
        reader.abort();
        writer.abort();
        debug!("Connection with {address} terminated");
    }

    /// Disconnects all peers
    pub fn terminate_all_peers(&self) {
        for (_, router) in self.peers.lock().drain() {
            router.close();
        }
    }
}
