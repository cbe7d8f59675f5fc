pub mod addresses;
pub mod block_relay;
pub mod handshake;
pub mod ibd;
pub mod ping;
pub mod tx_relay;

use crate::flow_context::FlowContext;
use kaspad_p2p_lib::{Command, Message, ProtocolError, SharedRouter};
use log::debug;
use std::future::Future;
use std::sync::Arc;

/// Spawns a flow as an independent cooperative task owned by the router.
/// A terminal flow error converts into peer disconnection (and possibly a ban).
pub(crate) fn spawn_flow<F>(context: Arc<FlowContext>, router: SharedRouter, name: &'static str, fut: F)
where
    F: Future<Output = Result<(), ProtocolError>> + Send + 'static,
{
    let handle_router = router.clone();
    let handle = tokio::spawn(async move {
        if let Err(err) = fut.await {
            debug!("Flow {name} of peer {} exited with error: {err}", handle_router.peer_address());
            context.handle_flow_error(&handle_router, &err);
        }
    });
    router.register_flow_handle(handle);
}

/// Registers the full set of post-handshake flows for a fresh peer.
/// Subscriptions happen synchronously so no incoming message is lost
/// between registration and task startup.
pub fn register_flows(context: Arc<FlowContext>, router: SharedRouter) {
    // Ping responder and periodic pinger
    let route = router.subscribe(vec![Command::Ping]);
    spawn_flow(context.clone(), router.clone(), "ping-responder", ping::respond_loop(route, router.clone()));
    let route = router.subscribe(vec![Command::Pong]);
    spawn_flow(context.clone(), router.clone(), "pinger", ping::ping_loop(route, router.clone()));

    // Address exchange
    let route = router.subscribe(vec![Command::RequestAddresses]);
    spawn_flow(context.clone(), router.clone(), "addresses-responder", addresses::respond_loop(context.clone(), route, router.clone()));
    let route = router.subscribe(vec![Command::Addresses]);
    spawn_flow(context.clone(), router.clone(), "addresses-receiver", addresses::receive_loop(context.clone(), route, router.clone()));

    // Block relay
    let route = router.subscribe(vec![Command::InvBlock, Command::Block]);
    spawn_flow(context.clone(), router.clone(), "block-relay", block_relay::relay_loop(context.clone(), route, router.clone()));

    // Sync request serving (locators, selected tip, block ranges)
    let route = router.subscribe(vec![
        Command::RequestBlockLocator,
        Command::RequestSelectedTip,
        Command::RequestIbdBlocks,
        Command::RequestNextIbdBlocks,
    ]);
    spawn_flow(context.clone(), router.clone(), "ibd-server", ibd::server_loop(context.clone(), route, router.clone()));

    // IBD client
    let route = router.subscribe(vec![Command::SelectedTip, Command::BlockLocator, Command::IbdBlock, Command::DoneIbdBlocks]);
    spawn_flow(context.clone(), router.clone(), "ibd-client", ibd::client_loop(context.clone(), route, router.clone()));

    // Transaction relay
    let route = router.subscribe(vec![Command::InvTransaction, Command::Transaction, Command::TransactionNotFound]);
    spawn_flow(context.clone(), router.clone(), "tx-relay", tx_relay::relay_loop(context.clone(), route, router.clone()));
    let route = router.subscribe(vec![Command::RequestTransactions]);
    spawn_flow(context.clone(), router.clone(), "tx-responder", tx_relay::respond_loop(context.clone(), route, router.clone()));

    // Rejects are informational for the peer's own requests
    let mut route = router.subscribe(vec![Command::Reject]);
    let reject_router = router.clone();
    spawn_flow(context, router, "reject-handler", async move {
        loop {
            if let Message::Reject { reason } = route.dequeue().await? {
                debug!("Peer {} rejected our message: {reason}", reject_router.peer_address());
            }
        }
    });
}
