use crate::flow_context::FlowContext;
use kaspad_p2p_lib::{router::IncomingRoute, Message, ProtocolError, SharedRouter};
use log::debug;
use std::sync::Arc;

/// Handles transaction inventory and full transactions from the peer.
/// Unknown announced transactions are requested; received ones go through
/// the shared mempool insertion path which re-relays them.
pub async fn relay_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    loop {
        match route.dequeue().await? {
            Message::InvTransaction(ids) => {
                if context.is_ibd_running() {
                    continue;
                }
                let unknown: Vec<_> = ids.into_iter().filter(|id| !context.mining_manager.has_transaction(id)).collect();
                if !unknown.is_empty() {
                    router.enqueue(Message::RequestTransactions(unknown)).await?;
                }
            }
            Message::Transaction(transaction) => {
                let id = transaction.id();
                if let Err(err) = context.add_transaction(transaction, Some(router.clone())) {
                    // Mempool policy rejections answer the peer without banning
                    debug!("Transaction {id} from {} was rejected: {err}", router.peer_address());
                    router.enqueue(Message::Reject { reason: format!("transaction {id}: {err}") }).await?;
                }
            }
            Message::TransactionNotFound { id } => {
                debug!("Peer {} does not have transaction {id}", router.peer_address());
            }
            _ => {}
        }
    }
}

/// Serves transaction requests from the mempool
pub async fn respond_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    loop {
        if let Message::RequestTransactions(ids) = route.dequeue().await? {
            for id in ids {
                match context.mining_manager.get_transaction(&id) {
                    Some(tx) => router.enqueue(Message::Transaction((*tx).clone())).await?,
                    None => router.enqueue(Message::TransactionNotFound { id }).await?,
                }
            }
        }
    }
}
