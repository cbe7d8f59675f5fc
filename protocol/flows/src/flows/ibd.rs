use crate::flow_context::FlowContext;
use kaspad_hashes::Hash;
use kaspad_p2p_lib::{router::IncomingRoute, Message, ProtocolError, SharedRouter};
use log::{debug, info};
use std::collections::VecDeque;
use std::sync::Arc;

/// Number of blocks sent per batch before the server waits for the
/// requester's explicit continuation
pub const IBD_BATCH_SIZE: usize = 64;

/// Bound on a single ranged blocks request
const MAX_BLOCKS_PER_REQUEST: usize = 1 << 14;

/// Serves the sync-related requests of the peer: selected tip queries, block
/// locators, single relay blocks and ranged IBD batches. The batch cursor is
/// flow-local state, so each peer independently walks its own download.
pub async fn server_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    let mut pending: VecDeque<Hash> = VecDeque::new();
    loop {
        match route.dequeue().await? {
            Message::RequestSelectedTip => {
                router.enqueue(Message::SelectedTip { hash: context.consensus.get_selected_tip_hash() }).await?;
            }
            Message::RequestBlockLocator { high: _, limit: _ } => {
                // The locator walks our own selected chain from the tip down
                let locator = context.consensus.create_block_locator();
                router.enqueue(Message::BlockLocator(locator)).await?;
            }
            Message::RequestIbdBlocks { low, high } => {
                if low == high {
                    // A single-block (relay) request is answered directly
                    match context.consensus.get_block(low) {
                        Ok(block) => router.enqueue(Message::Block(block)).await?,
                        Err(_) => router.enqueue(Message::Reject { reason: format!("block {low} not found") }).await?,
                    }
                    continue;
                }
                match context.consensus.get_hashes_between(low, high, MAX_BLOCKS_PER_REQUEST) {
                    Ok(hashes) => {
                        debug!("Serving an IBD range of {} blocks to {}", hashes.len(), router.peer_address());
                        pending = hashes.into();
                        send_batch(&context, &router, &mut pending).await?;
                    }
                    Err(_) => {
                        router.enqueue(Message::Reject { reason: "unknown IBD range".to_string() }).await?;
                    }
                }
            }
            Message::RequestNextIbdBlocks => {
                send_batch(&context, &router, &mut pending).await?;
            }
            _ => {}
        }
    }
}

async fn send_batch(context: &FlowContext, router: &SharedRouter, pending: &mut VecDeque<Hash>) -> Result<(), ProtocolError> {
    for _ in 0..IBD_BATCH_SIZE {
        let Some(hash) = pending.pop_front() else { break };
        match context.consensus.get_block(hash) {
            Ok(block) => router.enqueue(Message::IbdBlock(block)).await?,
            Err(_) => break,
        }
    }
    if pending.is_empty() {
        router.enqueue(Message::DoneIbdBlocks).await?;
    }
    Ok(())
}

/// The IBD client: negotiates the highest shared block through a locator
/// exchange and downloads the gap in batches, applying each block before
/// acknowledging the next batch. On disconnect the flow simply exits; the
/// download is idempotently resumable from this or any other peer.
pub async fn client_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    let mut ibd_target: Option<Hash> = None;
    let mut received_in_batch = 0usize;
    let result: Result<(), ProtocolError> = async {
        loop {
            match route.dequeue().await? {
                Message::SelectedTip { hash } => {
                    if context.consensus.block_exists(hash) || ibd_target.is_some() {
                        continue;
                    }
                    if !context.try_set_ibd_running() {
                        debug!("Skipping IBD with {}: another run is in progress", router.peer_address());
                        continue;
                    }
                    info!("IBD started with peer {} towards {hash}", router.peer_address());
                    ibd_target = Some(hash);
                    router.enqueue(Message::RequestBlockLocator { high: hash, limit: 0 }).await?;
                }
                Message::BlockLocator(locator) => {
                    let Some(target) = ibd_target else { continue };
                    // The highest locator entry we recognize bounds the missing range
                    let low = context.consensus.find_highest_shared_block(&locator);
                    debug!("IBD locator negotiation: highest shared block is {low}");
                    received_in_batch = 0;
                    router.enqueue(Message::RequestIbdBlocks { low, high: target }).await?;
                }
                Message::IbdBlock(block) => {
                    if ibd_target.is_none() {
                        return Err(ProtocolError::Misbehavior("unsolicited IBD block".to_string()));
                    }
                    context.add_block(block, Some(router.clone()))?;
                    received_in_batch += 1;
                    if received_in_batch == IBD_BATCH_SIZE {
                        received_in_batch = 0;
                        router.enqueue(Message::RequestNextIbdBlocks).await?;
                    }
                }
                Message::DoneIbdBlocks => {
                    if let Some(target) = ibd_target.take() {
                        context.unset_ibd_running();
                        info!("IBD with peer {} completed (target {target})", router.peer_address());
                    }
                }
                _ => {}
            }
        }
    }
    .await;

    // Never leave the global IBD flag dangling when the flow unwinds
    if ibd_target.is_some() {
        context.unset_ibd_running();
    }
    result
}
