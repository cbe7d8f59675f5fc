use crate::flow_context::FlowContext;
use kaspad_p2p_lib::{router::IncomingRoute, Message, ProtocolError, SharedRouter};
use log::debug;
use std::sync::Arc;

/// Handles block inventory announcements and full relay blocks. Announced
/// blocks are fetched on demand; received blocks run through the shared
/// insertion path which re-relays them to other peers.
pub async fn relay_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    loop {
        match route.dequeue().await? {
            Message::InvBlock { hash } => {
                if context.consensus.block_exists(hash) {
                    continue;
                }
                if context.is_ibd_running() {
                    // Relay is suspended while catching up; the block will be
                    // acquired through the sync process
                    debug!("Ignoring inv {hash} while IBD is running");
                    continue;
                }
                router.enqueue(Message::RequestIbdBlocks { low: hash, high: hash }).await?;
            }
            Message::Block(block) => {
                context.add_block(block, Some(router.clone()))?;
            }
            _ => {}
        }
    }
}
