use crate::flow_context::FlowContext;
use kaspad_p2p_lib::{router::IncomingRoute, Message, ProtocolError, SharedRouter};
use std::sync::Arc;

/// Maximum amount of addresses shared per response
const MAX_ADDRESSES_RESPONSE: usize = 256;

/// Serves peer address requests from the address directory
pub async fn respond_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    loop {
        if let Message::RequestAddresses = route.dequeue().await? {
            let addresses = context.address_manager.lock().iterate_prioritized_addresses().take(MAX_ADDRESSES_RESPONSE).collect();
            router.enqueue(Message::Addresses(addresses)).await?;
        }
    }
}

/// Feeds addresses learned from the peer into the address directory
pub async fn receive_loop(context: Arc<FlowContext>, mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    // Kick off a request so fresh connections seed the directory
    router.enqueue(Message::RequestAddresses).await?;
    loop {
        if let Message::Addresses(addresses) = route.dequeue().await? {
            let mut address_manager = context.address_manager.lock();
            for address in addresses {
                address_manager.add_address(address);
            }
        }
    }
}
