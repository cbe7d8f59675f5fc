use crate::flow_context::FlowContext;
use kaspad_p2p_lib::{
    router::PeerProperties,
    wire::{Command, Message, VersionMessage},
    ProtocolError, SharedRouter, MAX_USER_AGENT_LEN, PROTOCOL_VERSION,
};
use log::debug;
use std::time::Duration;

pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(4);

/// Runs the version/verack handshake. Both directions run concurrently: we
/// send our Version immediately and spawn two waits, one expecting the peer's
/// Version (answered with VerAck) and one expecting the peer's VerAck for our
/// own Version. Any protocol error or timeout terminates the connection.
pub async fn perform_handshake(context: &FlowContext, router: &SharedRouter) -> Result<(), ProtocolError> {
    let mut version_route = router.subscribe(vec![Command::Version]);
    let mut verack_route = router.subscribe(vec![Command::VerAck]);

    let our_version = VersionMessage {
        protocol_version: PROTOCOL_VERSION,
        timestamp: kaspad_core::time::unix_now(),
        id: context.node_id,
        user_agent: kaspad_p2p_lib::default_user_agent(),
        disable_relay_tx: false,
        subnetwork_id: None,
        selected_tip_hash: context.consensus.get_selected_tip_hash(),
    };
    router.enqueue(Message::Version(our_version)).await?;

    let expect_version = async {
        let message = version_route.dequeue_with_timeout(HANDSHAKE_TIMEOUT, "Version").await?;
        let Message::Version(peer_version) = message else {
            return Err(ProtocolError::Misbehavior("expected a Version message".to_string()));
        };
        validate_peer_version(context, &peer_version)?;
        router.enqueue(Message::VerAck).await?;
        Ok(peer_version)
    };

    let expect_verack = async {
        match verack_route.dequeue_with_timeout(HANDSHAKE_TIMEOUT, "VerAck").await? {
            Message::VerAck => Ok(()),
            _ => Err(ProtocolError::Misbehavior("expected a VerAck message".to_string())),
        }
    };

    let (peer_version, ()) = tokio::try_join!(expect_version, expect_verack)?;
    debug!("Handshake with {} completed: {}", router.peer_address(), peer_version.user_agent);
    router.set_properties(PeerProperties::from(&peer_version));
    Ok(())
}

fn validate_peer_version(context: &FlowContext, peer_version: &VersionMessage) -> Result<(), ProtocolError> {
    if peer_version.user_agent.len() > MAX_USER_AGENT_LEN {
        return Err(ProtocolError::VersionRejected(format!("user agent of {} bytes is too long", peer_version.user_agent.len())));
    }
    // A peer echoing our own id indicates a self connection
    if peer_version.id == context.node_id {
        return Err(ProtocolError::VersionRejected("connected to self".to_string()));
    }
    // Full native nodes only peer within the native subnetwork
    if peer_version.subnetwork_id.is_some() {
        return Err(ProtocolError::VersionRejected("incompatible subnetwork".to_string()));
    }
    Ok(())
}
