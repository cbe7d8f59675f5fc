use kaspad_p2p_lib::{router::IncomingRoute, Message, ProtocolError, SharedRouter};
use std::time::Duration;

const PING_INTERVAL: Duration = Duration::from_secs(120);
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Answers peer pings with matching pongs
pub async fn respond_loop(mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    loop {
        if let Message::Ping { nonce } = route.dequeue().await? {
            router.enqueue(Message::Pong { nonce }).await?;
        }
    }
}

/// Periodically measures peer liveness; a missing or mismatched pong closes
/// the connection without banning
pub async fn ping_loop(mut route: IncomingRoute, router: SharedRouter) -> Result<(), ProtocolError> {
    let mut ticker = tokio::time::interval(PING_INTERVAL);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // The first tick fires immediately; skip it so we don't ping right after the handshake
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let nonce = rand::random();
        router.enqueue(Message::Ping { nonce }).await?;
        match route.dequeue_with_timeout(PONG_TIMEOUT, "Pong").await? {
            Message::Pong { nonce: received } if received == nonce => {}
            Message::Pong { .. } => {
                return Err(ProtocolError::Misbehavior("pong nonce mismatch".to_string()));
            }
            _ => {}
        }
    }
}
