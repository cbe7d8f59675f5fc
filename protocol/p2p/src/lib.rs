pub mod connection;
pub mod errors;
pub mod router;
pub mod wire;

pub use errors::ProtocolError;
pub use router::{Router, SharedRouter};
pub use wire::{Command, Message};

/// The protocol version advertised in Version messages
pub const PROTOCOL_VERSION: u32 = 1;

/// Maximum user agent length accepted from peers
pub const MAX_USER_AGENT_LEN: usize = 256;

/// The default user agent, overridable through configuration
pub fn default_user_agent() -> String {
    format!("/rusty-kaspad:{}/", env!("CARGO_PKG_VERSION"))
}
