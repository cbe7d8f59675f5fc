pub mod hex;
pub mod networking;
pub mod refs;
pub mod serde_bytes;
pub mod triggers;
