use kaspad_hashes::{Hash, HASH_SIZE};
use std::sync::Arc;

pub type BlockHashes = Arc<Vec<Hash>>;

/// `0xfe..fe` - a hash which is neither a real block hash nor the zero hash,
/// used as the virtual parent of genesis within the reachability tree
pub const ORIGIN: Hash = Hash::from_bytes([0xfe; HASH_SIZE]);

pub trait BlockHashExtensions {
    fn is_origin(&self) -> bool;
}

impl BlockHashExtensions for Hash {
    fn is_origin(&self) -> bool {
        self.eq(&ORIGIN)
    }
}

/// Exposes the hash of the block with no assumptions on the underlying type
pub trait Hashed {
    fn hash(&self) -> Hash;
}
