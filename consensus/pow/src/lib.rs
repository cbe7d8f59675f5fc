use kaspad_consensus_core::{hashing, header::Header};
use kaspad_hashes::{Hash, HasherBase, ProofOfWorkHash};
use kaspad_math::Uint256;

/// State for validating the proof of work of a single header over possibly
/// many nonce attempts
pub struct State {
    target: Uint256,
    /// The header hashed with a zeroed nonce
    prefix_hash: Hash,
}

impl State {
    pub fn new(header: &Header) -> Self {
        let target = Uint256::from_compact_target_bits(header.bits);

        let mut zero_nonce_header = header.clone();
        zero_nonce_header.nonce = 0;
        let prefix_hash = hashing::header::hash(&zero_nonce_header);

        Self { target, prefix_hash }
    }

    /// Computes the proof-of-work hash for the given nonce
    pub fn calculate_pow(&self, nonce: u64) -> Uint256 {
        let mut hasher = ProofOfWorkHash::new();
        hasher.update(self.prefix_hash).update(nonce.to_le_bytes());
        let hash = hasher.finalize();
        // The pow hash is interpreted as a little endian number
        Uint256::from_le_bytes(hash.as_bytes())
    }

    /// Returns true iff the proof of work for the given nonce meets the target.
    /// A zero or overflowing target never passes.
    pub fn check_pow(&self, nonce: u64) -> (bool, Uint256) {
        if self.target.is_zero() {
            return (false, Uint256::ZERO);
        }
        let pow = self.calculate_pow(nonce);
        (pow <= self.target, pow)
    }
}

/// Validates the header's committed nonce against its encoded difficulty bits
pub fn check_pow_of_header(header: &Header) -> bool {
    State::new(header).check_pow(header.nonce).0
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_hashes::ZERO_HASH;

    fn easy_header(nonce: u64) -> Header {
        // 0x207fffff encodes a target of nearly 2^255, met by half of all hashes
        Header::new(0, vec![1.into()], ZERO_HASH, 0, 0x207fffff, nonce)
    }

    #[test]
    fn test_easy_target_is_reachable() {
        let state = State::new(&easy_header(0));
        let found = (0u64..256).any(|nonce| state.check_pow(nonce).0);
        assert!(found, "an easy target must be met within a couple hundred attempts");
    }

    #[test]
    fn test_impossible_target_never_passes() {
        let mut header = easy_header(0);
        header.bits = 0; // zero target
        let state = State::new(&header);
        assert!(!(0u64..100).any(|nonce| state.check_pow(nonce).0));
    }

    #[test]
    fn test_nonce_changes_pow() {
        let state = State::new(&easy_header(0));
        assert_ne!(state.calculate_pow(1), state.calculate_pow(2));
    }
}
