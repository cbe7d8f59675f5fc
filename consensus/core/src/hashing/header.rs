use super::HasherExtensions;
use crate::header::Header;
use kaspad_hashes::{BlockHash, Hash, HasherBase};

/// Returns the header hash
pub fn hash(header: &Header) -> Hash {
    let mut hasher = BlockHash::new();
    hasher
        .write_u16(header.version)
        .write_var_array(&header.parents)
        .update(header.hash_merkle_root)
        .update(header.accepted_id_merkle_root)
        .update(header.utxo_commitment)
        .write_u64(header.timestamp)
        .write_u32(header.bits)
        .write_u64(header.nonce);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_hashes::ZERO_HASH;

    #[test]
    fn test_header_hashing() {
        let header = Header::new(1, vec![1.into()], ZERO_HASH, 234, 23, 567);
        assert_ne!(header.hash, ZERO_HASH);

        let mut nonce_changed = header.clone();
        nonce_changed.nonce = 568;
        nonce_changed.finalize();
        assert_ne!(header.hash, nonce_changed.hash);
    }

    #[test]
    fn test_parents_affect_hash() {
        let header = Header::new(1, vec![1.into()], ZERO_HASH, 234, 23, 567);
        let other = Header::new(1, vec![1.into(), 2.into()], ZERO_HASH, 234, 23, 567);
        assert_ne!(header.hash, other.hash);
    }
}
