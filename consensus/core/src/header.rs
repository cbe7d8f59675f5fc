use crate::hashing;
use borsh::{BorshDeserialize, BorshSerialize};
use kaspad_hashes::Hash;
use serde::{Deserialize, Serialize};

/// A block header. The genesis header is the unique header with an empty
/// parents list.
#[derive(Clone, Debug, Serialize, Deserialize, BorshSerialize, BorshDeserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Header {
    /// Cached hash
    pub hash: Hash,
    pub version: u16,
    pub parents: Vec<Hash>,
    /// Merkle root over the block's transaction hashes
    pub hash_merkle_root: Hash,
    /// Merkle root over the IDs of transactions accepted from this block's merge set
    pub accepted_id_merkle_root: Hash,
    /// Muhash of the UTXO set resulting from this block's virtual state
    pub utxo_commitment: Hash,
    /// Timestamp is in milliseconds
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
}

impl Header {
    pub fn new(version: u16, parents: Vec<Hash>, hash_merkle_root: Hash, timestamp: u64, bits: u32, nonce: u64) -> Self {
        let mut header = Self {
            hash: Default::default(),
            version,
            parents,
            hash_merkle_root,
            accepted_id_merkle_root: Default::default(),
            utxo_commitment: Default::default(),
            timestamp,
            bits,
            nonce,
        };
        header.finalize();
        header
    }

    /// Recomputes the cached header hash following field updates
    pub fn finalize(&mut self) {
        self.hash = hashing::header::hash(self);
    }

    pub fn direct_parents(&self) -> &[Hash] {
        &self.parents
    }

    pub fn is_genesis(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_hashes::ZERO_HASH;

    #[test]
    fn test_genesis_detection() {
        let genesis = Header::new(0, vec![], ZERO_HASH, 0, 0x207fffff, 0);
        assert!(genesis.is_genesis());

        let child = Header::new(0, vec![genesis.hash], ZERO_HASH, 1, 0x207fffff, 0);
        assert!(!child.is_genesis());
        assert_eq!(child.direct_parents(), &[genesis.hash]);
    }

    #[test]
    fn test_serde_round_trip() {
        let header = Header::new(1, vec![5.into(), 6.into()], ZERO_HASH, 12345, 0x207fffff, 99);
        let bin = bincode::serialize(&header).unwrap();
        assert_eq!(header, bincode::deserialize(&bin).unwrap());
    }
}
