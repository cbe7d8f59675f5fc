use crate::{block::Block, header::Header, merkle::calc_hash_merkle_root, subnets::SUBNETWORK_ID_COINBASE, tx::Transaction};
use kaspad_muhash::EMPTY_MUHASH;

/// The parameters of the unique parentless block of each network. The genesis
/// hash is derived from these fields, so they fully pin the network identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenesisBlock {
    pub version: u16,
    pub timestamp: u64,
    pub bits: u32,
    pub nonce: u64,
    pub coinbase_payload: &'static [u8],
}

impl GenesisBlock {
    /// Builds the genesis coinbase transaction: no inputs, no outputs, hence
    /// an empty starting UTXO set
    pub fn build_genesis_transaction(&self) -> Transaction {
        Transaction::new(0, Vec::new(), Vec::new(), 0, SUBNETWORK_ID_COINBASE, 0, self.coinbase_payload.to_vec())
    }

    pub fn build_genesis_block(&self) -> Block {
        let coinbase = self.build_genesis_transaction();
        let mut header = Header::new(
            self.version,
            Vec::new(),
            calc_hash_merkle_root(std::iter::once(&coinbase)),
            self.timestamp,
            self.bits,
            self.nonce,
        );
        header.utxo_commitment = EMPTY_MUHASH;
        header.finalize();
        Block::new(header, vec![coinbase])
    }
}

pub const GENESIS: GenesisBlock = GenesisBlock {
    version: 0,
    // 2021-11-07 16:11:51 UTC
    timestamp: 0x17d0828a5ab,
    bits: 0x1e7fffff,
    nonce: 0x3392c,
    coinbase_payload: &[
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Blue score
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Subsidy
        0x00, 0x00, // Script version
        0x01, // Script length
        0x00, // Script
        0x6b, 0x61, 0x73, 0x70, 0x61, 0x2d, 0x6d, 0x61, 0x69, 0x6e, 0x6e, 0x65, 0x74, // kaspa-mainnet
    ],
};

pub const TESTNET_GENESIS: GenesisBlock = GenesisBlock {
    version: 0,
    timestamp: 0x17d0828a5ab,
    bits: 0x1e7fffff,
    nonce: 0x20a1,
    coinbase_payload: &[
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Blue score
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Subsidy
        0x00, 0x00, // Script version
        0x01, // Script length
        0x00, // Script
        0x6b, 0x61, 0x73, 0x70, 0x61, 0x2d, 0x74, 0x65, 0x73, 0x74, 0x6e, 0x65, 0x74, // kaspa-testnet
    ],
};

pub const SIMNET_GENESIS: GenesisBlock = GenesisBlock {
    version: 0,
    timestamp: 0x17d0828a5ab,
    bits: 0x207fffff,
    nonce: 0x1,
    coinbase_payload: &[
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Blue score
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Subsidy
        0x00, 0x00, // Script version
        0x01, // Script length
        0x00, // Script
        0x6b, 0x61, 0x73, 0x70, 0x61, 0x2d, 0x73, 0x69, 0x6d, 0x6e, 0x65, 0x74, // kaspa-simnet
    ],
};

pub const DEVNET_GENESIS: GenesisBlock = GenesisBlock {
    version: 0,
    timestamp: 0x17d0828a5ab,
    bits: 0x1e7fffff,
    nonce: 0x48e5e,
    coinbase_payload: &[
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Blue score
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // Subsidy
        0x00, 0x00, // Script version
        0x01, // Script length
        0x00, // Script
        0x6b, 0x61, 0x73, 0x70, 0x61, 0x2d, 0x64, 0x65, 0x76, 0x6e, 0x65, 0x74, // kaspa-devnet
    ],
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::calc_hash_merkle_root;

    #[test]
    fn test_genesis_blocks_are_distinct_and_self_consistent() {
        let mut hashes = std::collections::HashSet::new();
        for genesis in [&GENESIS, &TESTNET_GENESIS, &SIMNET_GENESIS, &DEVNET_GENESIS] {
            let block = genesis.build_genesis_block();
            assert!(block.header.is_genesis());
            assert_eq!(
                block.header.hash_merkle_root,
                calc_hash_merkle_root(block.transactions.iter()),
                "genesis merkle root must commit to the coinbase"
            );
            assert!(hashes.insert(block.hash()), "genesis hashes must be network-unique");
        }
    }

    #[test]
    fn test_genesis_hash_is_deterministic() {
        assert_eq!(GENESIS.build_genesis_block().hash(), GENESIS.build_genesis_block().hash());
    }
}
