use super::genesis::{GenesisBlock, DEVNET_GENESIS, GENESIS, SIMNET_GENESIS, TESTNET_GENESIS};
use crate::{constants::SOMPI_PER_KASPA, network::NetworkType};
use kaspad_addresses::Prefix;
use kaspad_hashes::Hash;
use kaspad_math::Uint256;

/// Consensus parameters. Contains settings and configurations which are consensus-sensitive.
/// Changing one of these on a network node would exclude and prevent it from reaching consensus
/// with the other unmodified nodes.
#[derive(Clone, Debug)]
pub struct Params {
    pub net: NetworkType,
    pub genesis: GenesisBlock,

    /// The GHOSTDAG anticone size parameter
    pub ghostdag_k: u8,

    /// Timestamp deviation tolerance expressed in block units. Derives both the
    /// future timestamp limit and the median time window size
    pub timestamp_deviation_tolerance: u64,

    /// Target time per block (in milliseconds)
    pub target_time_per_block: u64,

    /// Size of the blue window used for difficulty calculation
    pub difficulty_adjustment_window_size: usize,

    /// Highest allowed proof of work target
    pub max_difficulty_target: Uint256,

    pub max_block_parents: u8,
    pub mergeset_size_limit: u64,

    pub max_block_mass: u64,
    pub max_tx_script_len: usize,
    pub max_payload_len: usize,

    /// Gas limit applying to any single non-builtin subnetwork within a block
    pub max_subnetwork_gas_limit: u64,

    pub coinbase_maturity: u64,
    pub base_subsidy: u64,
    /// Blue-score interval between subsidy halvings
    pub subsidy_halving_interval: u64,

    pub pruning_depth: u64,
}

impl Params {
    pub fn genesis_hash(&self) -> Hash {
        self.genesis.build_genesis_block().hash()
    }

    pub fn prefix(&self) -> Prefix {
        self.net.into()
    }

    /// The number of blocks over which the median time past is calculated
    pub fn past_median_time_window_size(&self) -> usize {
        (2 * self.timestamp_deviation_tolerance + 1) as usize
    }

    /// Maximum time (in milliseconds) a block timestamp may exceed the adjusted local time
    pub fn max_allowed_timestamp_offset(&self) -> u64 {
        self.timestamp_deviation_tolerance * self.target_time_per_block
    }

    /// Subsidy of a block whose accepting chain block has the given blue score
    pub fn block_subsidy(&self, blue_score: u64) -> u64 {
        let halvings = blue_score / self.subsidy_halving_interval;
        if halvings >= 64 {
            return 0;
        }
        self.base_subsidy >> halvings
    }
}

impl From<NetworkType> for Params {
    fn from(value: NetworkType) -> Self {
        match value {
            NetworkType::Mainnet => MAINNET_PARAMS,
            NetworkType::Testnet => TESTNET_PARAMS,
            NetworkType::Simnet => SIMNET_PARAMS,
            NetworkType::Devnet => DEVNET_PARAMS,
        }
    }
}

pub const MAINNET_PARAMS: Params = Params {
    net: NetworkType::Mainnet,
    genesis: GENESIS,
    ghostdag_k: 18,
    timestamp_deviation_tolerance: 132,
    target_time_per_block: 1000,
    difficulty_adjustment_window_size: 2641,
    max_difficulty_target: Uint256([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1]),
    max_block_parents: 10,
    mergeset_size_limit: 180,
    max_block_mass: 500_000,
    max_tx_script_len: 10_000,
    max_payload_len: 100_000,
    max_subnetwork_gas_limit: 1_000_000,
    coinbase_maturity: 100,
    base_subsidy: 50 * SOMPI_PER_KASPA,
    subsidy_halving_interval: 210_000,
    pruning_depth: 185_798,
};

pub const TESTNET_PARAMS: Params = Params {
    net: NetworkType::Testnet,
    genesis: TESTNET_GENESIS,
    ghostdag_k: 18,
    timestamp_deviation_tolerance: 132,
    target_time_per_block: 1000,
    difficulty_adjustment_window_size: 2641,
    max_difficulty_target: Uint256([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1]),
    max_block_parents: 10,
    mergeset_size_limit: 180,
    max_block_mass: 500_000,
    max_tx_script_len: 10_000,
    max_payload_len: 100_000,
    max_subnetwork_gas_limit: 1_000_000,
    coinbase_maturity: 100,
    base_subsidy: 50 * SOMPI_PER_KASPA,
    subsidy_halving_interval: 210_000,
    pruning_depth: 185_798,
};

pub const SIMNET_PARAMS: Params = Params {
    net: NetworkType::Simnet,
    genesis: SIMNET_GENESIS,
    ghostdag_k: 18,
    timestamp_deviation_tolerance: 132,
    target_time_per_block: 1000,
    difficulty_adjustment_window_size: 2641,
    max_difficulty_target: Uint256([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1]),
    max_block_parents: 10,
    mergeset_size_limit: 180,
    max_block_mass: 500_000,
    max_tx_script_len: 10_000,
    max_payload_len: 100_000,
    max_subnetwork_gas_limit: 1_000_000,
    coinbase_maturity: 100,
    base_subsidy: 50 * SOMPI_PER_KASPA,
    subsidy_halving_interval: 210_000,
    pruning_depth: 185_798,
};

pub const DEVNET_PARAMS: Params = Params {
    net: NetworkType::Devnet,
    genesis: DEVNET_GENESIS,
    ghostdag_k: 18,
    timestamp_deviation_tolerance: 132,
    target_time_per_block: 1000,
    difficulty_adjustment_window_size: 2641,
    max_difficulty_target: Uint256([u64::MAX, u64::MAX, u64::MAX, u64::MAX >> 1]),
    max_block_parents: 10,
    mergeset_size_limit: 180,
    max_block_mass: 500_000,
    max_tx_script_len: 10_000,
    max_payload_len: 100_000,
    max_subnetwork_gas_limit: 1_000_000,
    coinbase_maturity: 100,
    base_subsidy: 50 * SOMPI_PER_KASPA,
    subsidy_halving_interval: 210_000,
    pruning_depth: 185_798,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subsidy_halving() {
        let params = MAINNET_PARAMS;
        assert_eq!(params.block_subsidy(0), params.base_subsidy);
        assert_eq!(params.block_subsidy(params.subsidy_halving_interval), params.base_subsidy / 2);
        assert_eq!(params.block_subsidy(params.subsidy_halving_interval * 2), params.base_subsidy / 4);
        assert_eq!(params.block_subsidy(params.subsidy_halving_interval * 64), 0);
    }

    #[test]
    fn test_median_time_window_is_odd() {
        assert_eq!(MAINNET_PARAMS.past_median_time_window_size() % 2, 1);
    }

    #[test]
    fn test_max_target_encodes_to_pow_limit() {
        // 2^255 - 1 must survive the compact round trip with only mantissa truncation
        let limit = MAINNET_PARAMS.max_difficulty_target;
        let compact = limit.compact_target_bits();
        assert!(Uint256::from_compact_target_bits(compact) <= limit);
    }
}
