use kaspad_consensus_core::config::params::Params;

pub const DEFAULT_MAXIMUM_TRANSACTION_COUNT: u64 = 1_000_000;
pub const DEFAULT_MAXIMUM_ORPHAN_TRANSACTION_COUNT: u64 = 100;

/// One minute of blocks (in blue score units) before an orphan expires
pub const DEFAULT_ORPHAN_EXPIRE_INTERVAL: u64 = 60;

/// One hour of blocks before an admitted transaction expires
pub const DEFAULT_TRANSACTION_EXPIRE_INTERVAL: u64 = 3600;

/// Minimum fee rate in sompi per kilogram of mass
pub const DEFAULT_MINIMUM_RELAY_TRANSACTION_FEE: u64 = 1000;

#[derive(Clone, Debug)]
pub struct MempoolConfig {
    pub maximum_transaction_count: u64,
    pub maximum_orphan_transaction_count: u64,
    pub maximum_transaction_mass: u64,
    pub minimum_relay_transaction_fee: u64,
    pub transaction_expire_blue_score_interval: u64,
    pub orphan_expire_blue_score_interval: u64,
    pub accept_non_standard: bool,
}

impl MempoolConfig {
    pub fn build_default(params: &Params) -> Self {
        Self {
            maximum_transaction_count: DEFAULT_MAXIMUM_TRANSACTION_COUNT,
            maximum_orphan_transaction_count: DEFAULT_MAXIMUM_ORPHAN_TRANSACTION_COUNT,
            maximum_transaction_mass: params.max_block_mass / 2,
            minimum_relay_transaction_fee: DEFAULT_MINIMUM_RELAY_TRANSACTION_FEE,
            transaction_expire_blue_score_interval: DEFAULT_TRANSACTION_EXPIRE_INTERVAL,
            orphan_expire_blue_score_interval: DEFAULT_ORPHAN_EXPIRE_INTERVAL,
            accept_non_standard: false,
        }
    }

    pub fn with_maximum_orphans(mut self, maximum_orphan_transaction_count: u64) -> Self {
        self.maximum_orphan_transaction_count = maximum_orphan_transaction_count;
        self
    }

    pub fn with_minimum_relay_fee(mut self, minimum_relay_transaction_fee: u64) -> Self {
        self.minimum_relay_transaction_fee = minimum_relay_transaction_fee;
        self
    }

    pub fn with_accept_non_standard(mut self, accept_non_standard: bool) -> Self {
        self.accept_non_standard = accept_non_standard;
        self
    }
}
