pub mod tx_validation_in_isolation;
pub mod tx_validation_in_utxo_context;

use kaspad_consensus_core::config::params::Params;
use kaspad_txscript::SigCache;

/// Full transaction validation split into two phases: context free
/// (isolation) rules and rules requiring the UTXO state of the block's past
#[derive(Clone)]
pub struct TransactionValidator {
    max_tx_script_len: usize,
    max_payload_len: usize,
    coinbase_maturity: u64,
    sig_cache: SigCache,
}

impl TransactionValidator {
    pub fn new(params: &Params, sig_cache: SigCache) -> Self {
        Self {
            max_tx_script_len: params.max_tx_script_len,
            max_payload_len: params.max_payload_len,
            coinbase_maturity: params.coinbase_maturity,
            sig_cache,
        }
    }
}
