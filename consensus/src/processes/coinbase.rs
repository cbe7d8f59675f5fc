use kaspad_consensus_core::{
    coinbase::{deserialize_coinbase_payload, CoinbaseData, MinerData},
    config::params::Params,
    errors::{block::RuleError, coinbase::CoinbaseResult},
    subnets::SUBNETWORK_ID_COINBASE,
    tx::Transaction,
};

/// Builds and validates coinbase transactions: the payload commits to the
/// accepting blue score and subsidy, and carries the miner payout data
#[derive(Clone)]
pub struct CoinbaseManager {
    base_subsidy: u64,
    subsidy_halving_interval: u64,
}

impl CoinbaseManager {
    pub fn new(params: &Params) -> Self {
        Self { base_subsidy: params.base_subsidy, subsidy_halving_interval: params.subsidy_halving_interval }
    }

    pub fn calc_block_subsidy(&self, blue_score: u64) -> u64 {
        let halvings = blue_score / self.subsidy_halving_interval;
        if halvings >= 64 {
            return 0;
        }
        self.base_subsidy >> halvings
    }

    /// Creates the expected coinbase transaction for a block with the given
    /// blue score, merging fees collected from its accepted merge set
    pub fn expected_coinbase_transaction<T: AsRef<[u8]>>(
        &self,
        blue_score: u64,
        total_fees: u64,
        miner_data: MinerData<T>,
    ) -> Transaction {
        let subsidy = self.calc_block_subsidy(blue_score);
        let payload = CoinbaseData::new(
            blue_score,
            subsidy,
            MinerData::new(miner_data.script_public_key.clone(), miner_data.extra_data.as_ref().to_vec()),
        )
        .serialize();

        let payout = subsidy + total_fees;
        let outputs = if payout > 0 {
            vec![kaspad_consensus_core::tx::TransactionOutput::new(payout, miner_data.script_public_key)]
        } else {
            vec![]
        };

        Transaction::new(0, Vec::new(), outputs, 0, SUBNETWORK_ID_COINBASE, 0, payload)
    }

    /// Deserializes the coinbase payload of `tx` and validates its committed
    /// blue score and subsidy against the expected values
    pub fn validate_coinbase_payload(&self, tx: &Transaction, expected_blue_score: u64) -> Result<(), RuleError> {
        let data = deserialize_coinbase_payload(&tx.payload)?;
        if data.blue_score != expected_blue_score {
            return Err(RuleError::BadCoinbasePayloadBlueScore(data.blue_score, expected_blue_score));
        }
        let expected_subsidy = self.calc_block_subsidy(expected_blue_score);
        if data.subsidy != expected_subsidy {
            return Err(RuleError::WrongSubsidy(expected_subsidy, data.subsidy));
        }
        Ok(())
    }

    /// Structural payload check only (used in the isolated validation phase
    /// where the blue score context is not yet known)
    pub fn deserialize_coinbase_payload_check(&self, tx: &Transaction) -> CoinbaseResult<()> {
        deserialize_coinbase_payload(&tx.payload).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::config::params::SIMNET_PARAMS;
    use kaspad_consensus_core::tx::ScriptPublicKey;
    use smallvec::smallvec;

    fn manager() -> CoinbaseManager {
        CoinbaseManager::new(&SIMNET_PARAMS)
    }

    #[test]
    fn test_subsidy_schedule() {
        let cbm = manager();
        assert_eq!(cbm.calc_block_subsidy(0), SIMNET_PARAMS.base_subsidy);
        assert_eq!(cbm.calc_block_subsidy(SIMNET_PARAMS.subsidy_halving_interval), SIMNET_PARAMS.base_subsidy / 2);
        assert_eq!(cbm.calc_block_subsidy(SIMNET_PARAMS.subsidy_halving_interval * 64), 0);
    }

    #[test]
    fn test_expected_coinbase_round_trips_validation() {
        let cbm = manager();
        let miner_data = MinerData::new(ScriptPublicKey::new(0, smallvec![0x51]), vec![1, 2, 3]);
        let tx = cbm.expected_coinbase_transaction(42, 1000, miner_data);
        assert!(tx.is_coinbase());
        cbm.validate_coinbase_payload(&tx, 42).unwrap();
        assert!(cbm.validate_coinbase_payload(&tx, 43).is_err());
    }
}
