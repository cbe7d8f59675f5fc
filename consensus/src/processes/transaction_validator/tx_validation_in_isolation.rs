use super::TransactionValidator;
use kaspad_consensus_core::{
    constants::{MAX_SOMPI, TX_VERSION},
    errors::tx::{TxResult, TxRuleError},
    hashing,
    tx::Transaction,
};
use std::collections::HashSet;

impl TransactionValidator {
    /// Validates everything which can be checked on the transaction alone,
    /// with no UTXO or DAG context
    pub fn validate_tx_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        self.check_transaction_inputs_in_isolation(tx)?;
        self.check_transaction_outputs_in_isolation(tx)?;
        self.check_coinbase_in_isolation(tx)?;

        check_transaction_version(tx)?;
        check_duplicate_transaction_inputs(tx)?;
        check_gas(tx)?;
        self.check_payload(tx)?;
        Ok(())
    }

    fn check_transaction_inputs_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        for (i, input) in tx.inputs.iter().enumerate() {
            if input.signature_script.len() > self.max_tx_script_len {
                return Err(TxRuleError::TooBigSignatureScript(i, self.max_tx_script_len));
            }
        }
        Ok(())
    }

    fn check_transaction_outputs_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        let mut total: u64 = 0;
        for (i, output) in tx.outputs.iter().enumerate() {
            if output.value == 0 {
                return Err(TxRuleError::TxOutZero(i));
            }
            if output.value > MAX_SOMPI {
                return Err(TxRuleError::TxOutTooHigh(i));
            }
            total = total.checked_add(output.value).ok_or(TxRuleError::OutputsValueOverflow)?;
            if total > MAX_SOMPI {
                return Err(TxRuleError::TotalTxOutTooHigh);
            }
            if output.script_public_key.script().len() > self.max_tx_script_len {
                return Err(TxRuleError::TooBigScriptPublicKey(i, self.max_tx_script_len));
            }
        }
        Ok(())
    }

    fn check_coinbase_in_isolation(&self, tx: &Transaction) -> TxResult<()> {
        if tx.is_coinbase() && !tx.inputs.is_empty() {
            return Err(TxRuleError::CoinbaseHasInputs(tx.inputs.len()));
        }
        Ok(())
    }

    fn check_payload(&self, tx: &Transaction) -> TxResult<()> {
        if tx.payload.len() > self.max_payload_len {
            return Err(TxRuleError::TooBigPayload(self.max_payload_len));
        }
        if tx.subnetwork_id.is_native() {
            if !tx.payload.is_empty() {
                return Err(TxRuleError::NonCoinbaseTxHasPayload);
            }
            if tx.payload_hash.is_some() {
                return Err(TxRuleError::WrongPayloadHash(tx.payload_hash));
            }
        } else {
            // Non-native transactions must commit to their payload
            let expected = hashing::tx::payload_hash(&tx.payload);
            if tx.payload_hash != Some(expected) {
                return Err(TxRuleError::WrongPayloadHash(tx.payload_hash));
            }
        }
        Ok(())
    }
}

fn check_transaction_version(tx: &Transaction) -> TxResult<()> {
    if tx.version > TX_VERSION {
        return Err(TxRuleError::UnknownTxVersion(tx.version));
    }
    Ok(())
}

fn check_duplicate_transaction_inputs(tx: &Transaction) -> TxResult<()> {
    let mut existing = HashSet::with_capacity(tx.inputs.len());
    for input in tx.inputs.iter() {
        if !existing.insert(input.previous_outpoint) {
            return Err(TxRuleError::TxDuplicateInputs);
        }
    }
    Ok(())
}

fn check_gas(tx: &Transaction) -> TxResult<()> {
    // Built-in subnetworks (and the native one) always use zero gas
    if tx.subnetwork_id.is_builtin_or_native() && tx.gas > 0 {
        return Err(TxRuleError::TxHasGas);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::config::params::SIMNET_PARAMS;
    use kaspad_consensus_core::subnets::{SubnetworkId, SUBNETWORK_ID_NATIVE};
    use kaspad_consensus_core::tx::*;
    use kaspad_txscript::caches::Cache;

    fn validator() -> TransactionValidator {
        TransactionValidator::new(&SIMNET_PARAMS, Cache::new(100))
    }

    fn input(id: u64) -> TransactionInput {
        TransactionInput::new(TransactionOutpoint::new(TransactionId::from_u64_word(id), 0), vec![], 0)
    }

    fn output(value: u64) -> TransactionOutput {
        TransactionOutput::new(value, ScriptPublicKey::from_vec(0, vec![0x51]))
    }

    #[test]
    fn test_valid_native_tx() {
        let tx = Transaction::new(0, vec![input(1)], vec![output(100)], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        validator().validate_tx_in_isolation(&tx).unwrap();
    }

    #[test]
    fn test_duplicate_inputs_rejected() {
        let tx = Transaction::new(0, vec![input(1), input(1)], vec![output(100)], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        assert!(matches!(validator().validate_tx_in_isolation(&tx), Err(TxRuleError::TxDuplicateInputs)));
    }

    #[test]
    fn test_zero_output_rejected() {
        let tx = Transaction::new(0, vec![input(1)], vec![output(0)], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        assert!(matches!(validator().validate_tx_in_isolation(&tx), Err(TxRuleError::TxOutZero(0))));
    }

    #[test]
    fn test_native_payload_rejected() {
        let mut tx = Transaction::new(0, vec![input(1)], vec![output(5)], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        tx.payload = vec![1, 2, 3];
        assert!(matches!(validator().validate_tx_in_isolation(&tx), Err(TxRuleError::NonCoinbaseTxHasPayload)));
    }

    #[test]
    fn test_gas_on_native_rejected() {
        let mut tx = Transaction::new(0, vec![input(1)], vec![output(5)], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        tx.gas = 10;
        assert!(matches!(validator().validate_tx_in_isolation(&tx), Err(TxRuleError::TxHasGas)));
    }

    #[test]
    fn test_subnetwork_payload_commitment() {
        // A properly constructed non-native tx passes
        let tx = Transaction::new(0, vec![input(1)], vec![output(5)], 0, SubnetworkId::from_byte(42), 100, vec![7, 7]);
        validator().validate_tx_in_isolation(&tx).unwrap();

        // Tampering with the payload invalidates the commitment
        let mut tampered = tx.clone();
        tampered.payload = vec![8, 8];
        assert!(matches!(validator().validate_tx_in_isolation(&tampered), Err(TxRuleError::WrongPayloadHash(_))));
    }
}
