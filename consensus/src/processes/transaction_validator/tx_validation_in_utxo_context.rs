use super::TransactionValidator;
use kaspad_consensus_core::{
    constants::{LOCK_TIME_THRESHOLD, MAX_SOMPI},
    errors::tx::{TxResult, TxRuleError},
    hashing::sighash::SigHashReusedValues,
    tx::VerifiableTransaction,
};
use kaspad_txscript::TxScriptEngine;

impl TransactionValidator {
    /// Validates a fully populated transaction within the UTXO context of a
    /// specific block (or the virtual): maturity, amounts, lock times and
    /// script execution. Returns the calculated fee.
    pub fn validate_populated_transaction_and_get_fee(
        &self,
        tx: &impl VerifiableTransaction,
        ctx_blue_score: u64,
        ctx_past_median_time: u64,
    ) -> TxResult<u64> {
        self.check_transaction_coinbase_maturity(tx, ctx_blue_score)?;
        let total_in = self.check_transaction_input_amounts(tx)?;
        let total_out = Self::check_transaction_output_values(tx)?;
        if total_out > total_in {
            return Err(TxRuleError::SpendTooHigh(total_out, total_in));
        }
        check_transaction_is_finalized(tx, ctx_blue_score, ctx_past_median_time)?;
        self.check_scripts(tx)?;
        Ok(total_in - total_out)
    }

    fn check_transaction_coinbase_maturity(&self, tx: &impl VerifiableTransaction, ctx_blue_score: u64) -> TxResult<()> {
        if let Some((index, (input, entry))) = tx
            .populated_inputs()
            .enumerate()
            .find(|(_, (_, entry))| entry.is_coinbase && entry.block_blue_score + self.coinbase_maturity > ctx_blue_score)
        {
            return Err(TxRuleError::ImmatureCoinbaseSpend(
                index,
                input.previous_outpoint,
                entry.block_blue_score,
                ctx_blue_score,
                self.coinbase_maturity,
            ));
        }
        Ok(())
    }

    fn check_transaction_input_amounts(&self, tx: &impl VerifiableTransaction) -> TxResult<u64> {
        let mut total: u64 = 0;
        for (_, entry) in tx.populated_inputs() {
            total = total.checked_add(entry.amount).ok_or(TxRuleError::InputAmountOverflow)?;
            if total > MAX_SOMPI {
                return Err(TxRuleError::InputAmountTooHigh);
            }
        }
        Ok(total)
    }

    fn check_transaction_output_values(tx: &impl VerifiableTransaction) -> TxResult<u64> {
        // Overflow and upper-bound checks are part of the isolated phase; here
        // we only accumulate for the fee calculation
        let mut total: u64 = 0;
        for output in tx.outputs() {
            total = total.checked_add(output.value).ok_or(TxRuleError::OutputsValueOverflow)?;
        }
        Ok(total)
    }

    pub fn check_scripts(&self, tx: &impl VerifiableTransaction) -> TxResult<()> {
        let mut reused_values = SigHashReusedValues::new();
        for (i, (input, entry)) in tx.populated_inputs().enumerate() {
            let mut engine = TxScriptEngine::from_transaction_input(tx, input, i, entry, &mut reused_values, &self.sig_cache)
                .map_err(TxRuleError::SignatureInvalid)?;
            engine.execute().map_err(TxRuleError::SignatureInvalid)?;
        }
        Ok(())
    }
}

/// A transaction is finalized when its lock time has passed in the context
/// block's view: lock times below the threshold are blue scores, above it
/// they are millisecond timestamps compared against the past median time
fn check_transaction_is_finalized(tx: &impl VerifiableTransaction, ctx_blue_score: u64, ctx_past_median_time: u64) -> TxResult<()> {
    let tx = tx.tx();
    if tx.lock_time == 0 {
        return Ok(());
    }

    let block_time_or_blue_score = if tx.lock_time < LOCK_TIME_THRESHOLD { ctx_blue_score } else { ctx_past_median_time };
    if tx.lock_time < block_time_or_blue_score {
        return Ok(());
    }

    // At this point, the transaction's lock time hasn't occurred yet, but the
    // transaction might still be finalized if every input's sequence is maxed
    for (i, input) in tx.inputs.iter().enumerate() {
        if input.sequence != u64::MAX {
            return Err(TxRuleError::NotFinalized(i));
        }
    }

    Ok(())
}
