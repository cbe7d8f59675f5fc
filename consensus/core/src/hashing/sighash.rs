use super::{sighash_type::SigHashType, HasherExtensions};
use crate::tx::{ScriptPublicKey, VerifiableTransaction};
use kaspad_hashes::{Hash, Hasher, HasherBase, TransactionSigningHash, TransactionSigningHashECDSA, ZERO_HASH};

/// Holds the fields used in the pre-image for signature hashing which do not
/// depend on the signed input, so they are calculated once per transaction.
#[derive(Default)]
pub struct SigHashReusedValues {
    previous_outputs_hash: Option<Hash>,
    sequences_hash: Option<Hash>,
    outputs_hash: Option<Hash>,
}

impl SigHashReusedValues {
    pub fn new() -> Self {
        Default::default()
    }
}

fn previous_outputs_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_anyone_can_pay() {
        return ZERO_HASH;
    }

    if let Some(previous_outputs_hash) = reused_values.previous_outputs_hash {
        previous_outputs_hash
    } else {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs() {
            super::tx::write_outpoint(&mut hasher, &input.previous_outpoint);
        }
        let previous_outputs_hash = hasher.finalize();
        reused_values.previous_outputs_hash = Some(previous_outputs_hash);
        previous_outputs_hash
    }
}

fn sequences_hash(tx: &impl VerifiableTransaction, hash_type: SigHashType, reused_values: &mut SigHashReusedValues) -> Hash {
    if hash_type.is_sighash_single() || hash_type.is_sighash_anyone_can_pay() || hash_type.is_sighash_none() {
        return ZERO_HASH;
    }

    if let Some(sequences_hash) = reused_values.sequences_hash {
        sequences_hash
    } else {
        let mut hasher = TransactionSigningHash::new();
        for input in tx.inputs() {
            hasher.write_u64(input.sequence);
        }
        let sequences_hash = hasher.finalize();
        reused_values.sequences_hash = Some(sequences_hash);
        sequences_hash
    }
}

fn outputs_hash(
    tx: &impl VerifiableTransaction,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
    input_index: usize,
) -> Hash {
    if hash_type.is_sighash_none() {
        return ZERO_HASH;
    }

    if hash_type.is_sighash_single() {
        // If the relevant output exists - return its hash, otherwise return zero-hash
        if input_index >= tx.outputs().len() {
            return ZERO_HASH;
        }
        let mut hasher = TransactionSigningHash::new();
        super::tx::write_output(&mut hasher, &tx.outputs()[input_index]);
        return hasher.finalize();
    }

    if let Some(outputs_hash) = reused_values.outputs_hash {
        outputs_hash
    } else {
        let mut hasher = TransactionSigningHash::new();
        for output in tx.outputs() {
            super::tx::write_output(&mut hasher, output);
        }
        let outputs_hash = hasher.finalize();
        reused_values.outputs_hash = Some(outputs_hash);
        outputs_hash
    }
}

fn hash_script_public_key<T: Hasher>(hasher: &mut T, script_public_key: &ScriptPublicKey) {
    hasher.write_u16(script_public_key.version).write_var_bytes(script_public_key.script());
}

pub fn calc_schnorr_signature_hash(
    tx: &impl VerifiableTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Hash {
    let (input, utxo_entry) = tx.populated_input(input_index);
    let mut hasher = TransactionSigningHash::new();
    hasher
        .write_u16(tx.tx().version)
        .update(previous_outputs_hash(tx, hash_type, reused_values))
        .update(sequences_hash(tx, hash_type, reused_values));
    super::tx::write_outpoint(&mut hasher, &input.previous_outpoint);
    hash_script_public_key(&mut hasher, &utxo_entry.script_public_key);
    hasher
        .write_u64(utxo_entry.amount)
        .write_u64(input.sequence)
        .update(outputs_hash(tx, hash_type, reused_values, input_index))
        .write_u64(tx.tx().lock_time)
        .update(&tx.tx().subnetwork_id)
        .write_u64(tx.tx().gas)
        .update(tx.tx().payload_hash.unwrap_or(ZERO_HASH))
        .write_u8(hash_type.to_u8());
    hasher.finalize()
}

pub fn calc_ecdsa_signature_hash(
    tx: &impl VerifiableTransaction,
    input_index: usize,
    hash_type: SigHashType,
    reused_values: &mut SigHashReusedValues,
) -> Hash {
    let hash = calc_schnorr_signature_hash(tx, input_index, hash_type, reused_values);
    let mut hasher = TransactionSigningHashECDSA::new();
    hasher.update(hash);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::sighash_type::{SIG_HASH_ALL, SIG_HASH_ANY_ONE_CAN_PAY, SIG_HASH_NONE, SIG_HASH_SINGLE};
    use crate::subnets::SUBNETWORK_ID_NATIVE;
    use crate::tx::{PopulatedTransaction, Transaction, TransactionInput, TransactionOutpoint, TransactionOutput, UtxoEntry};
    use kaspad_hashes::Hash;
    use smallvec::smallvec;

    fn test_tx() -> Transaction {
        Transaction::new(
            0,
            vec![
                TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(1), 0), vec![], 0),
                TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(2), 1), vec![], 1),
            ],
            vec![
                TransactionOutput::new(100, ScriptPublicKey::new(0, smallvec![0x51])),
                TransactionOutput::new(200, ScriptPublicKey::new(0, smallvec![0x51])),
            ],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        )
    }

    fn populated(tx: &Transaction) -> PopulatedTransaction<'_> {
        let entries = tx
            .inputs
            .iter()
            .map(|_| UtxoEntry::new(300, ScriptPublicKey::new(0, smallvec![0x51]), 0, false))
            .collect();
        PopulatedTransaction::new(tx, entries)
    }

    #[test]
    fn test_sighash_changes_with_output() {
        let tx = test_tx();
        let sighash = calc_schnorr_signature_hash(&populated(&tx), 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());

        let mut changed = tx.clone();
        changed.outputs[1].value += 1;
        changed.finalize();
        let changed_sighash = calc_schnorr_signature_hash(&populated(&changed), 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
        assert_ne!(sighash, changed_sighash);
    }

    #[test]
    fn test_sighash_none_ignores_outputs() {
        let tx = test_tx();
        let sighash = calc_schnorr_signature_hash(&populated(&tx), 0, SIG_HASH_NONE, &mut SigHashReusedValues::new());

        let mut changed = tx.clone();
        changed.outputs[1].value += 1;
        let changed_sighash = calc_schnorr_signature_hash(&populated(&changed), 0, SIG_HASH_NONE, &mut SigHashReusedValues::new());
        assert_eq!(sighash, changed_sighash);
    }

    #[test]
    fn test_sighash_single_covers_corresponding_output_only() {
        let tx = test_tx();
        let sighash = calc_schnorr_signature_hash(&populated(&tx), 0, SIG_HASH_SINGLE, &mut SigHashReusedValues::new());

        // Changing output 1 must not affect input 0 under SIGHASH_SINGLE
        let mut changed = tx.clone();
        changed.outputs[1].value += 1;
        let changed_sighash = calc_schnorr_signature_hash(&populated(&changed), 0, SIG_HASH_SINGLE, &mut SigHashReusedValues::new());
        assert_eq!(sighash, changed_sighash);

        // Changing output 0 must
        let mut changed = tx.clone();
        changed.outputs[0].value += 1;
        let changed_sighash = calc_schnorr_signature_hash(&populated(&changed), 0, SIG_HASH_SINGLE, &mut SigHashReusedValues::new());
        assert_ne!(sighash, changed_sighash);
    }

    #[test]
    fn test_anyone_can_pay_ignores_other_inputs() {
        let tx = test_tx();
        let flags = SigHashType::from_u8(SIG_HASH_ALL.to_u8() | SIG_HASH_ANY_ONE_CAN_PAY.to_u8()).unwrap();
        let sighash = calc_schnorr_signature_hash(&populated(&tx), 0, flags, &mut SigHashReusedValues::new());

        let mut changed = tx.clone();
        changed.inputs[1].sequence += 1;
        let changed_sighash = calc_schnorr_signature_hash(&populated(&changed), 0, flags, &mut SigHashReusedValues::new());
        assert_eq!(sighash, changed_sighash);
    }

    #[test]
    fn test_ecdsa_differs_from_schnorr() {
        let tx = test_tx();
        let schnorr = calc_schnorr_signature_hash(&populated(&tx), 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
        let ecdsa = calc_ecdsa_signature_hash(&populated(&tx), 0, SIG_HASH_ALL, &mut SigHashReusedValues::new());
        assert_ne!(schnorr, ecdsa);
    }
}
