use super::HasherExtensions;
use crate::tx::{Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput};
use kaspad_hashes::{Hash, Hasher, TransactionHash, TransactionID, ZERO_HASH};

/// A bitmask defining which transaction fields we
/// want to encode and which to ignore.
type TxEncodingFlags = u8;

pub const TX_ENCODING_FULL: TxEncodingFlags = 0;
pub const TX_ENCODING_EXCLUDE_SIGNATURE_SCRIPT: TxEncodingFlags = 1;

/// Returns the transaction hash. Note that this is different than the transaction ID.
pub fn hash(tx: &Transaction) -> Hash {
    let mut hasher = TransactionHash::new();
    write_transaction(&mut hasher, tx, TX_ENCODING_FULL);
    hasher.finalize()
}

/// Not intended for direct use by clients. Instead use `tx.id()`
pub(crate) fn id(tx: &Transaction) -> TransactionId {
    // Encode the transaction with signature scripts replaced by empty pushes,
    // isolating the ID from signature malleability. The coinbase is whole-encoded
    // since its payload is filled by the miner.
    let encoding_flags = if tx.is_coinbase() { TX_ENCODING_FULL } else { TX_ENCODING_EXCLUDE_SIGNATURE_SCRIPT };
    let mut hasher = TransactionID::new();
    write_transaction(&mut hasher, tx, encoding_flags);
    hasher.finalize()
}

/// Hash of the opaque payload bytes, committed by `Transaction::payload_hash`
/// for non-native transactions
pub fn payload_hash(payload: &[u8]) -> Hash {
    let mut hasher = TransactionHash::new();
    hasher.write_var_bytes(payload);
    hasher.finalize()
}

/// Write the transaction into the provided hasher according to the encoding flags
fn write_transaction<T: Hasher>(hasher: &mut T, tx: &Transaction, encoding_flags: TxEncodingFlags) {
    hasher.write_u16(tx.version).write_len(tx.inputs.len());
    for input in tx.inputs.iter() {
        write_input(hasher, input, encoding_flags);
    }

    hasher.write_len(tx.outputs.len());
    for output in tx.outputs.iter() {
        write_output(hasher, output);
    }

    hasher.write_u64(tx.lock_time).update(&tx.subnetwork_id).write_u64(tx.gas).update(tx.payload_hash.unwrap_or(ZERO_HASH));

    hasher.write_var_bytes(&tx.payload);
}

#[inline(always)]
fn write_input<T: Hasher>(hasher: &mut T, input: &TransactionInput, encoding_flags: TxEncodingFlags) {
    write_outpoint(hasher, &input.previous_outpoint);
    if encoding_flags & TX_ENCODING_EXCLUDE_SIGNATURE_SCRIPT != TX_ENCODING_EXCLUDE_SIGNATURE_SCRIPT {
        hasher.write_var_bytes(input.signature_script.as_slice());
    } else {
        hasher.write_var_bytes(&[]);
    }
    hasher.write_u64(input.sequence);
}

#[inline(always)]
pub(crate) fn write_outpoint<T: Hasher>(hasher: &mut T, outpoint: &TransactionOutpoint) {
    hasher.update(outpoint.transaction_id).write_u32(outpoint.index);
}

#[inline(always)]
pub(crate) fn write_output<T: Hasher>(hasher: &mut T, output: &TransactionOutput) {
    hasher.write_u64(output.value).write_u16(output.script_public_key.version).write_var_bytes(output.script_public_key.script());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subnets::SUBNETWORK_ID_NATIVE;

    #[test]
    fn test_id_and_hash_agree_for_empty_sig_scripts() {
        let tx = Transaction::new(
            1,
            vec![TransactionInput::new(TransactionOutpoint::new(Hash::from_u64_word(3), 0), vec![], 1)],
            vec![],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        // With no signature material the two encodings coincide structurally,
        // but the domains differ so the digests must not be equal
        assert_ne!(tx.id(), tx.hash());
    }

    #[test]
    fn test_payload_hash_is_length_prefixed() {
        // [1] ++ [] must differ from [] ++ [1] under the length prefix
        assert_ne!(payload_hash(&[1]), payload_hash(&[]));
        assert_ne!(payload_hash(&[0]), payload_hash(&[0, 0]));
    }
}
