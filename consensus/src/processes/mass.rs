use kaspad_consensus_core::tx::{Transaction, VerifiableTransaction};
use kaspad_txscript::opcodes::codes;

// Mass coefficients per unit
pub const MASS_PER_TX_BYTE: u64 = 1;
pub const MASS_PER_SCRIPT_PUB_KEY_BYTE: u64 = 10;
pub const MASS_PER_SIG_OP: u64 = 1000;

/// Deterministic estimation of the wire-serialized transaction size, used as
/// the byte component of the transaction mass
pub fn transaction_estimated_serialized_size(tx: &Transaction) -> u64 {
    let mut size: u64 = 0;
    size += 2; // Tx version (u16)
    size += 8; // Number of inputs (u64)
    size += tx.inputs.iter().map(transaction_input_estimated_serialized_size).sum::<u64>();

    size += 8; // number of outputs (u64)
    size += tx.outputs.iter().map(|output| 8 /* value */ + 2 /* version */ + 8 + output.script_public_key.script().len() as u64).sum::<u64>();

    size += 8; // lock time (u64)
    size += 20; // subnetwork id
    size += 8; // gas (u64)
    size += 32; // payload hash
    size += 8; // length of the payload (u64)
    size += tx.payload.len() as u64;
    size
}

fn transaction_input_estimated_serialized_size(input: &kaspad_consensus_core::tx::TransactionInput) -> u64 {
    let mut size = 0;
    size += 32; // previous tx id
    size += 4; // index (u32)
    size += 8; // length of signature script (u64)
    size += input.signature_script.len() as u64;
    size += 8; // sequence (u64)
    size
}

/// Counts the signature operations within a script, walking pushes correctly
/// so data bytes are never mistaken for opcodes
pub fn get_sig_op_count_for_script(script: &[u8]) -> u64 {
    let mut count = 0u64;
    let mut i = 0usize;
    while i < script.len() {
        let opcode = script[i];
        i += 1;
        match opcode {
            // Fixed-size data pushes carry their length in the opcode itself
            1..=0x4b => i += opcode as usize,
            codes::OpPushData1 => {
                if i >= script.len() {
                    break;
                }
                i += 1 + script[i] as usize;
            }
            codes::OpPushData2 => {
                if i + 1 >= script.len() {
                    break;
                }
                i += 2 + u16::from_le_bytes([script[i], script[i + 1]]) as usize;
            }
            codes::OpPushData4 => {
                if i + 3 >= script.len() {
                    break;
                }
                i += 4 + u32::from_le_bytes([script[i], script[i + 1], script[i + 2], script[i + 3]]) as usize;
            }
            codes::OpCheckSig | codes::OpCheckSigVerify | codes::OpCheckSigECDSA => count += 1,
            codes::OpCheckMultiSig | codes::OpCheckMultiSigVerify | codes::OpCheckMultiSigECDSA => count += 20,
            _ => {}
        }
    }
    count
}

/// Counts signature operations of a populated transaction, including any
/// operations inside redeem scripts of script-hash spends
pub fn get_sig_op_count(tx: &impl VerifiableTransaction) -> u64 {
    tx.populated_inputs()
        .map(|(input, entry)| {
            let prev_script = entry.script_public_key.script();
            let mut count = get_sig_op_count_for_script(prev_script);
            if kaspad_txscript::is_payment_script_hash(prev_script) {
                // The last push of the signature script is the redeem script
                if let Some(redeem_script) = last_push(&input.signature_script) {
                    count += get_sig_op_count_for_script(&redeem_script);
                }
            }
            count
        })
        .sum()
}

fn last_push(script: &[u8]) -> Option<Vec<u8>> {
    let mut i = 0usize;
    let mut last: Option<Vec<u8>> = None;
    while i < script.len() {
        let opcode = script[i];
        i += 1;
        let (data_start, data_len) = match opcode {
            1..=0x4b => (i, opcode as usize),
            codes::OpPushData1 if i < script.len() => (i + 1, script[i] as usize),
            codes::OpPushData2 if i + 1 < script.len() => (i + 2, u16::from_le_bytes([script[i], script[i + 1]]) as usize),
            _ => (i, 0),
        };
        let data_end = data_start + data_len;
        if data_end > script.len() {
            return last;
        }
        if data_len > 0 {
            last = Some(script[data_start..data_end].to_vec());
        }
        i = data_end;
    }
    last
}

/// Calculates the mass of the given populated transaction
pub fn calc_tx_mass(tx: &impl VerifiableTransaction) -> u64 {
    let size_mass = transaction_estimated_serialized_size(tx.tx()) * MASS_PER_TX_BYTE;
    let script_pub_key_mass: u64 =
        tx.outputs().iter().map(|output| (2 + output.script_public_key.script().len() as u64) * MASS_PER_SCRIPT_PUB_KEY_BYTE).sum();
    let sig_op_mass = get_sig_op_count(tx) * MASS_PER_SIG_OP;
    size_mass + script_pub_key_mass + sig_op_mass
}

/// A mass bound usable before UTXO population (counts sig ops from the
/// signature scripts only, hence a lower bound on the final mass)
pub fn calc_tx_mass_standalone(tx: &Transaction) -> u64 {
    let size_mass = transaction_estimated_serialized_size(tx) * MASS_PER_TX_BYTE;
    let script_pub_key_mass: u64 =
        tx.outputs.iter().map(|output| (2 + output.script_public_key.script().len() as u64) * MASS_PER_SCRIPT_PUB_KEY_BYTE).sum();
    size_mass + script_pub_key_mass
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
    use kaspad_consensus_core::tx::*;

    #[test]
    fn test_sig_op_counting() {
        // P2PK: OpData32 <32 bytes> OpCheckSig
        let mut script = vec![0x20];
        script.extend_from_slice(&[0u8; 32]);
        script.push(codes::OpCheckSig);
        assert_eq!(get_sig_op_count_for_script(&script), 1);

        // Data pushes must not be counted even if they contain opcode-like bytes
        let script = vec![0x02, codes::OpCheckSig, codes::OpCheckSig];
        assert_eq!(get_sig_op_count_for_script(&script), 0);

        // Multisig counts the maximal key amount
        assert_eq!(get_sig_op_count_for_script(&[codes::OpCheckMultiSig]), 20);
    }

    #[test]
    fn test_mass_grows_with_size() {
        let small = Transaction::new(0, vec![], vec![], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        let large = Transaction::new(
            0,
            vec![TransactionInput::new(TransactionOutpoint::new(TransactionId::from_u64_word(1), 0), vec![0; 100], 0)],
            vec![TransactionOutput::new(1, ScriptPublicKey::from_vec(0, vec![0; 50]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        assert!(calc_tx_mass_standalone(&large) > calc_tx_mass_standalone(&small));
    }
}
