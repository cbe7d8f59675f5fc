pub mod caches;
mod data_stack;
pub mod opcodes;
pub mod standard;

use crate::caches::Cache;
use crate::data_stack::{DataStack, Stack};
use crate::opcodes::{deserialize, OpCodeImplementation};
use itertools::Itertools;
use kaspad_consensus_core::hashing::sighash::{calc_ecdsa_signature_hash, calc_schnorr_signature_hash, SigHashReusedValues};
use kaspad_consensus_core::hashing::sighash_type::SigHashType;
use kaspad_consensus_core::tx::{TransactionInput, UtxoEntry, VerifiableTransaction};
use kaspad_txscript_errors::TxScriptError;
use log::warn;

pub use standard::*;

pub const MAX_SCRIPT_PUBLIC_KEY_VERSION: u16 = 0;
pub const MAX_STACK_SIZE: usize = 244;
pub const MAX_SCRIPTS_SIZE: usize = 10_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_OPS_PER_SCRIPT: i32 = 201;
pub const MAX_TX_IN_SEQUENCE_NUM: u64 = u64::MAX;
pub const SEQUENCE_LOCK_TIME_DISABLED: u64 = 1 << 63;
pub const SEQUENCE_LOCK_TIME_MASK: u64 = 0x00000000ffffffff;
pub const LOCK_TIME_THRESHOLD: u64 = 500_000_000_000;
pub const MAX_PUB_KEYS_PER_MULTISIG: i64 = 20;

// The last opcode that does not count toward operations.
// Note that this includes OP_RESERVED which counts as a push operation.
pub const NO_COST_OPCODE: u8 = 0x60;

#[derive(Clone, Hash, PartialEq, Eq)]
enum Signature {
    Secp256k1(secp256k1::schnorr::Signature),
    Ecdsa(secp256k1::ecdsa::Signature),
}

#[derive(Clone, Hash, PartialEq, Eq)]
enum PublicKey {
    Secp256k1(secp256k1::XOnlyPublicKey),
    Ecdsa(secp256k1::PublicKey),
}

#[derive(Clone, Hash, PartialEq, Eq)]
pub struct SigCacheKey {
    signature: Signature,
    pub_key: PublicKey,
    message: secp256k1::Message,
}

pub type SigCache = Cache<SigCacheKey, Result<(), secp256k1::Error>>;

enum ScriptSource<'a, T: VerifiableTransaction> {
    TxInput { tx: &'a T, input: &'a TransactionInput, id: usize, utxo_entry: &'a UtxoEntry, is_p2sh: bool },
    StandAloneScripts(Vec<&'a [u8]>),
}

pub struct TxScriptEngine<'a, T: VerifiableTransaction> {
    dstack: Stack,
    astack: Stack,

    script_source: ScriptSource<'a, T>,

    // Outer caches for quicker calculation
    reused_values: &'a mut SigHashReusedValues,
    sig_cache: &'a SigCache,

    cond_stack: Vec<i8>, // Following if stacks, and whether it is running

    num_ops: i32,
}

/// Returns true if the script passed in has the canonical pay-to-script-hash
/// shape: `OpHash160 <20 byte hash> OpEqual`
pub fn is_payment_script_hash(script: &[u8]) -> bool {
    script.len() == 23
        && script[0] == opcodes::codes::OpHash160
        && script[1] == opcodes::codes::OpData20
        && script[22] == opcodes::codes::OpEqual
}

impl<'a, T: VerifiableTransaction> TxScriptEngine<'a, T> {
    pub fn new(reused_values: &'a mut SigHashReusedValues, sig_cache: &'a SigCache) -> Self {
        Self {
            dstack: vec![],
            astack: vec![],
            script_source: ScriptSource::StandAloneScripts(vec![]),
            reused_values,
            sig_cache,
            cond_stack: vec![],
            num_ops: 0,
        }
    }

    pub fn from_transaction_input(
        tx: &'a T,
        input: &'a TransactionInput,
        id: usize,
        utxo_entry: &'a UtxoEntry,
        reused_values: &'a mut SigHashReusedValues,
        sig_cache: &'a SigCache,
    ) -> Result<Self, TxScriptError> {
        let is_p2sh = is_payment_script_hash(utxo_entry.script_public_key.script());
        match id < tx.tx().inputs.len() {
            true => Ok(Self {
                dstack: Default::default(),
                astack: Default::default(),
                script_source: ScriptSource::TxInput { tx, input, id, utxo_entry, is_p2sh },
                reused_values,
                sig_cache,
                cond_stack: Default::default(),
                num_ops: 0,
            }),
            false => Err(TxScriptError::InvalidIndex(id, tx.tx().inputs.len())),
        }
    }

    pub fn from_script(script: &'a [u8], reused_values: &'a mut SigHashReusedValues, sig_cache: &'a SigCache) -> Self {
        Self {
            dstack: Default::default(),
            astack: Default::default(),
            script_source: ScriptSource::StandAloneScripts(vec![script]),
            reused_values,
            sig_cache,
            cond_stack: Default::default(),
            num_ops: 0,
        }
    }

    #[inline]
    pub fn is_executing(&self) -> bool {
        self.cond_stack.is_empty() || *self.cond_stack.last().expect("checked not empty") == 1
    }

    fn execute_opcode(&mut self, opcode: Box<dyn OpCodeImplementation<T>>) -> Result<(), TxScriptError> {
        // Note that this includes OP_RESERVED which counts as a push operation
        if opcode.value() > NO_COST_OPCODE {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(TxScriptError::TooManyOperations(MAX_OPS_PER_SCRIPT));
            }
        } else if opcode.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(TxScriptError::ElementTooBig(opcode.len(), MAX_SCRIPT_ELEMENT_SIZE));
        }

        if self.is_executing() || opcode.is_conditional() {
            if opcode.value() > 0 && opcode.value() <= opcodes::codes::OpPushData4 {
                opcode.check_minimal_data_push()?;
            }
            opcode.execute(self)
        } else {
            Ok(())
        }
    }

    fn execute_script(&mut self, script: &[u8], verify_only_push: bool) -> Result<(), TxScriptError> {
        let script_result = script
            .iter()
            .batching(|it| {
                // Reads the opcode byte and then the opcode-defined data length
                it.next().map(|code| deserialize(*code, it))
            })
            .try_for_each(|opcode| {
                let opcode = opcode?;
                if verify_only_push && opcode.value() > NO_COST_OPCODE {
                    return Err(TxScriptError::SignatureScriptNotPushOnly);
                }

                self.execute_opcode(opcode)?;

                let combined_size = self.astack.len() + self.dstack.len();
                if combined_size > MAX_STACK_SIZE {
                    return Err(TxScriptError::StackSizeExceeded(combined_size, MAX_STACK_SIZE));
                }
                Ok(())
            });

        // A script must drain its condition stack before handing over
        if script_result.is_ok() && !self.cond_stack.is_empty() {
            return Err(TxScriptError::ErrUnbalancedConditional);
        }

        // Alt stack doesn't persist between scripts
        self.astack.clear();
        self.num_ops = 0; // number of ops is per script

        script_result
    }

    pub fn execute(&mut self) -> Result<(), TxScriptError> {
        let (scripts, is_p2sh) = match &self.script_source {
            ScriptSource::TxInput { input, utxo_entry, is_p2sh, .. } => {
                if utxo_entry.script_public_key.version() > MAX_SCRIPT_PUBLIC_KEY_VERSION {
                    warn!("The version of the scriptPublicKey is higher than the known version - the Execute function returns true.");
                    return Ok(());
                }
                (vec![input.signature_script.as_slice(), utxo_entry.script_public_key.script()], *is_p2sh)
            }
            ScriptSource::StandAloneScripts(scripts) => (scripts.clone(), false),
        };

        // When both the signature script and public key script are empty the
        // result is necessarily an error since the stack would end up being
        // empty which is equivalent to a false top element, so just return
        // the relevant error now as an optimization.
        if scripts.is_empty() {
            return Err(TxScriptError::NoScripts);
        }
        if scripts.iter().all(|e| e.is_empty()) {
            return Err(TxScriptError::EvalFalse);
        }
        if let Some(size) = scripts.iter().map(|e| e.len()).find(|size| *size > MAX_SCRIPTS_SIZE) {
            return Err(TxScriptError::ScriptSize(size, MAX_SCRIPTS_SIZE));
        }

        let mut saved_stack: Option<Vec<Vec<u8>>> = None;
        // try_for_each quits only if an error occurred, so we always run over
        // all scripts when each is successful
        scripts.iter().enumerate().filter(|(_, s)| !s.is_empty()).try_for_each(|(idx, s)| {
            // The signature script is restricted to plain pushes when redeeming a script hash
            let verify_only_push = is_p2sh && idx == 0;
            // Save the p2sh stack between the pubkey script and the redeem script
            if is_p2sh && idx == 1 {
                saved_stack = Some(self.dstack.clone());
            }
            self.execute_script(s, verify_only_push)
        })?;

        if is_p2sh {
            self.check_error_condition(false)?;
            self.dstack = saved_stack.ok_or(TxScriptError::EmptyStack)?;
            let script = self.dstack.pop().ok_or(TxScriptError::EmptyStack)?;
            self.execute_script(script.as_slice(), false)?
        }

        self.check_error_condition(true)?;
        Ok(())
    }

    // check_error_condition is called whenever we finish a chunk of the scripts
    // (all original scripts, all scripts including p2sh, and maybe future extensions).
    // Returns Ok(()) if the running script has ended and was successful, leaving a
    // true boolean on the stack. An error otherwise.
    #[inline]
    fn check_error_condition(&mut self, final_script: bool) -> Result<(), TxScriptError> {
        if final_script {
            if self.dstack.len() > 1 {
                return Err(TxScriptError::CleanStack(self.dstack.len() - 1));
            } else if self.dstack.is_empty() {
                return Err(TxScriptError::EmptyStack);
            }
        }

        let [v]: [bool; 1] = self.dstack.pop_item()?;
        match v {
            true => Ok(()),
            false => Err(TxScriptError::EvalFalse),
        }
    }

    // *** SIGNATURE SPECIFIC CODE ***

    fn check_pub_key_encoding(pub_key: &[u8]) -> Result<(), TxScriptError> {
        match pub_key.len() {
            32 => Ok(()),
            _ => Err(TxScriptError::PubKeyFormat),
        }
    }

    fn check_pub_key_encoding_ecdsa(pub_key: &[u8]) -> Result<(), TxScriptError> {
        match pub_key.len() {
            33 => Ok(()),
            _ => Err(TxScriptError::PubKeyFormat),
        }
    }

    #[inline]
    fn check_schnorr_signature(&mut self, hash_type: SigHashType, key: &[u8], sig: &[u8]) -> Result<(), TxScriptError> {
        match self.script_source {
            ScriptSource::TxInput { tx, id, .. } => {
                if sig.len() != 64 {
                    return Err(TxScriptError::SigLength(sig.len()));
                }
                Self::check_pub_key_encoding(key)?;
                let pk = secp256k1::XOnlyPublicKey::from_slice(key).map_err(TxScriptError::InvalidSignature)?;
                let sig = secp256k1::schnorr::Signature::from_slice(sig).map_err(TxScriptError::InvalidSignature)?;
                let sig_hash = calc_schnorr_signature_hash(tx, id, hash_type, self.reused_values);
                let msg = secp256k1::Message::from_digest_slice(sig_hash.as_bytes().as_slice()).expect("sig hash is 32 bytes");
                let sig_cache_key =
                    SigCacheKey { signature: Signature::Secp256k1(sig), pub_key: PublicKey::Secp256k1(pk), message: msg };

                match self.sig_cache.get(&sig_cache_key) {
                    Some(valid) => valid.map_err(TxScriptError::InvalidSignature),
                    None => match sig.verify(&msg, &pk) {
                        Ok(()) => {
                            self.sig_cache.insert(sig_cache_key, Ok(()));
                            Ok(())
                        }
                        Err(e) => {
                            self.sig_cache.insert(sig_cache_key, Err(e));
                            Err(TxScriptError::InvalidSignature(e))
                        }
                    },
                }
            }
            _ => Err(TxScriptError::NotATransactionInput),
        }
    }

    fn check_ecdsa_signature(&mut self, hash_type: SigHashType, key: &[u8], sig: &[u8]) -> Result<(), TxScriptError> {
        match self.script_source {
            ScriptSource::TxInput { tx, id, .. } => {
                if sig.len() != 64 {
                    return Err(TxScriptError::SigLength(sig.len()));
                }
                Self::check_pub_key_encoding_ecdsa(key)?;
                let pk = secp256k1::PublicKey::from_slice(key).map_err(TxScriptError::InvalidSignature)?;
                let sig = secp256k1::ecdsa::Signature::from_compact(sig).map_err(TxScriptError::InvalidSignature)?;
                let sig_hash = calc_ecdsa_signature_hash(tx, id, hash_type, self.reused_values);
                let msg = secp256k1::Message::from_digest_slice(sig_hash.as_bytes().as_slice()).expect("sig hash is 32 bytes");
                let sig_cache_key = SigCacheKey { signature: Signature::Ecdsa(sig), pub_key: PublicKey::Ecdsa(pk), message: msg };

                match self.sig_cache.get(&sig_cache_key) {
                    Some(valid) => valid.map_err(TxScriptError::InvalidSignature),
                    None => match sig.verify(&msg, &pk) {
                        Ok(()) => {
                            self.sig_cache.insert(sig_cache_key, Ok(()));
                            Ok(())
                        }
                        Err(e) => {
                            self.sig_cache.insert(sig_cache_key, Err(e));
                            Err(TxScriptError::InvalidSignature(e))
                        }
                    },
                }
            }
            _ => Err(TxScriptError::NotATransactionInput),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaspad_consensus_core::hashing::sighash::SigHashReusedValues;
    use kaspad_consensus_core::subnets::SUBNETWORK_ID_NATIVE;
    use kaspad_consensus_core::tx::{
        PopulatedTransaction, ScriptPublicKey, Transaction, TransactionId, TransactionInput, TransactionOutpoint, TransactionOutput,
    };

    struct ScriptTestCase {
        script: &'static [u8],
        expected_result: Result<(), TxScriptError>,
    }

    fn run_test_script_case(test: ScriptTestCase) {
        let sig_cache = Cache::new(10_000);
        let mut reused_values = SigHashReusedValues::new();

        let input = TransactionInput {
            previous_outpoint: TransactionOutpoint { transaction_id: TransactionId::from_u64_word(42), index: 0 },
            signature_script: vec![],
            sequence: 4294967295,
        };
        let output = TransactionOutput { value: 1000000000, script_public_key: ScriptPublicKey::new(0, test.script.into()) };

        let tx = Transaction::new(1, vec![input.clone()], vec![output.clone()], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        let utxo_entry = UtxoEntry::new(output.value, output.script_public_key.clone(), 0, tx.is_coinbase());

        let populated_tx = PopulatedTransaction::new(&tx, vec![utxo_entry.clone()]);

        let mut vm = TxScriptEngine::from_transaction_input(&populated_tx, &input, 0, &utxo_entry, &mut reused_values, &sig_cache)
            .expect("script creation failed");
        assert_eq!(vm.execute(), test.expected_result);
    }

    #[test]
    fn test_check_error_condition() {
        let test_cases = vec![
            ScriptTestCase {
                script: b"\x51", // opcodes::codes::OpTrue
                expected_result: Ok(()),
            },
            ScriptTestCase {
                script: b"\x61", // opcodes::codes::OpNop
                expected_result: Err(TxScriptError::EmptyStack),
            },
            ScriptTestCase {
                script: b"\x51\x51", // OpTrue, OpTrue
                expected_result: Err(TxScriptError::CleanStack(1)),
            },
            ScriptTestCase {
                script: b"\x00", // opcodes::codes::OpFalse
                expected_result: Err(TxScriptError::EvalFalse),
            },
        ];

        for test in test_cases {
            run_test_script_case(test)
        }
    }

    #[test]
    fn test_arithmetic_and_flow() {
        let test_cases = vec![
            // 2 3 OpAdd 5 OpNumEqual
            ScriptTestCase { script: b"\x52\x53\x93\x55\x9c", expected_result: Ok(()) },
            // 1 OpIf 1 OpElse 0 OpEndIf
            ScriptTestCase { script: b"\x51\x63\x51\x67\x00\x68", expected_result: Ok(()) },
            // 0 OpIf 1 OpElse 0 OpEndIf -> false on stack
            ScriptTestCase { script: b"\x00\x63\x51\x67\x00\x68", expected_result: Err(TxScriptError::EvalFalse) },
            // Unbalanced: 1 OpIf 1
            ScriptTestCase { script: b"\x51\x63\x51", expected_result: Err(TxScriptError::ErrUnbalancedConditional) },
            // OpReturn
            ScriptTestCase { script: b"\x6a", expected_result: Err(TxScriptError::EarlyReturn) },
            // Disabled OpMul
            ScriptTestCase {
                script: b"\x51\x51\x95",
                expected_result: Err(TxScriptError::OpcodeDisabled("Opcode<0x95>{ data: [] }".to_string())),
            },
        ];

        for test in test_cases {
            run_test_script_case(test)
        }
    }

    #[test]
    fn test_minimal_push_enforced() {
        // A single-byte value 5 pushed via OpData1 instead of Op5
        run_test_script_case(ScriptTestCase {
            script: b"\x01\x05\x55\x9c",
            expected_result: Err(TxScriptError::NotMinimalData("push of 1 bytes used opcode 0x01".to_string())),
        })
    }

    #[test]
    fn test_check_pub_key_encode() {
        assert_eq!(TxScriptEngine::<PopulatedTransaction>::check_pub_key_encoding(&[0u8; 32]), Ok(()));
        assert_eq!(TxScriptEngine::<PopulatedTransaction>::check_pub_key_encoding(&[0u8; 33]), Err(TxScriptError::PubKeyFormat));
        assert_eq!(TxScriptEngine::<PopulatedTransaction>::check_pub_key_encoding(&[]), Err(TxScriptError::PubKeyFormat));
        assert_eq!(TxScriptEngine::<PopulatedTransaction>::check_pub_key_encoding_ecdsa(&[0u8; 33]), Ok(()));
        assert_eq!(TxScriptEngine::<PopulatedTransaction>::check_pub_key_encoding_ecdsa(&[0u8; 32]), Err(TxScriptError::PubKeyFormat));
    }

    #[test]
    fn test_stack_size_limit() {
        // Push 245 separate zero-length items via OpFalse repetitions
        let script: Vec<u8> = vec![0x00; MAX_STACK_SIZE + 1];
        let sig_cache = Cache::new(10);
        let mut reused_values = SigHashReusedValues::new();
        let mut vm = TxScriptEngine::<PopulatedTransaction>::from_script(&script, &mut reused_values, &sig_cache);
        assert_eq!(vm.execute(), Err(TxScriptError::StackSizeExceeded(MAX_STACK_SIZE + 1, MAX_STACK_SIZE)));
    }

    #[test]
    fn test_schnorr_sign_and_verify() {
        let secp = secp256k1::Secp256k1::new();
        let (secret_key, _) = secp.generate_keypair(&mut rand::thread_rng());
        let keypair = secp256k1::Keypair::from_secret_key(&secp, &secret_key);
        let (xonly, _) = keypair.x_only_public_key();

        // Build a P2PK script: OpData32 <key> OpCheckSig
        let mut script = Vec::with_capacity(34);
        script.push(opcodes::codes::OpData32);
        script.extend_from_slice(&xonly.serialize());
        script.push(opcodes::codes::OpCheckSig);
        let script_public_key = ScriptPublicKey::from_vec(0, script);

        let prev_entry = UtxoEntry::new(1000, script_public_key, 0, false);
        let unsigned = Transaction::new(
            0,
            vec![TransactionInput::new(TransactionOutpoint::new(TransactionId::from_u64_word(7), 0), vec![], 0)],
            vec![TransactionOutput::new(900, ScriptPublicKey::from_vec(0, vec![opcodes::codes::OpTrue]))],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        let mut mutable = kaspad_consensus_core::tx::MutableTransaction::with_entries(unsigned, vec![prev_entry.clone()]);
        mutable = kaspad_consensus_core::sign::sign(mutable, keypair);

        let tx = mutable.tx.clone();
        let populated = PopulatedTransaction::new(&tx, vec![prev_entry.clone()]);

        let sig_cache = Cache::new(10);
        let mut reused_values = SigHashReusedValues::new();
        let mut vm = TxScriptEngine::from_transaction_input(
            &populated,
            &populated.tx.inputs[0],
            0,
            &prev_entry,
            &mut reused_values,
            &sig_cache,
        )
        .unwrap();
        assert_eq!(vm.execute(), Ok(()));

        // Re-validation against the same UTXO snapshot must agree (cache hit path)
        let mut reused_values = SigHashReusedValues::new();
        let mut vm = TxScriptEngine::from_transaction_input(
            &populated,
            &populated.tx.inputs[0],
            0,
            &prev_entry,
            &mut reused_values,
            &sig_cache,
        )
        .unwrap();
        assert_eq!(vm.execute(), Ok(()));

        // A corrupted signature must fail
        let mut bad_tx = tx.clone();
        bad_tx.inputs[0].signature_script[10] ^= 1;
        let bad_populated = PopulatedTransaction::new(&bad_tx, vec![prev_entry.clone()]);
        let mut reused_values = SigHashReusedValues::new();
        let mut vm = TxScriptEngine::from_transaction_input(
            &bad_populated,
            &bad_populated.tx.inputs[0],
            0,
            &prev_entry,
            &mut reused_values,
            &sig_cache,
        )
        .unwrap();
        assert_eq!(vm.execute(), Err(TxScriptError::EvalFalse));
    }

    #[test]
    fn test_p2sh_redeem() {
        // Redeem script: OpTrue. Script public key: OpHash160 <hash160(redeem)> OpEqual
        let redeem_script = vec![opcodes::codes::OpTrue];
        let spk = pay_to_script_hash_script(&redeem_script);
        assert!(is_payment_script_hash(spk.script()));

        // Signature script pushes the redeem script
        let mut signature_script = Vec::new();
        signature_script.push(opcodes::codes::OpData1);
        signature_script.extend_from_slice(&redeem_script);

        let input = TransactionInput {
            previous_outpoint: TransactionOutpoint { transaction_id: TransactionId::from_u64_word(1), index: 0 },
            signature_script,
            sequence: 0,
        };
        let output = TransactionOutput { value: 1, script_public_key: spk.clone() };
        let tx = Transaction::new(0, vec![input.clone()], vec![output], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        let utxo_entry = UtxoEntry::new(5, spk, 0, false);
        let populated = PopulatedTransaction::new(&tx, vec![utxo_entry.clone()]);

        let sig_cache = Cache::new(10);
        let mut reused_values = SigHashReusedValues::new();
        let mut vm =
            TxScriptEngine::from_transaction_input(&populated, &input, 0, &utxo_entry, &mut reused_values, &sig_cache).unwrap();
        assert_eq!(vm.execute(), Ok(()));
    }

    #[test]
    fn test_p2sh_rejects_non_push_signature_script() {
        let redeem_script = vec![opcodes::codes::OpTrue];
        let spk = pay_to_script_hash_script(&redeem_script);

        // OpNop is not a push
        let signature_script = vec![opcodes::codes::OpNop, opcodes::codes::OpData1, opcodes::codes::OpTrue];
        let input = TransactionInput {
            previous_outpoint: TransactionOutpoint { transaction_id: TransactionId::from_u64_word(1), index: 0 },
            signature_script,
            sequence: 0,
        };
        let output = TransactionOutput { value: 1, script_public_key: spk.clone() };
        let tx = Transaction::new(0, vec![input.clone()], vec![output], 0, SUBNETWORK_ID_NATIVE, 0, vec![]);
        let utxo_entry = UtxoEntry::new(5, spk, 0, false);
        let populated = PopulatedTransaction::new(&tx, vec![utxo_entry.clone()]);

        let sig_cache = Cache::new(10);
        let mut reused_values = SigHashReusedValues::new();
        let mut vm =
            TxScriptEngine::from_transaction_input(&populated, &input, 0, &utxo_entry, &mut reused_values, &sig_cache).unwrap();
        assert_eq!(vm.execute(), Err(TxScriptError::SignatureScriptNotPushOnly));
    }
}
