use crate::opcodes::codes;
use kaspad_addresses::{Address, Prefix, Version};
use kaspad_consensus_core::tx::{ScriptPublicKey, ScriptVec};
use ripemd::{Digest as RipemdDigest, Ripemd160};
use sha2::{Digest, Sha256};

/// The standard classes a script public key can belong to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// Doesn't match any recognized form
    NonStandard,
    /// Pay to schnorr pubkey
    PubKey,
    /// Pay to ECDSA pubkey
    PubKeyEcdsa,
    /// Pay to script hash
    ScriptHash,
}

pub fn hash_160(data: &[u8]) -> [u8; 20] {
    let mut sha = Sha256::new();
    sha.update(data);
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha.finalize());
    ripemd.finalize().into()
}

pub fn classify_script(script: &[u8]) -> ScriptClass {
    if script.len() == 34 && script[0] == codes::OpData32 && script[33] == codes::OpCheckSig {
        ScriptClass::PubKey
    } else if script.len() == 35 && script[0] == codes::OpData33 && script[34] == codes::OpCheckSigECDSA {
        ScriptClass::PubKeyEcdsa
    } else if crate::is_payment_script_hash(script) {
        ScriptClass::ScriptHash
    } else {
        ScriptClass::NonStandard
    }
}

/// Creates a script to pay a transaction output to the given address
pub fn pay_to_address_script(address: &Address) -> ScriptPublicKey {
    let mut script = ScriptVec::new();
    match address.version {
        Version::PubKey => {
            script.push(codes::OpData32);
            script.extend_from_slice(&address.payload);
            script.push(codes::OpCheckSig);
        }
        Version::PubKeyEcdsa => {
            script.push(codes::OpData33);
            script.extend_from_slice(&address.payload);
            script.push(codes::OpCheckSigECDSA);
        }
        Version::ScriptHash => {
            script.push(codes::OpHash160);
            script.push(codes::OpData20);
            script.extend_from_slice(&address.payload);
            script.push(codes::OpEqual);
        }
    }
    ScriptPublicKey::new(0, script)
}

/// Creates a script-hash script public key paying to the given redeem script
pub fn pay_to_script_hash_script(redeem_script: &[u8]) -> ScriptPublicKey {
    let hash = hash_160(redeem_script);
    let mut script = ScriptVec::with_capacity(23);
    script.push(codes::OpHash160);
    script.push(codes::OpData20);
    script.extend_from_slice(&hash);
    script.push(codes::OpEqual);
    ScriptPublicKey::new(0, script)
}

/// Extracts the receiving address of a standard script public key, if any
pub fn extract_script_pub_key_address(script_public_key: &ScriptPublicKey, prefix: Prefix) -> Option<Address> {
    if script_public_key.version() > crate::MAX_SCRIPT_PUBLIC_KEY_VERSION {
        return None;
    }
    let script = script_public_key.script();
    match classify_script(script) {
        ScriptClass::PubKey => Some(Address::new(prefix, Version::PubKey, &script[1..33])),
        ScriptClass::PubKeyEcdsa => Some(Address::new(prefix, Version::PubKeyEcdsa, &script[1..34])),
        ScriptClass::ScriptHash => Some(Address::new(prefix, Version::ScriptHash, &script[2..22])),
        ScriptClass::NonStandard => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_to_address_round_trips() {
        let cases = [
            Address::new(Prefix::Mainnet, Version::PubKey, &[11u8; 32]),
            Address::new(Prefix::Testnet, Version::PubKeyEcdsa, &[22u8; 33]),
            Address::new(Prefix::Simnet, Version::ScriptHash, &[33u8; 20]),
        ];
        for address in cases {
            let spk = pay_to_address_script(&address);
            let extracted = extract_script_pub_key_address(&spk, address.prefix).unwrap();
            assert_eq!(address, extracted);
        }
    }

    #[test]
    fn test_classification() {
        let p2pk = pay_to_address_script(&Address::new(Prefix::Mainnet, Version::PubKey, &[1u8; 32]));
        assert_eq!(classify_script(p2pk.script()), ScriptClass::PubKey);

        let p2sh = pay_to_script_hash_script(&[codes::OpTrue]);
        assert_eq!(classify_script(p2sh.script()), ScriptClass::ScriptHash);

        assert_eq!(classify_script(&[codes::OpTrue]), ScriptClass::NonStandard);
        assert_eq!(classify_script(&[]), ScriptClass::NonStandard);
    }

    #[test]
    fn test_non_standard_yields_no_address() {
        let spk = ScriptPublicKey::from_vec(0, vec![codes::OpTrue]);
        assert!(extract_script_pub_key_address(&spk, Prefix::Mainnet).is_none());
    }
}
