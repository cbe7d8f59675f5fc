use crate::{
    hashing::{
        sighash::{calc_schnorr_signature_hash, SigHashReusedValues},
        sighash_type::SIG_HASH_ALL,
    },
    tx::SignableTransaction,
};

/// Signs the transaction with schnorr, filling every input's signature script.
/// All input UTXO entries must be populated and payable to the given keypair.
pub fn sign(mut signable_tx: SignableTransaction, keypair: secp256k1::Keypair) -> SignableTransaction {
    let mut reused_values = SigHashReusedValues::new();
    for i in 0..signable_tx.tx.inputs.len() {
        let sig_hash = calc_schnorr_signature_hash(&signable_tx.as_verifiable(), i, SIG_HASH_ALL, &mut reused_values);
        let msg = secp256k1::Message::from_digest_slice(sig_hash.as_bytes().as_slice()).expect("sig hash is 32 bytes");
        let sig: [u8; 64] = *keypair.sign_schnorr(msg).as_ref();
        // This represents OP_DATA_65 <SIGNATURE+SIG_HASH_TYPE> (since signature length is 64 bytes and SIG_HASH_TYPE is one byte)
        signable_tx.tx.inputs[i].signature_script = std::iter::once(65u8).chain(sig).chain([SIG_HASH_ALL.to_u8()]).collect();
    }
    signable_tx
}
