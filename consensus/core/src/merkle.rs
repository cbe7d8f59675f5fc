use crate::tx::{Transaction, TransactionId};
use kaspad_hashes::Hash;
use kaspad_merkle::calc_merkle_root;

/// The merkle root committed by `Header::hash_merkle_root`, computed over full
/// transaction hashes (including signature scripts)
pub fn calc_hash_merkle_root<'a>(txs: impl ExactSizeIterator<Item = &'a Transaction>) -> Hash {
    calc_merkle_root(txs.map(|x| x.hash()))
}

/// The merkle root committed by `Header::accepted_id_merkle_root`, computed
/// over the IDs of transactions accepted from the block's merge set
pub fn calc_accepted_id_merkle_root(ids: impl ExactSizeIterator<Item = TransactionId>) -> Hash {
    calc_merkle_root(ids)
}
