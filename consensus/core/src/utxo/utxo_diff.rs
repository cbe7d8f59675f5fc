use super::{
    utxo_collection::{UtxoCollection, UtxoCollectionExtensions},
    utxo_error::{UtxoAlgebraError, UtxoResult},
};
use crate::tx::{TransactionOutpoint, UtxoEntry, VerifiableTransaction};
use serde::{Deserialize, Serialize};

/// A set-difference over the UTXO state: outpoints created (`add`) and
/// outpoints consumed (`remove`) by a block's accepted transactions
#[derive(Clone, Default, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoDiff {
    pub add: UtxoCollection,
    pub remove: UtxoCollection,
}

impl UtxoDiff {
    pub fn new(add: UtxoCollection, remove: UtxoCollection) -> Self {
        Self { add, remove }
    }

    pub fn is_empty(&self) -> bool {
        self.add.is_empty() && self.remove.is_empty()
    }

    /// Records a fully populated transaction: spent entries move to the remove
    /// set and created outputs to the add set. An output spent by a later
    /// transaction of the same diff cancels out of both sets.
    pub fn add_transaction(&mut self, tx: &impl VerifiableTransaction, block_blue_score: u64) -> UtxoResult<()> {
        for (input, entry) in tx.populated_inputs() {
            self.remove_entry(&input.previous_outpoint, entry)?;
        }

        let is_coinbase = tx.is_coinbase();
        let tx_id = tx.id();
        for (i, output) in tx.outputs().iter().enumerate() {
            let outpoint = TransactionOutpoint::new(tx_id, i as u32);
            let entry = UtxoEntry::new(output.value, output.script_public_key.clone(), block_blue_score, is_coinbase);
            self.add_entry(outpoint, entry)?;
        }
        Ok(())
    }

    fn add_entry(&mut self, outpoint: TransactionOutpoint, entry: UtxoEntry) -> UtxoResult<()> {
        if self.add.insert(outpoint, entry).is_some() {
            return Err(UtxoAlgebraError::DuplicateAddPoint(outpoint));
        }
        Ok(())
    }

    fn remove_entry(&mut self, outpoint: &TransactionOutpoint, entry: &UtxoEntry) -> UtxoResult<()> {
        // An entry both created and consumed within the same diff cancels out
        if self.add.remove(outpoint).is_some() {
            return Ok(());
        }
        if self.remove.insert(*outpoint, entry.clone()).is_some() {
            return Err(UtxoAlgebraError::DuplicateRemovePoint(*outpoint));
        }
        Ok(())
    }

    /// Applies the diff to the collection in place
    pub fn apply_to(&self, collection: &mut UtxoCollection) -> UtxoResult<()> {
        for outpoint in self.remove.keys() {
            if collection.remove(outpoint).is_none() {
                return Err(UtxoAlgebraError::RemovePointMissing(*outpoint));
            }
        }
        for (outpoint, entry) in self.add.iter() {
            if collection.insert(*outpoint, entry.clone()).is_some() {
                return Err(UtxoAlgebraError::AddPointExists(*outpoint));
            }
        }
        Ok(())
    }

    /// Reverses the diff over the collection, restoring the pre-diff state
    pub fn unapply_from(&self, collection: &mut UtxoCollection) -> UtxoResult<()> {
        for outpoint in self.add.keys() {
            if collection.remove(outpoint).is_none() {
                return Err(UtxoAlgebraError::RemovePointMissing(*outpoint));
            }
        }
        for (outpoint, entry) in self.remove.iter() {
            if collection.insert(*outpoint, entry.clone()).is_some() {
                return Err(UtxoAlgebraError::AddPointExists(*outpoint));
            }
        }
        Ok(())
    }

    /// Returns a reversed copy, swapping the add and remove roles
    pub fn reversed(&self) -> Self {
        Self { add: self.remove.clone(), remove: self.add.clone() }
    }

    /// Accumulates `other` on top of this diff (this ⊕ other), assuming
    /// `other` was built over the state this diff leads to
    pub fn with_diff_in_place(&mut self, other: &UtxoDiff) -> UtxoResult<()> {
        for (outpoint, entry) in other.remove.iter() {
            // Entries added by self and removed by other cancel out
            if self.add.remove(outpoint).is_none() {
                if self.remove.contains_key(outpoint) {
                    return Err(UtxoAlgebraError::DuplicateRemovePoint(*outpoint));
                }
                self.remove.insert(*outpoint, entry.clone());
            }
        }
        for (outpoint, entry) in other.add.iter() {
            if self.add.contains_key(outpoint) {
                return Err(UtxoAlgebraError::DuplicateAddPoint(*outpoint));
            }
            self.add.insert(*outpoint, entry.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::{
        PopulatedTransaction, ScriptPublicKey, Transaction, TransactionId, TransactionInput, TransactionOutput,
    };
    use crate::subnets::SUBNETWORK_ID_NATIVE;

    fn outpoint(n: u64) -> TransactionOutpoint {
        TransactionOutpoint::new(TransactionId::from_u64_word(n), 0)
    }

    fn entry(amount: u64) -> UtxoEntry {
        UtxoEntry::new(amount, Default::default(), 0, false)
    }

    #[test]
    fn test_add_transaction_moves_entries() {
        let spent_entry = entry(100);
        let tx = Transaction::new(
            0,
            vec![TransactionInput::new(outpoint(1), vec![], 0)],
            vec![TransactionOutput::new(95, ScriptPublicKey::default())],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        let populated = PopulatedTransaction::new(&tx, vec![spent_entry.clone()]);

        let mut diff = UtxoDiff::default();
        diff.add_transaction(&populated, 7).unwrap();

        assert_eq!(diff.remove[&outpoint(1)], spent_entry);
        let created = TransactionOutpoint::new(tx.id(), 0);
        assert_eq!(diff.add[&created].amount, 95);
        assert_eq!(diff.add[&created].block_blue_score, 7);
    }

    #[test]
    fn test_chained_spend_cancels_out() {
        let first = Transaction::new(
            0,
            vec![TransactionInput::new(outpoint(1), vec![], 0)],
            vec![TransactionOutput::new(95, ScriptPublicKey::default())],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );
        let second = Transaction::new(
            0,
            vec![TransactionInput::new(TransactionOutpoint::new(first.id(), 0), vec![], 0)],
            vec![TransactionOutput::new(90, ScriptPublicKey::default())],
            0,
            SUBNETWORK_ID_NATIVE,
            0,
            vec![],
        );

        let mut diff = UtxoDiff::default();
        diff.add_transaction(&PopulatedTransaction::new(&first, vec![entry(100)]), 7).unwrap();
        diff.add_transaction(&PopulatedTransaction::new(&second, vec![entry(95)]), 7).unwrap();

        // The intermediate output was both created and consumed within the diff
        assert_eq!(diff.add.len(), 1);
        assert_eq!(diff.remove.len(), 1);
        assert!(diff.add.contains_key(&TransactionOutpoint::new(second.id(), 0)));
        assert!(diff.remove.contains_key(&outpoint(1)));
    }

    #[test]
    fn test_apply_unapply_round_trip() {
        let mut collection: UtxoCollection = [(outpoint(1), entry(10)), (outpoint(2), entry(20))].into();
        let original = collection.clone();

        let diff = UtxoDiff::new([(outpoint(3), entry(30))].into(), [(outpoint(1), entry(10))].into());
        diff.apply_to(&mut collection).unwrap();
        assert!(!collection.contains_key(&outpoint(1)));
        assert!(collection.contains_key(&outpoint(3)));

        diff.unapply_from(&mut collection).unwrap();
        assert_eq!(collection, original);
    }

    #[test]
    fn test_apply_detects_missing_remove_point() {
        let mut collection = UtxoCollection::new();
        let diff = UtxoDiff::new(Default::default(), [(outpoint(1), entry(10))].into());
        assert!(matches!(diff.apply_to(&mut collection), Err(UtxoAlgebraError::RemovePointMissing(_))));
    }
}
