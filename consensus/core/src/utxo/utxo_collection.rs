use crate::tx::{TransactionOutpoint, UtxoEntry};
use std::collections::HashMap;

pub type UtxoCollection = HashMap<TransactionOutpoint, UtxoEntry>;

pub trait UtxoCollectionExtensions {
    /// Adds `other` into the collection, overwriting colliding outpoints
    fn add_many(&mut self, other: &Self);

    /// Removes all `other` outpoints from the collection
    fn remove_many(&mut self, other: &Self);

    /// True if the two collections share at least one outpoint
    fn intersects(&self, other: &Self) -> bool;

    /// True if `other` is fully contained, entries compared by value
    fn includes(&self, other: &Self) -> bool;
}

impl UtxoCollectionExtensions for UtxoCollection {
    fn add_many(&mut self, other: &Self) {
        for (outpoint, entry) in other.iter() {
            self.insert(*outpoint, entry.clone());
        }
    }

    fn remove_many(&mut self, other: &Self) {
        for outpoint in other.keys() {
            self.remove(outpoint);
        }
    }

    fn intersects(&self, other: &Self) -> bool {
        let (smaller, larger) = if self.len() <= other.len() { (self, other) } else { (other, self) };
        smaller.keys().any(|outpoint| larger.contains_key(outpoint))
    }

    fn includes(&self, other: &Self) -> bool {
        other.iter().all(|(outpoint, entry)| self.get(outpoint).is_some_and(|existing| existing == entry))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tx::TransactionId;

    fn outpoint(n: u64) -> TransactionOutpoint {
        TransactionOutpoint::new(TransactionId::from_u64_word(n), 0)
    }

    fn entry(amount: u64) -> UtxoEntry {
        UtxoEntry::new(amount, Default::default(), 0, false)
    }

    #[test]
    fn test_collection_extensions() {
        let mut a: UtxoCollection = [(outpoint(1), entry(10)), (outpoint(2), entry(20))].into();
        let b: UtxoCollection = [(outpoint(2), entry(25)), (outpoint(3), entry(30))].into();

        assert!(a.intersects(&b));
        assert!(!a.includes(&b));

        a.add_many(&b);
        assert_eq!(a.len(), 3);
        assert_eq!(a[&outpoint(2)].amount, 25);
        assert!(a.includes(&b));

        a.remove_many(&b);
        assert_eq!(a.len(), 1);
        assert!(!a.intersects(&b));
    }
}
