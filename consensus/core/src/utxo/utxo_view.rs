use super::{utxo_collection::UtxoCollection, utxo_diff::UtxoDiff};
use crate::tx::{TransactionOutpoint, UtxoEntry};

/// A read-only view over some UTXO state
pub trait UtxoView {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry>;

    fn contains(&self, outpoint: &TransactionOutpoint) -> bool {
        self.get(outpoint).is_some()
    }
}

impl UtxoView for UtxoCollection {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        std::collections::HashMap::get(self, outpoint).cloned()
    }
}

/// A view of `base` with `diff` layered on top of it
pub struct ComposedUtxoView<'a, V: UtxoView> {
    base: &'a V,
    diff: &'a UtxoDiff,
}

impl<'a, V: UtxoView> ComposedUtxoView<'a, V> {
    pub fn new(base: &'a V, diff: &'a UtxoDiff) -> Self {
        Self { base, diff }
    }
}

impl<V: UtxoView> UtxoView for ComposedUtxoView<'_, V> {
    fn get(&self, outpoint: &TransactionOutpoint) -> Option<UtxoEntry> {
        if let Some(entry) = self.diff.add.get(outpoint) {
            return Some(entry.clone());
        }
        if self.diff.remove.contains_key(outpoint) {
            return None;
        }
        self.base.get(outpoint)
    }
}

pub fn compose<'a, V: UtxoView>(base: &'a V, diff: &'a UtxoDiff) -> ComposedUtxoView<'a, V> {
    ComposedUtxoView::new(base, diff)
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
    fn test_composed_view() {
        let base: UtxoCollection = [(outpoint(1), entry(10)), (outpoint(2), entry(20))].into();
        let diff = UtxoDiff::new([(outpoint(3), entry(30))].into(), [(outpoint(1), entry(10))].into());
        let view = compose(&base, &diff);

        assert!(view.get(&outpoint(1)).is_none());
        assert_eq!(view.get(&outpoint(2)).unwrap().amount, 20);
        assert_eq!(view.get(&outpoint(3)).unwrap().amount, 30);
        assert!(!view.contains(&outpoint(4)));
    }
}
