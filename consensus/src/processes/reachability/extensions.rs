use super::{interval::Interval, Result};
use crate::model::stores::reachability::ReachabilityStoreReader;
use kaspad_hashes::Hash;

pub(super) trait ReachabilityStoreIntervalExtensions {
    fn interval_children_capacity(&self, block: Hash) -> Result<Interval>;
    fn interval_remaining_after(&self, block: Hash) -> Result<Interval>;
}

impl<T: ReachabilityStoreReader + ?Sized> ReachabilityStoreIntervalExtensions for T {
    /// Returns the reachability allocation capacity for children of `block`:
    /// the block's interval with the last point reserved for the block itself
    fn interval_children_capacity(&self, block: Hash) -> Result<Interval> {
        let interval = self.get_interval(block)?;
        Ok(interval.decrease_end(1))
    }

    /// Returns the available interval to allocate for tree children, after the
    /// last allocated child
    fn interval_remaining_after(&self, block: Hash) -> Result<Interval> {
        let capacity = self.interval_children_capacity(block)?;
        match self.get_children(block)?.last() {
            Some(last_child) => {
                let last_alloc = self.get_interval(*last_child)?;
                Ok(Interval::new(last_alloc.end + 1, capacity.end))
            }
            None => Ok(capacity),
        }
    }
}
