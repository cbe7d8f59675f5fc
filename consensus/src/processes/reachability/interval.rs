use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// A closed integer interval over a spanning-tree node. The interval of a node
/// contains the intervals of all its tree descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: u64,
    pub end: u64,
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}

impl From<Interval> for (u64, u64) {
    fn from(val: Interval) -> Self {
        (val.start, val.end)
    }
}

impl Interval {
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(end >= start.saturating_sub(1)); // Empty intervals are represented as (start, start - 1)
        Interval { start, end }
    }

    pub fn empty() -> Self {
        Self::new(1, 0)
    }

    /// Returns the maximally allocatable interval. The end is reserved one
    /// below `u64::MAX` so that the reserved zero/max sentinels never appear
    /// within child allocations.
    pub fn maximal() -> Self {
        Self::new(1, u64::MAX - 1)
    }

    pub fn size(&self) -> u64 {
        // Empty intervals are possible, so we avoid the overflow
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    pub fn increase_start(&self, offset: u64) -> Self {
        Self::new(self.start + offset, self.end)
    }

    pub fn decrease_end(&self, offset: u64) -> Self {
        Self::new(self.start, self.end - offset)
    }

    /// Splits into two halves, left biased
    pub fn split_half(&self) -> (Self, Self) {
        self.split_fraction(0.5)
    }

    /// Splits into two parts where the left size is the given fraction of the
    /// total size, rounded up
    pub fn split_fraction(&self, fraction: f64) -> (Self, Self) {
        let left_size = f64::ceil(self.size() as f64 * fraction) as u64;
        (Self::new(self.start, self.start + left_size - 1), Self::new(self.start + left_size, self.end))
    }

    /// Splits into `sizes.len()` parts of exactly the requested sizes. The
    /// sizes must sum to the interval size.
    pub fn split_exact(&self, sizes: &[u64]) -> Vec<Self> {
        assert_eq!(sizes.iter().sum::<u64>(), self.size(), "requested sizes must sum to the interval size");
        let mut start = self.start;
        sizes
            .iter()
            .map(|size| {
                let interval = Self::new(start, start + size - 1);
                start += size;
                interval
            })
            .collect()
    }

    /// Splits the whole interval into parts proportional to the given sizes,
    /// with each part guaranteed to contain at least its requested size. The
    /// remainder is accumulated on the last part.
    pub fn split_proportional(&self, sizes: &[u64]) -> Vec<Self> {
        let interval_size = self.size();
        let sizes_sum: u64 = sizes.iter().sum();
        assert!(interval_size >= sizes_sum, "interval of size {} cannot cover subtrees of total size {}", interval_size, sizes_sum);
        assert!(!sizes.is_empty());

        let mut allocations = Vec::with_capacity(sizes.len());
        let mut remaining_size = interval_size;
        let mut remaining_sum = sizes_sum;
        for &size in &sizes[..sizes.len() - 1] {
            // Proportional share, never below the required size. The math
            // guarantees the remainder stays sufficient for the rest.
            let alloc = ((remaining_size as u128 * size as u128 / remaining_sum as u128) as u64).max(size);
            allocations.push(alloc);
            remaining_size -= alloc;
            remaining_sum -= size;
        }
        allocations.push(remaining_size);

        let mut start = self.start;
        allocations
            .into_iter()
            .map(|size| {
                let interval = Self::new(start, start + size - 1);
                start += size;
                interval
            })
            .collect()
    }

    pub fn contains(&self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn strictly_contains(&self, other: Self) -> bool {
        self.start <= other.start && other.end < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_and_emptiness() {
        assert_eq!(Interval::maximal().size(), u64::MAX - 1);
        assert_eq!(Interval::new(5, 9).size(), 5);
        assert_eq!(Interval::new(5, 5).size(), 1);
        assert!(Interval::empty().is_empty());
        assert_eq!(Interval::empty().size(), 0);
    }

    #[test]
    fn test_split_half() {
        let (left, right) = Interval::new(1, 10).split_half();
        assert_eq!(left, Interval::new(1, 5));
        assert_eq!(right, Interval::new(6, 10));

        let (left, right) = Interval::new(1, 11).split_half();
        assert_eq!(left.size(), 6);
        assert_eq!(right.size(), 5);
        assert_eq!(left.end + 1, right.start);
    }

    #[test]
    fn test_split_exact() {
        let splits = Interval::new(1, 10).split_exact(&[3, 2, 5]);
        assert_eq!(splits, vec![Interval::new(1, 3), Interval::new(4, 5), Interval::new(6, 10)]);
    }

    #[test]
    fn test_split_proportional_respects_sizes() {
        let interval = Interval::new(1, 100);
        let sizes = [7u64, 1, 20, 2];
        let splits = interval.split_proportional(&sizes);

        assert_eq!(splits.len(), sizes.len());
        assert_eq!(splits[0].start, interval.start);
        assert_eq!(splits.last().unwrap().end, interval.end);
        for (split, &size) in splits.iter().zip(sizes.iter()) {
            assert!(split.size() >= size, "allocated interval {split} is below the required size {size}");
        }
        for pair in splits.windows(2) {
            assert_eq!(pair[0].end + 1, pair[1].start, "allocations must be consecutive");
        }
    }

    #[test]
    fn test_containment() {
        let outer = Interval::new(1, 100);
        assert!(outer.contains(Interval::new(1, 100)));
        assert!(!outer.strictly_contains(Interval::new(1, 100)));
        assert!(outer.strictly_contains(Interval::new(1, 99)));
        assert!(!outer.contains(Interval::new(0, 3)));
        assert!(!outer.contains(Interval::new(50, 101)));
    }
}
