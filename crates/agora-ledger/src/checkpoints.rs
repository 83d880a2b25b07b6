//! Block-keyed history of a value.
//!
//! Used to freeze voting inputs at a proposal's creation point: token votes,
//! total supply, reputation accounts and the default decay rate.

use serde::{Deserialize, Serialize};

/// Append-only `(block, value)` history. Keys are non-decreasing; a second
/// write in the same block replaces the first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoints<T> {
    entries: Vec<(u64, T)>,
}

impl<T> Default for Checkpoints<T> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<T: Clone> Checkpoints<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as of `block`.
    pub fn push(&mut self, block: u64, value: T) {
        match self.entries.last_mut() {
            Some((last, slot)) if *last == block => *slot = value,
            // the engine rejects clock regressions before any write, so
            // `block` is never below the last key here
            _ => self.entries.push((block, value)),
        }
    }

    /// Value as it stood at the end of block `block - 1`: the latest entry
    /// strictly before `block`.
    pub fn value_before(&self, block: u64) -> Option<&T> {
        let idx = self.entries.partition_point(|(b, _)| *b < block);
        idx.checked_sub(1).map(|i| &self.entries[i].1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_before_is_strict() {
        let mut cp = Checkpoints::new();
        cp.push(5, 100u64);
        cp.push(10, 200u64);

        assert_eq!(cp.value_before(5), None);
        assert_eq!(cp.value_before(6), Some(&100));
        assert_eq!(cp.value_before(10), Some(&100));
        assert_eq!(cp.value_before(11), Some(&200));
        assert_eq!(cp.value_before(u64::MAX), Some(&200));
    }

    #[test]
    fn test_same_block_overwrites() {
        let mut cp = Checkpoints::new();
        cp.push(3, 1u64);
        cp.push(3, 2u64);
        assert_eq!(cp.entries, vec![(3, 2)]);
        assert_eq!(cp.value_before(4), Some(&2));
    }
}
