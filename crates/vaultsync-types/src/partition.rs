//! Set partition: split two key sets into exclusive and common parts.
//!
//! Drives the collection merge: children found on one side only are carried
//! over as-is, children found on both sides are merged recursively.

use std::collections::BTreeSet;

/// The three disjoint parts of two partitioned key sets.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition<K> {
    /// Keys found only in the first set.
    pub only_a: BTreeSet<K>,
    /// Keys found only in the second set.
    pub only_b: BTreeSet<K>,
    /// Keys found in both sets.
    pub both: BTreeSet<K>,
}

/// Partition two sets into `(A∖B, B∖A, A∩B)`.
///
/// Pure and stateless. Every key from `A ∪ B` lands in exactly one of the
/// three output sets.
pub fn partition<K: Ord + Clone>(a: &BTreeSet<K>, b: &BTreeSet<K>) -> Partition<K> {
    Partition {
        only_a: a.difference(b).cloned().collect(),
        only_b: b.difference(a).cloned().collect(),
        both: a.intersection(b).cloned().collect(),
    }
}
