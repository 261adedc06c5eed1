//! Multiset comparison for small unordered collections of pairs, such as
//! group-to-role assignments, where duplicates matter.

use std::collections::HashMap;
use std::hash::Hash;

/// True when both slices hold the same elements with the same multiplicities.
pub fn multiset_equivalent<T: Eq + Hash>(desired: &[T], observed: &[T]) -> bool {
    if desired.len() != observed.len() {
        return false;
    }

    let mut counts: HashMap<&T, usize> = HashMap::with_capacity(desired.len());
    for item in desired {
        *counts.entry(item).or_insert(0) += 1;
    }

    for item in observed {
        match counts.get_mut(item) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }

    counts.values().all(|count| *count == 0)
}

/// Elements that keep two multisets apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultisetDiff<T> {
    /// Desired but not observed.
    pub missing: Vec<T>,
    /// Observed but not desired.
    pub unexpected: Vec<T>,
}

impl<T> MultisetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty()
    }
}

/// Full difference, for log messages when [`multiset_equivalent`] fails.
pub fn multiset_difference<T: Eq + Hash + Clone>(desired: &[T], observed: &[T]) -> MultisetDiff<T> {
    let mut counts: HashMap<&T, usize> = HashMap::with_capacity(desired.len());
    for item in desired {
        *counts.entry(item).or_insert(0) += 1;
    }

    let mut unexpected = Vec::new();
    for item in observed {
        match counts.get_mut(item) {
            Some(count) if *count > 0 => *count -= 1,
            _ => unexpected.push(item.clone()),
        }
    }

    // Walk `desired` again so `missing` keeps the caller's order.
    let mut missing = Vec::new();
    for item in desired {
        if let Some(count) = counts.get_mut(item) {
            if *count > 0 {
                *count -= 1;
                missing.push(item.clone());
            }
        }
    }

    MultisetDiff {
        missing,
        unexpected,
    }
}
