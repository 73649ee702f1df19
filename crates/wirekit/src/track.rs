#![forbid(unsafe_code)]

//! Reverse index from a target name to the dependents holding a reference
//! to it.
//!
//! The table is a cleanup index, not a dependency graph: `unwire` drains a
//! whole bucket and deletes the reference from every dependent in it.
//!
//! # Invariants
//!
//! 1. A dependent appears at most once per bucket.
//! 2. Buckets keep the order in which dependents were recorded.
//! 3. An empty bucket is never stored.

use std::rc::Rc;

use ahash::AHashMap;

use crate::object::{ObjectRef, same_object};

/// `target → dependents` cleanup index.
#[derive(Default)]
pub struct TrackTable {
    buckets: AHashMap<String, Vec<ObjectRef>>,
}

impl TrackTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `dependent` holds a reference to `target`.
    ///
    /// Returns `false` if it was already recorded.
    pub fn record(&mut self, target: &str, dependent: &ObjectRef) -> bool {
        let bucket = self.buckets.entry(target.to_owned()).or_default();
        if bucket.iter().any(|d| same_object(&**d, &**dependent)) {
            return false;
        }
        bucket.push(Rc::clone(dependent));
        true
    }

    /// Remove and return the whole bucket for `target`.
    pub fn drain(&mut self, target: &str) -> Vec<ObjectRef> {
        self.buckets.remove(target).unwrap_or_default()
    }

    /// Dependents recorded under `target`.
    #[must_use]
    pub fn dependents(&self, target: &str) -> &[ObjectRef] {
        self.buckets.get(target).map_or(&[][..], Vec::as_slice)
    }

    /// Whether `dependent` is recorded under `target`.
    #[must_use]
    pub fn contains(&self, target: &str, dependent: &ObjectRef) -> bool {
        self.dependents(target)
            .iter()
            .any(|d| same_object(&**d, &**dependent))
    }

    /// Number of targets with at least one dependent.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Drop every bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
    }
}

impl std::fmt::Debug for TrackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut buckets: Vec<(&str, usize)> = self
            .buckets
            .iter()
            .map(|(target, deps)| (target.as_str(), deps.len()))
            .collect();
        buckets.sort_unstable();
        f.debug_struct("TrackTable").field("buckets", &buckets).finish()
    }
}
