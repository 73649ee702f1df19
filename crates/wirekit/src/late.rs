#![forbid(unsafe_code)]

//! Pending wiring for targets that were not available at wire time.
//!
//! For every missing target the table keeps, per dependent name, the event
//! bindings still waiting to be subscribed. A dependent entry with no
//! bindings still means "wire the reference once the target exists".
//!
//! # Invariants
//!
//! 1. Targets keep the order in which they were first deferred, and each
//!    target keeps its dependents in deferral order. Late wiring resolves in
//!    that order.
//! 2. Bindings for one dependent drain first-in, first-out.
//! 3. A target with no pending dependents is not stored.

use std::collections::VecDeque;

use crate::declaration::HandlerRef;

/// An event binding waiting for its target.
#[derive(Clone, Debug)]
pub struct PendingBinding {
    /// Event name on the target.
    pub event: String,
    /// Handler to subscribe, with the dependent as scope.
    pub handler: HandlerRef,
}

/// Everything pending for one dependent of one target.
#[derive(Clone, Debug)]
pub struct PendingDependent {
    /// Name of the dependent waiting for the target.
    pub name: String,
    /// Bindings not yet subscribed.
    pub bindings: VecDeque<PendingBinding>,
}

#[derive(Debug)]
struct PendingTarget {
    target: String,
    dependents: Vec<PendingDependent>,
}

/// `target → dependent → pending bindings`.
#[derive(Debug, Default)]
pub struct LateTable {
    targets: Vec<PendingTarget>,
}

impl LateTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `dependent` waits on `target` and return its pending bindings
    /// for appending.
    pub fn defer(&mut self, target: &str, dependent: &str) -> &mut VecDeque<PendingBinding> {
        let t = match self.targets.iter().position(|t| t.target == target) {
            Some(index) => index,
            None => {
                self.targets.push(PendingTarget {
                    target: target.to_owned(),
                    dependents: Vec::new(),
                });
                self.targets.len() - 1
            }
        };
        let dependents = &mut self.targets[t].dependents;
        let d = match dependents.iter().position(|d| d.name == dependent) {
            Some(index) => index,
            None => {
                dependents.push(PendingDependent {
                    name: dependent.to_owned(),
                    bindings: VecDeque::new(),
                });
                dependents.len() - 1
            }
        };
        &mut dependents[d].bindings
    }

    /// Pending bindings of `dependent` on `target`.
    #[must_use]
    pub fn pending(&self, target: &str, dependent: &str) -> Option<&VecDeque<PendingBinding>> {
        self.dependents(target)?
            .iter()
            .find(|d| d.name == dependent)
            .map(|d| &d.bindings)
    }

    /// Whether `dependent` waits on `target`.
    #[must_use]
    pub fn is_pending(&self, target: &str, dependent: &str) -> bool {
        self.pending(target, dependent).is_some()
    }

    /// Dependents waiting on `target`, in deferral order.
    #[must_use]
    pub fn dependents(&self, target: &str) -> Option<&[PendingDependent]> {
        self.targets
            .iter()
            .find(|t| t.target == target)
            .map(|t| t.dependents.as_slice())
    }

    /// Targets with pending dependents, in deferral order.
    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.target.clone()).collect()
    }

    /// Whether `dependent` waits on any target.
    #[must_use]
    pub fn waits(&self, dependent: &str) -> bool {
        self.targets
            .iter()
            .any(|t| t.dependents.iter().any(|d| d.name == dependent))
    }

    /// Remove `target` and return its pending dependents.
    pub fn take_target(&mut self, target: &str) -> Vec<PendingDependent> {
        match self.targets.iter().position(|t| t.target == target) {
            Some(index) => self.targets.remove(index).dependents,
            None => Vec::new(),
        }
    }

    /// Drop everything pending on `target`.
    pub fn forget_target(&mut self, target: &str) {
        self.targets.retain(|t| t.target != target);
    }

    /// Drop everything `dependent` waits for, pruning targets left empty.
    pub fn forget_dependent(&mut self, dependent: &str) {
        for t in &mut self.targets {
            t.dependents.retain(|d| d.name != dependent);
        }
        self.targets.retain(|t| !t.dependents.is_empty());
    }

    /// Number of targets with pending dependents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        self.targets.clear();
    }
}
