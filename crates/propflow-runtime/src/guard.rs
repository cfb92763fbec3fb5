#![forbid(unsafe_code)]

//! Dependency edges and a binding's read-set.
//!
//! A [`DependencyGuard`] pairs the identity of a change channel that was read
//! with the live subscription that re-triggers the owning binding. Dropping
//! the guard disconnects the edge. A [`DependencySet`] is the read-set of
//! one binding: it is cleared in full before every evaluation and rebuilt
//! from the reads that evaluation performs, so it only ever reflects the most
//! recent evaluation.
//!
//! # Invariants
//!
//! 1. At most one guard per [`DependencySource`] in a set.
//! 2. Iteration order is registration order.

use propflow_core::{DependencySource, Subscription};
use smallvec::SmallVec;

/// One (observed channel → owning binding) edge.
#[derive(Debug)]
pub struct DependencyGuard {
    source: DependencySource,
    _subscription: Subscription,
}

impl DependencyGuard {
    #[must_use]
    pub fn new(source: DependencySource, subscription: Subscription) -> Self {
        Self {
            source,
            _subscription: subscription,
        }
    }

    #[must_use]
    pub fn source(&self) -> &DependencySource {
        &self.source
    }
}

/// The read-set of one binding.
#[derive(Debug, Default)]
pub struct DependencySet {
    guards: SmallVec<[DependencyGuard; 4]>,
}

impl DependencySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, source: &DependencySource) -> bool {
        self.guards.iter().any(|g| g.source() == source)
    }

    /// Add an edge. Returns `false` (dropping the guard) if the source is
    /// already present.
    pub fn insert(&mut self, guard: DependencyGuard) -> bool {
        if self.contains(guard.source()) {
            return false;
        }
        self.guards.push(guard);
        true
    }

    /// Drop every edge.
    pub fn clear(&mut self) {
        self.guards.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn sources(&self) -> impl Iterator<Item = &DependencySource> + '_ {
        self.guards.iter().map(DependencyGuard::source)
    }
}
