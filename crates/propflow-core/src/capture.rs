#![forbid(unsafe_code)]

//! The active dependency collector.
//!
//! While a binding evaluates, it is installed as the thread's active
//! [`DependencyCollector`]. Every tracked read (a reflected property read
//! through the graph, a [`Notifier::get`](crate::notify::Notifier::get))
//! calls [`capture`], which forwards the read source to the collector
//! together with a `connect` function the collector can use to subscribe.
//!
//! # Invariants
//!
//! 1. A [`CollectorScope`] restores the previously active collector when it
//!    drops, on every exit path, so nested evaluations never corrupt an outer
//!    evaluation's registration.
//! 2. No borrow of the slot is held while the collector runs; a collector may
//!    itself install a nested scope.

use std::cell::RefCell;
use std::rc::Rc;

use crate::id::ObjectId;
use crate::notify::{NotifierId, Subscription};

/// Identity of a change-notification channel that was read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencySource {
    /// Notify signal of a reflected property.
    Property { object: ObjectId, signal: u32 },
    /// Opaque notifier outside the object graph.
    Notifier { id: NotifierId, label: Rc<str> },
}

/// Receiver of dependency edges during an evaluation.
pub trait DependencyCollector {
    /// Record that `source` was read. `connect` subscribes a callback to the
    /// source's change channel.
    fn capture(&self, source: DependencySource, connect: &dyn Fn(Rc<dyn Fn()>) -> Subscription);
}

thread_local! {
    static ACTIVE: RefCell<Option<Rc<dyn DependencyCollector>>> = const { RefCell::new(None) };
}

/// Scoped installation of the active collector.
#[must_use = "the collector is uninstalled when the scope drops"]
pub struct CollectorScope {
    previous: Option<Rc<dyn DependencyCollector>>,
}

impl std::fmt::Debug for CollectorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorScope")
            .field("restores_outer", &self.previous.is_some())
            .finish()
    }
}

impl CollectorScope {
    /// Make `collector` the active collector until the scope drops.
    pub fn install(collector: Rc<dyn DependencyCollector>) -> Self {
        Self::replace(Some(collector))
    }

    /// Disable capture until the scope drops (untracked evaluation).
    pub fn suspend() -> Self {
        Self::replace(None)
    }

    fn replace(next: Option<Rc<dyn DependencyCollector>>) -> Self {
        let previous = ACTIVE.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), next));
        Self { previous }
    }
}

impl Drop for CollectorScope {
    fn drop(&mut self) {
        let previous = self.previous.take();
        ACTIVE.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Whether a collector is currently active.
#[must_use]
pub fn is_capturing() -> bool {
    ACTIVE.with(|slot| slot.borrow().is_some())
}

/// Forward a tracked read to the active collector, if any.
pub fn capture(source: DependencySource, connect: &dyn Fn(Rc<dyn Fn()>) -> Subscription) {
    let active = ACTIVE.with(|slot| slot.borrow().clone());
    if let Some(collector) = active {
        collector.capture(source, connect);
    }
}
