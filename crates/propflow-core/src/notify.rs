#![forbid(unsafe_code)]

//! Change-notification channels.
//!
//! # Design
//!
//! A [`Signal`] keeps its subscribers as `Weak` callbacks. The strong `Rc`
//! lives inside the [`Subscription`] guard handed back to the subscriber, so
//! dropping the guard is all it takes to disconnect. Dead entries are pruned
//! lazily on the next [`Signal::subscribe`] or [`Signal::emit`], so a
//! channel that is re-subscribed on every evaluation but rarely fires stays
//! bounded by its live subscribers.
//!
//! [`Notifier<T>`] is a version-tracked value outside the object graph (a
//! context property, say). Reading it through [`Notifier::get`] registers a
//! dependency edge with the active collector, exactly like reading a
//! reflected property.
//!
//! # Failure Modes
//!
//! - **Drop during emit**: callbacks are collected as strong references
//!   before any is invoked, so a subscription dropped by an earlier callback
//!   in the same cycle may still be called once. Subscribers must tolerate
//!   a late call.
//! - **Re-entrant set**: `Notifier::set` from inside a subscriber is allowed;
//!   no borrow is held while callbacks run.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::capture::{self, DependencySource};

type CallbackRc = Rc<dyn Fn()>;
type CallbackWeak = Weak<dyn Fn()>;

/// Subscriber list for one change-notification channel.
#[derive(Default)]
pub struct Signal {
    subscribers: RefCell<Vec<CallbackWeak>>,
}

impl fmt::Debug for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl Signal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect a callback. Dropping the returned guard disconnects it.
    pub fn subscribe(&self, callback: Rc<dyn Fn()>) -> Subscription {
        let mut subscribers = self.subscribers.borrow_mut();
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.push(Rc::downgrade(&callback));
        Subscription { _guard: callback }
    }

    /// Number of registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }

    /// Invoke live subscribers in registration order and prune dead ones.
    pub fn emit(&self) {
        let callbacks: Vec<CallbackRc> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for cb in &callbacks {
            cb();
        }
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    _guard: Rc<dyn Fn()>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Identity of a [`Notifier`], unique per thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotifierId(u64);

fn next_notifier_id() -> NotifierId {
    thread_local! {
        static NEXT: Cell<u64> = const { Cell::new(0) };
    }
    NEXT.with(|n| {
        let id = n.get();
        n.set(id + 1);
        NotifierId(id)
    })
}

struct NotifierInner<T> {
    id: NotifierId,
    label: Rc<str>,
    value: RefCell<T>,
    version: Cell<u64>,
    signal: Signal,
}

/// A shared, version-tracked value whose reads are dependency-tracked.
///
/// Cloning a `Notifier` creates a new handle to the **same** value.
///
/// # Invariants
///
/// 1. `version` increments by exactly 1 on each value-changing `set`.
/// 2. `set(v)` where `v == current` is a no-op.
pub struct Notifier<T> {
    inner: Rc<NotifierInner<T>>,
}

impl<T> Clone for Notifier<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Notifier<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier")
            .field("label", &self.inner.label)
            .field("value", &self.inner.value.borrow())
            .field("version", &self.inner.version.get())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Notifier<T> {
    /// Create a notifier; `label` names it in dependency snapshots.
    #[must_use]
    pub fn new(label: impl AsRef<str>, value: T) -> Self {
        Self {
            inner: Rc::new(NotifierInner {
                id: next_notifier_id(),
                label: Rc::from(label.as_ref()),
                value: RefCell::new(value),
                version: Cell::new(0),
                signal: Signal::new(),
            }),
        }
    }

    #[must_use]
    pub fn id(&self) -> NotifierId {
        self.inner.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Read the value, registering a dependency edge if a collector is active.
    #[must_use]
    pub fn get(&self) -> T {
        let source = DependencySource::Notifier {
            id: self.inner.id,
            label: Rc::clone(&self.inner.label),
        };
        capture::capture(source, &|callback| self.inner.signal.subscribe(callback));
        self.get_untracked()
    }

    /// Read the value without registering a dependency.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Set a new value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.inner.version.set(self.inner.version.get() + 1);
        self.inner.signal.emit();
    }

    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.signal.subscriber_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_emits_in_registration_order() {
        let signal = Signal::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let _a = signal.subscribe(Rc::new(move || l1.borrow_mut().push('A')));
        let l2 = Rc::clone(&log);
        let _b = signal.subscribe(Rc::new(move || l2.borrow_mut().push('B')));
        signal.emit();
        assert_eq!(*log.borrow(), vec!['A', 'B']);
    }

    #[test]
    fn dropped_subscription_is_pruned() {
        let signal = Signal::new();
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let sub = signal.subscribe(Rc::new(move || c.set(c.get() + 1)));
        signal.emit();
        drop(sub);
        assert_eq!(signal.subscriber_count(), 1);
        signal.emit();
        assert_eq!(count.get(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[test]
    fn resubscribing_prunes_dead_entries() {
        let signal = Signal::new();
        let mut current = signal.subscribe(Rc::new(|| {}));
        for _ in 0..1000 {
            drop(current);
            current = signal.subscribe(Rc::new(|| {}));
        }
        assert_eq!(signal.subscriber_count(), 1);
        drop(current);
    }

    #[test]
    fn notifier_set_same_value_is_noop() {
        let n = Notifier::new("scale", 1.0f64);
        n.set(1.0);
        assert_eq!(n.version(), 0);
        n.set(2.0);
        assert_eq!(n.version(), 1);
        assert_eq!(n.get_untracked(), 2.0);
    }

    #[test]
    fn clones_share_state() {
        let a = Notifier::new("flag", false);
        let b = a.clone();
        a.set(true);
        assert!(b.get());
        assert_eq!(a.id(), b.id());
        assert_eq!(b.label(), "flag");
    }

    #[test]
    fn notifier_ids_are_unique() {
        let a = Notifier::new("a", 0);
        let b = Notifier::new("b", 0);
        assert_ne!(a.id(), b.id());
    }
}
