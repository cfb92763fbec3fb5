#![forbid(unsafe_code)]

//! Non-owning liveness checks across re-entrant calls.
//!
//! A [`LivenessWatcher`] is taken before control leaves the evaluator (script
//! invocation, a property write that may run interceptors or subscribers, a
//! diagnostic handler) and consulted afterwards. Destruction of the watched
//! object during that window is routine; the watcher reports it as a plain
//! boolean rather than an error.
//!
//! The check is an `(index, generation)` comparison against the graph's slot
//! table: it does not keep the object alive and costs one slot lookup.

use propflow_core::{ObjectGraph, ObjectId};

/// Watches one object for destruction.
#[derive(Debug, Clone)]
pub struct LivenessWatcher<'g> {
    graph: &'g ObjectGraph,
    watched: ObjectId,
}

impl<'g> LivenessWatcher<'g> {
    #[must_use]
    pub fn new(graph: &'g ObjectGraph, watched: ObjectId) -> Self {
        Self { graph, watched }
    }

    #[must_use]
    pub fn watched(&self) -> ObjectId {
        self.watched
    }

    /// Whether the object has been destroyed since (or before) the watcher
    /// was created.
    #[must_use]
    pub fn was_deleted(&self) -> bool {
        self.graph.is_destroyed(self.watched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propflow_core::TypeRegistry;

    #[test]
    fn reports_destruction_and_ignores_slot_reuse() {
        let mut reg = TypeRegistry::new();
        let item = reg.define_class("Item", None).finish();
        let graph = ObjectGraph::new(reg);
        let obj = graph.create(item);
        let watcher = LivenessWatcher::new(&graph, obj);
        assert!(!watcher.was_deleted());

        graph.destroy(obj);
        assert!(watcher.was_deleted());

        let reused = graph.create(item);
        assert_eq!(reused.index(), obj.index());
        assert!(watcher.was_deleted());
        assert!(!LivenessWatcher::new(&graph, reused).was_deleted());
    }
}
