#![forbid(unsafe_code)]

//! Read-only view of a binding's dependencies for tooling.

use std::fmt;

use propflow_core::{DependencySource, ObjectGraph, ObjectId};
use serde::Serialize;

/// One dependency: the object read and the name of the property (or the
/// notifier label for sources outside the object graph).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyEntry {
    /// `None` for notifier sources and for objects destroyed since the read.
    pub object: Option<ObjectId>,
    pub property: String,
}

impl fmt::Display for DependencyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.object {
            Some(object) => write!(f, "{object}.{}", self.property),
            None => f.write_str(&self.property),
        }
    }
}

/// Resolve captured sources to (object, property name) pairs, in read-set
/// order.
#[must_use]
pub fn snapshot<'a>(graph: &ObjectGraph, sources: impl Iterator<Item = &'a DependencySource>) -> Vec<DependencyEntry> {
    sources
        .map(|source| match source {
            DependencySource::Property { object, signal } => match graph.signal_property_name(*object, *signal) {
                Some(property) => DependencyEntry {
                    object: Some(*object),
                    property,
                },
                None => DependencyEntry {
                    object: None,
                    property: format!("<destroyed>#{signal}"),
                },
            },
            DependencySource::Notifier { label, .. } => DependencyEntry {
                object: None,
                property: label.to_string(),
            },
        })
        .collect()
}
