#![forbid(unsafe_code)]

//! Binding diagnostics: error taxonomy, records, and the shared sink.
//!
//! Every failure a binding reports ends up as one [`BindingError`]: a kind,
//! the binding's source location, the target object, and a human-readable
//! message. [`Diagnostics`] collects them, logs each through `tracing`,
//! mirrors them to an optional JSONL [`EvidenceSink`], and forwards them to
//! an optional user handler.
//!
//! # Failure Modes
//!
//! - **Handler re-enters the graph**: allowed. The handler runs with no
//!   borrow of diagnostics state held, and callers treat the call as a
//!   suspension point.
//! - **Evidence write fails**: logged at `warn!`, the record is still kept.
//! - **Persistent failures**: the in-memory record list is a ring of
//!   [`Diagnostics::capacity`] entries. The oldest record is evicted once
//!   it is full and counted in [`Diagnostics::evicted`]. The evidence sink
//!   and the handler still see every record.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::io;
use std::rc::Rc;

use propflow_core::{ObjectId, SourceLocation};
use serde::Serialize;
use tracing::warn;

use crate::evidence_sink::{EvidenceSink, EvidenceSinkConfig};

/// Category of a binding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Expression source failed to compile.
    Compile,
    /// Script threw during evaluation.
    Evaluation,
    /// Re-entrant update of the same binding.
    BindingLoop,
    /// `undefined` written to a type with no empty representation.
    UndefinedAssignment,
    /// Result could not be coerced to the declared property type.
    TypeMismatch,
    /// Function value written to a fixed-type property.
    FunctionAssignment,
    /// Target could not be resolved or written (unknown property, broken alias).
    Property,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Evaluation => "evaluation",
            Self::BindingLoop => "binding_loop",
            Self::UndefinedAssignment => "undefined_assignment",
            Self::TypeMismatch => "type_mismatch",
            Self::FunctionAssignment => "function_assignment",
            Self::Property => "property",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One diagnostic record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BindingError {
    pub kind: ErrorKind,
    pub location: SourceLocation,
    /// Target object at fault.
    pub object: Option<ObjectId>,
    pub message: String,
    /// Resolved property path of the binding (`width`, `pos.x`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_path: Option<String>,
}

impl BindingError {
    #[must_use]
    pub fn new(kind: ErrorKind, location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            kind,
            location,
            object: None,
            message: message.into(),
            property_path: None,
        }
    }

    /// Attach the object at fault.
    #[must_use]
    pub fn with_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    /// Attach the binding's resolved property path.
    #[must_use]
    pub fn with_property_path(mut self, path: impl Into<String>) -> Self {
        self.property_path = Some(path.into());
        self
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

impl std::error::Error for BindingError {}

/// User hook invoked for every reported error.
pub type ErrorHandler = Rc<dyn Fn(&BindingError)>;

#[derive(Serialize)]
struct EvidenceRecord<'a> {
    event: &'static str,
    #[serde(flatten)]
    error: &'a BindingError,
}

/// Records kept in memory before the oldest is evicted.
pub const DEFAULT_RECORD_CAPACITY: usize = 1024;

struct DiagnosticsState {
    records: RefCell<VecDeque<BindingError>>,
    capacity: Cell<usize>,
    evicted: Cell<u64>,
    handler: RefCell<Option<ErrorHandler>>,
    sink: Option<EvidenceSink>,
}

impl Default for DiagnosticsState {
    fn default() -> Self {
        Self {
            records: RefCell::new(VecDeque::new()),
            capacity: Cell::new(DEFAULT_RECORD_CAPACITY),
            evicted: Cell::new(0),
            handler: RefCell::new(None),
            sink: None,
        }
    }
}

impl DiagnosticsState {
    fn trim_to(&self, capacity: usize) {
        let mut records = self.records.borrow_mut();
        while records.len() > capacity {
            records.pop_front();
            self.evicted.set(self.evicted.get() + 1);
        }
    }
}

/// Shared diagnostics sink. Clones report into the same record list.
#[derive(Clone, Default)]
pub struct Diagnostics {
    state: Rc<DiagnosticsState>,
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("records", &self.state.records.borrow().len())
            .field("capacity", &self.state.capacity.get())
            .field("handler", &self.state.handler.borrow().is_some())
            .field("sink", &self.state.sink)
            .finish()
    }
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics mirrored to the sink described by `config`.
    pub fn from_config(config: &EvidenceSinkConfig) -> io::Result<Self> {
        Ok(match EvidenceSink::from_config(config)? {
            Some(sink) => Self::with_sink(sink),
            None => Self::new(),
        })
    }

    /// Diagnostics mirrored to `sink`.
    #[must_use]
    pub fn with_sink(sink: EvidenceSink) -> Self {
        Self {
            state: Rc::new(DiagnosticsState {
                sink: Some(sink),
                ..DiagnosticsState::default()
            }),
        }
    }

    /// Install the user handler, replacing any previous one.
    pub fn set_handler(&self, handler: ErrorHandler) {
        *self.state.handler.borrow_mut() = Some(handler);
    }

    pub fn clear_handler(&self) {
        self.state.handler.borrow_mut().take();
    }

    /// Bound the in-memory record list (at least 1), evicting the oldest
    /// records if it is already longer.
    pub fn set_capacity(&self, capacity: usize) {
        let capacity = capacity.max(1);
        self.state.capacity.set(capacity);
        self.state.trim_to(capacity);
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.state.capacity.get()
    }

    /// Records evicted from the in-memory list since creation.
    #[must_use]
    pub fn evicted(&self) -> u64 {
        self.state.evicted.get()
    }

    /// Record, log, mirror, and forward one error.
    pub fn report(&self, error: BindingError) {
        match error.kind {
            ErrorKind::BindingLoop => warn!(
                property_path = error.property_path.as_deref().unwrap_or(""),
                location = %error.location,
                object = ?error.object,
                "{}",
                error.message
            ),
            kind => warn!(
                kind = kind.as_str(),
                location = %error.location,
                object = ?error.object,
                "{}",
                error.message
            ),
        }

        if let Some(sink) = &self.state.sink {
            let record = EvidenceRecord {
                event: "binding_error",
                error: &error,
            };
            if let Err(err) = sink.write_record(&record) {
                warn!(error = %err, "failed to write binding evidence");
            }
        }

        let handler = self.state.handler.borrow().clone();
        self.state.records.borrow_mut().push_back(error.clone());
        self.state.trim_to(self.state.capacity.get());
        if let Some(handler) = handler {
            handler(&error);
        }
    }

    /// Snapshot of the retained records, oldest first.
    #[must_use]
    pub fn records(&self) -> Vec<BindingError> {
        self.state.records.borrow().iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.records.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.records.borrow().is_empty()
    }

    #[must_use]
    pub fn count(&self, kind: ErrorKind) -> usize {
        self.state.records.borrow().iter().filter(|r| r.kind == kind).count()
    }

    /// Remove and return every retained record.
    pub fn take(&self) -> Vec<BindingError> {
        self.state.records.borrow_mut().drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tracing_test::traced_test;

    fn sample(kind: ErrorKind) -> BindingError {
        BindingError::new(kind, SourceLocation::new("main.ui", 4, 2), "boom")
    }

    #[test]
    fn display_includes_location() {
        assert_eq!(sample(ErrorKind::Evaluation).to_string(), "main.ui:4:2: boom");
    }

    #[test]
    fn records_and_counts() {
        let diag = Diagnostics::new();
        diag.report(sample(ErrorKind::TypeMismatch));
        diag.report(sample(ErrorKind::TypeMismatch));
        diag.report(sample(ErrorKind::Compile));
        assert_eq!(diag.len(), 3);
        assert_eq!(diag.count(ErrorKind::TypeMismatch), 2);
        assert_eq!(diag.take().len(), 3);
        assert!(diag.is_empty());
    }

    #[test]
    fn record_list_is_a_bounded_ring() {
        let diag = Diagnostics::new();
        assert_eq!(diag.capacity(), DEFAULT_RECORD_CAPACITY);
        diag.set_capacity(2);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        diag.set_handler(Rc::new(move |_: &BindingError| s.set(s.get() + 1)));

        diag.report(sample(ErrorKind::Compile));
        diag.report(sample(ErrorKind::Evaluation));
        diag.report(sample(ErrorKind::TypeMismatch));
        let kinds: Vec<ErrorKind> = diag.records().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Evaluation, ErrorKind::TypeMismatch]);
        assert_eq!(diag.evicted(), 1);
        assert_eq!(seen.get(), 3);

        diag.set_capacity(0);
        assert_eq!(diag.capacity(), 1);
        assert_eq!(diag.len(), 1);
        assert_eq!(diag.evicted(), 2);
    }

    #[test]
    fn handler_sees_every_record() {
        let diag = Diagnostics::new();
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        diag.set_handler(Rc::new(move |_: &BindingError| s.set(s.get() + 1)));
        diag.report(sample(ErrorKind::Evaluation));
        diag.clear_handler();
        diag.report(sample(ErrorKind::Evaluation));
        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn handler_may_report_reentrantly() {
        let diag = Diagnostics::new();
        let inner = diag.clone();
        diag.set_handler(Rc::new(move |e: &BindingError| {
            if e.kind == ErrorKind::Evaluation {
                inner.report(sample(ErrorKind::Property));
            }
        }));
        diag.report(sample(ErrorKind::Evaluation));
        assert_eq!(diag.len(), 2);
    }

    #[test]
    #[traced_test]
    fn loop_warning_carries_property_path() {
        let diag = Diagnostics::new();
        diag.report(
            BindingError::new(
                ErrorKind::BindingLoop,
                SourceLocation::new("main.ui", 1, 1),
                "Binding loop detected for property \"width\"",
            )
            .with_property_path("width"),
        );
        assert!(logs_contain("Binding loop detected"));
        assert!(logs_contain("property_path=\"width\""));
    }

    #[test]
    fn evidence_lines_are_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("diag.jsonl");
        let diag = Diagnostics::from_config(&EvidenceSinkConfig::enabled_file(&path)).unwrap();
        diag.report(sample(ErrorKind::UndefinedAssignment).with_property_path("count"));
        let line = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["event"], "binding_error");
        assert_eq!(value["kind"], "undefined_assignment");
        assert_eq!(value["location"]["line"], 4);
        assert_eq!(value["property_path"], "count");
    }
}
