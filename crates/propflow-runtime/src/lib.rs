#![forbid(unsafe_code)]

//! Runtime: the property-binding evaluator.
//!
//! # Role in propflow
//! `propflow-runtime` turns an expression and a target property into a live
//! binding. It evaluates the expression through the [`ScriptEngine`] seam
//! from `propflow-core`, records which properties and notifiers were read,
//! writes the coerced result back, and re-evaluates when any read source
//! changes.
//!
//! # Primary responsibilities
//! - **Binding**: [`Binding`], with enable/disable, loop detection, deferred
//!   errors and dependency snapshots.
//! - **Write-back**: [`PropertyWriteAdapter`], one [`WriteStrategy`] per
//!   target-type family.
//! - **Read-set**: [`DependencyGuard`] edges collected into a
//!   [`DependencySet`].
//! - **Liveness**: [`LivenessWatcher`] checks across re-entrant calls.
//! - **Diagnostics**: [`Diagnostics`] with `tracing` warnings and an
//!   optional JSONL [`EvidenceSink`].
//! - **Configuration**: [`EngineConfig`], with environment overrides.
//!
//! [`ScriptEngine`]: propflow_core::ScriptEngine

pub mod binding;
pub mod config;
pub mod diagnostics;
pub mod evidence_sink;
pub mod guard;
pub mod liveness;
pub mod snapshot;
pub mod write;

pub use binding::{Binding, BindingContext, BindingExpression, BindingFlags, BindingOptions, BindingTarget};
pub use config::EngineConfig;
pub use diagnostics::{BindingError, DEFAULT_RECORD_CAPACITY, Diagnostics, ErrorHandler, ErrorKind};
pub use evidence_sink::{EvidenceSink, EvidenceSinkConfig, EvidenceSinkDestination};
pub use guard::{DependencyGuard, DependencySet};
pub use liveness::LivenessWatcher;
pub use snapshot::{DependencyEntry, snapshot};
pub use write::{PrimitiveKind, PropertyWriteAdapter, ResolvedTarget, WriteError, WriteStrategy};
