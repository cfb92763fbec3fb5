#![forbid(unsafe_code)]

//! Core: value model, reflected object graph, and the script engine seam.
//!
//! # Role in propflow
//! `propflow-core` holds everything a property binding talks to but does not
//! own: the dynamic and native value representations, the coercion rules
//! between them, the reflected object graph with its notify signals, the
//! active dependency collector slot, and the [`ScriptEngine`] trait.
//!
//! # Primary responsibilities
//! - **Values**: [`DynValue`], [`NativeValue`] and the [`ValueBox`] that
//!   carries either across the evaluation/write-back boundary.
//! - **Metadata**: [`TypeRegistry`] with classes, enums and value types.
//! - **Object graph**: [`ObjectGraph`] with generation-checked ids, aliases,
//!   interceptors, var slots and binding attachment.
//! - **Capture**: the thread-local collector slot and [`CollectorScope`].
//! - **Scripting**: [`ScriptEngine`], [`CompiledFunction`] and the reference
//!   [`Interpreter`].
//!
//! # How it fits in the system
//! `propflow-runtime` builds the binding evaluator on top of these types.
//! Nothing here knows about bindings beyond the [`AttachedBinding`] retire
//! hook and the [`DependencyCollector`] trait.

pub mod capture;
pub mod coerce;
pub mod graph;
pub mod id;
pub mod interp;
pub mod meta;
pub mod notify;
pub mod script;
pub mod value;

pub use capture::{CollectorScope, DependencyCollector, DependencySource};
pub use coerce::{ConversionError, TypeContext};
pub use graph::{AttachedBinding, BindingSlot, Interceptor, ObjectGraph, PropertyError, WeakObjectGraph, WriteFlags};
pub use id::{ClassId, EnumId, ObjectId, ValueTypeId};
pub use interp::Interpreter;
pub use meta::{ClassInfo, Compatibility, PropertyDescriptor, StorageKind, TypeRegistry, TypeTag};
pub use notify::{Notifier, NotifierId, Signal, Subscription};
pub use script::{CallContext, CompileError, CompiledFunction, ScriptEngine, ScriptException, Scope, SourceLocation};
pub use value::{DynValue, FunctionValue, NativeBox, NativeValue, ValueBox, ValueTypeValue, Variant};
