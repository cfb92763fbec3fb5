#![forbid(unsafe_code)]

//! The binding evaluator.
//!
//! A [`Binding`] owns one expression and one target property. `update()`
//! runs the expression with the binding installed as the active dependency
//! collector, rebuilds the read-set from the reads the expression performed,
//! and writes the result back through a [`PropertyWriteAdapter`].
//!
//! ```text
//!              enable / set_enabled(true)
//!   Disabled ─────────────────────────────▶ Enabled ◀──────────────┐
//!      ▲                                      │ update()            │ success
//!      │ disable / retire                     ▼                     │
//!      └────────────────────────────────── Updating ──▶ ErrorState ─┘
//!                                                        (cleared by the
//!                                                         next success)
//! ```
//!
//! # Invariants
//!
//! 1. The read-set holds exactly the sources read by the most recent
//!    evaluation; it is cleared before every evaluation.
//! 2. `UPDATING` is set for the duration of one evaluation and cleared on
//!    every exit path; a re-entrant `update()` is rejected with a loop
//!    diagnostic and does not evaluate.
//! 3. A failed evaluation or write leaves the target holding the last value
//!    that was written successfully.
//! 4. A retired binding never evaluates or writes again.
//!
//! # Failure Modes
//!
//! - **Target destroyed mid-evaluation**: the write is abandoned silently.
//!   Liveness is re-checked after the script call and after the write.
//! - **Binding retired mid-evaluation** (the expression assigned a literal to
//!   its own target): the result is discarded.
//! - **Graph dropped**: `update()` becomes a no-op.
//!
//! A running update holds a strong handle to the binding, so retiring or
//! detaching it from inside the expression never frees it mid-method.

use std::cell::{Cell, OnceCell, RefCell};
use std::fmt;
use std::io;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use propflow_core::{
    AttachedBinding, BindingSlot, CollectorScope, CompileError, CompiledFunction, DependencyCollector,
    DependencySource, DynValue, ObjectGraph, ObjectId, PropertyError, ScriptEngine, Scope, SourceLocation,
    Subscription, TypeTag, ValueBox, WeakObjectGraph, WriteFlags,
};
use tracing::{debug_span, trace};

use crate::config::EngineConfig;
use crate::diagnostics::{BindingError, Diagnostics, ErrorKind};
use crate::guard::{DependencyGuard, DependencySet};
use crate::liveness::LivenessWatcher;
use crate::snapshot::{self, DependencyEntry};
use crate::write::{PropertyWriteAdapter, ResolvedTarget, WriteError};

bitflags! {
    /// Binding state bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BindingFlags: u8 {
        const ENABLED = 1 << 0;
        const UPDATING = 1 << 1;
        /// Reads during evaluation register dependency edges.
        const NOTIFY_ON_CHANGE = 1 << 2;
        /// Write-back bypasses interceptors.
        const ACCESSOR_FAST_PATH = 1 << 3;
        const BOUND_ARGUMENTS = 1 << 4;
        /// No longer the active writer for its target.
        const RETIRED = 1 << 5;
    }
}

/// The property a binding writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingTarget {
    pub object: ObjectId,
    pub index: u32,
    /// Field of a value-type property (`pos.x`).
    pub sub_index: Option<u32>,
}

impl BindingTarget {
    #[must_use]
    pub fn new(object: ObjectId, index: u32) -> Self {
        Self {
            object,
            index,
            sub_index: None,
        }
    }

    /// Target one field of a value-type property.
    #[must_use]
    pub fn with_sub_index(mut self, field: u32) -> Self {
        self.sub_index = Some(field);
        self
    }

    /// Resolve `"name"` or `"name.field"` on `object`.
    pub fn resolve(graph: &ObjectGraph, object: ObjectId, path: &str) -> Result<Self, PropertyError> {
        let (name, field) = match path.split_once('.') {
            Some((name, field)) => (name, Some(field)),
            None => (path, None),
        };
        let index = graph.property_index(object, name)?;
        let target = Self::new(object, index);
        let Some(field) = field else {
            return Ok(target);
        };
        let desc = graph.descriptor(object, index)?;
        let field_index = match desc.ty {
            TypeTag::Value(ty) => graph.registry().value_type(ty).and_then(|info| info.field_index(field)),
            _ => None,
        };
        match field_index {
            Some(i) => Ok(target.with_sub_index(i)),
            None => Err(PropertyError::UnknownProperty {
                class: graph.registry().type_name(desc.ty),
                property: field.to_string(),
            }),
        }
    }

    /// Attachment key on `object`. Alias targets attach under the slot of
    /// the property they resolve to instead.
    #[must_use]
    pub fn slot(&self) -> BindingSlot {
        (self.index, self.sub_index)
    }
}

/// What a binding evaluates.
#[derive(Debug, Clone)]
pub enum BindingExpression {
    /// Already compiled; carries its own location.
    Function(CompiledFunction),
    /// Source text, compiled on first evaluation.
    Source { text: String, url: String, line: u32 },
}

impl BindingExpression {
    #[must_use]
    pub fn source(text: impl Into<String>, url: impl Into<String>, line: u32) -> Self {
        Self::Source {
            text: text.into(),
            url: url.into(),
            line,
        }
    }
}

impl From<CompiledFunction> for BindingExpression {
    fn from(function: CompiledFunction) -> Self {
        Self::Function(function)
    }
}

/// Everything bindings created together share.
#[derive(Clone)]
pub struct BindingContext {
    graph: ObjectGraph,
    engine: Rc<dyn ScriptEngine>,
    diagnostics: Diagnostics,
    config: Rc<EngineConfig>,
    scope: Scope,
}

impl fmt::Debug for BindingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingContext")
            .field("graph", &self.graph)
            .field("diagnostics", &self.diagnostics)
            .field("config", &self.config)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl BindingContext {
    /// Context with the default configuration and no evidence sink.
    #[must_use]
    pub fn new(graph: ObjectGraph, engine: Rc<dyn ScriptEngine>) -> Self {
        Self {
            graph,
            engine,
            diagnostics: Diagnostics::new(),
            config: Rc::new(EngineConfig::default()),
            scope: Scope::new(),
        }
    }

    /// Context using `config`; opens the evidence sink it describes.
    pub fn with_config(graph: ObjectGraph, engine: Rc<dyn ScriptEngine>, config: EngineConfig) -> io::Result<Self> {
        let diagnostics = Diagnostics::from_config(&config.evidence)?;
        diagnostics.set_capacity(config.diagnostic_capacity);
        Ok(Self {
            graph,
            engine,
            diagnostics,
            config: Rc::new(config),
            scope: Scope::new(),
        })
    }

    /// Set the lexical scope expressions resolve free identifiers in.
    #[must_use]
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Report into `diagnostics` instead of the context's own sink.
    #[must_use]
    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    #[must_use]
    pub fn graph(&self) -> &ObjectGraph {
        &self.graph
    }

    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    #[must_use]
    pub fn scope(&self) -> &Scope {
        &self.scope
    }
}

/// Per-binding options.
#[derive(Debug, Clone)]
pub struct BindingOptions {
    /// Bound `this` for the call.
    pub this: Option<ObjectId>,
    /// Bound arguments for the call.
    pub args: Vec<DynValue>,
    /// Register dependency edges while evaluating. `false` gives a one-shot
    /// binding that only updates when asked.
    pub notify_on_change: bool,
    /// Fixes the write strategy instead of reading it from the descriptor.
    pub declared_type: Option<TypeTag>,
    pub location: Option<SourceLocation>,
}

impl Default for BindingOptions {
    fn default() -> Self {
        Self {
            this: None,
            args: Vec::new(),
            notify_on_change: true,
            declared_type: None,
            location: None,
        }
    }
}

impl BindingOptions {
    /// Bind `this` for the call.
    #[must_use]
    pub fn with_this(mut self, this: ObjectId) -> Self {
        self.this = Some(this);
        self
    }

    /// Bind call arguments; marks the binding as having bound arguments.
    #[must_use]
    pub fn with_args(mut self, args: Vec<DynValue>) -> Self {
        self.args = args;
        self
    }

    /// Enable or disable dependency tracking.
    #[must_use]
    pub fn with_notify_on_change(mut self, notify: bool) -> Self {
        self.notify_on_change = notify;
        self
    }

    /// Fix the write strategy to `ty`.
    #[must_use]
    pub fn with_declared_type(mut self, ty: TypeTag) -> Self {
        self.declared_type = Some(ty);
        self
    }

    /// Report diagnostics at `location` instead of the expression's own.
    #[must_use]
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

#[derive(Debug, Clone)]
struct DelayedError {
    error: BindingError,
    /// Already forwarded to diagnostics.
    reported: bool,
}

/// One property binding.
pub struct Binding {
    self_ref: Weak<Binding>,
    graph: WeakObjectGraph,
    engine: Rc<dyn ScriptEngine>,
    diagnostics: Diagnostics,
    config: Rc<EngineConfig>,
    scope: Scope,
    expression: BindingExpression,
    compiled: OnceCell<Result<CompiledFunction, CompileError>>,
    target: BindingTarget,
    this: Option<ObjectId>,
    bound_args: Vec<DynValue>,
    adapter: PropertyWriteAdapter,
    flags: Cell<BindingFlags>,
    dependencies: RefCell<DependencySet>,
    delayed_error: RefCell<Option<DelayedError>>,
    location_override: RefCell<Option<SourceLocation>>,
    evaluations: Cell<u64>,
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("target", &self.target)
            .field("flags", &self.flags.get())
            .field("dependencies", &self.dependencies.borrow().len())
            .field("evaluations", &self.evaluations.get())
            .finish_non_exhaustive()
    }
}

impl Binding {
    /// Create a disabled binding that is not yet attached to its target.
    pub fn create(
        cx: &BindingContext,
        target: BindingTarget,
        expression: BindingExpression,
        options: BindingOptions,
    ) -> Result<Rc<Self>, PropertyError> {
        let desc = cx.graph.descriptor(target.object, target.index)?;
        let adapter = match options.declared_type {
            Some(ty) => PropertyWriteAdapter::for_type(ty),
            None if desc.is_alias() => PropertyWriteAdapter::deferred(),
            None => PropertyWriteAdapter::for_type(desc.ty),
        };

        let mut flags = BindingFlags::empty();
        flags.set(BindingFlags::NOTIFY_ON_CHANGE, options.notify_on_change);
        flags.set(BindingFlags::BOUND_ARGUMENTS, !options.args.is_empty());
        trace!(object = %target.object, property = %desc.name, "binding created");

        Ok(Rc::new_cyclic(|self_ref| Self {
            self_ref: self_ref.clone(),
            graph: cx.graph.downgrade(),
            engine: Rc::clone(&cx.engine),
            diagnostics: cx.diagnostics.clone(),
            config: Rc::clone(&cx.config),
            scope: cx.scope.clone(),
            expression,
            compiled: OnceCell::new(),
            target,
            this: options.this,
            bound_args: options.args,
            adapter,
            flags: Cell::new(flags),
            dependencies: RefCell::new(DependencySet::new()),
            delayed_error: RefCell::new(None),
            location_override: RefCell::new(options.location),
            evaluations: Cell::new(0),
        }))
    }

    /// Create, attach and enable a binding on `object.path` in one step.
    pub fn bind(
        cx: &BindingContext,
        object: ObjectId,
        path: &str,
        expression: impl Into<BindingExpression>,
    ) -> Result<Rc<Self>, PropertyError> {
        let target = BindingTarget::resolve(&cx.graph, object, path)?;
        let binding = Self::create(cx, target, expression.into(), BindingOptions::default())?;
        binding.install()?;
        binding.set_enabled(true, WriteFlags::empty());
        Ok(binding)
    }

    /// Make this binding the active writer of its target, retiring the
    /// previous one.
    ///
    /// A binding on an alias is attached to the property the alias resolves
    /// to, so it competes with bindings on that property and is retired by
    /// literal writes through either name. An alias that does not resolve
    /// yet keeps the binding on the alias itself; the failure surfaces on
    /// the first write.
    pub fn install(self: &Rc<Self>) -> Result<(), PropertyError> {
        let graph = self.graph.upgrade().ok_or(PropertyError::Destroyed(self.target.object))?;
        let (object, index) = graph
            .resolve_alias(self.target.object, self.target.index, self.config.max_alias_depth)
            .unwrap_or((self.target.object, self.target.index));
        let slot = (index, self.target.sub_index);
        if let Some(current) = graph.binding(object, slot) {
            if std::ptr::addr_eq(Rc::as_ptr(&current), Rc::as_ptr(self)) {
                return Ok(());
            }
        }
        graph.attach_binding(object, slot, Rc::clone(self) as Rc<dyn AttachedBinding>)
    }

    // ========================================================================
    // Enable / disable
    // ========================================================================

    /// Enable; on a disabled → enabled transition, evaluate once if
    /// `write_immediately`.
    pub fn enable(&self, write_immediately: bool) {
        self.apply_enabled(true, write_immediately.then_some(WriteFlags::empty()));
    }

    /// Stop reacting. Dependency edges are kept.
    pub fn disable(&self) {
        self.apply_enabled(false, None);
    }

    /// Set the enabled state; on a disabled → enabled transition, evaluate
    /// once with `flags`.
    pub fn set_enabled(&self, enabled: bool, flags: WriteFlags) {
        self.apply_enabled(enabled, Some(flags));
    }

    fn apply_enabled(&self, enabled: bool, write: Option<WriteFlags>) {
        if enabled && self.is_retired() {
            trace!(object = %self.target.object, "retired binding cannot be re-enabled");
            return;
        }
        let was_enabled = self.is_enabled();
        self.set_flag(BindingFlags::ENABLED, enabled);
        self.recompute_fast_path();
        if enabled && !was_enabled {
            if let Some(flags) = write {
                self.update(flags);
            }
        }
    }

    fn recompute_fast_path(&self) {
        let fast = self.config.accessor_fast_path
            && self
                .graph
                .upgrade()
                .is_some_and(|g| !g.has_interceptor(self.target.object, self.target.index));
        self.set_flag(BindingFlags::ACCESSOR_FAST_PATH, fast);
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Evaluate and write back.
    pub fn update(&self, flags: WriteFlags) {
        // Held until return: retirement from inside the expression must not
        // free the binding mid-update.
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let Some(graph) = self.graph.upgrade() else {
            return;
        };
        let state = self.flags.get();
        if !state.contains(BindingFlags::ENABLED) || state.contains(BindingFlags::RETIRED) {
            return;
        }
        if graph.is_destroyed(self.target.object) {
            return;
        }
        if state.contains(BindingFlags::UPDATING) {
            self.report_loop(&graph);
            return;
        }

        let _span = debug_span!(
            "binding_update",
            object = %self.target.object,
            property = self.target.index
        )
        .entered();
        self.set_flag(BindingFlags::UPDATING, true);
        let watcher = LivenessWatcher::new(&graph, self.target.object);
        self.dependencies.borrow_mut().clear();

        let result = self.evaluate(&graph, &this);
        self.evaluations.set(self.evaluations.get() + 1);

        if watcher.was_deleted() {
            trace!("target destroyed during evaluation");
            self.set_flag(BindingFlags::UPDATING, false);
            return;
        }

        match result {
            Err(error) => self.record_error(error),
            Ok(_) if self.is_retired() => trace!("binding retired during evaluation"),
            Ok(value) => match self.write_back(&graph, &value, flags) {
                Ok(()) => {
                    trace!("written");
                    self.delayed_error.borrow_mut().take();
                }
                Err(WriteError::TargetDestroyed) => {}
                Err(_) if watcher.was_deleted() => {}
                Err(err) => self.record_error(self.write_failure(&graph, &err)),
            },
        }
        self.set_flag(BindingFlags::UPDATING, false);
    }

    /// Re-evaluate now.
    pub fn refresh(&self) {
        self.update(WriteFlags::empty());
    }

    /// Re-evaluate after the expression's inputs changed outside dependency
    /// tracking.
    pub fn expression_changed(&self) {
        self.update(WriteFlags::empty());
    }

    fn function(&self) -> Result<CompiledFunction, CompileError> {
        match &self.expression {
            BindingExpression::Function(f) => Ok(f.clone()),
            BindingExpression::Source { text, url, line } => self
                .compiled
                .get_or_init(|| self.engine.compile(text, url, *line))
                .clone(),
        }
    }

    fn evaluate(&self, graph: &ObjectGraph, this: &Rc<Self>) -> Result<ValueBox, BindingError> {
        let function = self.function().map_err(|err| {
            BindingError::new(ErrorKind::Compile, err.location(), err.message.clone()).with_object(self.target.object)
        })?;
        let _collector = if self.flags.get().contains(BindingFlags::NOTIFY_ON_CHANGE) {
            CollectorScope::install(Rc::clone(this) as Rc<dyn DependencyCollector>)
        } else {
            CollectorScope::suspend()
        };
        self.engine
            .invoke(&function, graph, &self.scope, self.this, &self.bound_args)
            .map_err(|err| {
                BindingError::new(ErrorKind::Evaluation, self.source_location(), err.to_string())
                    .with_object(self.target.object)
            })
    }

    fn write_back(&self, graph: &ObjectGraph, value: &ValueBox, flags: WriteFlags) -> Result<(), WriteError> {
        let (object, index) = graph.resolve_alias(self.target.object, self.target.index, self.config.max_alias_depth)?;
        let mut flags = flags | WriteFlags::DONT_REMOVE_BINDING;
        if self.flags.get().contains(BindingFlags::ACCESSOR_FAST_PATH) {
            flags |= WriteFlags::BYPASS_INTERCEPTORS;
        }
        let target = ResolvedTarget {
            object,
            index,
            sub_index: self.target.sub_index,
        };
        self.adapter.write(graph, self.engine.as_ref(), target, value, flags)
    }

    fn write_failure(&self, graph: &ObjectGraph, err: &WriteError) -> BindingError {
        BindingError::new(
            err.kind().unwrap_or(ErrorKind::Property),
            self.source_location(),
            err.to_string(),
        )
        .with_object(self.target.object)
        .with_property_path(self.path_in(graph))
    }

    // ========================================================================
    // Errors
    // ========================================================================

    fn report_loop(&self, graph: &ObjectGraph) {
        if !self.config.report_binding_loops {
            return;
        }
        let path = self.path_in(graph);
        self.diagnostics.report(
            BindingError::new(
                ErrorKind::BindingLoop,
                self.source_location(),
                format!("Binding loop detected for property \"{path}\""),
            )
            .with_object(self.target.object)
            .with_property_path(path),
        );
    }

    fn record_error(&self, error: BindingError) {
        if self.config.defer_error_reporting {
            let previous = self.delayed_error.borrow_mut().replace(DelayedError {
                error,
                reported: false,
            });
            if let Some(previous) = previous.filter(|d| !d.reported) {
                self.diagnostics.report(previous.error);
            }
        } else {
            *self.delayed_error.borrow_mut() = Some(DelayedError {
                error: error.clone(),
                reported: true,
            });
            self.diagnostics.report(error);
        }
    }

    /// The error from the most recent failed update, until an update
    /// succeeds.
    #[must_use]
    pub fn error(&self) -> Option<BindingError> {
        self.delayed_error.borrow().as_ref().map(|d| d.error.clone())
    }

    /// Forward a deferred error that has not been reported yet. Returns
    /// whether one was.
    pub fn report_pending(&self) -> bool {
        let pending = match self.delayed_error.borrow_mut().as_mut() {
            Some(d) if !d.reported => {
                d.reported = true;
                Some(d.error.clone())
            }
            _ => None,
        };
        match pending {
            Some(error) => {
                self.diagnostics.report(error);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Current dependencies in read order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<DependencyEntry> {
        let Some(graph) = self.graph.upgrade() else {
            return Vec::new();
        };
        snapshot::snapshot(&graph, self.dependencies.borrow().sources())
    }

    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependencies.borrow().len()
    }

    /// Explicit override, else the compiled function's location, else the
    /// source origin.
    #[must_use]
    pub fn source_location(&self) -> SourceLocation {
        if let Some(location) = self.location_override.borrow().as_ref() {
            return location.clone();
        }
        match &self.expression {
            BindingExpression::Function(f) => f.location().clone(),
            BindingExpression::Source { url, line, .. } => match self.compiled.get() {
                Some(Ok(f)) => f.location().clone(),
                _ => SourceLocation::new(url.as_str(), *line, 1),
            },
        }
    }

    pub fn set_source_location(&self, location: SourceLocation) {
        *self.location_override.borrow_mut() = Some(location);
    }

    /// Resolved property path (`width`, `pos.x`), or `None` once the graph
    /// is gone.
    #[must_use]
    pub fn property_path(&self) -> Option<String> {
        self.graph.upgrade().map(|g| self.path_in(&g))
    }

    fn path_in(&self, graph: &ObjectGraph) -> String {
        let Ok(desc) = graph.descriptor(self.target.object, self.target.index) else {
            return format!("#{}", self.target.index);
        };
        match (self.target.sub_index, desc.ty) {
            (Some(field), TypeTag::Value(ty)) => {
                let field_name = graph
                    .registry()
                    .value_type(ty)
                    .and_then(|info| info.fields.get(field as usize))
                    .map_or_else(|| field.to_string(), Clone::clone);
                format!("{}.{field_name}", desc.name)
            }
            _ => desc.name.clone(),
        }
    }

    #[must_use]
    pub fn target(&self) -> BindingTarget {
        self.target
    }

    #[must_use]
    pub fn flags(&self) -> BindingFlags {
        self.flags.get()
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.flags.get().contains(BindingFlags::ENABLED)
    }

    #[must_use]
    pub fn is_updating(&self) -> bool {
        self.flags.get().contains(BindingFlags::UPDATING)
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.flags.get().contains(BindingFlags::RETIRED)
    }

    #[must_use]
    pub fn uses_accessor_fast_path(&self) -> bool {
        self.flags.get().contains(BindingFlags::ACCESSOR_FAST_PATH)
    }

    #[must_use]
    pub fn has_bound_arguments(&self) -> bool {
        self.flags.get().contains(BindingFlags::BOUND_ARGUMENTS)
    }

    /// Number of evaluations that ran to completion (successful or not).
    #[must_use]
    pub fn evaluation_count(&self) -> u64 {
        self.evaluations.get()
    }

    fn set_flag(&self, flag: BindingFlags, on: bool) {
        let mut flags = self.flags.get();
        flags.set(flag, on);
        self.flags.set(flags);
    }

    fn on_dependency_changed(&self) {
        if self.is_enabled() {
            self.update(WriteFlags::empty());
        }
    }
}

impl DependencyCollector for Binding {
    fn capture(&self, source: DependencySource, connect: &dyn Fn(Rc<dyn Fn()>) -> Subscription) {
        if self.is_retired() || self.dependencies.borrow().contains(&source) {
            return;
        }
        let weak = self.self_ref.clone();
        let subscription = connect(Rc::new(move || {
            if let Some(binding) = weak.upgrade() {
                binding.on_dependency_changed();
            }
        }));
        self.dependencies
            .borrow_mut()
            .insert(DependencyGuard::new(source, subscription));
    }
}

impl AttachedBinding for Binding {
    fn retire(&self) {
        trace!(object = %self.target.object, "binding retired");
        self.set_flag(BindingFlags::RETIRED, true);
        self.set_flag(BindingFlags::ENABLED, false);
        self.dependencies.borrow_mut().clear();
    }
}
