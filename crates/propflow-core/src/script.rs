#![forbid(unsafe_code)]

//! Script engine seam.
//!
//! A [`ScriptEngine`] compiles expression source into a [`CompiledFunction`]
//! and invokes compiled functions against an object graph and a lexical
//! [`Scope`]. The binding runtime only depends on this trait; the bundled
//! [`Interpreter`](crate::interp::Interpreter) is one implementation.
//!
//! A compiled function's body is either dynamic (returns a [`DynValue`]) or
//! typed (returns a [`NativeValue`] of a known [`TypeTag`], the way an
//! ahead-of-time compiled binding would). Invocation wraps the former in
//! [`ValueBox::Dynamic`] and the latter in [`ValueBox::Native`].

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::coerce::{self, ConversionError};
use crate::graph::ObjectGraph;
use crate::id::ObjectId;
use crate::meta::TypeTag;
use crate::notify::Notifier;
use crate::value::{DynValue, FunctionValue, NativeValue, ValueBox};

/// Origin of an expression: file url, 1-based line and column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    pub url: String,
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(url: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            url: url.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let url = if self.url.is_empty() { "<Unknown File>" } else { &self.url };
        write!(f, "{url}:{}:{}", self.line, self.column)
    }
}

/// Expression source failed to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError {
    pub message: String,
    pub url: String,
    pub line: u32,
    pub column: u32,
}

impl CompileError {
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.url.clone(), self.line, self.column)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location(), self.message)
    }
}

impl std::error::Error for CompileError {}

/// Runtime exception thrown by script code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptException {
    pub message: String,
}

impl ScriptException {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn reference_error(name: &str) -> Self {
        Self::new(format!("ReferenceError: {name} is not defined"))
    }

    #[must_use]
    pub fn type_error(message: impl fmt::Display) -> Self {
        Self::new(format!("TypeError: {message}"))
    }
}

impl fmt::Display for ScriptException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ScriptException {}

#[derive(Clone, Default)]
struct ScopeData {
    ids: HashMap<String, ObjectId>,
    context: HashMap<String, Notifier<DynValue>>,
    context_object: Option<ObjectId>,
}

/// Lexical scope an expression is evaluated in: named objects, context
/// values, and an optional context object whose properties are in scope.
///
/// Cheap to clone; builders copy on write.
#[derive(Clone, Default)]
pub struct Scope {
    data: Rc<ScopeData>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.data.ids.keys().collect();
        ids.sort();
        let mut context: Vec<&String> = self.data.context.keys().collect();
        context.sort();
        f.debug_struct("Scope")
            .field("ids", &ids)
            .field("context", &context)
            .field("context_object", &self.data.context_object)
            .finish()
    }
}

impl Scope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_id(mut self, name: impl Into<String>, object: ObjectId) -> Self {
        Rc::make_mut(&mut self.data).ids.insert(name.into(), object);
        self
    }

    /// Expose a notifier as a free variable. Reads are dependency-tracked.
    #[must_use]
    pub fn with_context_value(mut self, name: impl Into<String>, value: Notifier<DynValue>) -> Self {
        Rc::make_mut(&mut self.data).context.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_context_object(mut self, object: ObjectId) -> Self {
        Rc::make_mut(&mut self.data).context_object = Some(object);
        self
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<ObjectId> {
        self.data.ids.get(name).copied()
    }

    #[must_use]
    pub fn context_value(&self, name: &str) -> Option<&Notifier<DynValue>> {
        self.data.context.get(name)
    }

    #[must_use]
    pub fn context_object(&self) -> Option<ObjectId> {
        self.data.context_object
    }
}

/// Everything a function body sees while it runs.
pub struct CallContext<'a> {
    pub graph: &'a ObjectGraph,
    pub scope: &'a Scope,
    pub this: Option<ObjectId>,
    pub args: &'a [DynValue],
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("this", &self.this)
            .field("args", &self.args.len())
            .finish()
    }
}

impl CallContext<'_> {
    /// Positional argument, `undefined` when missing.
    #[must_use]
    pub fn arg(&self, index: usize) -> DynValue {
        self.args.get(index).cloned().unwrap_or_default()
    }

    /// Tracked property read. Unknown properties read as `undefined`; a dead
    /// object throws.
    pub fn get(&self, object: ObjectId, name: &str) -> Result<DynValue, ScriptException> {
        if self.graph.is_destroyed(object) {
            return Err(ScriptException::type_error(format!(
                "Cannot read property '{name}' of null"
            )));
        }
        let Ok(index) = self.graph.property_index(object, name) else {
            return Ok(DynValue::Undefined);
        };
        self.graph
            .read_dynamic(object, index)
            .map_err(ScriptException::type_error)
    }

    /// Property write from script; replaces any binding on the property.
    pub fn set(&self, object: ObjectId, name: &str, value: &DynValue) -> Result<(), ScriptException> {
        let index = self
            .graph
            .property_index(object, name)
            .map_err(ScriptException::type_error)?;
        let ty = self.graph.descriptor(object, index).map_err(ScriptException::type_error)?.ty;
        let native = coerce::to_native(value, ty, self.graph).map_err(ScriptException::type_error)?;
        self.graph
            .set_literal(object, index, native)
            .map_err(ScriptException::type_error)
    }

    /// Resolve a free identifier: scope ids, context values, properties of
    /// `this`, then properties of the context object.
    pub fn lookup(&self, name: &str) -> Result<DynValue, ScriptException> {
        if let Some(id) = self.scope.id(name) {
            return Ok(DynValue::Object(id));
        }
        if let Some(value) = self.scope.context_value(name) {
            return Ok(value.get());
        }
        for object in [self.this, self.scope.context_object()].into_iter().flatten() {
            if self.graph.is_alive(object) {
                if let Ok(index) = self.graph.property_index(object, name) {
                    return self
                        .graph
                        .read_dynamic(object, index)
                        .map_err(ScriptException::type_error);
                }
            }
        }
        Err(ScriptException::reference_error(name))
    }

    /// Call a function value with a new `this` and arguments.
    pub fn call(&self, function: &FunctionValue, this: Option<ObjectId>, args: &[DynValue]) -> Result<DynValue, ScriptException> {
        let cx = CallContext {
            graph: self.graph,
            scope: self.scope,
            this,
            args,
        };
        function.function.call(&cx).map(ValueBox::into_dynamic)
    }
}

/// Dynamic function body.
pub type DynamicBody = Rc<dyn Fn(&CallContext<'_>) -> Result<DynValue, ScriptException>>;
/// Typed function body returning a native value of a fixed type.
pub type TypedBody = Rc<dyn Fn(&CallContext<'_>) -> Result<NativeValue, ScriptException>>;

enum FunctionBody {
    Dynamic(DynamicBody),
    Typed(TypeTag, TypedBody),
}

struct FunctionInner {
    name: String,
    location: SourceLocation,
    body: FunctionBody,
}

/// A callable produced by [`ScriptEngine::compile`] or wrapped from a
/// closure. Clones share the same function.
#[derive(Clone)]
pub struct CompiledFunction {
    inner: Rc<FunctionInner>,
}

impl fmt::Debug for CompiledFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledFunction")
            .field("name", &self.inner.name)
            .field("location", &self.inner.location)
            .field("return_type", &self.return_type())
            .finish()
    }
}

impl CompiledFunction {
    /// Wrap a closure returning a VM value.
    #[must_use]
    pub fn native(
        name: impl Into<String>,
        location: SourceLocation,
        body: impl Fn(&CallContext<'_>) -> Result<DynValue, ScriptException> + 'static,
    ) -> Self {
        Self::from_body(name, location, FunctionBody::Dynamic(Rc::new(body)))
    }

    /// Wrap a closure returning a native value of type `ty`.
    #[must_use]
    pub fn typed(
        name: impl Into<String>,
        location: SourceLocation,
        ty: TypeTag,
        body: impl Fn(&CallContext<'_>) -> Result<NativeValue, ScriptException> + 'static,
    ) -> Self {
        Self::from_body(name, location, FunctionBody::Typed(ty, Rc::new(body)))
    }

    fn from_body(name: impl Into<String>, location: SourceLocation, body: FunctionBody) -> Self {
        Self {
            inner: Rc::new(FunctionInner {
                name: name.into(),
                location,
                body,
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn location(&self) -> &SourceLocation {
        &self.inner.location
    }

    /// Native return type of a typed function.
    #[must_use]
    pub fn return_type(&self) -> Option<TypeTag> {
        match &self.inner.body {
            FunctionBody::Typed(ty, _) => Some(*ty),
            FunctionBody::Dynamic(_) => None,
        }
    }

    /// Identity comparison.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Run the body.
    pub fn call(&self, cx: &CallContext<'_>) -> Result<ValueBox, ScriptException> {
        match &self.inner.body {
            FunctionBody::Dynamic(body) => body(cx).map(ValueBox::Dynamic),
            FunctionBody::Typed(ty, body) => {
                let value = body(cx)?;
                if !value.fits(*ty) {
                    return Err(ScriptException::type_error(format!(
                        "{} returned a value that is not a {}",
                        self.inner.name,
                        cx.graph.registry().type_name(*ty)
                    )));
                }
                Ok(ValueBox::native(*ty, value))
            }
        }
    }
}

/// The scripting VM as seen by the binding runtime.
pub trait ScriptEngine {
    /// Compile expression source. `line` is the 1-based line the expression
    /// starts on in `url`.
    fn compile(&self, source: &str, url: &str, line: u32) -> Result<CompiledFunction, CompileError>;

    /// Invoke a compiled function.
    fn invoke(
        &self,
        function: &CompiledFunction,
        graph: &ObjectGraph,
        scope: &Scope,
        this: Option<ObjectId>,
        args: &[DynValue],
    ) -> Result<ValueBox, ScriptException> {
        let cx = CallContext {
            graph,
            scope,
            this,
            args,
        };
        function.call(&cx)
    }

    /// Convert a VM value to a native value of type `ty`.
    fn to_native(&self, value: &DynValue, ty: TypeTag, graph: &ObjectGraph) -> Result<NativeValue, ConversionError> {
        coerce::to_native(value, ty, graph)
    }

    /// Convert a native value to a VM value.
    fn from_native(&self, value: &NativeValue, ty: TypeTag) -> DynValue {
        coerce::from_native(value, ty)
    }
}
