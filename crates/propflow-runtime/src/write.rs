#![forbid(unsafe_code)]

//! Typed write-back of binding results.
//!
//! The target property's declared type selects one [`WriteStrategy`] per
//! family, once. Each strategy has a fast path for results whose dynamic tag
//! already matches the target and falls back to the engine's generic
//! coercion otherwise.
//!
//! | Family | Fast path | Fallback |
//! |--------|-----------|----------|
//! | bool/int/float/double/string | exact tag match | `to_native` |
//! | enum | int value | `to_native` (key lookup) |
//! | object pointer | wrapped object whose class is compatible | `to_native`, names both classes on failure |
//! | list | none | `to_native` |
//! | value type | wrapper of the same value type, copied | `to_native` |
//! | variant | wrap anything | n/a |
//! | script value | store verbatim | n/a |
//! | var slot | store in the dynamic slot | n/a |
//!
//! `undefined` is handled before dispatch: reset if the property is
//! resettable, else an empty variant, else an empty script value, else an
//! error. A var slot accepts `undefined` as a value.
//!
//! The adapter reports failures as [`WriteError`]; it has no notion of source
//! locations. The binding attaches that context.

use std::cell::Cell;
use std::fmt;

use propflow_core::coerce;
use propflow_core::{
    ClassId, Compatibility, ConversionError, DynValue, EnumId, NativeValue, ObjectGraph, ObjectId, PropertyDescriptor,
    PropertyError, ScriptEngine, TypeTag, ValueBox, ValueTypeId, Variant, WriteFlags,
};
use tracing::trace;

use crate::diagnostics::ErrorKind;

/// Primitive target families sharing the exact-tag fast path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    Bool,
    Int,
    Float,
    Double,
    String,
}

/// Write strategy for one target-type family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    Primitive(PrimitiveKind),
    Enum(EnumId),
    Object(ClassId),
    List(ClassId),
    ValueType(ValueTypeId),
    Variant,
    ScriptValue,
    VarSlot,
}

impl WriteStrategy {
    /// Strategy for a declared property type.
    #[must_use]
    pub fn for_type(ty: TypeTag) -> Self {
        match ty {
            TypeTag::Bool => Self::Primitive(PrimitiveKind::Bool),
            TypeTag::Int => Self::Primitive(PrimitiveKind::Int),
            TypeTag::Float => Self::Primitive(PrimitiveKind::Float),
            TypeTag::Double => Self::Primitive(PrimitiveKind::Double),
            TypeTag::String => Self::Primitive(PrimitiveKind::String),
            TypeTag::Enum(e) => Self::Enum(e),
            TypeTag::Object(c) => Self::Object(c),
            TypeTag::List(c) => Self::List(c),
            TypeTag::Value(v) => Self::ValueType(v),
            TypeTag::Variant => Self::Variant,
            TypeTag::ScriptValue => Self::ScriptValue,
            TypeTag::Var => Self::VarSlot,
        }
    }

    #[must_use]
    pub fn for_descriptor(desc: &PropertyDescriptor) -> Self {
        if desc.is_var() { Self::VarSlot } else { Self::for_type(desc.ty) }
    }

    /// Whether a function value may be stored.
    #[must_use]
    pub fn accepts_functions(self) -> bool {
        matches!(self, Self::Variant | Self::ScriptValue | Self::VarSlot)
    }
}

/// Why a write-back did not happen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteError {
    /// `undefined` for a type with no empty representation.
    UndefinedAssignment { type_name: String },
    /// Result not coercible to the declared type.
    TypeMismatch { from: String, to: String },
    /// Function value for a fixed-type property. `binding_helper` is set when
    /// the value came from `binding(...)`.
    FunctionAssignment { binding_helper: bool },
    /// The target died during the write. Never reported.
    TargetDestroyed,
    Property(PropertyError),
}

impl WriteError {
    /// Diagnostic category; `None` for the silent target-destroyed case.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::UndefinedAssignment { .. } => Some(ErrorKind::UndefinedAssignment),
            Self::TypeMismatch { .. } => Some(ErrorKind::TypeMismatch),
            Self::FunctionAssignment { .. } => Some(ErrorKind::FunctionAssignment),
            Self::TargetDestroyed => None,
            Self::Property(_) => Some(ErrorKind::Property),
        }
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UndefinedAssignment { type_name } => write!(f, "Unable to assign [undefined] to {type_name}"),
            Self::TypeMismatch { from, to } => write!(f, "Unable to assign {from} to {to}"),
            Self::FunctionAssignment { binding_helper: true } => {
                f.write_str("Invalid use of binding() in a binding declaration.")
            }
            Self::FunctionAssignment { binding_helper: false } => {
                f.write_str("Unable to assign a function to a property of any type other than var.")
            }
            Self::TargetDestroyed => f.write_str("target object was destroyed during write-back"),
            Self::Property(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<PropertyError> for WriteError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::Destroyed(_) => Self::TargetDestroyed,
            other => Self::Property(other),
        }
    }
}

impl From<ConversionError> for WriteError {
    fn from(err: ConversionError) -> Self {
        Self::TypeMismatch {
            from: err.from,
            to: err.to,
        }
    }
}

/// A write target with aliases already followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub object: ObjectId,
    pub index: u32,
    /// Field of a value-type property.
    pub sub_index: Option<u32>,
}

/// Coerces binding results and writes them through the reflected property.
#[derive(Debug, Default)]
pub struct PropertyWriteAdapter {
    strategy: Cell<Option<WriteStrategy>>,
}

impl PropertyWriteAdapter {
    /// Adapter with the strategy fixed by a known declared type.
    #[must_use]
    pub fn for_type(ty: TypeTag) -> Self {
        Self {
            strategy: Cell::new(Some(WriteStrategy::for_type(ty))),
        }
    }

    /// Adapter that picks its strategy on the first write.
    #[must_use]
    pub fn deferred() -> Self {
        Self::default()
    }

    /// Strategy chosen so far.
    #[must_use]
    pub fn strategy(&self) -> Option<WriteStrategy> {
        self.strategy.get()
    }

    fn strategy_for(&self, desc: &PropertyDescriptor) -> WriteStrategy {
        if let Some(strategy) = self.strategy.get() {
            return strategy;
        }
        let strategy = WriteStrategy::for_descriptor(desc);
        trace!(property = %desc.name, ?strategy, "write strategy selected");
        self.strategy.set(Some(strategy));
        strategy
    }

    /// Write `value` into `target`.
    pub fn write(
        &self,
        graph: &ObjectGraph,
        engine: &dyn ScriptEngine,
        target: ResolvedTarget,
        value: &ValueBox,
        flags: WriteFlags,
    ) -> Result<(), WriteError> {
        let desc = graph.descriptor(target.object, target.index)?;
        if let Some(field) = target.sub_index {
            return write_field(graph, engine, desc, target, field, value, flags);
        }
        let strategy = self.strategy_for(desc);

        let dynamic = match value {
            ValueBox::Native(native) if strategy == WriteStrategy::VarSlot => engine.from_native(native.value(), native.tag()),
            ValueBox::Native(native)
                if native.value().fits(desc.ty) && !matches!(strategy, WriteStrategy::Object(_) | WriteStrategy::List(_)) =>
            {
                return graph.write(target.object, target.index, native.value().clone(), flags).map_err(Into::into);
            }
            ValueBox::Native(native) => engine.from_native(native.value(), native.tag()),
            ValueBox::Dynamic(v) => v.clone(),
        };

        if dynamic.is_undefined() {
            return write_undefined(graph, desc, strategy, target, flags);
        }
        if let DynValue::Function(f) = &dynamic {
            if !strategy.accepts_functions() {
                return Err(WriteError::FunctionAssignment {
                    binding_helper: f.binding_helper,
                });
            }
        }

        let native = match strategy {
            WriteStrategy::VarSlot => {
                return graph.write_var(target.object, target.index, dynamic, flags).map_err(Into::into);
            }
            WriteStrategy::Primitive(kind) => match primitive_fast_path(kind, &dynamic) {
                Some(native) => native,
                None => engine.to_native(&dynamic, desc.ty, graph)?,
            },
            WriteStrategy::Enum(_) => match &dynamic {
                DynValue::Int(i) => NativeValue::Enum(*i),
                _ => engine.to_native(&dynamic, desc.ty, graph)?,
            },
            WriteStrategy::Object(declared) => match object_fast_path(graph, &dynamic, declared) {
                Some(native) => native,
                None => engine.to_native(&dynamic, desc.ty, graph)?,
            },
            WriteStrategy::ValueType(ty) => match &dynamic {
                DynValue::Value(v) if v.ty == ty => NativeValue::Value(v.clone()),
                _ => engine.to_native(&dynamic, desc.ty, graph)?,
            },
            WriteStrategy::List(_) => engine.to_native(&dynamic, desc.ty, graph)?,
            WriteStrategy::Variant => NativeValue::Variant(coerce::to_variant(&dynamic)),
            WriteStrategy::ScriptValue => NativeValue::Script(dynamic),
        };
        graph.write(target.object, target.index, native, flags).map_err(Into::into)
    }
}

fn primitive_fast_path(kind: PrimitiveKind, value: &DynValue) -> Option<NativeValue> {
    match (kind, value) {
        (PrimitiveKind::Bool, DynValue::Bool(b)) => Some(NativeValue::Bool(*b)),
        (PrimitiveKind::Int, DynValue::Int(i)) => Some(NativeValue::Int(*i)),
        (PrimitiveKind::Float, DynValue::Double(d)) => Some(NativeValue::Float(*d as f32)),
        (PrimitiveKind::Double, DynValue::Double(d)) => Some(NativeValue::Double(*d)),
        (PrimitiveKind::String, DynValue::String(s)) => Some(NativeValue::String(s.to_string())),
        _ => None,
    }
}

/// Null, or a wrapped object whose runtime class is assignable to `declared`.
/// Anything else (variants, unrelated classes, downcasts) takes the slow path.
fn object_fast_path(graph: &ObjectGraph, value: &DynValue, declared: ClassId) -> Option<NativeValue> {
    match value {
        DynValue::Null => Some(NativeValue::Object(None)),
        DynValue::Object(id) => {
            let class = graph.class_of(*id)?;
            match graph.registry().compatibility(class, declared) {
                Compatibility::Compatible => Some(NativeValue::Object(Some(*id))),
                Compatibility::RequiresCoercion | Compatibility::Incompatible => None,
            }
        }
        _ => None,
    }
}

fn write_undefined(
    graph: &ObjectGraph,
    desc: &PropertyDescriptor,
    strategy: WriteStrategy,
    target: ResolvedTarget,
    flags: WriteFlags,
) -> Result<(), WriteError> {
    if desc.resettable {
        return graph.reset(target.object, target.index, flags).map_err(Into::into);
    }
    let empty = match strategy {
        WriteStrategy::Variant => NativeValue::Variant(Variant::Empty),
        WriteStrategy::ScriptValue => NativeValue::Script(DynValue::Undefined),
        WriteStrategy::VarSlot => {
            return graph
                .write_var(target.object, target.index, DynValue::Undefined, flags)
                .map_err(Into::into);
        }
        _ => {
            return Err(WriteError::UndefinedAssignment {
                type_name: graph.registry().type_name(desc.ty),
            });
        }
    };
    graph.write(target.object, target.index, empty, flags).map_err(Into::into)
}

/// Update one field of a value-type property: read the whole value, patch
/// the field, write the whole value back.
fn write_field(
    graph: &ObjectGraph,
    engine: &dyn ScriptEngine,
    desc: &PropertyDescriptor,
    target: ResolvedTarget,
    field: u32,
    value: &ValueBox,
    flags: WriteFlags,
) -> Result<(), WriteError> {
    let field_type = TypeTag::Double;
    let dynamic = match value {
        ValueBox::Dynamic(v) => v.clone(),
        ValueBox::Native(native) => engine.from_native(native.value(), native.tag()),
    };
    if dynamic.is_undefined() {
        return Err(WriteError::UndefinedAssignment {
            type_name: graph.registry().type_name(field_type),
        });
    }
    if let DynValue::Function(f) = &dynamic {
        return Err(WriteError::FunctionAssignment {
            binding_helper: f.binding_helper,
        });
    }
    let number = match primitive_fast_path(PrimitiveKind::Double, &dynamic) {
        Some(NativeValue::Double(d)) => d,
        _ => match engine.to_native(&dynamic, field_type, graph)? {
            NativeValue::Double(d) => d,
            _ => {
                return Err(WriteError::TypeMismatch {
                    from: coerce::dyn_type_name(&dynamic, graph),
                    to: graph.registry().type_name(field_type),
                });
            }
        },
    };

    let NativeValue::Value(mut current) = graph.read_untracked(target.object, target.index)? else {
        return Err(WriteError::TypeMismatch {
            from: graph.registry().type_name(field_type),
            to: graph.registry().type_name(desc.ty),
        });
    };
    if !current.set_field(field, number) {
        return Err(WriteError::Property(PropertyError::UnknownField {
            property: desc.name.clone(),
            field,
        }));
    }
    graph
        .write(target.object, target.index, NativeValue::Value(current), flags)
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use propflow_core::{CompiledFunction, FunctionValue, Interpreter, SourceLocation, TypeRegistry, ValueTypeValue};
    use std::rc::Rc;

    struct Fixture {
        graph: ObjectGraph,
        obj: ObjectId,
        base: ClassId,
        derived: ClassId,
        other: ClassId,
    }

    fn fixture() -> Fixture {
        let mut reg = TypeRegistry::new();
        let align = reg.define_enum("Alignment", &[("Left", 1), ("Right", 2)]);
        let base = reg.define_class("Base", None).finish();
        let derived = reg.define_class("Derived", Some(base)).finish();
        let other = reg.define_class("Other", None).finish();
        let holder = reg
            .define_class("Holder", None)
            .property("flag", TypeTag::Bool)
            .property("count", TypeTag::Int)
            .property("ratio", TypeTag::Float)
            .property("width", TypeTag::Double)
            .property("label", TypeTag::String)
            .property("align", TypeTag::Enum(align))
            .property("item", TypeTag::Object(base))
            .property("items", TypeTag::List(base))
            .property("pos", TypeTag::Value(ValueTypeId::POINT))
            .property("any", TypeTag::Variant)
            .property("boxed", TypeTag::ScriptValue)
            .var("data")
            .resettable("height", TypeTag::Double, NativeValue::Double(100.0))
            .finish();
        let graph = ObjectGraph::new(reg);
        let obj = graph.create(holder);
        Fixture {
            graph,
            obj,
            base,
            derived,
            other,
        }
    }

    impl Fixture {
        fn write(&self, name: &str, value: DynValue) -> Result<(), WriteError> {
            self.write_box(name, &ValueBox::dynamic(value))
        }

        fn write_box(&self, name: &str, value: &ValueBox) -> Result<(), WriteError> {
            let index = self.graph.property_index(self.obj, name).unwrap();
            let desc = self.graph.descriptor(self.obj, index).unwrap();
            let adapter = PropertyWriteAdapter::for_type(desc.ty);
            let target = ResolvedTarget {
                object: self.obj,
                index,
                sub_index: None,
            };
            adapter.write(&self.graph, &Interpreter, target, value, WriteFlags::empty())
        }

        fn get(&self, name: &str) -> NativeValue {
            self.graph.get(self.obj, name).unwrap()
        }
    }

    fn function(binding_helper: bool) -> DynValue {
        DynValue::Function(FunctionValue {
            function: CompiledFunction::native("f", SourceLocation::default(), |_| Ok(DynValue::Null)),
            binding_helper,
        })
    }

    #[test]
    fn strategy_per_family() {
        assert_eq!(WriteStrategy::for_type(TypeTag::Int), WriteStrategy::Primitive(PrimitiveKind::Int));
        assert_eq!(WriteStrategy::for_type(TypeTag::Var), WriteStrategy::VarSlot);
        assert!(WriteStrategy::Variant.accepts_functions());
        assert!(!WriteStrategy::Primitive(PrimitiveKind::Bool).accepts_functions());
    }

    #[test]
    fn primitive_fast_paths_and_fallbacks() {
        let fx = fixture();
        fx.write("flag", DynValue::Bool(true)).unwrap();
        fx.write("count", DynValue::Double(7.9)).unwrap();
        fx.write("ratio", DynValue::Double(0.5)).unwrap();
        fx.write("width", DynValue::Int(3)).unwrap();
        fx.write("label", DynValue::Int(42)).unwrap();
        assert_eq!(fx.get("flag"), NativeValue::Bool(true));
        assert_eq!(fx.get("count"), NativeValue::Int(7));
        assert_eq!(fx.get("ratio"), NativeValue::Float(0.5));
        assert_eq!(fx.get("width"), NativeValue::Double(3.0));
        assert_eq!(fx.get("label"), NativeValue::String("42".into()));
    }

    #[test]
    fn enum_from_int_and_key() {
        let fx = fixture();
        fx.write("align", DynValue::Int(2)).unwrap();
        assert_eq!(fx.get("align"), NativeValue::Enum(2));
        fx.write("align", DynValue::string("Left")).unwrap();
        assert_eq!(fx.get("align"), NativeValue::Enum(1));
        assert!(matches!(
            fx.write("align", DynValue::string("Up")),
            Err(WriteError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn object_pointer_compatibility() {
        let fx = fixture();
        let derived = fx.graph.create(fx.derived);
        let other = fx.graph.create(fx.other);
        fx.write("item", DynValue::Object(derived)).unwrap();
        assert_eq!(fx.get("item"), NativeValue::Object(Some(derived)));

        let err = fx.write("item", DynValue::Object(other)).unwrap_err();
        assert_eq!(
            err,
            WriteError::TypeMismatch {
                from: "Other".into(),
                to: "Base*".into()
            }
        );
        assert_eq!(fx.get("item"), NativeValue::Object(Some(derived)));

        fx.write("item", DynValue::Null).unwrap();
        assert_eq!(fx.get("item"), NativeValue::Object(None));
    }

    #[test]
    fn object_wrapped_in_variant_takes_slow_path() {
        let fx = fixture();
        let base = fx.graph.create(fx.base);
        fx.write("item", DynValue::Variant(Rc::new(Variant::Object(base)))).unwrap();
        assert_eq!(fx.get("item"), NativeValue::Object(Some(base)));
    }

    #[test]
    fn list_from_array_and_single_object() {
        let fx = fixture();
        let a = fx.graph.create(fx.base);
        let b = fx.graph.create(fx.derived);
        fx.write("items", DynValue::array(vec![DynValue::Object(a), DynValue::Object(b)]))
            .unwrap();
        assert_eq!(fx.get("items"), NativeValue::List(vec![a, b]));
        fx.write("items", DynValue::Object(a)).unwrap();
        assert_eq!(fx.get("items"), NativeValue::List(vec![a]));
    }

    #[test]
    fn value_types_copy_or_fail() {
        let fx = fixture();
        let p = ValueTypeValue::point(1.5, -2.0);
        fx.write("pos", DynValue::Value(p.clone())).unwrap();
        assert_eq!(fx.get("pos"), NativeValue::Value(p));
        let err = fx
            .write("pos", DynValue::Value(ValueTypeValue::rect(0.0, 0.0, 1.0, 1.0)))
            .unwrap_err();
        assert!(matches!(err, WriteError::TypeMismatch { .. }));
    }

    #[test]
    fn undefined_per_family() {
        let fx = fixture();
        fx.graph.set(fx.obj, "height", NativeValue::Double(5.0)).unwrap();
        fx.write("height", DynValue::Undefined).unwrap();
        assert_eq!(fx.get("height"), NativeValue::Double(100.0));

        fx.write("any", DynValue::Int(1)).unwrap();
        fx.write("any", DynValue::Undefined).unwrap();
        assert_eq!(fx.get("any"), NativeValue::Variant(Variant::Empty));

        fx.write("boxed", DynValue::Int(1)).unwrap();
        fx.write("boxed", DynValue::Undefined).unwrap();
        assert_eq!(fx.get("boxed"), NativeValue::Script(DynValue::Undefined));

        fx.graph.set(fx.obj, "count", NativeValue::Int(5)).unwrap();
        let err = fx.write("count", DynValue::Undefined).unwrap_err();
        assert_eq!(err.to_string(), "Unable to assign [undefined] to int");
        assert_eq!(fx.get("count"), NativeValue::Int(5));
    }

    #[test]
    fn var_slot_stores_anything() {
        let fx = fixture();
        fx.write("data", function(false)).unwrap();
        assert!(matches!(fx.get("data"), NativeValue::Script(DynValue::Function(_))));
        fx.write("data", DynValue::Undefined).unwrap();
        assert_eq!(fx.get("data"), NativeValue::Script(DynValue::Undefined));
        fx.write_box("data", &ValueBox::native(TypeTag::Int, NativeValue::Int(3)))
            .unwrap();
        assert_eq!(fx.get("data"), NativeValue::Script(DynValue::Int(3)));
    }

    #[test]
    fn functions_rejected_for_fixed_types() {
        let fx = fixture();
        let err = fx.write("width", function(false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unable to assign a function to a property of any type other than var."
        );
        let err = fx.write("width", function(true)).unwrap_err();
        assert_eq!(err, WriteError::FunctionAssignment { binding_helper: true });
        fx.write("any", function(false)).unwrap();
    }

    #[test]
    fn native_boxes_write_directly() {
        let fx = fixture();
        fx.write_box("width", &ValueBox::native(TypeTag::Double, NativeValue::Double(8.0)))
            .unwrap();
        assert_eq!(fx.get("width"), NativeValue::Double(8.0));
        fx.write_box("count", &ValueBox::native(TypeTag::Double, NativeValue::Double(2.0)))
            .unwrap();
        assert_eq!(fx.get("count"), NativeValue::Int(2));
    }

    #[test]
    fn sub_field_write_patches_one_field() {
        let fx = fixture();
        fx.graph
            .set(fx.obj, "pos", NativeValue::Value(ValueTypeValue::point(1.0, 2.0)))
            .unwrap();
        let index = fx.graph.property_index(fx.obj, "pos").unwrap();
        let target = ResolvedTarget {
            object: fx.obj,
            index,
            sub_index: Some(1),
        };
        PropertyWriteAdapter::deferred()
            .write(&fx.graph, &Interpreter, target, &ValueBox::dynamic(DynValue::Int(9)), WriteFlags::empty())
            .unwrap();
        assert_eq!(fx.get("pos"), NativeValue::Value(ValueTypeValue::point(1.0, 9.0)));

        let bad = ResolvedTarget {
            sub_index: Some(5),
            ..target
        };
        assert!(matches!(
            PropertyWriteAdapter::deferred().write(
                &fx.graph,
                &Interpreter,
                bad,
                &ValueBox::dynamic(DynValue::Int(1)),
                WriteFlags::empty()
            ),
            Err(WriteError::Property(PropertyError::UnknownField { .. }))
        ));
    }

    #[test]
    fn deferred_adapter_picks_strategy_on_first_write() {
        let fx = fixture();
        let index = fx.graph.property_index(fx.obj, "data").unwrap();
        let adapter = PropertyWriteAdapter::deferred();
        assert_eq!(adapter.strategy(), None);
        let target = ResolvedTarget {
            object: fx.obj,
            index,
            sub_index: None,
        };
        adapter
            .write(&fx.graph, &Interpreter, target, &ValueBox::dynamic(DynValue::Int(1)), WriteFlags::empty())
            .unwrap();
        assert_eq!(adapter.strategy(), Some(WriteStrategy::VarSlot));
    }

    #[test]
    fn destroyed_target_is_reported_as_such() {
        let fx = fixture();
        let index = fx.graph.property_index(fx.obj, "width").unwrap();
        fx.graph.destroy(fx.obj);
        let err = PropertyWriteAdapter::for_type(TypeTag::Double)
            .write(
                &fx.graph,
                &Interpreter,
                ResolvedTarget {
                    object: fx.obj,
                    index,
                    sub_index: None,
                },
                &ValueBox::dynamic(DynValue::Double(1.0)),
                WriteFlags::empty(),
            )
            .unwrap_err();
        assert_eq!(err, WriteError::TargetDestroyed);
        assert_eq!(err.kind(), None);
    }
}
