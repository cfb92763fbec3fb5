#![forbid(unsafe_code)]

//! Dynamic VM values, native property values, and the [`ValueBox`] that
//! carries either one across the evaluation/write-back boundary.
//!
//! # Invariants
//!
//! 1. A [`ValueBox`] holds exactly one representation. Converting between
//!    the dynamic and native forms is explicit; the native → dynamic
//!    direction always succeeds, the reverse may fail.
//! 2. `DynValue::Undefined` is distinct from `DynValue::Null` and from every
//!    native default.

use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::id::{ObjectId, ValueTypeId};
use crate::meta::TypeTag;
use crate::script::CompiledFunction;

/// Instance of a registered value type: a fixed list of `f64` fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTypeValue {
    pub ty: ValueTypeId,
    pub fields: SmallVec<[f64; 4]>,
}

impl ValueTypeValue {
    #[must_use]
    pub fn new(ty: ValueTypeId, fields: &[f64]) -> Self {
        Self {
            ty,
            fields: SmallVec::from_slice(fields),
        }
    }

    #[must_use]
    pub fn zeroed(ty: ValueTypeId, count: usize) -> Self {
        Self {
            ty,
            fields: SmallVec::from_elem(0.0, count),
        }
    }

    #[must_use]
    pub fn point(x: f64, y: f64) -> Self {
        Self::new(ValueTypeId::POINT, &[x, y])
    }

    #[must_use]
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(ValueTypeId::RECT, &[x, y, width, height])
    }

    #[must_use]
    pub fn field(&self, index: u32) -> Option<f64> {
        self.fields.get(index as usize).copied()
    }

    /// Set a field; returns `false` when the index is out of range.
    pub fn set_field(&mut self, index: u32, value: f64) -> bool {
        match self.fields.get_mut(index as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

/// A function value as seen by the VM.
#[derive(Clone)]
pub struct FunctionValue {
    pub function: CompiledFunction,
    /// Produced by the `binding(...)` helper rather than a plain function.
    pub binding_helper: bool,
}

impl PartialEq for FunctionValue {
    fn eq(&self, other: &Self) -> bool {
        self.binding_helper == other.binding_helper && self.function.same_as(&other.function)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue")
            .field("name", &self.function.name())
            .field("binding_helper", &self.binding_helper)
            .finish()
    }
}

/// Generic native container that accepts any value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Variant {
    #[default]
    Empty,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(String),
    Object(ObjectId),
    Value(ValueTypeValue),
    List(Vec<Variant>),
    /// VM value with no native counterpart (functions).
    Script(DynValue),
}

impl Variant {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Value held by the scripting VM.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum DynValue {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    String(Rc<str>),
    /// Wrapper around a native object.
    Object(ObjectId),
    /// Wrapper around a native variant.
    Variant(Rc<Variant>),
    /// Wrapper around a value-type instance.
    Value(ValueTypeValue),
    Array(Rc<[DynValue]>),
    Function(FunctionValue),
}

impl DynValue {
    #[must_use]
    pub fn string(s: impl AsRef<str>) -> Self {
        Self::String(Rc::from(s.as_ref()))
    }

    #[must_use]
    pub fn array(items: Vec<DynValue>) -> Self {
        Self::Array(Rc::from(items))
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[must_use]
    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Self::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Numeric view of `Int` and `Double`.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Double(d) => Some(*d),
            _ => None,
        }
    }

    /// Script truthiness.
    #[must_use]
    pub fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Double(d) => *d != 0.0 && !d.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Variant(v) => !matches!(**v, Variant::Empty | Variant::Null),
            Self::Object(_) | Self::Value(_) | Self::Array(_) | Self::Function(_) => true,
        }
    }
}

/// Value stored in a native property slot.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
    String(String),
    Enum(i32),
    Object(Option<ObjectId>),
    List(Vec<ObjectId>),
    Value(ValueTypeValue),
    Variant(Variant),
    /// Boxed VM value (`ScriptValue` properties and var slots).
    Script(DynValue),
}

impl NativeValue {
    /// Whether this value has the storage shape required by `ty`.
    ///
    /// Class compatibility of object pointers is not checked here.
    #[must_use]
    pub fn fits(&self, ty: TypeTag) -> bool {
        match (self, ty) {
            (Self::Bool(_), TypeTag::Bool)
            | (Self::Int(_), TypeTag::Int)
            | (Self::Float(_), TypeTag::Float)
            | (Self::Double(_), TypeTag::Double)
            | (Self::String(_), TypeTag::String)
            | (Self::Enum(_), TypeTag::Enum(_))
            | (Self::Object(_), TypeTag::Object(_))
            | (Self::List(_), TypeTag::List(_))
            | (Self::Variant(_), TypeTag::Variant)
            | (Self::Script(_), TypeTag::ScriptValue | TypeTag::Var) => true,
            (Self::Value(v), TypeTag::Value(id)) => v.ty == id,
            _ => false,
        }
    }
}

#[derive(Clone)]
enum NativeStorage {
    Owned(NativeValue),
    Shared(Rc<NativeValue>),
}

/// Native payload of a [`ValueBox`]: a value plus its type tag.
#[derive(Clone)]
pub struct NativeBox {
    tag: TypeTag,
    storage: NativeStorage,
}

impl NativeBox {
    #[must_use]
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    #[must_use]
    pub fn value(&self) -> &NativeValue {
        match &self.storage {
            NativeStorage::Owned(v) => v,
            NativeStorage::Shared(v) => v,
        }
    }

    /// Whether the box owns its storage rather than sharing it.
    #[must_use]
    pub fn owns_memory(&self) -> bool {
        matches!(self.storage, NativeStorage::Owned(_))
    }

    #[must_use]
    pub fn into_value(self) -> NativeValue {
        match self.storage {
            NativeStorage::Owned(v) => v,
            NativeStorage::Shared(v) => Rc::try_unwrap(v).unwrap_or_else(|rc| (*rc).clone()),
        }
    }
}

impl fmt::Debug for NativeBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeBox")
            .field("tag", &self.tag)
            .field("value", self.value())
            .field("owns_memory", &self.owns_memory())
            .finish()
    }
}

/// Type-erased result container: a dynamic VM value or a tagged native value.
#[derive(Debug, Clone)]
pub enum ValueBox {
    Dynamic(DynValue),
    Native(NativeBox),
}

impl ValueBox {
    #[must_use]
    pub fn dynamic(value: DynValue) -> Self {
        Self::Dynamic(value)
    }

    #[must_use]
    pub fn native(tag: TypeTag, value: NativeValue) -> Self {
        Self::Native(NativeBox {
            tag,
            storage: NativeStorage::Owned(value),
        })
    }

    /// Native value whose storage is shared with the caller.
    #[must_use]
    pub fn shared(tag: TypeTag, value: Rc<NativeValue>) -> Self {
        Self::Native(NativeBox {
            tag,
            storage: NativeStorage::Shared(value),
        })
    }

    #[must_use]
    pub fn undefined() -> Self {
        Self::Dynamic(DynValue::Undefined)
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Dynamic(DynValue::Undefined))
    }

    #[must_use]
    pub fn as_dynamic(&self) -> Option<&DynValue> {
        match self {
            Self::Dynamic(v) => Some(v),
            Self::Native(_) => None,
        }
    }

    #[must_use]
    pub fn as_native(&self) -> Option<&NativeBox> {
        match self {
            Self::Native(n) => Some(n),
            Self::Dynamic(_) => None,
        }
    }

    /// Convert to the dynamic representation. Always succeeds.
    #[must_use]
    pub fn into_dynamic(self) -> DynValue {
        match self {
            Self::Dynamic(v) => v,
            Self::Native(n) => {
                let tag = n.tag;
                crate::coerce::from_native(&n.into_value(), tag)
            }
        }
    }

    /// Borrowing variant of [`into_dynamic`](Self::into_dynamic).
    #[must_use]
    pub fn to_dynamic(&self) -> DynValue {
        match self {
            Self::Dynamic(v) => v.clone(),
            Self::Native(n) => crate::coerce::from_native(n.value(), n.tag),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_box_single_representation() {
        let dynamic = ValueBox::dynamic(DynValue::Int(3));
        assert!(dynamic.as_native().is_none());
        assert_eq!(dynamic.as_dynamic(), Some(&DynValue::Int(3)));

        let native = ValueBox::native(TypeTag::Double, NativeValue::Double(2.5));
        assert!(native.as_dynamic().is_none());
        assert!(native.as_native().unwrap().owns_memory());
        assert_eq!(native.into_dynamic(), DynValue::Double(2.5));
    }

    #[test]
    fn shared_native_does_not_own() {
        let shared = Rc::new(NativeValue::Int(4));
        let boxed = ValueBox::shared(TypeTag::Int, Rc::clone(&shared));
        let native = boxed.as_native().unwrap();
        assert!(!native.owns_memory());
        assert_eq!(native.value(), &NativeValue::Int(4));
        assert_eq!(boxed.to_dynamic(), DynValue::Int(4));
    }

    #[test]
    fn undefined_is_not_null() {
        assert!(ValueBox::undefined().is_undefined());
        assert!(!ValueBox::dynamic(DynValue::Null).is_undefined());
        assert!(DynValue::Null.is_nullish());
    }

    #[test]
    fn truthiness() {
        assert!(!DynValue::Double(f64::NAN).truthy());
        assert!(!DynValue::string("").truthy());
        assert!(DynValue::string("x").truthy());
        assert!(!DynValue::Variant(Rc::new(Variant::Empty)).truthy());
    }

    #[test]
    fn value_type_fields() {
        let mut p = ValueTypeValue::point(1.0, 2.0);
        assert!(p.set_field(1, 5.0));
        assert!(!p.set_field(2, 5.0));
        assert_eq!(p.field(1), Some(5.0));
    }

    #[test]
    fn fits_checks_shape() {
        assert!(NativeValue::Int(1).fits(TypeTag::Int));
        assert!(!NativeValue::Int(1).fits(TypeTag::Double));
        assert!(NativeValue::Value(ValueTypeValue::point(0.0, 0.0)).fits(TypeTag::Value(ValueTypeId::POINT)));
        assert!(!NativeValue::Value(ValueTypeValue::point(0.0, 0.0)).fits(TypeTag::Value(ValueTypeId::SIZE)));
    }
}
