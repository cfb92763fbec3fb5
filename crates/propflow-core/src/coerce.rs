#![forbid(unsafe_code)]

//! Generic conversion between VM values and native property values.
//!
//! This is the slow, type-erased path. The write adapter's per-family fast
//! paths fall back to [`to_native`] whenever the value's dynamic tag does not
//! match the target exactly.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unrelated class | object of class `Other` into `Base*` | `ConversionError` naming both |
//! | Unparsable string | `"abc"` into `int` | `ConversionError` |
//! | Foreign value type | `point` into `rect` | `ConversionError` |
//! | Undefined | `undefined` into any native type | `ConversionError` |

use std::fmt;

use crate::id::{ClassId, ObjectId};
use crate::meta::{TypeRegistry, TypeTag};
use crate::value::{DynValue, NativeValue, Variant};

/// Access to class metadata needed by coercion.
pub trait TypeContext {
    fn registry(&self) -> &TypeRegistry;
    /// Runtime class of a live object, `None` once it is destroyed.
    fn class_of(&self, object: ObjectId) -> Option<ClassId>;
}

impl TypeContext for TypeRegistry {
    fn registry(&self) -> &TypeRegistry {
        self
    }

    fn class_of(&self, _object: ObjectId) -> Option<ClassId> {
        None
    }
}

/// A value could not be converted to the requested type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionError {
    /// Runtime type name of the source value.
    pub from: String,
    /// Declared type name of the target.
    pub to: String,
}

impl fmt::Display for ConversionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unable to assign {} to {}", self.from, self.to)
    }
}

impl std::error::Error for ConversionError {}

/// Runtime type name of a VM value, as used in diagnostics.
#[must_use]
pub fn dyn_type_name(value: &DynValue, cx: &dyn TypeContext) -> String {
    match value {
        DynValue::Undefined => "[undefined]".into(),
        DynValue::Null => "null".into(),
        DynValue::Bool(_) => "bool".into(),
        DynValue::Int(_) => "int".into(),
        DynValue::Double(_) => "double".into(),
        DynValue::String(_) => "string".into(),
        DynValue::Object(id) => cx
            .class_of(*id)
            .map_or_else(|| "null".into(), |c| cx.registry().class_name(c)),
        DynValue::Variant(v) => match &**v {
            Variant::Object(id) => dyn_type_name(&DynValue::Object(*id), cx),
            _ => "variant".into(),
        },
        DynValue::Value(v) => cx
            .registry()
            .value_type(v.ty)
            .map_or_else(|| "value".into(), |info| info.name.clone()),
        DynValue::Array(_) => "array".into(),
        DynValue::Function(_) => "function".into(),
    }
}

/// Script `ToInt32`.
#[must_use]
pub fn to_int32(d: f64) -> i32 {
    if !d.is_finite() {
        return 0;
    }
    let modulo = d.trunc().rem_euclid(4_294_967_296.0);
    if modulo >= 2_147_483_648.0 {
        (modulo - 4_294_967_296.0) as i32
    } else {
        modulo as i32
    }
}

/// Script number-to-string formatting.
#[must_use]
pub fn number_to_string(d: f64) -> String {
    if d.is_nan() {
        "NaN".into()
    } else if d.is_infinite() {
        if d > 0.0 { "Infinity".into() } else { "-Infinity".into() }
    } else if d.fract() == 0.0 && d.abs() < 1e21 {
        format!("{}", d as i64)
    } else {
        format!("{d}")
    }
}

fn parse_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok()
}

fn unwrap_variant(value: &DynValue) -> Option<DynValue> {
    match value {
        DynValue::Variant(v) => Some(variant_to_dyn(v)),
        _ => None,
    }
}

fn object_into(id: ObjectId, declared: ClassId, cx: &dyn TypeContext) -> Option<Option<ObjectId>> {
    match cx.class_of(id) {
        // Destroyed objects read back as null.
        None => Some(None),
        Some(class) if cx.registry().inherits(class, declared) => Some(Some(id)),
        Some(_) => None,
    }
}

/// Convert a VM value to a native value of type `expected`.
pub fn to_native(value: &DynValue, expected: TypeTag, cx: &dyn TypeContext) -> Result<NativeValue, ConversionError> {
    let fail = || ConversionError {
        from: dyn_type_name(value, cx),
        to: cx.registry().type_name(expected),
    };

    if let Some(inner) = unwrap_variant(value) {
        if !matches!(expected, TypeTag::Variant | TypeTag::ScriptValue | TypeTag::Var) {
            return to_native(&inner, expected, cx).map_err(|_| fail());
        }
    }

    match expected {
        TypeTag::Bool => match value {
            DynValue::Undefined | DynValue::Function(_) => Err(fail()),
            other => Ok(NativeValue::Bool(other.truthy())),
        },
        TypeTag::Int => match value {
            DynValue::Int(i) => Ok(NativeValue::Int(*i)),
            DynValue::Double(d) => Ok(NativeValue::Int(to_int32(*d))),
            DynValue::Bool(b) => Ok(NativeValue::Int(i32::from(*b))),
            DynValue::String(s) => parse_number(s).map(|d| NativeValue::Int(to_int32(d))).ok_or_else(fail),
            _ => Err(fail()),
        },
        TypeTag::Float | TypeTag::Double => {
            let number = match value {
                DynValue::Int(i) => Some(f64::from(*i)),
                DynValue::Double(d) => Some(*d),
                DynValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
                DynValue::String(s) => parse_number(s),
                _ => None,
            }
            .ok_or_else(fail)?;
            Ok(if expected == TypeTag::Float {
                NativeValue::Float(number as f32)
            } else {
                NativeValue::Double(number)
            })
        }
        TypeTag::String => match value {
            DynValue::String(s) => Ok(NativeValue::String(s.to_string())),
            DynValue::Int(i) => Ok(NativeValue::String(i.to_string())),
            DynValue::Double(d) => Ok(NativeValue::String(number_to_string(*d))),
            DynValue::Bool(b) => Ok(NativeValue::String(b.to_string())),
            _ => Err(fail()),
        },
        TypeTag::Enum(e) => match value {
            DynValue::Int(i) => Ok(NativeValue::Enum(*i)),
            DynValue::Double(d) if d.fract() == 0.0 => Ok(NativeValue::Enum(to_int32(*d))),
            DynValue::String(s) => cx
                .registry()
                .enum_info(e)
                .and_then(|info| info.value_of(s))
                .map(NativeValue::Enum)
                .ok_or_else(fail),
            _ => Err(fail()),
        },
        TypeTag::Object(class) => match value {
            DynValue::Null => Ok(NativeValue::Object(None)),
            DynValue::Object(id) => object_into(*id, class, cx).map(NativeValue::Object).ok_or_else(fail),
            _ => Err(fail()),
        },
        TypeTag::List(class) => match value {
            DynValue::Null => Ok(NativeValue::List(Vec::new())),
            DynValue::Object(id) => match object_into(*id, class, cx) {
                Some(Some(id)) => Ok(NativeValue::List(vec![id])),
                Some(None) => Ok(NativeValue::List(Vec::new())),
                None => Err(fail()),
            },
            DynValue::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    match item {
                        DynValue::Null => {}
                        DynValue::Object(id) => match object_into(*id, class, cx) {
                            Some(Some(id)) => out.push(id),
                            Some(None) => {}
                            None => return Err(fail()),
                        },
                        _ => return Err(fail()),
                    }
                }
                Ok(NativeValue::List(out))
            }
            _ => Err(fail()),
        },
        TypeTag::Value(ty) => match value {
            DynValue::Value(v) if v.ty == ty => Ok(NativeValue::Value(v.clone())),
            _ => Err(fail()),
        },
        TypeTag::Variant => Ok(NativeValue::Variant(to_variant(value))),
        TypeTag::ScriptValue | TypeTag::Var => Ok(NativeValue::Script(value.clone())),
    }
}

/// Wrap any VM value into a [`Variant`]. Never fails.
#[must_use]
pub fn to_variant(value: &DynValue) -> Variant {
    match value {
        DynValue::Undefined => Variant::Empty,
        DynValue::Null => Variant::Null,
        DynValue::Bool(b) => Variant::Bool(*b),
        DynValue::Int(i) => Variant::Int(*i),
        DynValue::Double(d) => Variant::Double(*d),
        DynValue::String(s) => Variant::String(s.to_string()),
        DynValue::Object(id) => Variant::Object(*id),
        DynValue::Variant(v) => (**v).clone(),
        DynValue::Value(v) => Variant::Value(v.clone()),
        DynValue::Array(items) => Variant::List(items.iter().map(to_variant).collect()),
        DynValue::Function(_) => Variant::Script(value.clone()),
    }
}

/// Unwrap a [`Variant`] into the VM value it holds.
#[must_use]
pub fn variant_to_dyn(variant: &Variant) -> DynValue {
    match variant {
        Variant::Empty => DynValue::Undefined,
        Variant::Null => DynValue::Null,
        Variant::Bool(b) => DynValue::Bool(*b),
        Variant::Int(i) => DynValue::Int(*i),
        Variant::Double(d) => DynValue::Double(*d),
        Variant::String(s) => DynValue::string(s),
        Variant::Object(id) => DynValue::Object(*id),
        Variant::Value(v) => DynValue::Value(v.clone()),
        Variant::List(items) => DynValue::array(items.iter().map(variant_to_dyn).collect()),
        Variant::Script(v) => v.clone(),
    }
}

/// Convert a native value to its VM representation. Never fails.
#[must_use]
pub fn from_native(value: &NativeValue, _tag: TypeTag) -> DynValue {
    match value {
        NativeValue::Bool(b) => DynValue::Bool(*b),
        NativeValue::Int(i) | NativeValue::Enum(i) => DynValue::Int(*i),
        NativeValue::Float(f) => DynValue::Double(f64::from(*f)),
        NativeValue::Double(d) => DynValue::Double(*d),
        NativeValue::String(s) => DynValue::string(s),
        NativeValue::Object(None) => DynValue::Null,
        NativeValue::Object(Some(id)) => DynValue::Object(*id),
        NativeValue::List(ids) => DynValue::array(ids.iter().copied().map(DynValue::Object).collect()),
        NativeValue::Value(v) => DynValue::Value(v.clone()),
        NativeValue::Variant(v) => variant_to_dyn(v),
        NativeValue::Script(v) => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ValueTypeId;
    use crate::value::ValueTypeValue;
    use std::rc::Rc;

    #[test]
    fn int_from_numbers_and_strings() {
        let reg = TypeRegistry::new();
        assert_eq!(to_native(&DynValue::Double(3.9), TypeTag::Int, &reg), Ok(NativeValue::Int(3)));
        assert_eq!(to_native(&DynValue::string(" 42 "), TypeTag::Int, &reg), Ok(NativeValue::Int(42)));
        let err = to_native(&DynValue::string("abc"), TypeTag::Int, &reg).unwrap_err();
        assert_eq!(err.to_string(), "Unable to assign string to int");
    }

    #[test]
    fn to_int32_wraps() {
        assert_eq!(to_int32(4_294_967_297.0), 1);
        assert_eq!(to_int32(-1.5), -1);
        assert_eq!(to_int32(f64::NAN), 0);
        assert_eq!(to_int32(2_147_483_648.0), i32::MIN);
    }

    #[test]
    fn number_formatting() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(0.5), "0.5");
        assert_eq!(number_to_string(f64::INFINITY), "Infinity");
    }

    #[test]
    fn undefined_never_converts_to_fixed_types() {
        let reg = TypeRegistry::new();
        for ty in [TypeTag::Bool, TypeTag::Int, TypeTag::Double, TypeTag::String] {
            assert!(to_native(&DynValue::Undefined, ty, &reg).is_err());
        }
        assert_eq!(
            to_native(&DynValue::Undefined, TypeTag::Variant, &reg),
            Ok(NativeValue::Variant(Variant::Empty))
        );
    }

    #[test]
    fn enum_from_key() {
        let mut reg = TypeRegistry::new();
        let e = reg.define_enum("Align", &[("Left", 1), ("Right", 2)]);
        assert_eq!(to_native(&DynValue::string("Right"), TypeTag::Enum(e), &reg), Ok(NativeValue::Enum(2)));
        assert!(to_native(&DynValue::string("Up"), TypeTag::Enum(e), &reg).is_err());
    }

    #[test]
    fn value_type_must_match_exactly() {
        let reg = TypeRegistry::new();
        let p = DynValue::Value(ValueTypeValue::point(1.0, 2.0));
        assert!(to_native(&p, TypeTag::Value(ValueTypeId::POINT), &reg).is_ok());
        let err = to_native(&p, TypeTag::Value(ValueTypeId::RECT), &reg).unwrap_err();
        assert_eq!(err.to_string(), "Unable to assign point to rect");
    }

    #[test]
    fn variant_roundtrip_through_dyn() {
        let v = DynValue::array(vec![DynValue::Int(1), DynValue::string("a")]);
        let variant = to_variant(&v);
        assert_eq!(variant_to_dyn(&variant), v);
    }

    #[test]
    fn wrapped_variant_unwraps_for_fixed_types() {
        let reg = TypeRegistry::new();
        let wrapped = DynValue::Variant(Rc::new(Variant::Int(7)));
        assert_eq!(to_native(&wrapped, TypeTag::Double, &reg), Ok(NativeValue::Double(7.0)));
    }

    proptest::proptest! {
        #[test]
        fn to_int32_is_identity_on_i32(i in proptest::prelude::any::<i32>()) {
            proptest::prop_assert_eq!(to_int32(f64::from(i)), i);
        }

        #[test]
        fn to_int32_has_period_two_pow_32(i in -1_000_000_000i64..1_000_000_000, frac in 0.0f64..1.0) {
            let d = i as f64 + frac.copysign(i as f64);
            proptest::prop_assert_eq!(to_int32(d), to_int32(d + 4_294_967_296.0 * d.signum()));
        }

        #[test]
        fn integral_numbers_format_without_fraction(i in proptest::prelude::any::<i32>()) {
            proptest::prop_assert_eq!(number_to_string(f64::from(i)), i.to_string());
        }
    }
}
