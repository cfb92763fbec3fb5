#![forbid(unsafe_code)]

//! Reflected type metadata: type tags, classes, property descriptors.
//!
//! The [`TypeRegistry`] is built up front and then frozen inside an
//! [`ObjectGraph`](crate::graph::ObjectGraph). Property indices are global
//! across a class hierarchy: a subclass appends its own properties after the
//! ones it inherits, so an index valid on `Base` is valid on every `Derived`.
//!
//! # Invariants
//!
//! 1. `ClassInfo::properties[i].index == i` for every class.
//! 2. A class's parent is always registered before the class itself, so
//!    inheritance chains are acyclic.
//! 3. Value type ids `0..4` are the built-ins (`point`, `size`, `rect`,
//!    `vector3d`).

use std::fmt;

use crate::id::{ClassId, EnumId, ValueTypeId};
use crate::value::NativeValue;

/// Static type of a reflected property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int,
    Float,
    Double,
    String,
    Enum(EnumId),
    /// Pointer to an object of the given class (or a subclass), nullable.
    Object(ClassId),
    /// List of object pointers.
    List(ClassId),
    /// Copyable struct such as `point` or `rect`.
    Value(ValueTypeId),
    /// Generic container accepting any value.
    Variant,
    /// A boxed VM value stored verbatim.
    ScriptValue,
    /// Open dynamic slot owned by the object.
    Var,
}

/// How a property's storage is laid out on the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// Fixed native slot written through the descriptor.
    Native,
    /// Dynamic VM-value slot.
    Var,
    /// Forwards to another object's property; configured per object.
    Alias,
}

/// Result of comparing a runtime class against a declared class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// The dynamic class is the declared class or derives from it.
    Compatible,
    /// The declared class derives from the dynamic class; only a checked
    /// downcast could succeed.
    RequiresCoercion,
    /// The classes are unrelated.
    Incompatible,
}

/// Reflected property metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    pub index: u32,
    pub ty: TypeTag,
    pub storage: StorageKind,
    pub resettable: bool,
    /// Value written on object creation and by `reset`.
    pub default: NativeValue,
    /// Change-notification channel index.
    pub notify_signal: u32,
}

impl PropertyDescriptor {
    /// Whether the property lives in a dynamic var slot.
    #[must_use]
    pub fn is_var(&self) -> bool {
        self.storage == StorageKind::Var
    }

    /// Whether the property forwards to another property.
    #[must_use]
    pub fn is_alias(&self) -> bool {
        self.storage == StorageKind::Alias
    }
}

/// A registered object class.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    pub parent: Option<ClassId>,
    pub properties: Vec<PropertyDescriptor>,
}

impl ClassInfo {
    /// Look up a property by name, including inherited ones.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyDescriptor> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// A registered enumeration.
#[derive(Debug, Clone)]
pub struct EnumInfo {
    pub name: String,
    pub keys: Vec<(String, i32)>,
}

impl EnumInfo {
    /// Value for a key name.
    #[must_use]
    pub fn value_of(&self, key: &str) -> Option<i32> {
        self.keys.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }
}

/// A registered value type: named `f64` fields.
#[derive(Debug, Clone)]
pub struct ValueTypeInfo {
    pub name: String,
    pub fields: Vec<String>,
}

impl ValueTypeInfo {
    /// Index of a named field.
    #[must_use]
    pub fn field_index(&self, name: &str) -> Option<u32> {
        self.fields.iter().position(|f| f == name).map(|i| i as u32)
    }
}

/// Registry of classes, enums and value types.
#[derive(Debug, Clone)]
pub struct TypeRegistry {
    classes: Vec<ClassInfo>,
    enums: Vec<EnumInfo>,
    value_types: Vec<ValueTypeInfo>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry holding only the built-in value types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            classes: Vec::new(),
            enums: Vec::new(),
            value_types: Vec::new(),
        };
        registry.define_value_type("point", &["x", "y"]);
        registry.define_value_type("size", &["width", "height"]);
        registry.define_value_type("rect", &["x", "y", "width", "height"]);
        registry.define_value_type("vector3d", &["x", "y", "z"]);
        registry
    }

    /// Start defining a class. Call [`ClassBuilder::finish`] to register it.
    pub fn define_class(&mut self, name: impl Into<String>, parent: Option<ClassId>) -> ClassBuilder<'_> {
        let properties = parent
            .and_then(|p| self.classes.get(p.0 as usize))
            .map(|info| info.properties.clone())
            .unwrap_or_default();
        ClassBuilder {
            registry: self,
            info: ClassInfo {
                name: name.into(),
                parent,
                properties,
            },
        }
    }

    /// Register an enumeration.
    pub fn define_enum(&mut self, name: impl Into<String>, keys: &[(&str, i32)]) -> EnumId {
        let id = EnumId(self.enums.len() as u32);
        self.enums.push(EnumInfo {
            name: name.into(),
            keys: keys.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
        });
        id
    }

    /// Register a value type with the given field names.
    pub fn define_value_type(&mut self, name: impl Into<String>, fields: &[&str]) -> ValueTypeId {
        let id = ValueTypeId(self.value_types.len() as u32);
        self.value_types.push(ValueTypeInfo {
            name: name.into(),
            fields: fields.iter().map(|f| (*f).to_string()).collect(),
        });
        id
    }

    #[must_use]
    pub fn class(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.0 as usize)
    }

    #[must_use]
    pub fn class_by_name(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|c| c.name == name)
            .map(|i| ClassId(i as u32))
    }

    #[must_use]
    pub fn enum_info(&self, id: EnumId) -> Option<&EnumInfo> {
        self.enums.get(id.0 as usize)
    }

    #[must_use]
    pub fn value_type(&self, id: ValueTypeId) -> Option<&ValueTypeInfo> {
        self.value_types.get(id.0 as usize)
    }

    /// Whether `class` is `ancestor` or derives from it.
    #[must_use]
    pub fn inherits(&self, class: ClassId, ancestor: ClassId) -> bool {
        let mut current = Some(class);
        while let Some(c) = current {
            if c == ancestor {
                return true;
            }
            current = self.class(c).and_then(|info| info.parent);
        }
        false
    }

    /// Compare a runtime class with a declared class.
    #[must_use]
    pub fn compatibility(&self, dynamic: ClassId, declared: ClassId) -> Compatibility {
        if self.inherits(dynamic, declared) {
            Compatibility::Compatible
        } else if self.inherits(declared, dynamic) {
            Compatibility::RequiresCoercion
        } else {
            Compatibility::Incompatible
        }
    }

    /// Human-readable type name used in diagnostics.
    #[must_use]
    pub fn type_name(&self, ty: TypeTag) -> String {
        match ty {
            TypeTag::Bool => "bool".into(),
            TypeTag::Int => "int".into(),
            TypeTag::Float => "float".into(),
            TypeTag::Double => "double".into(),
            TypeTag::String => "string".into(),
            TypeTag::Enum(e) => self
                .enum_info(e)
                .map_or_else(|| "enum".into(), |info| info.name.clone()),
            TypeTag::Object(c) => format!("{}*", self.class_name(c)),
            TypeTag::List(c) => format!("list<{}>", self.class_name(c)),
            TypeTag::Value(v) => self
                .value_type(v)
                .map_or_else(|| "value".into(), |info| info.name.clone()),
            TypeTag::Variant => "variant".into(),
            TypeTag::ScriptValue => "ScriptValue".into(),
            TypeTag::Var => "var".into(),
        }
    }

    /// Class name, or `"<unknown>"` for an unregistered id.
    #[must_use]
    pub fn class_name(&self, id: ClassId) -> String {
        self.class(id)
            .map_or_else(|| "<unknown>".into(), |info| info.name.clone())
    }

    /// Default value for a type, used for fresh objects and resets.
    #[must_use]
    pub fn default_value(&self, ty: TypeTag) -> NativeValue {
        match ty {
            TypeTag::Bool => NativeValue::Bool(false),
            TypeTag::Int => NativeValue::Int(0),
            TypeTag::Float => NativeValue::Float(0.0),
            TypeTag::Double => NativeValue::Double(0.0),
            TypeTag::String => NativeValue::String(String::new()),
            TypeTag::Enum(e) => NativeValue::Enum(
                self.enum_info(e)
                    .and_then(|info| info.keys.first())
                    .map_or(0, |(_, v)| *v),
            ),
            TypeTag::Object(_) => NativeValue::Object(None),
            TypeTag::List(_) => NativeValue::List(Vec::new()),
            TypeTag::Value(v) => {
                let fields = self.value_type(v).map_or(0, |info| info.fields.len());
                NativeValue::Value(crate::value::ValueTypeValue::zeroed(v, fields))
            }
            TypeTag::Variant => NativeValue::Variant(crate::value::Variant::Empty),
            TypeTag::ScriptValue | TypeTag::Var => {
                NativeValue::Script(crate::value::DynValue::Undefined)
            }
        }
    }
}

/// Builder returned by [`TypeRegistry::define_class`].
pub struct ClassBuilder<'r> {
    registry: &'r mut TypeRegistry,
    info: ClassInfo,
}

impl fmt::Debug for ClassBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBuilder")
            .field("name", &self.info.name)
            .field("properties", &self.info.properties.len())
            .finish()
    }
}

impl ClassBuilder<'_> {
    fn push(mut self, name: &str, ty: TypeTag, storage: StorageKind, resettable: bool, default: Option<NativeValue>) -> Self {
        let index = self.info.properties.len() as u32;
        let default = default.unwrap_or_else(|| self.registry.default_value(ty));
        self.info.properties.push(PropertyDescriptor {
            name: name.to_string(),
            index,
            ty,
            storage,
            resettable,
            default,
            notify_signal: index,
        });
        self
    }

    /// Plain native property.
    #[must_use]
    pub fn property(self, name: &str, ty: TypeTag) -> Self {
        self.push(name, ty, StorageKind::Native, false, None)
    }

    /// Native property with a reset operation restoring `default`.
    #[must_use]
    pub fn resettable(self, name: &str, ty: TypeTag, default: NativeValue) -> Self {
        self.push(name, ty, StorageKind::Native, true, Some(default))
    }

    /// Dynamically typed var slot.
    #[must_use]
    pub fn var(self, name: &str) -> Self {
        self.push(name, TypeTag::Var, StorageKind::Var, false, None)
    }

    /// Alias property; the target is configured per object.
    #[must_use]
    pub fn alias(self, name: &str, ty: TypeTag) -> Self {
        self.push(name, ty, StorageKind::Alias, false, None)
    }

    /// Register the class.
    pub fn finish(self) -> ClassId {
        let id = ClassId(self.registry.classes.len() as u32);
        tracing::trace!(class = %self.info.name, properties = self.info.properties.len(), "class registered");
        self.registry.classes.push(self.info);
        id
    }
}
