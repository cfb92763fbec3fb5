#![forbid(unsafe_code)]

//! Reflected object graph: the host property system bindings write into.
//!
//! # Design
//!
//! Objects live in a slot vector with per-slot generations (see
//! [`ObjectId`]). Each object holds one storage cell per property of its
//! class: a native value, a dynamic var slot, or an alias pointer. Reads go
//! through [`ObjectGraph::read`], which registers a dependency edge with the
//! active collector. Writes go through [`ObjectGraph::write`], which runs any
//! installed interceptor, stores the value, and emits the property's notify
//! signal.
//!
//! # Invariants
//!
//! 1. No `RefCell` borrow of graph state is held while foreign code runs
//!    (interceptors, signal subscribers, binding retirement). Any of them may
//!    re-enter the graph, including destroying the object being written.
//! 2. A destroyed object's id never becomes live again: destruction bumps the
//!    slot generation before the slot is reused.
//! 3. At most one binding is attached per (object, property, sub-index).
//!    Attaching a new one retires the previous one.
//!
//! # Failure Modes
//!
//! - **Interceptor destroys the object**: the write is abandoned and reported
//!   as [`PropertyError::Destroyed`].
//! - **Alias cycle**: resolution stops after `max_depth` hops with
//!   [`PropertyError::AliasCycle`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::{Rc, Weak};

use bitflags::bitflags;
use tracing::trace;

use crate::capture::{self, DependencySource};
use crate::coerce::{self, TypeContext};
use crate::id::{ClassId, ObjectId};
use crate::meta::{PropertyDescriptor, StorageKind, TypeRegistry, TypeTag};
use crate::notify::{Signal, Subscription};
use crate::value::{DynValue, NativeValue};

/// Default bound on alias-chain length.
pub const DEFAULT_MAX_ALIAS_DEPTH: usize = 16;

bitflags! {
    /// Options for [`ObjectGraph::write`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WriteFlags: u8 {
        /// Skip any interceptor installed on the property.
        const BYPASS_INTERCEPTORS = 1 << 0;
        /// Keep an attached binding in place (bindings writing their own target).
        const DONT_REMOVE_BINDING = 1 << 1;
        /// Store the value without emitting the notify signal.
        const SUPPRESS_NOTIFY = 1 << 2;
    }
}

/// Errors from reflected property access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyError {
    /// The object was destroyed (or the id was never valid).
    Destroyed(ObjectId),
    /// No property with this index or name on the object's class.
    UnknownProperty { class: String, property: String },
    /// Alias property with no target configured, or a dead target.
    UnresolvedAlias { property: String },
    /// Alias chain longer than the configured bound.
    AliasCycle { property: String },
    /// Value shape does not match the property's declared type.
    TypeMismatch { property: String, expected: String },
    /// `reset` on a property without a reset operation.
    NotResettable { property: String },
    /// Value-type field index out of range.
    UnknownField { property: String, field: u32 },
}

impl fmt::Display for PropertyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Destroyed(id) => write!(f, "object {id} has been destroyed"),
            Self::UnknownProperty { class, property } => {
                write!(f, "{class} has no property '{property}'")
            }
            Self::UnresolvedAlias { property } => write!(f, "alias '{property}' is unresolved"),
            Self::AliasCycle { property } => write!(f, "alias '{property}' forms a cycle"),
            Self::TypeMismatch { property, expected } => {
                write!(f, "property '{property}' expects a value of type {expected}")
            }
            Self::NotResettable { property } => write!(f, "property '{property}' cannot be reset"),
            Self::UnknownField { property, field } => {
                write!(f, "property '{property}' has no field {field}")
            }
        }
    }
}

impl std::error::Error for PropertyError {}

/// A binding attached to a property as its active writer.
pub trait AttachedBinding {
    /// Called once when the binding stops being the active writer: it was
    /// replaced, its property was assigned a literal, or the object died.
    fn retire(&self);
}

/// Value interceptor: sees (and may rewrite) every non-bypassed write.
pub type Interceptor = Rc<dyn Fn(&ObjectGraph, ObjectId, &mut NativeValue)>;

/// Key of an attached binding: property index plus optional value-type field.
pub type BindingSlot = (u32, Option<u32>);

enum PropertyCell {
    Native(NativeValue),
    Var(DynValue),
    Alias(Option<(ObjectId, u32)>),
}

struct ObjectData {
    class: ClassId,
    name: Option<String>,
    cells: Vec<PropertyCell>,
    interceptors: HashMap<u32, Interceptor>,
    bindings: HashMap<BindingSlot, Rc<dyn AttachedBinding>>,
}

struct Slot {
    generation: u32,
    object: Option<ObjectData>,
}

struct GraphInner {
    registry: TypeRegistry,
    slots: RefCell<Vec<Slot>>,
    free: RefCell<Vec<u32>>,
    signals: RefCell<HashMap<(ObjectId, u32), Rc<Signal>>>,
}

/// Shared handle to an object graph. Clones share the same graph.
#[derive(Clone)]
pub struct ObjectGraph {
    inner: Rc<GraphInner>,
}

/// Non-owning handle to an [`ObjectGraph`].
#[derive(Clone)]
pub struct WeakObjectGraph {
    inner: Weak<GraphInner>,
}

impl WeakObjectGraph {
    #[must_use]
    pub fn upgrade(&self) -> Option<ObjectGraph> {
        self.inner.upgrade().map(|inner| ObjectGraph { inner })
    }
}

impl fmt::Debug for WeakObjectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakObjectGraph")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for ObjectGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.inner.slots.borrow();
        f.debug_struct("ObjectGraph")
            .field("slots", &slots.len())
            .field("live", &slots.iter().filter(|s| s.object.is_some()).count())
            .field("signals", &self.inner.signals.borrow().len())
            .finish()
    }
}

impl TypeContext for ObjectGraph {
    fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    fn class_of(&self, object: ObjectId) -> Option<ClassId> {
        ObjectGraph::class_of(self, object)
    }
}

impl ObjectGraph {
    /// Create an empty graph over a frozen registry.
    #[must_use]
    pub fn new(registry: TypeRegistry) -> Self {
        Self {
            inner: Rc::new(GraphInner {
                registry,
                slots: RefCell::new(Vec::new()),
                free: RefCell::new(Vec::new()),
                signals: RefCell::new(HashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObjectGraph {
        WeakObjectGraph {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &TypeRegistry {
        &self.inner.registry
    }

    // ========================================================================
    // Lifetime
    // ========================================================================

    /// Instantiate an object with every property at its default.
    pub fn create(&self, class: ClassId) -> ObjectId {
        self.create_named(class, None::<String>)
    }

    /// Instantiate an object with an optional diagnostic name.
    pub fn create_named(&self, class: ClassId, name: Option<impl Into<String>>) -> ObjectId {
        let cells = self
            .registry()
            .class(class)
            .map(|info| {
                info.properties
                    .iter()
                    .map(|p| match p.storage {
                        StorageKind::Native => PropertyCell::Native(p.default.clone()),
                        StorageKind::Var => PropertyCell::Var(DynValue::Undefined),
                        StorageKind::Alias => PropertyCell::Alias(None),
                    })
                    .collect()
            })
            .unwrap_or_default();
        let data = ObjectData {
            class,
            name: name.map(Into::into),
            cells,
            interceptors: HashMap::new(),
            bindings: HashMap::new(),
        };

        let mut slots = self.inner.slots.borrow_mut();
        let id = match self.inner.free.borrow_mut().pop() {
            Some(index) => {
                let slot = &mut slots[index as usize];
                slot.object = Some(data);
                ObjectId::from_parts(index, slot.generation)
            }
            None => {
                let index = slots.len() as u32;
                slots.push(Slot {
                    generation: 0,
                    object: Some(data),
                });
                ObjectId::from_parts(index, 0)
            }
        };
        trace!(object = %id, class = class.index(), "object created");
        id
    }

    /// Destroy an object. Attached bindings are retired and all change
    /// subscriptions on its properties are dropped. Returns `false` if the
    /// object was already dead.
    pub fn destroy(&self, id: ObjectId) -> bool {
        let data = {
            let mut slots = self.inner.slots.borrow_mut();
            let Some(slot) = slots.get_mut(id.index() as usize) else {
                return false;
            };
            if slot.generation != id.generation() || slot.object.is_none() {
                return false;
            }
            slot.generation = slot.generation.wrapping_add(1);
            slot.object.take()
        };
        self.inner.free.borrow_mut().push(id.index());
        self.inner.signals.borrow_mut().retain(|(object, _), _| *object != id);
        trace!(object = %id, "object destroyed");

        if let Some(data) = data {
            for binding in data.bindings.into_values() {
                binding.retire();
            }
        }
        true
    }

    #[must_use]
    pub fn is_alive(&self, id: ObjectId) -> bool {
        self.with_object(id, |_| ()).is_some()
    }

    #[must_use]
    pub fn is_destroyed(&self, id: ObjectId) -> bool {
        !self.is_alive(id)
    }

    #[must_use]
    pub fn class_of(&self, id: ObjectId) -> Option<ClassId> {
        self.with_object(id, |o| o.class)
    }

    #[must_use]
    pub fn object_name(&self, id: ObjectId) -> Option<String> {
        self.with_object(id, |o| o.name.clone()).flatten()
    }

    fn with_object<R>(&self, id: ObjectId, f: impl FnOnce(&ObjectData) -> R) -> Option<R> {
        let slots = self.inner.slots.borrow();
        let slot = slots.get(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_ref().map(f)
    }

    fn with_object_mut<R>(&self, id: ObjectId, f: impl FnOnce(&mut ObjectData) -> R) -> Option<R> {
        let mut slots = self.inner.slots.borrow_mut();
        let slot = slots.get_mut(id.index() as usize)?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.object.as_mut().map(f)
    }

    // ========================================================================
    // Metadata
    // ========================================================================

    /// Descriptor of a property on a live object.
    pub fn descriptor(&self, id: ObjectId, index: u32) -> Result<&PropertyDescriptor, PropertyError> {
        let class = self.class_of(id).ok_or(PropertyError::Destroyed(id))?;
        let info = self.registry().class(class).ok_or(PropertyError::Destroyed(id))?;
        info.properties
            .get(index as usize)
            .ok_or_else(|| PropertyError::UnknownProperty {
                class: info.name.clone(),
                property: format!("#{index}"),
            })
    }

    /// Property index by name.
    pub fn property_index(&self, id: ObjectId, name: &str) -> Result<u32, PropertyError> {
        let class = self.class_of(id).ok_or(PropertyError::Destroyed(id))?;
        let info = self.registry().class(class).ok_or(PropertyError::Destroyed(id))?;
        info.property(name)
            .map(|p| p.index)
            .ok_or_else(|| PropertyError::UnknownProperty {
                class: info.name.clone(),
                property: name.to_string(),
            })
    }

    /// Name of the property whose notify signal is `signal`.
    #[must_use]
    pub fn signal_property_name(&self, id: ObjectId, signal: u32) -> Option<String> {
        let class = self.class_of(id)?;
        self.registry()
            .class(class)?
            .properties
            .iter()
            .find(|p| p.notify_signal == signal)
            .map(|p| p.name.clone())
    }

    // ========================================================================
    // Aliases
    // ========================================================================

    /// Point an alias property at another object's property.
    pub fn set_alias(&self, id: ObjectId, index: u32, target: ObjectId, target_index: u32) -> Result<(), PropertyError> {
        let desc = self.descriptor(id, index)?;
        if !desc.is_alias() {
            return Err(PropertyError::TypeMismatch {
                property: desc.name.clone(),
                expected: "alias".into(),
            });
        }
        self.descriptor(target, target_index)?;
        self.with_object_mut(id, |o| o.cells[index as usize] = PropertyCell::Alias(Some((target, target_index))))
            .ok_or(PropertyError::Destroyed(id))
    }

    /// Follow an alias chain to the property that actually stores the value.
    pub fn resolve_alias(&self, id: ObjectId, index: u32, max_depth: usize) -> Result<(ObjectId, u32), PropertyError> {
        let mut current = (id, index);
        for _ in 0..=max_depth {
            let desc = self.descriptor(current.0, current.1)?;
            if !desc.is_alias() {
                return Ok(current);
            }
            let next = self
                .with_object(current.0, |o| match &o.cells[current.1 as usize] {
                    PropertyCell::Alias(target) => *target,
                    _ => None,
                })
                .flatten();
            match next {
                Some(target) if self.is_alive(target.0) => current = target,
                _ => {
                    return Err(PropertyError::UnresolvedAlias {
                        property: desc.name.clone(),
                    });
                }
            }
        }
        Err(PropertyError::AliasCycle {
            property: self.descriptor(id, index)?.name.clone(),
        })
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read a property, registering a dependency edge with the active
    /// collector. Var slots read back as [`NativeValue::Script`].
    pub fn read(&self, id: ObjectId, index: u32) -> Result<NativeValue, PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        let signal = self.descriptor(object, index)?.notify_signal;
        capture::capture(DependencySource::Property { object, signal }, &|callback| {
            self.subscribe(object, signal, callback)
        });
        self.read_untracked(object, index)
    }

    /// Read a property as a VM value, with dependency capture.
    pub fn read_dynamic(&self, id: ObjectId, index: u32) -> Result<DynValue, PropertyError> {
        let ty = self.descriptor(id, index)?.ty;
        self.read(id, index).map(|v| coerce::from_native(&v, ty))
    }

    /// Read without dependency capture.
    pub fn read_untracked(&self, id: ObjectId, index: u32) -> Result<NativeValue, PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        self.with_object(object, |o| match &o.cells[index as usize] {
            PropertyCell::Native(v) => v.clone(),
            PropertyCell::Var(v) => NativeValue::Script(v.clone()),
            PropertyCell::Alias(_) => NativeValue::Script(DynValue::Undefined),
        })
        .ok_or(PropertyError::Destroyed(object))
    }

    /// Read by property name with dependency capture.
    pub fn get(&self, id: ObjectId, name: &str) -> Result<NativeValue, PropertyError> {
        let index = self.property_index(id, name)?;
        self.read(id, index)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write a native value into a fixed-type property.
    ///
    /// Unless `DONT_REMOVE_BINDING` is set, any binding attached to the
    /// property is retired first: an explicit write replaces the binding.
    pub fn write(&self, id: ObjectId, index: u32, value: NativeValue, flags: WriteFlags) -> Result<(), PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        let desc = self.descriptor(object, index)?;
        let (ty, signal, name) = (desc.ty, desc.notify_signal, desc.name.clone());
        if desc.is_var() {
            return match value {
                NativeValue::Script(v) => self.write_var(object, index, v, flags),
                _ => Err(PropertyError::TypeMismatch {
                    property: name,
                    expected: "var".into(),
                }),
            };
        }
        if !value.fits(ty) {
            return Err(PropertyError::TypeMismatch {
                property: name,
                expected: self.registry().type_name(ty),
            });
        }
        if !flags.contains(WriteFlags::DONT_REMOVE_BINDING) {
            self.remove_bindings(object, index);
        }

        let mut value = value;
        if !flags.contains(WriteFlags::BYPASS_INTERCEPTORS) {
            let interceptor = self
                .with_object(object, |o| o.interceptors.get(&index).cloned())
                .ok_or(PropertyError::Destroyed(object))?;
            if let Some(interceptor) = interceptor {
                interceptor(self, object, &mut value);
                if !value.fits(ty) {
                    return Err(PropertyError::TypeMismatch {
                        property: name,
                        expected: self.registry().type_name(ty),
                    });
                }
            }
        }

        let changed = self
            .with_object_mut(object, |o| {
                let cell = &mut o.cells[index as usize];
                let changed = !matches!(cell, PropertyCell::Native(current) if *current == value);
                *cell = PropertyCell::Native(value);
                changed
            })
            .ok_or(PropertyError::Destroyed(object))?;

        if changed && !flags.contains(WriteFlags::SUPPRESS_NOTIFY) {
            self.notify(object, signal);
        }
        Ok(())
    }

    /// Write a VM value directly into a var slot.
    pub fn write_var(&self, id: ObjectId, index: u32, value: DynValue, flags: WriteFlags) -> Result<(), PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        let desc = self.descriptor(object, index)?;
        if !desc.is_var() {
            return Err(PropertyError::TypeMismatch {
                property: desc.name.clone(),
                expected: self.registry().type_name(desc.ty),
            });
        }
        let signal = desc.notify_signal;
        if !flags.contains(WriteFlags::DONT_REMOVE_BINDING) {
            self.remove_bindings(object, index);
        }
        let changed = self
            .with_object_mut(object, |o| {
                let cell = &mut o.cells[index as usize];
                let changed = !matches!(cell, PropertyCell::Var(current) if *current == value);
                *cell = PropertyCell::Var(value);
                changed
            })
            .ok_or(PropertyError::Destroyed(object))?;
        if changed && !flags.contains(WriteFlags::SUPPRESS_NOTIFY) {
            self.notify(object, signal);
        }
        Ok(())
    }

    /// Restore a resettable property to its default.
    pub fn reset(&self, id: ObjectId, index: u32, flags: WriteFlags) -> Result<(), PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        let desc = self.descriptor(object, index)?;
        if !desc.resettable {
            return Err(PropertyError::NotResettable {
                property: desc.name.clone(),
            });
        }
        let default = desc.default.clone();
        self.write(object, index, default, flags)
    }

    /// Assign a literal by name, replacing any binding on the property.
    pub fn set(&self, id: ObjectId, name: &str, value: NativeValue) -> Result<(), PropertyError> {
        let index = self.property_index(id, name)?;
        self.set_literal(id, index, value)
    }

    /// Assign a literal, replacing any binding on the property.
    pub fn set_literal(&self, id: ObjectId, index: u32, value: NativeValue) -> Result<(), PropertyError> {
        if self.descriptor(id, index)?.is_var() {
            let v = match value {
                NativeValue::Script(v) => v,
                other => coerce::from_native(&other, TypeTag::Var),
            };
            return self.write_var(id, index, v, WriteFlags::empty());
        }
        self.write(id, index, value, WriteFlags::empty())
    }

    // ========================================================================
    // Interceptors
    // ========================================================================

    pub fn install_interceptor(&self, id: ObjectId, index: u32, interceptor: Interceptor) -> Result<(), PropertyError> {
        let (object, index) = self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)?;
        self.with_object_mut(object, |o| {
            o.interceptors.insert(index, interceptor);
        })
        .ok_or(PropertyError::Destroyed(object))
    }

    pub fn remove_interceptor(&self, id: ObjectId, index: u32) -> bool {
        self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)
            .ok()
            .and_then(|(object, index)| self.with_object_mut(object, |o| o.interceptors.remove(&index).is_some()))
            .unwrap_or(false)
    }

    #[must_use]
    pub fn has_interceptor(&self, id: ObjectId, index: u32) -> bool {
        self.resolve_alias(id, index, DEFAULT_MAX_ALIAS_DEPTH)
            .ok()
            .and_then(|(object, index)| self.with_object(object, |o| o.interceptors.contains_key(&index)))
            .unwrap_or(false)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Make `binding` the active writer for a property slot. The previous
    /// writer, if any, is retired.
    pub fn attach_binding(&self, id: ObjectId, slot: BindingSlot, binding: Rc<dyn AttachedBinding>) -> Result<(), PropertyError> {
        let previous = self
            .with_object_mut(id, |o| o.bindings.insert(slot, binding))
            .ok_or(PropertyError::Destroyed(id))?;
        if let Some(previous) = previous {
            previous.retire();
        }
        Ok(())
    }

    /// The active writer for a property slot.
    #[must_use]
    pub fn binding(&self, id: ObjectId, slot: BindingSlot) -> Option<Rc<dyn AttachedBinding>> {
        self.with_object(id, |o| o.bindings.get(&slot).cloned()).flatten()
    }

    /// Detach and retire the writer for one slot.
    pub fn detach_binding(&self, id: ObjectId, slot: BindingSlot) -> bool {
        let removed = self.with_object_mut(id, |o| o.bindings.remove(&slot)).flatten();
        match removed {
            Some(binding) => {
                binding.retire();
                true
            }
            None => false,
        }
    }

    /// Detach and retire every binding writing to `index` or one of its fields.
    fn remove_bindings(&self, id: ObjectId, index: u32) {
        let removed: Vec<Rc<dyn AttachedBinding>> = self
            .with_object_mut(id, |o| {
                let keys: Vec<BindingSlot> = o.bindings.keys().filter(|(i, _)| *i == index).copied().collect();
                keys.iter().filter_map(|k| o.bindings.remove(k)).collect()
            })
            .unwrap_or_default();
        for binding in removed {
            trace!(object = %id, property = index, "binding removed by explicit write");
            binding.retire();
        }
    }

    // ========================================================================
    // Notification
    // ========================================================================

    /// Subscribe to a property's notify signal.
    pub fn subscribe(&self, id: ObjectId, signal: u32, callback: Rc<dyn Fn()>) -> Subscription {
        let channel = Rc::clone(
            self.inner
                .signals
                .borrow_mut()
                .entry((id, signal))
                .or_insert_with(|| Rc::new(Signal::new())),
        );
        channel.subscribe(callback)
    }

    /// Emit a property's notify signal.
    pub fn notify(&self, id: ObjectId, signal: u32) {
        let channel = self.inner.signals.borrow().get(&(id, signal)).cloned();
        if let Some(channel) = channel {
            channel.emit();
        }
    }

    /// Subscriber count on a notify signal.
    #[must_use]
    pub fn subscriber_count(&self, id: ObjectId, signal: u32) -> usize {
        self.inner
            .signals
            .borrow()
            .get(&(id, signal))
            .map_or(0, |s| s.subscriber_count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueTypeValue;
    use std::cell::Cell;

    struct Fixture {
        graph: ObjectGraph,
        item: ClassId,
    }

    fn fixture() -> Fixture {
        let mut reg = TypeRegistry::new();
        let item = reg
            .define_class("Item", None)
            .property("width", TypeTag::Double)
            .resettable("height", TypeTag::Double, NativeValue::Double(10.0))
            .var("data")
            .alias("size", TypeTag::Double)
            .property("pos", TypeTag::Value(crate::id::ValueTypeId::POINT))
            .finish();
        Fixture {
            graph: ObjectGraph::new(reg),
            item,
        }
    }

    struct RecordingBinding {
        retired: Cell<bool>,
    }

    impl AttachedBinding for RecordingBinding {
        fn retire(&self) {
            self.retired.set(true);
        }
    }

    #[test]
    fn defaults_on_create() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        assert_eq!(fx.graph.get(obj, "width"), Ok(NativeValue::Double(0.0)));
        assert_eq!(fx.graph.get(obj, "height"), Ok(NativeValue::Double(10.0)));
        assert_eq!(fx.graph.get(obj, "data"), Ok(NativeValue::Script(DynValue::Undefined)));
        assert_eq!(
            fx.graph.get(obj, "pos"),
            Ok(NativeValue::Value(ValueTypeValue::point(0.0, 0.0)))
        );
    }

    #[test]
    fn destroy_invalidates_id_and_slot_reuse_bumps_generation() {
        let fx = fixture();
        let a = fx.graph.create(fx.item);
        assert!(fx.graph.destroy(a));
        assert!(!fx.graph.destroy(a));
        assert!(fx.graph.is_destroyed(a));
        let b = fx.graph.create(fx.item);
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(fx.graph.is_alive(b));
        assert_eq!(fx.graph.read(a, 0), Err(PropertyError::Destroyed(a)));
    }

    #[test]
    fn write_notifies_only_on_change() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let count = Rc::new(Cell::new(0));
        let c = Rc::clone(&count);
        let _sub = fx.graph.subscribe(obj, 0, Rc::new(move || c.set(c.get() + 1)));
        fx.graph.set(obj, "width", NativeValue::Double(5.0)).unwrap();
        fx.graph.set(obj, "width", NativeValue::Double(5.0)).unwrap();
        assert_eq!(count.get(), 1);
        fx.graph
            .write(obj, 0, NativeValue::Double(6.0), WriteFlags::SUPPRESS_NOTIFY)
            .unwrap();
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn write_rejects_wrong_shape() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let err = fx.graph.set(obj, "width", NativeValue::Int(1)).unwrap_err();
        assert!(matches!(err, PropertyError::TypeMismatch { .. }));
    }

    #[test]
    fn reset_restores_default() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        fx.graph.set(obj, "height", NativeValue::Double(3.0)).unwrap();
        fx.graph.reset(obj, 1, WriteFlags::empty()).unwrap();
        assert_eq!(fx.graph.get(obj, "height"), Ok(NativeValue::Double(10.0)));
        assert!(matches!(
            fx.graph.reset(obj, 0, WriteFlags::empty()),
            Err(PropertyError::NotResettable { .. })
        ));
    }

    #[test]
    fn alias_resolution_and_cycles() {
        let fx = fixture();
        let a = fx.graph.create(fx.item);
        let b = fx.graph.create(fx.item);
        assert!(matches!(
            fx.graph.resolve_alias(a, 3, 4),
            Err(PropertyError::UnresolvedAlias { .. })
        ));
        fx.graph.set_alias(a, 3, b, 0).unwrap();
        assert_eq!(fx.graph.resolve_alias(a, 3, 4), Ok((b, 0)));
        fx.graph.write(a, 3, NativeValue::Double(9.0), WriteFlags::empty()).unwrap();
        assert_eq!(fx.graph.get(b, "width"), Ok(NativeValue::Double(9.0)));

        fx.graph.set_alias(b, 3, a, 3).unwrap();
        fx.graph.set_alias(a, 3, b, 3).unwrap();
        assert!(matches!(
            fx.graph.resolve_alias(a, 3, 4),
            Err(PropertyError::AliasCycle { .. })
        ));
    }

    #[test]
    fn interceptor_sees_writes_unless_bypassed() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        fx.graph
            .install_interceptor(
                obj,
                0,
                Rc::new(move |_: &ObjectGraph, _: ObjectId, value: &mut NativeValue| {
                    h.set(h.get() + 1);
                    if let NativeValue::Double(d) = value {
                        *d *= 2.0;
                    }
                }),
            )
            .unwrap();
        assert!(fx.graph.has_interceptor(obj, 0));
        fx.graph.set(obj, "width", NativeValue::Double(2.0)).unwrap();
        assert_eq!(fx.graph.get(obj, "width"), Ok(NativeValue::Double(4.0)));
        fx.graph
            .write(obj, 0, NativeValue::Double(1.0), WriteFlags::BYPASS_INTERCEPTORS)
            .unwrap();
        assert_eq!(fx.graph.get(obj, "width"), Ok(NativeValue::Double(1.0)));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn interceptor_destroying_object_abandons_write() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        fx.graph
            .install_interceptor(obj, 0, Rc::new(|graph: &ObjectGraph, id: ObjectId, _: &mut NativeValue| {
                graph.destroy(id);
            }))
            .unwrap();
        assert_eq!(
            fx.graph.set(obj, "width", NativeValue::Double(2.0)),
            Err(PropertyError::Destroyed(obj))
        );
    }

    #[test]
    fn literal_write_retires_binding_but_flagged_write_keeps_it() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let binding = Rc::new(RecordingBinding { retired: Cell::new(false) });
        fx.graph.attach_binding(obj, (0, None), binding.clone()).unwrap();
        fx.graph
            .write(obj, 0, NativeValue::Double(1.0), WriteFlags::DONT_REMOVE_BINDING)
            .unwrap();
        assert!(!binding.retired.get());
        fx.graph.set(obj, "width", NativeValue::Double(2.0)).unwrap();
        assert!(binding.retired.get());
        assert!(fx.graph.binding(obj, (0, None)).is_none());
    }

    #[test]
    fn attaching_replaces_and_destroy_retires() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let first = Rc::new(RecordingBinding { retired: Cell::new(false) });
        let second = Rc::new(RecordingBinding { retired: Cell::new(false) });
        fx.graph.attach_binding(obj, (0, None), first.clone()).unwrap();
        fx.graph.attach_binding(obj, (0, None), second.clone()).unwrap();
        assert!(first.retired.get());
        assert!(!second.retired.get());
        fx.graph.destroy(obj);
        assert!(second.retired.get());
    }

    #[test]
    fn var_slots_hold_dynamic_values() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        fx.graph
            .write_var(obj, 2, DynValue::string("hello"), WriteFlags::empty())
            .unwrap();
        assert_eq!(fx.graph.read_dynamic(obj, 2), Ok(DynValue::string("hello")));
        assert!(fx.graph.write_var(obj, 0, DynValue::Int(1), WriteFlags::empty()).is_err());
    }

    #[test]
    fn destroy_drops_signals() {
        let fx = fixture();
        let obj = fx.graph.create(fx.item);
        let _sub = fx.graph.subscribe(obj, 0, Rc::new(|| {}));
        assert_eq!(fx.graph.subscriber_count(obj, 0), 1);
        fx.graph.destroy(obj);
        assert_eq!(fx.graph.subscriber_count(obj, 0), 0);
    }
}
