#![forbid(unsafe_code)]

//! Stable identifiers for objects and registered types.
//!
//! [`ObjectId`] is a packed `{ index: u32, generation: u32 }`. The index
//! selects a slot in the [`ObjectGraph`](crate::graph::ObjectGraph); the
//! generation is bumped each time that slot is freed. An id is only live
//! while the slot is occupied and its generation still matches, which makes
//! "was this object destroyed?" a pair of integer compares.

use std::fmt;

use serde::{Serialize, Serializer};

/// Generation-checked handle to an object in an [`ObjectGraph`](crate::graph::ObjectGraph).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ObjectId(u64);

impl ObjectId {
    pub(crate) fn from_parts(index: u32, generation: u32) -> Self {
        Self(u64::from(index) | (u64::from(generation) << 32))
    }

    /// The slot index within the graph.
    #[inline]
    #[must_use]
    pub fn index(self) -> u32 {
        self.0 as u32
    }

    /// The slot generation when this id was handed out.
    #[inline]
    #[must_use]
    pub fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectId")
            .field("index", &self.index())
            .field("generation", &self.generation())
            .finish()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}.{}", self.index(), self.generation())
    }
}

/// Serialized as its display form (`#index.generation`).
impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Registered object class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(pub(crate) u32);

/// Registered enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnumId(pub(crate) u32);

/// Registered value type (point, rect, user-declared structs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueTypeId(pub(crate) u32);

impl ValueTypeId {
    /// Built-in `point { x, y }`.
    pub const POINT: Self = Self(0);
    /// Built-in `size { width, height }`.
    pub const SIZE: Self = Self(1);
    /// Built-in `rect { x, y, width, height }`.
    pub const RECT: Self = Self(2);
    /// Built-in `vector3d { x, y, z }`.
    pub const VECTOR3D: Self = Self(3);
}

macro_rules! impl_index {
    ($($ty:ty),*) => {
        $(impl $ty {
            /// Raw registry index.
            #[inline]
            #[must_use]
            pub fn index(self) -> u32 {
                self.0
            }
        })*
    };
}

impl_index!(ClassId, EnumId, ValueTypeId);
