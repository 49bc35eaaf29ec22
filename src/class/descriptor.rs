//! Frozen per-class records.
//!
//! A [`ClassDescriptor`] is created once by [`ClassRegistry::publish`] from a
//! [`ClassBuilder`] and is read-only afterwards. Every object handle of the
//! class holds an `Arc` to it.
//!
//! [`ClassRegistry::publish`]: crate::ClassRegistry::publish
//! [`ClassBuilder`]: crate::ClassBuilder

use std::fmt;
use std::sync::Arc;

use nativebind_core::{Holder, OperatorKind, TypeHash};
use rustc_hash::FxHashMap;

use crate::native_fn::NativeFn;
use crate::overload::Overload;

/// A fixed-offset relation from a derived class to one of its bases.
///
/// Adding `offset` bytes to a pointer to the derived object yields a pointer
/// to the base sub-object.
#[derive(Clone)]
pub struct BaseEdge {
    /// The base class descriptor.
    pub base: Arc<ClassDescriptor>,
    /// Byte offset of the base sub-object inside the derived object.
    pub offset: isize,
}

impl fmt::Debug for BaseEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseEdge")
            .field("base", &self.base.name())
            .field("offset", &self.offset)
            .finish()
    }
}

/// Getter/setter pair for a bound property. No setter means read-only.
#[derive(Clone)]
pub struct PropertyEntry {
    /// Called with the receiver as `this` and no arguments.
    pub getter: NativeFn,
    /// Called with the receiver as `this` and the new value as argument 0.
    pub setter: Option<NativeFn>,
}

impl PropertyEntry {
    /// Check if this property has no setter.
    pub fn is_read_only(&self) -> bool {
        self.setter.is_none()
    }
}

impl fmt::Debug for PropertyEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyEntry")
            .field("read_only", &self.is_read_only())
            .finish()
    }
}

/// The published, immutable record of one native class.
pub struct ClassDescriptor {
    pub(crate) name: String,
    pub(crate) type_hash: TypeHash,
    pub(crate) holder: Arc<dyn Holder>,
    pub(crate) bases: Vec<BaseEdge>,
    pub(crate) methods: FxHashMap<String, Vec<Overload>>,
    pub(crate) properties: FxHashMap<String, PropertyEntry>,
    pub(crate) operators: [Vec<Overload>; OperatorKind::COUNT],
    pub(crate) constructors: Vec<Overload>,
}

impl ClassDescriptor {
    // =========================================================================
    // Identity
    // =========================================================================

    /// Registered class name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identity of the native type.
    pub fn type_hash(&self) -> TypeHash {
        self.type_hash
    }

    /// Identity of the held type, `None` in raw mode.
    pub fn held_type(&self) -> Option<TypeHash> {
        self.holder.held_type()
    }

    /// Identity of the const-held type, `None` in raw mode.
    pub fn const_held_type(&self) -> Option<TypeHash> {
        self.holder.const_held_type()
    }

    /// Check if objects of this class are stored through a held type.
    pub fn is_held(&self) -> bool {
        self.held_type().is_some()
    }

    /// Size of the inline held type, zero in raw mode.
    pub fn held_type_size(&self) -> usize {
        if self.is_held() {
            self.holder.storage_layout().size()
        } else {
            0
        }
    }

    /// Alignment of the inline held type, zero in raw mode.
    pub fn held_type_alignment(&self) -> usize {
        if self.is_held() {
            self.holder.storage_layout().align()
        } else {
            0
        }
    }

    /// The construct/extract/destroy capability for this class's objects.
    pub fn holder(&self) -> &dyn Holder {
        self.holder.as_ref()
    }

    // =========================================================================
    // Members
    // =========================================================================

    /// Direct base edges in registration order.
    pub fn bases(&self) -> &[BaseEdge] {
        &self.bases
    }

    /// Overloads registered directly on this class under `name`.
    pub fn methods(&self, name: &str) -> &[Overload] {
        self.methods.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Names of methods registered directly on this class.
    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    /// Property registered directly on this class.
    pub fn property(&self, name: &str) -> Option<&PropertyEntry> {
        self.properties.get(name)
    }

    /// Operator overloads registered directly on this class.
    pub fn operators(&self, kind: OperatorKind) -> &[Overload] {
        &self.operators[kind.index()]
    }

    /// Constructor overloads. Constructors are never inherited.
    pub fn constructors(&self) -> &[Overload] {
        &self.constructors
    }
}

impl fmt::Debug for ClassDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDescriptor")
            .field("name", &self.name)
            .field("type_hash", &self.type_hash)
            .field("holder", &self.holder.family())
            .field("bases", &self.bases)
            .field("methods", &self.methods.len())
            .field("properties", &self.properties.len())
            .field("constructors", &self.constructors.len())
            .finish()
    }
}
