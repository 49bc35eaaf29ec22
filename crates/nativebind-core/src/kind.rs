//! Runtime-observable argument kinds and expected parameter types.
//!
//! The host runtime only exposes a handful of value kinds; everything native is
//! an object tagged with its class identity and a constness flag. Overload
//! matching compares an [`ArgKind`] (what the caller passed) against a
//! [`ParamType`] (what the overload expects).

use std::fmt;

use crate::TypeHash;

/// Primitive value kinds the host runtime can push and read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    /// Absent value.
    Nil,
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// UTF-8 string.
    Str,
}

impl PrimitiveKind {
    /// Human-readable name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::Nil => "nil",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Str => "string",
        }
    }

    /// Name-derived identity, used as a converter key.
    pub fn type_hash(self) -> TypeHash {
        TypeHash::from_name(self.name())
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The runtime kind of one dynamic argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgKind {
    /// A primitive value.
    Primitive(PrimitiveKind),
    /// A native object of the given class.
    Object {
        /// Class identity of the object's descriptor.
        class: TypeHash,
        /// Whether the object was pushed as const.
        is_const: bool,
    },
}

impl ArgKind {
    /// Check if this argument is a native object.
    pub fn is_object(&self) -> bool {
        matches!(self, ArgKind::Object { .. })
    }
}

/// The expected type of one overload parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamType {
    /// Exact primitive kind. No implicit coercion between kinds.
    Primitive(PrimitiveKind),
    /// An object of the given class or of a registered descendant.
    Object {
        /// Expected class identity.
        class: TypeHash,
        /// A const parameter accepts const and mutable arguments.
        is_const: bool,
    },
    /// A type only reachable through a registered converter.
    Custom(TypeHash),
    /// Accepts any argument at the worst cost.
    Any,
}

impl ParamType {
    /// Shorthand for [`ParamType::Primitive`] of `Int`.
    pub const INT: ParamType = ParamType::Primitive(PrimitiveKind::Int);
    /// Shorthand for [`ParamType::Primitive`] of `Float`.
    pub const FLOAT: ParamType = ParamType::Primitive(PrimitiveKind::Float);
    /// Shorthand for [`ParamType::Primitive`] of `Bool`.
    pub const BOOL: ParamType = ParamType::Primitive(PrimitiveKind::Bool);
    /// Shorthand for [`ParamType::Primitive`] of `Str`.
    pub const STR: ParamType = ParamType::Primitive(PrimitiveKind::Str);

    /// A mutable object parameter of native type `T`.
    pub fn object<T: ?Sized + 'static>() -> Self {
        ParamType::Object {
            class: TypeHash::of::<T>(),
            is_const: false,
        }
    }

    /// A const object parameter of native type `T`.
    pub fn const_object<T: ?Sized + 'static>() -> Self {
        ParamType::Object {
            class: TypeHash::of::<T>(),
            is_const: true,
        }
    }

    /// Identity of this parameter type, used for fingerprints and converter lookup.
    ///
    /// Constness does not change identity: `f(const C)` and `f(C)` are
    /// distinguishable overloads only through their receiver or const cost.
    pub fn identity(&self) -> TypeHash {
        match self {
            ParamType::Primitive(kind) => kind.type_hash(),
            ParamType::Object { class, .. } => *class,
            ParamType::Custom(hash) => *hash,
            ParamType::Any => TypeHash::from_name("?"),
        }
    }
}
