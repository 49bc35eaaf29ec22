//! Hash-based native type identity.
//!
//! This module provides [`TypeHash`], a 64-bit token that identifies a native
//! type for equality comparison. Identities carry no subtype information: any
//! base/derived relationship must be registered explicitly as a base edge.
//!
//! # Sources of identity
//!
//! - [`TypeHash::of`] for native Rust types (derived from `TypeId`)
//! - [`TypeHash::of_const`] for the const-qualified view of a native type
//! - [`TypeHash::from_name`] for name-keyed identities (primitive parameter kinds,
//!   converter targets)
//! - [`TypeHash::from_signature`] for overload fingerprints
//!
//! # Examples
//!
//! ```
//! use nativebind_core::TypeHash;
//!
//! struct Shape;
//!
//! assert_eq!(TypeHash::of::<Shape>(), TypeHash::of::<Shape>());
//! assert_ne!(TypeHash::of::<Shape>(), TypeHash::of_const::<Shape>());
//!
//! let int = TypeHash::from_name("int");
//! let f1 = TypeHash::from_signature("area", &[int]);
//! let f2 = TypeHash::from_signature("area", &[]);
//! assert_ne!(f1, f2);
//! ```

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use xxhash_rust::xxh64::xxh64;

/// Domain-specific mixing constants for hash computation.
///
/// These keep identities from different domains (names, signatures, const views)
/// apart even when their inputs coincide.
pub mod hash_constants {
    /// Separator constant for chaining components.
    pub const SEP: u64 = 0x4bc94d6bd06053ad;

    /// Domain marker for name-derived type hashes.
    pub const TYPE: u64 = 0x2fac10b63a6cc57c;

    /// Domain marker for overload signature fingerprints.
    pub const SIGNATURE: u64 = 0x7d3c8b4a92e15f6d;

    /// Parameter position mixing constants.
    /// Each position gets its own constant so parameter order matters.
    pub const PARAM_MARKERS: [u64; 16] = [
        0x9e3779b97f4a7c15,
        0xbf58476d1ce4e5b9,
        0x94d049bb133111eb,
        0xd6e8feb86659fd93,
        0xe7037ed1a0b428db,
        0xc6a4a7935bd1e995,
        0x8648dbbc94d49b8d,
        0xa2b48b2c69e0d657,
        0x7c3e9f2a5b8d1403,
        0x5d8c7b4a3e9f2106,
        0x3f1e9d8c7b5a4203,
        0x1a2b3c4d5e6f7089,
        0x9f8e7d6c5b4a3210,
        0x2468ace013579bdf,
        0xfdb97531eca86420,
        0x123456789abcdef0,
    ];
}

/// Marker used to derive the identity of a const-qualified view.
struct ConstView<T: ?Sized>(PhantomData<fn() -> *const T>);

/// An opaque 64-bit identity for a native type.
///
/// Two identities are either equal or unrelated.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeHash(pub u64);

impl TypeHash {
    /// Empty/invalid hash constant.
    pub const EMPTY: TypeHash = TypeHash(0);

    /// Identity of a native Rust type.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::of_type_id(TypeId::of::<T>())
    }

    /// Identity of the const-qualified view of a native Rust type.
    ///
    /// Used for const-held aliases, e.g. a shared pointer to an immutable `T`.
    #[inline]
    pub fn of_const<T: ?Sized + 'static>() -> Self {
        Self::of_type_id(TypeId::of::<ConstView<T>>())
    }

    /// Create a TypeHash from an existing `TypeId`.
    #[inline]
    pub fn of_type_id(type_id: TypeId) -> Self {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        type_id.hash(&mut hasher);
        TypeHash(hasher.finish())
    }

    /// Create a type hash from a name.
    ///
    /// The same name always produces the same hash.
    #[inline]
    pub fn from_name(name: &str) -> Self {
        TypeHash(hash_constants::TYPE ^ xxh64(name.as_bytes(), 0))
    }

    /// Create an overload fingerprint from a selector name and parameter identities.
    ///
    /// Parameter order matters: `(int, float)` and `(float, int)` differ.
    #[inline]
    pub fn from_signature(name: &str, param_hashes: &[TypeHash]) -> Self {
        let mut hash = hash_constants::SIGNATURE ^ xxh64(name.as_bytes(), 0);
        for (i, param) in param_hashes.iter().enumerate() {
            let marker = hash_constants::PARAM_MARKERS
                .get(i)
                .copied()
                .unwrap_or_else(|| hash_constants::PARAM_MARKERS[0].wrapping_add(i as u64));
            // wrapping_mul keeps the fold order-sensitive
            hash = hash
                .wrapping_mul(hash_constants::SEP)
                .wrapping_add(marker ^ param.0);
        }
        TypeHash(hash)
    }

    /// Check if this is an empty/invalid hash.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Get the underlying u64 value.
    #[inline]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHash({:#018x})", self.0)
    }
}

impl fmt::Display for TypeHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}
