//! Held-type marshalling.
//!
//! Every class picks one object representation at registration time:
//!
//! - **Raw mode** ([`RawHolder`]): the object slot stores the native pointer
//!   itself and destruction deletes the object.
//! - **Held mode** ([`SmartHolder`]): the slot stores an owning wrapper (a
//!   [`SmartPointer`] such as `Rc<T>`) constructed in place from the raw
//!   pointer. The native pointer is obtained through the wrapper, and
//!   destruction only drops the wrapper, which owns deletion itself.
//!
//! Code above this boundary only ever asks a [`Holder`] for "the raw pointer"
//! and never branches on which mode is active.
//!
//! # Raw pointer provenance
//!
//! A raw pointer handed to [`Holder::construct`] must come from the same
//! pointer family the holder manages: `Box::into_raw` for [`RawHolder`] and
//! `Box` holders, `Rc::into_raw` for `Rc` holders, `Arc::into_raw` for `Arc`
//! holders. [`Holder::into_raw`] produces such a pointer from an owned value.
//!
//! Both [`SmartPointer`] and [`Holder`] are `unsafe` to implement: object
//! handles dereference whatever pointer a holder extracts and hand out
//! mutable views based on [`Holder::is_unique`], so a lying implementation
//! breaks memory safety for every caller.

use std::alloc::Layout;
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;
use std::rc::Rc;
use std::sync::Arc;

use crate::TypeHash;

/// Owning wrapper around a native object, e.g. a reference-counted pointer.
///
/// # Safety
///
/// - `get_pointer` must return a non-null pointer to the live `T` the wrapper
///   owns, valid for as long as the wrapper is alive.
/// - `into_raw` must return a non-null pointer that `from_raw` accepts, and
///   `from_raw(p.into_raw())` must own the same object as `p`.
/// - `is_unique` must only return `true` when no other owner can reach the
///   object, so a mutable view through this wrapper cannot alias.
pub unsafe trait SmartPointer<T>: Sized + 'static {
    /// Wrap an owned value.
    fn new(value: T) -> Self;

    /// Give up ownership, returning the pointer [`SmartPointer::from_raw`] accepts.
    fn into_raw(self) -> *mut T;

    /// Re-adopt a pointer produced by [`SmartPointer::into_raw`].
    ///
    /// # Safety
    ///
    /// `raw` must come from `into_raw` of the same pointer family and must not
    /// be adopted twice.
    unsafe fn from_raw(raw: *mut T) -> Self;

    /// The wrapped native pointer.
    fn get_pointer(&self) -> *mut T;

    /// Check if this wrapper is the only owner of the object.
    fn is_unique(&self) -> bool;
}

// SAFETY: a box is always the single owner of its allocation.
unsafe impl<T: 'static> SmartPointer<T> for Box<T> {
    fn new(value: T) -> Self {
        Box::new(value)
    }

    fn into_raw(self) -> *mut T {
        Box::into_raw(self)
    }

    unsafe fn from_raw(raw: *mut T) -> Self {
        // SAFETY: guaranteed by the caller.
        unsafe { Box::from_raw(raw) }
    }

    fn get_pointer(&self) -> *mut T {
        &**self as *const T as *mut T
    }

    fn is_unique(&self) -> bool {
        true
    }
}

// SAFETY: the pointer stays valid while any strong count is held.
unsafe impl<T: 'static> SmartPointer<T> for Rc<T> {
    fn new(value: T) -> Self {
        Rc::new(value)
    }

    fn into_raw(self) -> *mut T {
        Rc::into_raw(self) as *mut T
    }

    unsafe fn from_raw(raw: *mut T) -> Self {
        // SAFETY: guaranteed by the caller.
        unsafe { Rc::from_raw(raw as *const T) }
    }

    fn get_pointer(&self) -> *mut T {
        Rc::as_ptr(self) as *mut T
    }

    fn is_unique(&self) -> bool {
        Rc::strong_count(self) == 1 && Rc::weak_count(self) == 0
    }
}

// SAFETY: the pointer stays valid while any strong count is held.
unsafe impl<T: 'static> SmartPointer<T> for Arc<T> {
    fn new(value: T) -> Self {
        Arc::new(value)
    }

    fn into_raw(self) -> *mut T {
        Arc::into_raw(self) as *mut T
    }

    unsafe fn from_raw(raw: *mut T) -> Self {
        // SAFETY: guaranteed by the caller.
        unsafe { Arc::from_raw(raw as *const T) }
    }

    fn get_pointer(&self) -> *mut T {
        Arc::as_ptr(self) as *mut T
    }

    fn is_unique(&self) -> bool {
        Arc::strong_count(self) == 1 && Arc::weak_count(self) == 0
    }
}

/// Capability interface for one object representation.
///
/// A holder describes the inline slot an object handle allocates and the
/// operations the engine needs on it: construct from a raw pointer, extract
/// the raw pointer, destroy.
///
/// # Safety
///
/// Object handles trust a holder without further checks. An implementation
/// must guarantee that:
///
/// - `storage_layout` covers everything `construct` writes into the slot;
/// - `extract` returns a pointer to a live native object of the class's type,
///   derived from the pointer passed to `construct`, valid until `destroy`;
/// - `into_raw` returns pointers that `construct` accepts;
/// - when `held_type` is `Some(TypeHash::of::<P>())`, `construct` accepts
///   pointers produced by `P::into_raw` for the same smart pointer type `P`;
/// - `is_unique` returns `true` only when nothing outside the slot can reach
///   the object.
///
/// ```compile_fail,E0200
/// use std::alloc::Layout;
/// use std::any::Any;
/// use std::ptr::NonNull;
///
/// use nativebind_core::{Holder, TypeHash};
///
/// struct Loose;
///
/// impl Holder for Loose {
///     fn held_type(&self) -> Option<TypeHash> {
///         None
///     }
///
///     fn const_held_type(&self) -> Option<TypeHash> {
///         None
///     }
///
///     fn storage_layout(&self) -> Layout {
///         Layout::new::<u8>()
///     }
///
///     fn family(&self) -> &'static str {
///         "loose"
///     }
///
///     fn into_raw(&self, value: Box<dyn Any>) -> Result<NonNull<()>, Box<dyn Any>> {
///         Err(value)
///     }
///
///     unsafe fn construct(&self, _slot: NonNull<u8>, _raw: NonNull<()>) {}
///
///     unsafe fn extract(&self, slot: NonNull<u8>) -> NonNull<()> {
///         slot.cast()
///     }
///
///     unsafe fn destroy(&self, _slot: NonNull<u8>) {}
/// }
/// ```
pub unsafe trait Holder: Send + Sync + 'static {
    /// Identity of the held type, `None` in raw mode.
    fn held_type(&self) -> Option<TypeHash>;

    /// Identity of the const-held variant, `None` in raw mode.
    fn const_held_type(&self) -> Option<TypeHash>;

    /// Layout of the slot an object handle allocates.
    fn storage_layout(&self) -> Layout;

    /// Short family name for diagnostics.
    fn family(&self) -> &'static str;

    /// Turn an owned native value into a raw pointer with the provenance this
    /// holder expects. Returns the value back if it has the wrong type.
    fn into_raw(&self, value: Box<dyn Any>) -> Result<NonNull<()>, Box<dyn Any>>;

    /// Construct the slot contents from a raw native pointer.
    ///
    /// # Safety
    ///
    /// `slot` must be valid for writes of [`Holder::storage_layout`] and
    /// uninitialized; `raw` must satisfy the provenance rules of this holder.
    unsafe fn construct(&self, slot: NonNull<u8>, raw: NonNull<()>);

    /// Extract the raw native pointer from an initialized slot.
    ///
    /// # Safety
    ///
    /// `slot` must have been initialized by [`Holder::construct`] and not yet destroyed.
    unsafe fn extract(&self, slot: NonNull<u8>) -> NonNull<()>;

    /// Destroy the slot contents.
    ///
    /// # Safety
    ///
    /// `slot` must be initialized and must not be used again afterwards.
    unsafe fn destroy(&self, slot: NonNull<u8>);

    /// Check if the slot is the only owner of its object.
    ///
    /// Mutable views are refused for objects that are not unique. The
    /// default only trusts raw mode.
    ///
    /// # Safety
    ///
    /// `slot` must have been initialized by [`Holder::construct`] and not yet destroyed.
    unsafe fn is_unique(&self, slot: NonNull<u8>) -> bool {
        let _ = slot;
        self.held_type().is_none()
    }
}

impl fmt::Debug for dyn Holder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Holder")
            .field("family", &self.family())
            .field("held_type", &self.held_type())
            .field("layout", &self.storage_layout())
            .finish()
    }
}

/// Raw mode: the slot stores a `*mut T` obtained from `Box::into_raw`.
pub struct RawHolder<T>(PhantomData<fn() -> T>);

impl<T> RawHolder<T> {
    /// Create the raw-mode holder for `T`.
    pub const fn new() -> Self {
        RawHolder(PhantomData)
    }
}

impl<T> Default for RawHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the slot stores the `Box::into_raw` pointer and nothing else.
unsafe impl<T: 'static> Holder for RawHolder<T> {
    fn held_type(&self) -> Option<TypeHash> {
        None
    }

    fn const_held_type(&self) -> Option<TypeHash> {
        None
    }

    fn storage_layout(&self) -> Layout {
        Layout::new::<*mut T>()
    }

    fn family(&self) -> &'static str {
        "raw"
    }

    fn into_raw(&self, value: Box<dyn Any>) -> Result<NonNull<()>, Box<dyn Any>> {
        let value = value.downcast::<T>()?;
        Ok(NonNull::from(Box::leak(value)).cast())
    }

    unsafe fn construct(&self, slot: NonNull<u8>, raw: NonNull<()>) {
        // SAFETY: slot is valid for a pointer-sized write per the contract.
        unsafe { slot.cast::<*mut T>().write(raw.cast::<T>().as_ptr()) }
    }

    unsafe fn extract(&self, slot: NonNull<u8>) -> NonNull<()> {
        // SAFETY: slot holds the non-null pointer written by `construct`.
        unsafe { NonNull::new_unchecked(slot.cast::<*mut T>().read()).cast() }
    }

    unsafe fn destroy(&self, slot: NonNull<u8>) {
        // SAFETY: the pointer came from `Box::into_raw` and is released once.
        unsafe {
            let raw = slot.cast::<*mut T>().read();
            drop(Box::from_raw(raw));
        }
    }
}

/// Held mode: the slot stores a `P` wrapping the native `T`.
pub struct SmartHolder<T, P>(PhantomData<fn() -> (T, P)>);

impl<T, P> SmartHolder<T, P> {
    /// Create the held-mode holder for `T` wrapped in `P`.
    pub const fn new() -> Self {
        SmartHolder(PhantomData)
    }
}

impl<T, P> Default for SmartHolder<T, P> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the slot stores a `P`, whose contract covers the pointer it yields.
unsafe impl<T: 'static, P: SmartPointer<T>> Holder for SmartHolder<T, P> {
    fn held_type(&self) -> Option<TypeHash> {
        Some(TypeHash::of::<P>())
    }

    fn const_held_type(&self) -> Option<TypeHash> {
        Some(TypeHash::of_const::<P>())
    }

    fn storage_layout(&self) -> Layout {
        Layout::new::<P>()
    }

    fn family(&self) -> &'static str {
        std::any::type_name::<P>()
    }

    fn into_raw(&self, value: Box<dyn Any>) -> Result<NonNull<()>, Box<dyn Any>> {
        let value = value.downcast::<T>()?;
        let raw = P::new(*value).into_raw();
        // SAFETY: smart pointers never hand out null.
        Ok(unsafe { NonNull::new_unchecked(raw) }.cast())
    }

    unsafe fn construct(&self, slot: NonNull<u8>, raw: NonNull<()>) {
        // SAFETY: slot is valid for a `P` write; raw has `P` provenance.
        unsafe {
            let held = P::from_raw(raw.cast::<T>().as_ptr());
            slot.cast::<P>().write(held);
        }
    }

    unsafe fn extract(&self, slot: NonNull<u8>) -> NonNull<()> {
        // SAFETY: slot holds an initialized `P`.
        unsafe {
            let held = &*slot.cast::<P>().as_ptr();
            NonNull::new_unchecked(held.get_pointer()).cast()
        }
    }

    unsafe fn destroy(&self, slot: NonNull<u8>) {
        // SAFETY: slot holds an initialized `P` that is dropped exactly once.
        unsafe { std::ptr::drop_in_place(slot.cast::<P>().as_ptr()) }
    }

    unsafe fn is_unique(&self, slot: NonNull<u8>) -> bool {
        // SAFETY: slot holds an initialized `P`.
        unsafe { (*slot.cast::<P>().as_ptr()).is_unique() }
    }
}
