//! Script-owned native objects.
//!
//! An [`ObjectHandle`] is the engine's half of a script userdata: a block of
//! storage sized by the class holder, the holder constructed in it, and the
//! class descriptor. In raw mode the storage holds a pointer that the handle
//! owns; in held mode it holds the smart pointer itself and the pointer family
//! decides when the object dies.
//!
//! Native views of an object are handed out as [`ObjectRef`] and
//! [`ObjectRefMut`] guards. The handle counts them like a `RefCell`: any
//! number of shared views, or one mutable view, at a time. A mutable view is
//! also refused while the holder shares the object with another owner.

use std::alloc::{self, Layout};
use std::any::type_name;
use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;
use std::sync::Arc;

use bitflags::bitflags;
use nativebind_core::{NativeError, TypeHash};

use crate::class::{ClassDescriptor, apply_offset};

bitflags! {
    /// Per-handle state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ObjectFlags: u8 {
        /// The script may only use the const interface.
        const CONST = 1 << 0;
        /// Storage holds a smart pointer rather than a raw pointer.
        const HELD = 1 << 1;
    }
}

/// Storage and class record of one script-visible native object.
pub struct ObjectHandle {
    storage: NonNull<u8>,
    layout: Layout,
    class: Arc<ClassDescriptor>,
    flags: ObjectFlags,
    /// Number of shared views, or `-1` while a mutable view is out.
    borrow: Cell<isize>,
}

impl ObjectHandle {
    /// Move `value` into a new object of `class`.
    ///
    /// The value is handed to the class holder, so in held mode it is wrapped
    /// in the class's smart pointer.
    pub fn new<T: 'static>(
        class: Arc<ClassDescriptor>,
        value: T,
        is_const: bool,
    ) -> Result<Self, NativeError> {
        if class.type_hash() != TypeHash::of::<T>() {
            return Err(NativeError::ThisTypeMismatch {
                expected: type_name::<T>(),
                actual: class.name().to_string(),
            });
        }
        let Ok(raw) = class.holder().into_raw(Box::new(value)) else {
            let message = format!("holder of '{}' rejected the value", class.name());
            return Err(NativeError::other(message));
        };
        // SAFETY: `raw` was produced by this class's holder.
        Ok(unsafe { Self::adopt(class, raw, is_const) })
    }

    /// Take ownership of an already-allocated native object.
    ///
    /// # Safety
    ///
    /// `raw` must point to a live object of `class`'s native type and carry the
    /// provenance the class holder expects: from `Box::into_raw` in raw mode,
    /// or from the smart pointer family's `into_raw` in held mode. Ownership of
    /// that allocation passes to the handle.
    pub unsafe fn adopt(class: Arc<ClassDescriptor>, raw: NonNull<()>, is_const: bool) -> Self {
        let layout = class.holder().storage_layout();
        // SAFETY: publish rejects holders with a zero-size layout.
        let storage = unsafe { alloc::alloc(layout) };
        let Some(storage) = NonNull::new(storage) else {
            alloc::handle_alloc_error(layout);
        };
        // SAFETY: fresh storage with the holder's own layout, and the caller
        // vouches for `raw`.
        unsafe { class.holder().construct(storage, raw) };

        let mut flags = ObjectFlags::empty();
        flags.set(ObjectFlags::CONST, is_const);
        flags.set(ObjectFlags::HELD, class.is_held());
        Self {
            storage,
            layout,
            class,
            flags,
            borrow: Cell::new(0),
        }
    }

    /// Class of the object.
    pub fn class(&self) -> &Arc<ClassDescriptor> {
        &self.class
    }

    /// Handle state flags.
    pub fn flags(&self) -> ObjectFlags {
        self.flags
    }

    /// Check if the script holds this object through its const interface.
    pub fn is_const(&self) -> bool {
        self.flags.contains(ObjectFlags::CONST)
    }

    /// Check if the storage holds a smart pointer.
    pub fn is_held(&self) -> bool {
        self.flags.contains(ObjectFlags::HELD)
    }

    /// Pointer to the native object, read through the holder.
    pub fn raw_ptr(&self) -> NonNull<()> {
        // SAFETY: storage was constructed by this class's holder and lives
        // until drop.
        unsafe { self.class.holder().extract(self.storage) }
    }

    /// Pointer to the `target` sub-object, or `None` if `target` is neither
    /// the object's class nor one of its bases.
    pub fn ptr_as(&self, target: TypeHash) -> Option<NonNull<()>> {
        let offset = self.class.cast(target)?;
        // SAFETY: the offset comes from this object's own class.
        Some(unsafe { apply_offset(self.raw_ptr(), offset) })
    }

    /// Shared view of the object as `T`.
    ///
    /// `T` may be the object's class or any registered base of it. Fails if a
    /// mutable view is currently out.
    pub fn get<T: 'static>(&self) -> Result<ObjectRef<'_, T>, NativeError> {
        let ptr = self.typed_ptr::<T>()?;
        // SAFETY: the cast found a `T` sub-object at this address.
        unsafe { self.borrow_at(ptr) }
    }

    /// Mutable view of the object as `T`.
    ///
    /// Fails for const objects, while any other view is out, and while the
    /// holder shares the object with another owner.
    pub fn get_mut<T: 'static>(&self) -> Result<ObjectRefMut<'_, T>, NativeError> {
        if self.is_const() {
            return Err(NativeError::ConstViolation {
                what: format!("'{}' object", self.class.name()),
            });
        }
        let ptr = self.typed_ptr::<T>()?;
        // SAFETY: the cast found a `T` sub-object at this address.
        unsafe { self.borrow_mut_at(ptr) }
    }

    /// Check if a native view of the object is currently out.
    pub fn is_borrowed(&self) -> bool {
        self.borrow.get() != 0
    }

    /// Check if the holder is the only owner of the object.
    pub fn is_unique(&self) -> bool {
        // SAFETY: storage was constructed by this class's holder.
        unsafe { self.class.holder().is_unique(self.storage) }
    }

    fn typed_ptr<T: 'static>(&self) -> Result<NonNull<()>, NativeError> {
        self.ptr_as(TypeHash::of::<T>())
            .ok_or_else(|| NativeError::ThisTypeMismatch {
                expected: type_name::<T>(),
                actual: self.class.name().to_string(),
            })
    }

    /// Register a shared view of the sub-object at `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must address a `T` sub-object of this handle's object.
    pub(crate) unsafe fn borrow_at<T>(
        &self,
        ptr: NonNull<()>,
    ) -> Result<ObjectRef<'_, T>, NativeError> {
        let views = self.borrow.get();
        if views < 0 {
            return Err(self.conflict("already mutably borrowed"));
        }
        self.borrow.set(views + 1);
        Ok(ObjectRef {
            ptr: ptr.cast(),
            borrow: &self.borrow,
            _marker: PhantomData,
        })
    }

    /// Register the mutable view of the sub-object at `ptr`. Constness is
    /// checked by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must address a `T` sub-object of this handle's object.
    pub(crate) unsafe fn borrow_mut_at<T>(
        &self,
        ptr: NonNull<()>,
    ) -> Result<ObjectRefMut<'_, T>, NativeError> {
        if self.borrow.get() != 0 {
            return Err(self.conflict("already borrowed"));
        }
        if !self.is_unique() {
            return Err(self.conflict("shared with another owner"));
        }
        self.borrow.set(-1);
        Ok(ObjectRefMut {
            ptr: ptr.cast(),
            borrow: &self.borrow,
            _marker: PhantomData,
        })
    }

    fn conflict(&self, state: &'static str) -> NativeError {
        NativeError::BorrowConflict {
            class: self.class.name().to_string(),
            state,
        }
    }

    /// Identity of the holder storage. Two handles over the same held
    /// object have different storage but the same [`raw_ptr`](Self::raw_ptr).
    pub fn storage_ptr(&self) -> NonNull<u8> {
        self.storage
    }
}

impl Drop for ObjectHandle {
    fn drop(&mut self) {
        // SAFETY: constructed in `adopt`, destroyed exactly once here, then
        // freed with the layout it was allocated with.
        unsafe {
            self.class.holder().destroy(self.storage);
            alloc::dealloc(self.storage.as_ptr(), self.layout);
        }
    }
}

impl fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("class", &self.class.name())
            .field("flags", &self.flags)
            .field("borrow", &self.borrow.get())
            .field("ptr", &self.raw_ptr())
            .finish()
    }
}

/// Shared view of a native object, released on drop.
pub struct ObjectRef<'a, T> {
    ptr: NonNull<T>,
    borrow: &'a Cell<isize>,
    _marker: PhantomData<&'a T>,
}

impl<T> Deref for ObjectRef<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the handle counts this view, so no mutable view exists.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> Drop for ObjectRef<'_, T> {
    fn drop(&mut self) {
        self.borrow.set(self.borrow.get() - 1);
    }
}

impl<T> fmt::Debug for ObjectRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRef").field(&self.ptr).finish()
    }
}

/// Exclusive view of a native object, released on drop.
pub struct ObjectRefMut<'a, T> {
    ptr: NonNull<T>,
    borrow: &'a Cell<isize>,
    _marker: PhantomData<&'a mut T>,
}

impl<T> Deref for ObjectRefMut<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: this is the only view the handle handed out.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T> DerefMut for ObjectRefMut<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: this is the only view the handle handed out.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T> Drop for ObjectRefMut<'_, T> {
    fn drop(&mut self) {
        self.borrow.set(0);
    }
}

impl<T> fmt::Debug for ObjectRefMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectRefMut").field(&self.ptr).finish()
    }
}
