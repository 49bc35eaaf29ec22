//! Native function storage and execution context.
//!
//! Every method, operator, property accessor and constructor is stored as a
//! type-erased [`NativeFn`]. When an overload wins, the engine builds a
//! [`CallContext`] over the receiver and arguments and invokes it.

use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use nativebind_core::{NativeError, TypeHash};

use crate::class::apply_offset;
use crate::engine::Engine;
use crate::object::{ObjectHandle, ObjectRef, ObjectRefMut};
use crate::overload::ArgMatch;
use crate::registry::ClassRegistry;
use crate::value::{FromValue, Value};

/// Type-erased native function.
///
/// The inner callable is wrapped in `Arc` so descriptors can be cloned cheaply.
#[derive(Clone)]
pub struct NativeFn {
    inner: Arc<dyn NativeCallable + Send + Sync>,
}

impl NativeFn {
    /// Create a new NativeFn from a callable.
    pub fn new<F>(f: F) -> Self
    where
        F: NativeCallable + Send + Sync + 'static,
    {
        Self { inner: Arc::new(f) }
    }

    /// Call this native function with the given context.
    pub fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
        self.inner.call(ctx)
    }
}

impl fmt::Debug for NativeFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFn").finish_non_exhaustive()
    }
}

/// Trait for callable native functions.
pub trait NativeCallable {
    /// Call this function with the given context.
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value, NativeError>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut CallContext<'_>) -> Result<Value, NativeError>,
{
    fn call(&self, ctx: &mut CallContext<'_>) -> Result<Value, NativeError> {
        (self)(ctx)
    }
}

/// The receiver of a method or property call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Receiver<'a> {
    pub(crate) handle: &'a ObjectHandle,
    /// Receiver pointer already adjusted to `class`.
    pub(crate) ptr: NonNull<()>,
    /// The class that registered the member being called.
    pub(crate) class: TypeHash,
}

/// Context for native function calls.
///
/// Gives a thunk typed access to its receiver and arguments. Object arguments
/// are viewed through the inheritance graph, so a thunk that declared a base
/// parameter can read a derived object as that base.
pub struct CallContext<'a> {
    engine: &'a Engine,
    this: Option<Receiver<'a>>,
    args: &'a [Value],
    matches: &'a [ArgMatch],
}

impl<'a> CallContext<'a> {
    pub(crate) fn new(
        engine: &'a Engine,
        this: Option<Receiver<'a>>,
        args: &'a [Value],
        matches: &'a [ArgMatch],
    ) -> Self {
        Self {
            engine,
            this,
            args,
            matches,
        }
    }

    /// Get the number of arguments (excluding `this` for methods).
    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Get the argument as the thunk should see it: the converter output when
    /// a converter accepted it, the original value otherwise.
    pub fn value(&self, index: usize) -> Result<&'a Value, NativeError> {
        let converted = self.matches.get(index).and_then(ArgMatch::converted);
        match converted {
            Some(value) => Ok(value),
            None => self.raw_value(index),
        }
    }

    /// Get the argument exactly as the caller passed it.
    pub fn raw_value(&self, index: usize) -> Result<&'a Value, NativeError> {
        self.args
            .get(index)
            .ok_or(NativeError::ArgumentIndexOutOfBounds {
                index,
                count: self.arg_count(),
            })
    }

    /// Get a typed argument at the given index.
    pub fn arg<T: FromValue>(&self, index: usize) -> Result<T, NativeError> {
        T::from_value(self.value(index)?).map_err(NativeError::from)
    }

    /// Get an object argument viewed as `T`.
    ///
    /// `T` may be the argument's class or any base of it. The view counts as a
    /// shared borrow of the object until it is dropped.
    pub fn object<T: 'static>(&self, index: usize) -> Result<ObjectRef<'a, T>, NativeError> {
        let (handle, ptr) = self.object_ptr::<T>(index)?;
        // SAFETY: the cast found a `T` sub-object of the argument.
        unsafe { handle.borrow_at(ptr) }
    }

    /// Get a mutable view of an object argument as `T`.
    ///
    /// Fails with [`NativeError::ConstViolation`] if the argument is const and
    /// with [`NativeError::BorrowConflict`] while any other view of the same
    /// object is alive, including the receiver's.
    pub fn object_mut<T: 'static>(&self, index: usize) -> Result<ObjectRefMut<'a, T>, NativeError> {
        let (handle, ptr) = self.object_ptr::<T>(index)?;
        if handle.is_const() {
            return Err(NativeError::ConstViolation {
                what: format!("argument {index}"),
            });
        }
        // SAFETY: the cast found a `T` sub-object of the argument.
        unsafe { handle.borrow_mut_at(ptr) }
    }

    fn object_ptr<T: 'static>(
        &self,
        index: usize,
    ) -> Result<(&'a ObjectHandle, NonNull<()>), NativeError> {
        let value = self.value(index)?;
        let Value::Object(handle) = value else {
            return Err(NativeError::ArgumentTypeMismatch {
                index,
                expected: type_name::<T>(),
                actual: value.describe(),
            });
        };
        let ptr = handle
            .ptr_as(TypeHash::of::<T>())
            .ok_or_else(|| NativeError::ArgumentTypeMismatch {
                index,
                expected: type_name::<T>(),
                actual: value.describe(),
            })?;
        Ok((&**handle, ptr))
    }

    /// Get `this` reference for methods (immutable).
    ///
    /// The receiver is already adjusted to the class that registered the
    /// member; asking for any other class in the receiver's ancestry casts
    /// from the receiver's own class.
    pub fn this<T: 'static>(&self) -> Result<ObjectRef<'a, T>, NativeError> {
        let (handle, ptr) = self.this_ptr::<T>()?;
        // SAFETY: `ptr` addresses a `T` sub-object of the live receiver.
        unsafe { handle.borrow_at(ptr) }
    }

    /// Get `this` reference for methods (mutable).
    ///
    /// Only one mutable view of an object can be alive at a time. A thunk that
    /// re-enters the engine on its own receiver must drop the view first.
    pub fn this_mut<T: 'static>(&self) -> Result<ObjectRefMut<'a, T>, NativeError> {
        let (handle, ptr) = self.this_ptr::<T>()?;
        if handle.is_const() {
            return Err(NativeError::ConstViolation {
                what: format!("'this' of {}", handle.class().name()),
            });
        }
        // SAFETY: `ptr` addresses a `T` sub-object of the live receiver.
        unsafe { handle.borrow_mut_at(ptr) }
    }

    fn this_ptr<T: 'static>(&self) -> Result<(&'a ObjectHandle, NonNull<()>), NativeError> {
        let receiver = self
            .this
            .ok_or_else(|| NativeError::invalid_this("not a method call"))?;
        let target = TypeHash::of::<T>();
        if receiver.class == target {
            return Ok((receiver.handle, receiver.ptr));
        }
        let class = receiver.handle.class();
        match class.cast(target) {
            Some(offset) => {
                // SAFETY: offset computed on the receiver's own class.
                let ptr = unsafe { apply_offset(receiver.handle.raw_ptr(), offset) };
                Ok((receiver.handle, ptr))
            }
            None => Err(NativeError::ThisTypeMismatch {
                expected: type_name::<T>(),
                actual: class.name().to_string(),
            }),
        }
    }

    /// Check if this call has a receiver.
    pub fn has_this(&self) -> bool {
        self.this.is_some()
    }

    /// Wrap a native value in a new script object of its registered class.
    pub fn new_object<T: 'static>(&self, value: T) -> Result<Value, NativeError> {
        self.engine.push_object(value)
    }

    /// The engine running this call. Thunks may dispatch nested calls through it.
    pub fn engine(&self) -> &'a Engine {
        self.engine
    }

    /// Class registry of the running engine.
    pub fn registry(&self) -> &'a ClassRegistry {
        self.engine.registry()
    }
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("arg_count", &self.arg_count())
            .field("has_this", &self.has_this())
            .finish()
    }
}
