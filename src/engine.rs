//! Host-facing dispatch engine.
//!
//! The [`Engine`] owns the class registry, the converter table and the
//! configuration. Hosts publish classes into it, push native objects, and
//! route every script-side call on a native object through [`Engine::call`]
//! or one of its convenience wrappers.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = Engine::new();
//! engine.publish(ClassBuilder::<Shape>::new("Shape"))?;
//! let shape = engine.push_object(Shape::default())?;
//! let area = engine.call_method(&shape, "area", &[])?;
//! ```

use std::any::type_name;
use std::fmt;
use std::ptr::NonNull;
use std::sync::Arc;

use nativebind_core::{
    DispatchError, NativeError, OperatorKind, RegistrationError, SmartPointer, TypeHash,
};

use crate::class::{ClassBuilder, ClassDescriptor, apply_offset};
use crate::config::{EngineConfig, EngineProperty};
use crate::convert::{Converter, ConverterTable};
use crate::native_fn::{CallContext, Receiver};
use crate::object::ObjectHandle;
use crate::overload::{
    Candidate, MatchOptions, Overload, OverloadMatch, ReceiverMatch, ResolveEnv, resolve,
};
use crate::registry::ClassRegistry;
use crate::value::Value;

mod operators;

/// What a call asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<'s> {
    /// A named method.
    Method(&'s str),
    /// An operator. The callee is operand 0 and the arguments follow it.
    Operator(OperatorKind),
    /// A constructor of the callee class.
    Constructor,
}

/// The target of a call.
#[derive(Debug, Clone, Copy)]
pub enum Callee<'v> {
    /// A script value, normally a native object.
    Value(&'v Value),
    /// A class by identity, for constructors.
    Class(TypeHash),
}

/// The runtime call-dispatch engine.
#[derive(Default)]
pub struct Engine {
    registry: ClassRegistry,
    converters: ConverterTable,
    config: EngineConfig,
}

impl Engine {
    /// Create an engine with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the given configuration.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Current configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Set an engine property by id.
    ///
    /// [`EngineProperty::StrictOverloads`] only affects classes published
    /// afterwards.
    pub fn set_engine_property(&mut self, property: EngineProperty, value: usize) {
        self.config.set(property, value);
    }

    /// Get an engine property by id.
    pub fn get_engine_property(&self, property: EngineProperty) -> usize {
        self.config.get(property)
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Validate and publish a class.
    pub fn publish<T: 'static>(
        &mut self,
        builder: ClassBuilder<T>,
    ) -> Result<Arc<ClassDescriptor>, RegistrationError> {
        self.registry.publish(builder, &self.config)
    }

    /// Register a converter for parameters whose identity is `target`.
    pub fn register_converter(&mut self, target: TypeHash, converter: impl Converter + 'static) {
        self.converters.register(target, converter);
    }

    /// The class registry.
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// The converter table.
    pub fn converters(&self) -> &ConverterTable {
        &self.converters
    }

    // =========================================================================
    // Host primitives
    // =========================================================================

    /// Move `value` into a new script object of its registered class.
    pub fn push_object<T: 'static>(&self, value: T) -> Result<Value, NativeError> {
        self.push(value, false)
    }

    /// Like [`push_object`](Self::push_object), but the script only sees the
    /// const interface.
    pub fn push_const_object<T: 'static>(&self, value: T) -> Result<Value, NativeError> {
        self.push(value, true)
    }

    fn push<T: 'static>(&self, value: T, is_const: bool) -> Result<Value, NativeError> {
        let class = self.class_for::<T>()?;
        Ok(Value::object(ObjectHandle::new(class, value, is_const)?))
    }

    /// Adopt an already-allocated native object.
    ///
    /// # Safety
    ///
    /// `raw` must carry the provenance the class holder expects (see
    /// [`ObjectHandle::adopt`]) and ownership passes to the script object.
    pub unsafe fn push_raw<T: 'static>(
        &self,
        raw: NonNull<T>,
        is_const: bool,
    ) -> Result<Value, NativeError> {
        let class = self.class_for::<T>()?;
        // SAFETY: forwarded to the caller.
        let handle = unsafe { ObjectHandle::adopt(class, raw.cast(), is_const) };
        Ok(Value::object(handle))
    }

    /// Share a host-owned smart pointer with the script.
    ///
    /// The class is looked up through the held identity of `P`, so `T` must be
    /// published with `held_by::<P>()`. The script object and the host then
    /// co-own the native object; it dies when the last owner lets go. While
    /// the host keeps another owner, thunks only get shared views of it.
    pub fn push_held<T, P>(&self, pointer: P) -> Result<Value, NativeError>
    where
        T: 'static,
        P: SmartPointer<T>,
    {
        self.adopt_held::<T, P>(pointer, TypeHash::of::<P>())
    }

    /// Like [`push_held`](Self::push_held), but the class is looked up through
    /// the const-held identity of `P` and the script only sees the const
    /// interface.
    pub fn push_const_held<T, P>(&self, pointer: P) -> Result<Value, NativeError>
    where
        T: 'static,
        P: SmartPointer<T>,
    {
        self.adopt_held::<T, P>(pointer, TypeHash::of_const::<P>())
    }

    fn adopt_held<T, P>(&self, pointer: P, identity: TypeHash) -> Result<Value, NativeError>
    where
        T: 'static,
        P: SmartPointer<T>,
    {
        let class = self
            .registry
            .find(identity)
            .cloned()
            .ok_or(NativeError::UnregisteredType {
                type_name: type_name::<P>(),
            })?;
        let holder = class.holder();
        let held_by_pointer = holder.held_type() == Some(TypeHash::of::<P>());
        if !held_by_pointer || class.type_hash() != TypeHash::of::<T>() {
            return Err(NativeError::ThisTypeMismatch {
                expected: type_name::<P>(),
                actual: class.name().to_string(),
            });
        }
        let is_const = holder.const_held_type() == Some(identity);
        let Some(raw) = NonNull::new(pointer.into_raw()) else {
            return Err(NativeError::other("smart pointer released a null pointer"));
        };
        // SAFETY: the class is held by `P` and `raw` comes from `P::into_raw`.
        let handle = unsafe { ObjectHandle::adopt(class, raw.cast(), is_const) };
        Ok(Value::object(handle))
    }

    fn class_for<T: 'static>(&self) -> Result<Arc<ClassDescriptor>, NativeError> {
        self.registry
            .find(TypeHash::of::<T>())
            .cloned()
            .ok_or(NativeError::UnregisteredType {
                type_name: type_name::<T>(),
            })
    }

    /// Class of a native object value registered in this engine.
    pub fn class_of<'v>(&self, value: &'v Value) -> Option<&'v Arc<ClassDescriptor>> {
        value
            .class()
            .filter(|class| self.registry.contains(class.type_hash()))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Dispatch a call.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call(
        &self,
        callee: Callee<'_>,
        selector: Selector<'_>,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        match (selector, callee) {
            (Selector::Method(name), Callee::Value(receiver)) => {
                self.call_method(receiver, name, args)
            }
            (Selector::Operator(kind), Callee::Value(receiver)) => {
                let mut operands = Vec::with_capacity(args.len() + 1);
                operands.push(receiver.clone());
                operands.extend_from_slice(args);
                self.call_operator(kind, &operands)
            }
            (Selector::Constructor, Callee::Class(class)) => self.construct(class, args),
            (Selector::Constructor, Callee::Value(value)) => match value.class() {
                Some(class) => self.construct(class.type_hash(), args),
                None => Err(DispatchError::NotAnObject {
                    selector: "constructor".to_string(),
                    actual: value.type_name(),
                }),
            },
            (Selector::Method(name), Callee::Class(_)) => Err(DispatchError::NotAnObject {
                selector: name.to_string(),
                actual: "class",
            }),
            (Selector::Operator(kind), Callee::Class(_)) => Err(DispatchError::NotAnObject {
                selector: kind.to_string(),
                actual: "class",
            }),
        }
    }

    /// Call a method on a native object, searching its bases too.
    pub fn call_method(
        &self,
        receiver: &Value,
        name: &str,
        args: &[Value],
    ) -> Result<Value, DispatchError> {
        let handle = self.receiver(receiver, name)?;
        let class = handle.class();
        let hits = class.find_methods(name);
        if hits.is_empty() {
            return Err(DispatchError::UnknownMember {
                class: class.name().to_string(),
                member: name.to_string(),
            });
        }

        let candidates: Vec<Candidate<'_>> = hits
            .iter()
            .map(|hit| Candidate {
                owner: hit.owner.type_hash(),
                overload: hit.member,
                receiver: Some(ReceiverMatch {
                    handle,
                    path: hit.path,
                }),
            })
            .collect();
        let selector = format!("{}:{}", class.name(), name);
        let resolved = resolve(&selector, &candidates, args, self.env())?;

        let hit = &hits[resolved.index];
        let receiver = Receiver {
            handle,
            // SAFETY: the path was found on the receiver's own class.
            ptr: unsafe { apply_offset(handle.raw_ptr(), hit.path.offset) },
            class: hit.owner.type_hash(),
        };
        self.invoke(hit.member, Some(receiver), args, &resolved.matched)
    }

    /// Construct a new object of `class`.
    pub fn construct(&self, class: TypeHash, args: &[Value]) -> Result<Value, DispatchError> {
        let descriptor = self
            .registry
            .find(class)
            .ok_or_else(|| DispatchError::UnregisteredType {
                type_name: self.registry.class_name(class),
            })?;
        if descriptor.constructors().is_empty() {
            return Err(DispatchError::UnknownMember {
                class: descriptor.name().to_string(),
                member: "constructor".to_string(),
            });
        }

        let candidates: Vec<Candidate<'_>> = descriptor
            .constructors()
            .iter()
            .map(|overload| Candidate {
                owner: descriptor.type_hash(),
                overload,
                receiver: None,
            })
            .collect();
        let selector = format!("{}:constructor", descriptor.name());
        let resolved = resolve(&selector, &candidates, args, self.env())?;
        self.invoke(resolved.candidate.overload, None, args, &resolved.matched)
    }

    /// Read a property, searching bases too.
    pub fn get_property(&self, object: &Value, name: &str) -> Result<Value, DispatchError> {
        let handle = self.receiver(object, name)?;
        let class = handle.class();
        let hit = class
            .find_property(name)
            .ok_or_else(|| DispatchError::UnknownMember {
                class: class.name().to_string(),
                member: name.to_string(),
            })?;
        let receiver = Receiver {
            handle,
            // SAFETY: the path was found on the receiver's own class.
            ptr: unsafe { apply_offset(handle.raw_ptr(), hit.path.offset) },
            class: hit.owner.type_hash(),
        };
        let mut ctx = CallContext::new(self, Some(receiver), &[], &[]);
        Ok(hit.member.getter.call(&mut ctx)?)
    }

    /// Write a property, searching bases too.
    pub fn set_property(
        &self,
        object: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), DispatchError> {
        let handle = self.receiver(object, name)?;
        let class = handle.class();
        let hit = class
            .find_property(name)
            .ok_or_else(|| DispatchError::UnknownMember {
                class: class.name().to_string(),
                member: name.to_string(),
            })?;
        let Some(setter) = &hit.member.setter else {
            return Err(DispatchError::ReadOnlyProperty {
                class: class.name().to_string(),
                property: name.to_string(),
            });
        };
        if handle.is_const() {
            return Err(DispatchError::ConstViolation {
                class: class.name().to_string(),
                member: name.to_string(),
            });
        }

        let receiver = Receiver {
            handle,
            // SAFETY: the path was found on the receiver's own class.
            ptr: unsafe { apply_offset(handle.raw_ptr(), hit.path.offset) },
            class: hit.owner.type_hash(),
        };
        let args = [value];
        let mut ctx = CallContext::new(self, Some(receiver), &args, &[]);
        setter.call(&mut ctx)?;
        Ok(())
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// The object behind a receiver value, checked against this registry.
    pub(crate) fn receiver<'v>(
        &self,
        value: &'v Value,
        selector: &str,
    ) -> Result<&'v ObjectHandle, DispatchError> {
        let Value::Object(handle) = value else {
            return Err(DispatchError::NotAnObject {
                selector: selector.to_string(),
                actual: value.type_name(),
            });
        };
        let class = handle.class();
        if !self.registry.contains(class.type_hash()) {
            return Err(DispatchError::UnregisteredType {
                type_name: class.name().to_string(),
            });
        }
        Ok(handle)
    }

    pub(crate) fn env(&self) -> ResolveEnv<'_> {
        ResolveEnv {
            registry: &self.registry,
            converters: &self.converters,
            options: MatchOptions::from(&self.config),
        }
    }

    pub(crate) fn invoke(
        &self,
        overload: &Overload,
        receiver: Option<Receiver<'_>>,
        args: &[Value],
        matched: &OverloadMatch,
    ) -> Result<Value, DispatchError> {
        let mut ctx = CallContext::new(self, receiver, args, &matched.args);
        Ok(overload.thunk().call(&mut ctx)?)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("converters", &self.converters)
            .field("config", &self.config)
            .finish()
    }
}
