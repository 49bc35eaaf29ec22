//! Runtime call dispatch and object identity for native classes exposed to a
//! dynamic scripting runtime.
//!
//! The host describes each native type with a [`ClassBuilder`] (methods,
//! properties, operators, constructors, base classes and an optional smart
//! pointer holder) and publishes it into an [`Engine`]. Scripts then call
//! into native objects by name; the engine walks the inheritance graph,
//! scores every candidate overload against the dynamic arguments, casts the
//! receiver to the owning base and invokes the winning thunk.
//!
//! ## Layers
//!
//! ```text
//! nativebind-core   TypeHash, ParamType, OperatorKind, Holder, errors
//! class             ClassBuilder -> ClassDescriptor, cast graph walks
//! registry          identity -> descriptor, publish-time validation
//! overload          per-candidate matching, cost ranking, diagnostics
//! engine            method / operator / constructor / property dispatch
//! ```

mod class;
mod config;
mod convert;
mod engine;
mod native_fn;
mod object;
pub mod overload;
mod registry;
mod value;

pub use nativebind_core::{
    ArgKind, ConversionError, DispatchError, Holder, MismatchReason, NativeError, OperatorKind,
    ParamType, PrimitiveKind, RawHolder, RegistrationError, SmartHolder, SmartPointer, TypeHash,
};

pub use class::{
    BaseEdge, CastPath, ClassBuilder, ClassDescriptor, MemberHit, PropertyEntry, apply_offset,
};
pub use config::{EngineConfig, EngineProperty};
pub use convert::{Converter, ConverterTable, IntToFloat};
pub use engine::{Callee, Engine, Selector};
pub use native_fn::{CallContext, NativeCallable, NativeFn};
pub use object::{ObjectFlags, ObjectHandle, ObjectRef, ObjectRefMut};
pub use overload::{ArgConversion, ArgMatch, Overload, OverloadMatch};
pub use registry::ClassRegistry;
pub use value::{FromValue, IntoValue, Value};
