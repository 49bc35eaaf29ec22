//! Core types shared by the nativebind dispatch engine.
//!
//! This crate holds the leaf vocabulary of the engine: type identities,
//! argument and parameter kinds, operator kinds, the held-type capability
//! interface and the error taxonomy. It knows nothing about class descriptors
//! or the registry.

mod error;
mod holder;
mod kind;
mod operator;
mod type_hash;

pub use error::{ConversionError, DispatchError, MismatchReason, NativeError, RegistrationError};
pub use holder::{Holder, RawHolder, SmartHolder, SmartPointer};
pub use kind::{ArgKind, ParamType, PrimitiveKind};
pub use operator::OperatorKind;
pub use type_hash::{TypeHash, hash_constants};
