//! Error types for registration and dispatch.
//!
//! ## Error Hierarchy
//!
//! ```text
//! RegistrationError   - build/publish of class descriptors
//! DispatchError       - everything a call can fail with at runtime
//! ├── NoMatch / Ambiguous   (overload selection, with candidate lists)
//! ├── UnregisteredType / UnknownMember / ReadOnlyProperty / ...
//! └── Native(NativeError)   - raised inside a native thunk
//!     └── Conversion(ConversionError)
//! MismatchReason      - why one candidate overload was rejected
//! ```
//!
//! Every dispatch-time failure is a value: the host receives a single
//! [`DispatchError`] and reports it to the script author.

use thiserror::Error;

use crate::{OperatorKind, TypeHash};

// ============================================================================
// Conversion Errors
// ============================================================================

/// Errors that can occur when converting between native and dynamic values.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConversionError {
    /// Type mismatch during conversion
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    /// Integer overflow during conversion
    #[error("integer overflow: value {value} does not fit in {target_type}")]
    IntegerOverflow {
        value: i64,
        target_type: &'static str,
    },

    /// Generic conversion failure
    #[error("conversion failed: {message}")]
    Failed { message: String },
}

// ============================================================================
// Native Errors
// ============================================================================

/// Errors raised while a native thunk runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NativeError {
    /// Error converting arguments or return values
    #[error("conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Invalid `this` reference for method call
    #[error("invalid 'this' reference: {message}")]
    InvalidThis { message: String },

    /// Argument index out of bounds
    #[error("argument index {index} out of bounds (call has {count} arguments)")]
    ArgumentIndexOutOfBounds { index: usize, count: usize },

    /// `this` is not viewable as the requested native type
    #[error("'this' type mismatch: expected {expected}, got {actual}")]
    ThisTypeMismatch {
        expected: &'static str,
        actual: String,
    },

    /// An object argument is not viewable as the requested native type
    #[error("argument {index} type mismatch: expected {expected}, got {actual}")]
    ArgumentTypeMismatch {
        index: usize,
        expected: &'static str,
        actual: String,
    },

    /// A mutable view of a const object was requested
    #[error("cannot mutate const {what}")]
    ConstViolation { what: String },

    /// The object already has a conflicting view, or is shared with another
    /// owner and cannot be viewed mutably
    #[error("cannot borrow '{class}' object: {state}")]
    BorrowConflict { class: String, state: &'static str },

    /// A native type without a registered class was pushed
    #[error("native type {type_name} is not registered")]
    UnregisteredType { type_name: &'static str },

    /// Generic native error
    #[error("native error: {message}")]
    Other { message: String },
}

impl NativeError {
    /// Create an "invalid this" error with a message.
    pub fn invalid_this(message: impl Into<String>) -> Self {
        NativeError::InvalidThis {
            message: message.into(),
        }
    }

    /// Create a generic native error.
    pub fn other(message: impl Into<String>) -> Self {
        NativeError::Other {
            message: message.into(),
        }
    }
}

// ============================================================================
// Registration Errors
// ============================================================================

/// Errors raised while publishing a class descriptor.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistrationError {
    /// A base edge names a class that has not been published.
    #[error("class '{class}' derives from unregistered base {base}")]
    UnknownBase { class: String, base: TypeHash },

    /// The holder violates the held-type invariants.
    #[error("class '{class}' has an invalid holder: {reason}")]
    InvalidHolder { class: String, reason: String },

    /// An operator overload is malformed for its kind.
    #[error("class '{class}' registers an invalid {operator}: {reason}")]
    InvalidOperator {
        class: String,
        operator: OperatorKind,
        reason: String,
    },

    /// Strict mode found two overloads with an indistinguishable signature.
    #[error("class '{class}' registers '{selector}' twice with signature {signature}")]
    DuplicateOverload {
        class: String,
        selector: String,
        signature: String,
    },

    /// The type identity is already bound to a published class.
    #[error("class '{class}' is already published")]
    AlreadyPublished { class: String },
}

// ============================================================================
// Dispatch Errors
// ============================================================================

/// Why a single candidate overload rejected the call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MismatchReason {
    /// Wrong number of arguments.
    #[error("expects {expected} arguments, got {got}")]
    Arity { expected: usize, got: usize },

    /// The argument kind differs from the parameter kind.
    #[error("argument {index}: expected {expected}, got {actual}")]
    Kind {
        index: usize,
        expected: String,
        actual: String,
    },

    /// No base-edge path leads from the argument's class to the parameter's class.
    #[error("argument {index}: no cast path from {from} to {to}")]
    NoCastPath {
        index: usize,
        from: String,
        to: String,
    },

    /// Several distinct base paths lead to the parameter's class (strict casts only).
    #[error("argument {index}: ambiguous cast to {to} (offsets {offsets:?})")]
    AmbiguousCast {
        index: usize,
        to: String,
        offsets: Vec<isize>,
    },

    /// A const argument was passed to a mutable parameter.
    #[error("argument {index}: const object passed to non-const parameter")]
    ConstArgument { index: usize },

    /// A non-const method was called on a const receiver.
    #[error("non-const method called on const object")]
    ConstReceiver,
}

/// A dispatch failure returned across the host boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// No overload accepts the given arguments.
    #[error("no matching overload for {selector}{arguments}\ncandidates:{}", format_candidates(.candidates))]
    NoMatch {
        selector: String,
        arguments: String,
        candidates: Vec<String>,
    },

    /// Two or more overloads tie for the lowest cost. The tied candidates are
    /// listed first, followed by every other candidate and why it lost.
    #[error("ambiguous call to {selector}{arguments}\ncandidates:{}", format_candidates(.candidates))]
    Ambiguous {
        selector: String,
        arguments: String,
        candidates: Vec<String>,
    },

    /// The call targets a type identity absent from the registry.
    #[error("type {type_name} is not registered")]
    UnregisteredType { type_name: String },

    /// The class has no member with this name.
    #[error("class '{class}' has no member '{member}'")]
    UnknownMember { class: String, member: String },

    /// Attempted write to a property without a setter.
    #[error("property '{class}.{property}' is read-only")]
    ReadOnlyProperty { class: String, property: String },

    /// Attempted mutation through a const object.
    #[error("cannot modify '{member}' of const '{class}' object")]
    ConstViolation { class: String, member: String },

    /// The receiver is not a native object.
    #[error("cannot call {selector} on a value of type {actual}")]
    NotAnObject {
        selector: String,
        actual: &'static str,
    },

    /// Operand count does not fit the operator kind.
    #[error("{operator} expects {expected} operands, got {got}")]
    OperandCount {
        operator: OperatorKind,
        expected: usize,
        got: usize,
    },

    /// The native thunk failed.
    #[error("{0}")]
    Native(#[from] NativeError),
}

fn format_candidates(candidates: &[String]) -> String {
    if candidates.is_empty() {
        return " none".to_string();
    }
    candidates
        .iter()
        .map(|c| format!("\n  {c}"))
        .collect::<String>()
}
