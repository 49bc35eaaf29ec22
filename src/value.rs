//! Dynamic values crossing the host boundary.
//!
//! [`Value`] is what the host hands the engine for every argument and what
//! every native thunk returns. [`FromValue`] and [`IntoValue`] convert between
//! it and Rust types inside thunks.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use nativebind_core::{ArgKind, ConversionError, PrimitiveKind};

use crate::class::ClassDescriptor;
use crate::object::ObjectHandle;

/// A dynamically-typed script value.
#[derive(Clone)]
pub enum Value {
    /// Absent value.
    Nil,
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Floating point number.
    Float(f64),
    /// String.
    Str(String),
    /// A native object owned by the script runtime.
    Object(Rc<ObjectHandle>),
}

impl Value {
    /// Wrap a native object handle.
    pub fn object(handle: ObjectHandle) -> Self {
        Value::Object(Rc::new(handle))
    }

    /// Runtime kind observed by the matcher.
    pub fn kind(&self) -> ArgKind {
        match self {
            Value::Nil => ArgKind::Primitive(PrimitiveKind::Nil),
            Value::Bool(_) => ArgKind::Primitive(PrimitiveKind::Bool),
            Value::Int(_) => ArgKind::Primitive(PrimitiveKind::Int),
            Value::Float(_) => ArgKind::Primitive(PrimitiveKind::Float),
            Value::Str(_) => ArgKind::Primitive(PrimitiveKind::Str),
            Value::Object(handle) => ArgKind::Object {
                class: handle.class().type_hash(),
                is_const: handle.is_const(),
            },
        }
    }

    /// Primitive kind, `None` for objects.
    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match self.kind() {
            ArgKind::Primitive(kind) => Some(kind),
            ArgKind::Object { .. } => None,
        }
    }

    /// Short type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self.primitive_kind() {
            Some(kind) => kind.name(),
            None => "object",
        }
    }

    /// Type name including the class of objects, e.g. `const Circle`.
    pub fn describe(&self) -> String {
        match self {
            Value::Object(handle) if handle.is_const() => {
                format!("const {}", handle.class().name())
            }
            Value::Object(handle) => handle.class().name().to_string(),
            other => other.type_name().to_string(),
        }
    }

    /// Check if this value is nil.
    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// The object handle, if this value is an object.
    pub fn as_object(&self) -> Option<&Rc<ObjectHandle>> {
        match self {
            Value::Object(handle) => Some(handle),
            _ => None,
        }
    }

    /// Class of an object value.
    pub fn class(&self) -> Option<&Arc<ClassDescriptor>> {
        self.as_object().map(|handle| handle.class())
    }

    /// Check if this is a const object.
    pub fn is_const(&self) -> bool {
        self.as_object().is_some_and(|handle| handle.is_const())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Objects compare by identity.
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Bool(v) => write!(f, "Bool({v})"),
            Value::Int(v) => write!(f, "Int({v})"),
            Value::Float(v) => write!(f, "Float({v})"),
            Value::Str(v) => write!(f, "Str({v:?})"),
            Value::Object(handle) => {
                let ptr = handle.raw_ptr().as_ptr();
                write!(f, "Object({} @ {ptr:p})", self.describe())
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(v) => write!(f, "{v}"),
            Value::Object(handle) => write!(f, "{} object", handle.class().name()),
        }
    }
}

// =============================================================================
// Conversion traits
// =============================================================================

/// Convert a dynamic value into a Rust type (for reading arguments).
pub trait FromValue: Sized {
    /// Convert from a value to this Rust type.
    fn from_value(value: &Value) -> Result<Self, ConversionError>;
}

/// Convert a Rust type into a dynamic value (for returning results).
pub trait IntoValue {
    /// Convert this Rust type into a value.
    fn into_value(self) -> Value;
}

impl FromValue for () {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Nil => Ok(()),
            _ => Err(ConversionError::TypeMismatch {
                expected: "nil",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Bool(v) => Ok(*v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "bool",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => Ok(*v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "int",
                actual: value.type_name(),
            }),
        }
    }
}

macro_rules! narrow_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, ConversionError> {
                    match value {
                        Value::Int(v) => <$ty>::try_from(*v).map_err(|_| {
                            ConversionError::IntegerOverflow {
                                value: *v,
                                target_type: $name,
                            }
                        }),
                        _ => Err(ConversionError::TypeMismatch {
                            expected: $name,
                            actual: value.type_name(),
                        }),
                    }
                }
            }

            impl IntoValue for $ty {
                fn into_value(self) -> Value {
                    Value::Int(i64::from(self))
                }
            }
        )*
    };
}

narrow_int! {
    i8 => "int8",
    i16 => "int16",
    i32 => "int32",
    u8 => "uint8",
    u16 => "uint16",
    u32 => "uint32",
}

impl FromValue for u64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => u64::try_from(*v).map_err(|_| ConversionError::IntegerOverflow {
                value: *v,
                target_type: "uint64",
            }),
            _ => Err(ConversionError::TypeMismatch {
                expected: "uint64",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for usize {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Int(v) => usize::try_from(*v).map_err(|_| ConversionError::IntegerOverflow {
                value: *v,
                target_type: "usize",
            }),
            _ => Err(ConversionError::TypeMismatch {
                expected: "usize",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for f32 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(*v as f32),
            _ => Err(ConversionError::TypeMismatch {
                expected: "float",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Float(v) => Ok(*v),
            _ => Err(ConversionError::TypeMismatch {
                expected: "float",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Str(v) => Ok(v.clone()),
            _ => Err(ConversionError::TypeMismatch {
                expected: "string",
                actual: value.type_name(),
            }),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self, ConversionError> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::Nil
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::Float(f64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Float(self)
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Str(self.to_string())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Nil, IntoValue::into_value)
    }
}
