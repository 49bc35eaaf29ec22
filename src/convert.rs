//! Custom argument converters.
//!
//! The matcher never coerces between kinds on its own. A host that wants, say,
//! integers accepted where floats are expected registers a [`Converter`] for
//! the float parameter identity. Converters are consulted only after direct
//! matching fails, and always cost more than any direct match.

use std::fmt;
use std::sync::Arc;

use nativebind_core::TypeHash;
use rustc_hash::FxHashMap;

use crate::value::Value;

/// Turns an argument into a value acceptable for one parameter type.
pub trait Converter: Send + Sync {
    /// Convert `arg`, returning the conversion cost and the converted value,
    /// or `None` if this converter does not accept `arg`.
    ///
    /// Must be pure: matching calls it for candidates that may not win.
    fn convert(&self, arg: &Value) -> Option<(u32, Value)>;
}

impl<F> Converter for F
where
    F: Fn(&Value) -> Option<(u32, Value)> + Send + Sync,
{
    fn convert(&self, arg: &Value) -> Option<(u32, Value)> {
        (self)(arg)
    }
}

/// Accepts integers for float parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntToFloat;

impl Converter for IntToFloat {
    fn convert(&self, arg: &Value) -> Option<(u32, Value)> {
        match arg {
            Value::Int(v) => Some((0, Value::Float(*v as f64))),
            _ => None,
        }
    }
}

/// Converters keyed by target parameter identity.
#[derive(Default, Clone)]
pub struct ConverterTable {
    converters: FxHashMap<TypeHash, Vec<Arc<dyn Converter>>>,
}

impl ConverterTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a converter for parameters whose identity is `target`.
    pub fn register(&mut self, target: TypeHash, converter: impl Converter + 'static) {
        self.converters
            .entry(target)
            .or_default()
            .push(Arc::new(converter));
    }

    /// Cheapest conversion of `arg` to `target`, if any converter accepts it.
    pub fn convert(&self, target: TypeHash, arg: &Value) -> Option<(u32, Value)> {
        self.converters
            .get(&target)?
            .iter()
            .filter_map(|converter| converter.convert(arg))
            .min_by_key(|(cost, _)| *cost)
    }

    /// Number of target identities with at least one converter.
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Check if no converter is registered.
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}

impl fmt::Debug for ConverterTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterTable")
            .field("targets", &self.converters.len())
            .finish()
    }
}
