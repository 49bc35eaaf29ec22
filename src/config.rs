//! Engine configuration.
//!
//! Hosts either build an [`EngineConfig`] directly or toggle individual
//! [`EngineProperty`] values by numeric id, the way embedding APIs usually
//! expose engine switches.

use num_enum::{IntoPrimitive, TryFromPrimitive};

// Engine Properties
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum EngineProperty {
    /// Reject duplicate overload signatures at publish instead of shadowing.
    StrictOverloads = 0,
    /// Reject casts to a base reachable at more than one offset.
    StrictCasts = 1,
    /// Longest base chain a cast may cross during matching.
    MaxBaseDepth = 2,
}

impl EngineProperty {
    /// Value the property has in a fresh engine.
    pub const fn default_value(self) -> usize {
        match self {
            EngineProperty::StrictOverloads => 0,
            EngineProperty::StrictCasts => 0,
            EngineProperty::MaxBaseDepth => 64,
        }
    }
}

/// Typed engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// See [`EngineProperty::StrictOverloads`].
    pub strict_overloads: bool,
    /// See [`EngineProperty::StrictCasts`].
    pub strict_casts: bool,
    /// See [`EngineProperty::MaxBaseDepth`].
    pub max_base_depth: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            strict_overloads: EngineProperty::StrictOverloads.default_value() != 0,
            strict_casts: EngineProperty::StrictCasts.default_value() != 0,
            max_base_depth: EngineProperty::MaxBaseDepth.default_value() as u32,
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set [`EngineProperty::StrictOverloads`].
    pub fn with_strict_overloads(mut self, strict: bool) -> Self {
        self.strict_overloads = strict;
        self
    }

    /// Set [`EngineProperty::StrictCasts`].
    pub fn with_strict_casts(mut self, strict: bool) -> Self {
        self.strict_casts = strict;
        self
    }

    /// Set [`EngineProperty::MaxBaseDepth`].
    pub fn with_max_base_depth(mut self, depth: u32) -> Self {
        self.max_base_depth = depth;
        self
    }

    /// Current value of a property.
    pub fn get(&self, property: EngineProperty) -> usize {
        match property {
            EngineProperty::StrictOverloads => usize::from(self.strict_overloads),
            EngineProperty::StrictCasts => usize::from(self.strict_casts),
            EngineProperty::MaxBaseDepth => self.max_base_depth as usize,
        }
    }

    /// Set a property. Boolean properties treat any non-zero value as true;
    /// depths saturate at `u32::MAX`.
    pub fn set(&mut self, property: EngineProperty, value: usize) {
        match property {
            EngineProperty::StrictOverloads => self.strict_overloads = value != 0,
            EngineProperty::StrictCasts => self.strict_casts = value != 0,
            EngineProperty::MaxBaseDepth => {
                self.max_base_depth = u32::try_from(value).unwrap_or(u32::MAX)
            }
        }
    }
}
