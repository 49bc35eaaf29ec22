//! Operator kinds that can be bound on a native class.
//!
//! Operators are dispatched exactly like methods, but keyed by this closed
//! enumeration instead of a name. Operand 0 is always the receiver.

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Operator kinds understood by the dispatch engine.
///
/// The discriminants are stable so hosts can pass operator ids as plain integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum OperatorKind {
    // === Binary Arithmetic ===
    /// `a + b`
    Add = 0,
    /// `a - b`
    Sub = 1,
    /// `a * b`
    Mul = 2,
    /// `a / b`
    Div = 3,
    /// `a % b`
    Mod = 4,
    /// `a ^ b`
    Pow = 5,
    /// `a .. b`
    Concat = 6,

    // === Comparison ===
    /// `a == b`
    Eq = 7,
    /// `a < b`
    Lt = 8,
    /// `a <= b`
    Le = 9,

    // === Unary ===
    /// `-a`
    Neg = 10,
    /// `#a`
    Len = 11,
    /// String conversion.
    ToString = 12,

    // === Index and Call ===
    /// `a[b]`
    Index = 13,
    /// `a(...)`
    Call = 14,
}

impl OperatorKind {
    /// Number of operator kinds, used to size per-class operator tables.
    pub const COUNT: usize = 15;

    /// All operator kinds in discriminant order.
    pub const ALL: [OperatorKind; Self::COUNT] = [
        OperatorKind::Add,
        OperatorKind::Sub,
        OperatorKind::Mul,
        OperatorKind::Div,
        OperatorKind::Mod,
        OperatorKind::Pow,
        OperatorKind::Concat,
        OperatorKind::Eq,
        OperatorKind::Lt,
        OperatorKind::Le,
        OperatorKind::Neg,
        OperatorKind::Len,
        OperatorKind::ToString,
        OperatorKind::Index,
        OperatorKind::Call,
    ];

    /// Index into a per-class operator table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Number of operands including the receiver, or `None` for `Call`.
    pub const fn arity(self) -> Option<usize> {
        if self.is_unary() {
            Some(1)
        } else if matches!(self, OperatorKind::Call) {
            None
        } else {
            Some(2)
        }
    }

    /// Check if this is a unary operator.
    pub const fn is_unary(self) -> bool {
        matches!(
            self,
            OperatorKind::Neg | OperatorKind::Len | OperatorKind::ToString
        )
    }

    /// Check if this is a comparison operator.
    pub const fn is_comparison(self) -> bool {
        matches!(self, OperatorKind::Eq | OperatorKind::Lt | OperatorKind::Le)
    }

    /// Symbol used in diagnostics.
    pub const fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Add => "+",
            OperatorKind::Sub => "-",
            OperatorKind::Mul => "*",
            OperatorKind::Div => "/",
            OperatorKind::Mod => "%",
            OperatorKind::Pow => "^",
            OperatorKind::Concat => "..",
            OperatorKind::Eq => "==",
            OperatorKind::Lt => "<",
            OperatorKind::Le => "<=",
            OperatorKind::Neg => "unary -",
            OperatorKind::Len => "#",
            OperatorKind::ToString => "tostring",
            OperatorKind::Index => "[]",
            OperatorKind::Call => "()",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operator{}", self.symbol())
    }
}
