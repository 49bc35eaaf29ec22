//! Overload resolution.
//!
//! Given the candidate overloads of one selector and the dynamic argument
//! list of a call, pick the single best-matching overload or explain why none
//! (or more than one) fits.
//!
//! ## Algorithm
//!
//! 1. Every candidate is matched independently ([`match_overload`]). A match
//!    either fails with a [`MismatchReason`] or yields per-argument costs.
//! 2. The candidate with the lowest total cost wins ([`find_best_match`]).
//! 3. Ties between candidates registered by the same class with the same
//!    signature fingerprint are broken by registration sequence (the latest
//!    registration shadows the others); any other tie is ambiguous.
//!
//! ## Costs
//!
//! | Match | Cost |
//! |-------|------|
//! | Exact | 0 |
//! | Const addition | 1 |
//! | Each base edge crossed | 2 |
//! | Custom converter | 1000 + converter cost |
//! | `Any` parameter | 5000 |

mod matcher;
mod ranking;

pub use matcher::{MatchOptions, ReceiverMatch, match_arg, match_overload};
pub use ranking::{Ranking, find_best_match};

use nativebind_core::{DispatchError, MismatchReason, ParamType, TypeHash};

use crate::convert::ConverterTable;
use crate::native_fn::NativeFn;
use crate::registry::ClassRegistry;
use crate::value::Value;

// ============================================================================
// Overload
// ============================================================================

/// One registered signature of a method, operator or constructor.
#[derive(Clone)]
pub struct Overload {
    pub(crate) params: Vec<ParamType>,
    pub(crate) is_const: bool,
    pub(crate) thunk: NativeFn,
    pub(crate) fingerprint: TypeHash,
    pub(crate) sequence: u64,
}

impl Overload {
    pub(crate) fn new(
        selector: &str,
        params: Vec<ParamType>,
        is_const: bool,
        thunk: NativeFn,
    ) -> Self {
        let identities: Vec<TypeHash> = params.iter().map(ParamType::identity).collect();
        let fingerprint = if is_const {
            TypeHash::from_signature(&format!("{selector} const"), &identities)
        } else {
            TypeHash::from_signature(selector, &identities)
        };
        Self {
            params,
            is_const,
            thunk,
            fingerprint,
            sequence: 0,
        }
    }

    /// Declared parameter types. Operators include the receiver operand.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check if this method may be called on a const receiver.
    pub fn is_const(&self) -> bool {
        self.is_const
    }

    /// Signature fingerprint. Equal fingerprints are indistinguishable overloads.
    pub fn fingerprint(&self) -> TypeHash {
        self.fingerprint
    }

    /// Registry-wide registration sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The native thunk invoked when this overload wins.
    pub fn thunk(&self) -> &NativeFn {
        &self.thunk
    }

    /// Human-readable signature such as `area(int, const Shape) const`.
    pub fn describe(&self, selector: &str, registry: &ClassRegistry) -> String {
        self.describe_with(selector, &|hash| registry.class_name(hash))
    }

    /// Like [`describe`](Self::describe) with a custom class name lookup.
    pub fn describe_with(
        &self,
        selector: &str,
        class_name: &dyn Fn(TypeHash) -> String,
    ) -> String {
        let mut out = format!("{selector}(");
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&describe_param_with(param, class_name));
        }
        out.push(')');
        if self.is_const {
            out.push_str(" const");
        }
        out
    }
}

impl std::fmt::Debug for Overload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overload")
            .field("params", &self.params)
            .field("is_const", &self.is_const)
            .field("fingerprint", &self.fingerprint)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Display name of a parameter type for diagnostics.
pub fn describe_param(param: &ParamType, registry: &ClassRegistry) -> String {
    describe_param_with(param, &|hash| registry.class_name(hash))
}

fn describe_param_with(param: &ParamType, class_name: &dyn Fn(TypeHash) -> String) -> String {
    match param {
        ParamType::Primitive(kind) => kind.name().to_string(),
        ParamType::Object { class, is_const } => {
            let name = class_name(*class);
            if *is_const {
                format!("const {name}")
            } else {
                name
            }
        }
        ParamType::Custom(hash) => class_name(*hash),
        ParamType::Any => "any".to_string(),
    }
}

/// Display list of dynamic argument kinds, e.g. `(Vector, int)`.
pub fn describe_args(args: &[Value]) -> String {
    let mut out = String::from("(");
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&arg.describe());
    }
    out.push(')');
    out
}

// ============================================================================
// Match Results
// ============================================================================

/// How one argument was accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgConversion {
    /// Same kind or same class.
    Exact,
    /// Mutable object passed to a const parameter.
    ConstAddition,
    /// Derived object passed to a base parameter.
    BaseCast {
        /// Byte offset from the argument's class to the parameter's class.
        offset: isize,
        /// Number of base edges crossed.
        depth: u32,
    },
    /// Produced by a registered converter. The thunk sees this value.
    Converted(Value),
    /// Accepted by an `Any` parameter.
    Any,
}

/// Cost and conversion for one argument.
#[derive(Debug, Clone, PartialEq)]
pub struct ArgMatch {
    /// Cost contributed to the candidate's total.
    pub cost: u32,
    /// How the argument was accepted.
    pub conversion: ArgConversion,
}

impl ArgMatch {
    /// Same kind or same class.
    pub const COST_EXACT: u32 = 0;
    /// Adding const to an object argument.
    pub const COST_CONST_ADDITION: u32 = 1;
    /// Each base edge crossed by a cast.
    pub const COST_BASE_STEP: u32 = 2;
    /// Base cost of a custom converter; the converter's own cost is added.
    pub const COST_CONVERTED: u32 = 1000;
    /// An `Any` parameter.
    pub const COST_ANY: u32 = 5000;

    /// An exact match.
    pub fn exact() -> Self {
        Self {
            cost: Self::COST_EXACT,
            conversion: ArgConversion::Exact,
        }
    }

    /// Check if this argument matched without any adjustment.
    pub fn is_exact(&self) -> bool {
        matches!(self.conversion, ArgConversion::Exact)
    }

    /// The converted value, if a converter produced one.
    pub fn converted(&self) -> Option<&Value> {
        match &self.conversion {
            ArgConversion::Converted(value) => Some(value),
            _ => None,
        }
    }
}

/// A successful match of one candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct OverloadMatch {
    /// Cost of reaching the overload's owner from the receiver (methods only).
    pub receiver_cost: u32,
    /// Per-argument results, in argument order.
    pub args: Vec<ArgMatch>,
    /// Receiver cost plus every argument cost.
    pub total_cost: u32,
}

// ============================================================================
// Resolution
// ============================================================================

/// One overload under consideration for a call.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    /// Identity of the class that registered the overload.
    pub owner: TypeHash,
    /// The overload.
    pub overload: &'a Overload,
    /// Receiver and the path from its class to `owner` (methods only).
    pub receiver: Option<ReceiverMatch<'a>>,
}

/// The winning candidate of a resolved call.
#[derive(Debug, Clone)]
pub struct Resolved<'a> {
    /// Index into the candidate slice passed to [`resolve`].
    pub index: usize,
    /// The winning candidate.
    pub candidate: Candidate<'a>,
    /// Its match result, handed to the thunk through the call context.
    pub matched: OverloadMatch,
}

/// Everything a resolution needs besides the candidates and arguments.
#[derive(Clone, Copy)]
pub struct ResolveEnv<'a> {
    /// Class registry for names and casts.
    pub registry: &'a ClassRegistry,
    /// Converters consulted when direct matching fails.
    pub converters: &'a ConverterTable,
    /// Matching switches.
    pub options: MatchOptions,
}

/// Match every candidate and pick the winner.
///
/// `selector` names the call in diagnostics (`Circle:area`,
/// `Vector:operator+`).
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve<'a>(
    selector: &str,
    candidates: &[Candidate<'a>],
    args: &[Value],
    env: ResolveEnv<'_>,
) -> Result<Resolved<'a>, DispatchError> {
    let mut viable: Vec<(usize, OverloadMatch)> = Vec::new();
    let mut rejected: Vec<(usize, MismatchReason)> = Vec::new();

    for (index, candidate) in candidates.iter().enumerate() {
        match match_overload(candidate.overload, candidate.receiver, args, env) {
            Ok(matched) => {
                tracing::trace!(
                    selector,
                    candidate = index,
                    cost = matched.total_cost,
                    "candidate viable"
                );
                viable.push((index, matched));
            }
            Err(reason) => {
                tracing::trace!(selector, candidate = index, %reason, "candidate rejected");
                rejected.push((index, reason));
            }
        }
    }

    let describe = |index: usize| {
        let candidate = &candidates[index];
        let owner = env.registry.class_name(candidate.owner);
        let qualified = format!("{owner}:{}", bare_selector(selector));
        candidate.overload.describe(&qualified, env.registry)
    };
    let rejections = || {
        rejected
            .iter()
            .map(|(index, reason)| format!("{}  [{reason}]", describe(*index)))
            .collect::<Vec<_>>()
    };

    if viable.is_empty() {
        return Err(DispatchError::NoMatch {
            selector: selector.to_string(),
            arguments: describe_args(args),
            candidates: rejections(),
        });
    }

    match find_best_match(&viable, candidates) {
        Ranking::Winner(position) => {
            let (index, matched) = viable.swap_remove(position);
            Ok(Resolved {
                index,
                candidate: candidates[index],
                matched,
            })
        }
        Ranking::Ambiguous(tied) => {
            let best_cost = tied
                .first()
                .map_or(0, |&position| viable[position].1.total_cost);
            let mut listed: Vec<String> = tied
                .iter()
                .map(|&position| {
                    let (index, matched) = &viable[position];
                    let cost = matched.total_cost;
                    format!("{}  [tied, cost {cost}]", describe(*index))
                })
                .collect();
            for (position, (index, matched)) in viable.iter().enumerate() {
                if tied.contains(&position) {
                    continue;
                }
                let note = if matched.total_cost == best_cost {
                    "shadowed by a later registration".to_string()
                } else {
                    format!("viable, cost {}", matched.total_cost)
                };
                listed.push(format!("{}  [{note}]", describe(*index)));
            }
            listed.extend(rejections());
            Err(DispatchError::Ambiguous {
                selector: selector.to_string(),
                arguments: describe_args(args),
                candidates: listed,
            })
        }
    }
}

fn bare_selector(selector: &str) -> &str {
    selector.rsplit_once(':').map_or(selector, |(_, name)| name)
}
