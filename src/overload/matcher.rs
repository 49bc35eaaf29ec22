//! Per-candidate matching.
//!
//! Matching is pure: it inspects the argument values and the registry and
//! produces costs, but never touches the objects.

use nativebind_core::{ArgKind, MismatchReason, ParamType, TypeHash};

use super::{ArgConversion, ArgMatch, Overload, OverloadMatch, ResolveEnv};
use crate::class::CastPath;
use crate::config::{EngineConfig, EngineProperty};
use crate::object::ObjectHandle;
use crate::value::Value;

/// Switches that change how arguments are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOptions {
    /// Reject casts to a base reachable at more than one offset.
    pub strict_casts: bool,
    /// Casts crossing more base edges than this are rejected.
    pub max_base_depth: u32,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for MatchOptions {
    fn from(config: &EngineConfig) -> Self {
        Self {
            strict_casts: config.strict_casts,
            max_base_depth: config.max_base_depth,
        }
    }
}

impl MatchOptions {
    /// Options with [`EngineProperty::StrictCasts`] enabled.
    pub fn strict() -> Self {
        Self {
            strict_casts: true,
            max_base_depth: EngineProperty::MaxBaseDepth.default_value() as u32,
        }
    }
}

/// A method receiver and the path from its class to the overload's owner.
#[derive(Debug, Clone, Copy)]
pub struct ReceiverMatch<'a> {
    /// The receiver object.
    pub handle: &'a ObjectHandle,
    /// Cast from the receiver's class to the class that registered the method.
    pub path: CastPath,
}

/// Match one overload against a call.
///
/// For methods, the receiver's distance to the overload's owner and any const
/// addition on the receiver are part of the total cost, so an override on a
/// derived class beats the inherited overload with the same parameters.
pub fn match_overload(
    overload: &Overload,
    receiver: Option<ReceiverMatch<'_>>,
    args: &[Value],
    env: ResolveEnv<'_>,
) -> Result<OverloadMatch, MismatchReason> {
    if overload.params.len() != args.len() {
        return Err(MismatchReason::Arity {
            expected: overload.params.len(),
            got: args.len(),
        });
    }

    let receiver_cost = match receiver {
        Some(receiver) => {
            if receiver.handle.is_const() && !overload.is_const {
                return Err(MismatchReason::ConstReceiver);
            }
            let const_cost = if overload.is_const && !receiver.handle.is_const() {
                ArgMatch::COST_CONST_ADDITION
            } else {
                0
            };
            receiver.path.depth * ArgMatch::COST_BASE_STEP + const_cost
        }
        None => 0,
    };

    let mut total_cost = receiver_cost;
    let mut matched = Vec::with_capacity(args.len());
    for (index, (param, arg)) in overload.params.iter().zip(args).enumerate() {
        let arg_match = match_arg(param, arg, index, env)?;
        total_cost = total_cost.saturating_add(arg_match.cost);
        matched.push(arg_match);
    }

    Ok(OverloadMatch {
        receiver_cost,
        args: matched,
        total_cost,
    })
}

/// Match one argument against one parameter.
///
/// Direct matching (same kind, same class, const addition, base cast) is tried
/// first on the argument's [`ArgKind`]. Registered converters are consulted
/// only when it fails.
pub fn match_arg(
    param: &ParamType,
    arg: &Value,
    index: usize,
    env: ResolveEnv<'_>,
) -> Result<ArgMatch, MismatchReason> {
    let direct = match (param, arg.kind()) {
        (ParamType::Any, _) => {
            return Ok(ArgMatch {
                cost: ArgMatch::COST_ANY,
                conversion: ArgConversion::Any,
            });
        }
        (ParamType::Primitive(expected), ArgKind::Primitive(actual)) if *expected == actual => {
            return Ok(ArgMatch::exact());
        }
        (
            ParamType::Object { class, is_const },
            ArgKind::Object {
                class: source,
                is_const: arg_is_const,
            },
        ) => match_object(*class, *is_const, source, arg_is_const, index, env),
        _ => Err(MismatchReason::Kind {
            index,
            expected: super::describe_param(param, env.registry),
            actual: arg.describe(),
        }),
    };

    match direct {
        Ok(arg_match) => Ok(arg_match),
        Err(reason) if is_final(&reason) => Err(reason),
        Err(reason) => match env.converters.convert(param.identity(), arg) {
            Some((cost, value)) => Ok(ArgMatch {
                cost: ArgMatch::COST_CONVERTED.saturating_add(cost),
                conversion: ArgConversion::Converted(value),
            }),
            None => Err(reason),
        },
    }
}

/// A const object never becomes mutable through a converter, and an
/// ambiguous cast stays ambiguous.
fn is_final(reason: &MismatchReason) -> bool {
    matches!(
        reason,
        MismatchReason::ConstArgument { .. } | MismatchReason::AmbiguousCast { .. }
    )
}

fn match_object(
    target: TypeHash,
    param_is_const: bool,
    source: TypeHash,
    arg_is_const: bool,
    index: usize,
    env: ResolveEnv<'_>,
) -> Result<ArgMatch, MismatchReason> {
    if arg_is_const && !param_is_const {
        return Err(MismatchReason::ConstArgument { index });
    }

    let no_path = || MismatchReason::NoCastPath {
        index,
        from: env.registry.class_name(source),
        to: env.registry.class_name(target),
    };

    // Objects of classes this registry never published cast to nothing.
    let class = env.registry.find(source).ok_or_else(no_path)?;
    let path = class.cast_path(target).ok_or_else(no_path)?;
    if path.depth > env.options.max_base_depth {
        return Err(no_path());
    }
    if env.options.strict_casts && path.depth > 0 {
        let offsets = class.cast_offsets(target);
        if offsets.len() > 1 {
            return Err(MismatchReason::AmbiguousCast {
                index,
                to: env.registry.class_name(target),
                offsets,
            });
        }
    }

    let const_cost = if param_is_const && !arg_is_const {
        ArgMatch::COST_CONST_ADDITION
    } else {
        0
    };
    let conversion = match (path.depth, const_cost) {
        (0, 0) => ArgConversion::Exact,
        (0, _) => ArgConversion::ConstAddition,
        (depth, _) => ArgConversion::BaseCast {
            offset: path.offset,
            depth,
        },
    };
    Ok(ArgMatch {
        cost: path.depth * ArgMatch::COST_BASE_STEP + const_cost,
        conversion,
    })
}
