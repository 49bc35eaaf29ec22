//! Operator dispatch.
//!
//! Operators resolve like methods, but the candidate set comes from the first
//! object operand whose class (or one of its bases) binds the operator, so a
//! scalar on the left of `2 * v` still finds `Vector`'s overloads. Every
//! operand is matched as an argument; there is no separate receiver.

use std::slice;

use nativebind_core::{DispatchError, OperatorKind};

use super::Engine;
use crate::class::MemberHit;
use crate::object::ObjectHandle;
use crate::overload::{Candidate, Overload, resolve};
use crate::value::Value;

impl Engine {
    /// Apply an operator to its operands.
    ///
    /// For [`OperatorKind::Call`] operand 0 is the callee and the rest are the
    /// call arguments.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn call_operator(
        &self,
        kind: OperatorKind,
        operands: &[Value],
    ) -> Result<Value, DispatchError> {
        match kind.arity() {
            Some(expected) if operands.len() != expected => {
                return Err(DispatchError::OperandCount {
                    operator: kind,
                    expected,
                    got: operands.len(),
                });
            }
            None if operands.is_empty() => {
                return Err(DispatchError::OperandCount {
                    operator: kind,
                    expected: 1,
                    got: 0,
                });
            }
            _ => {}
        }

        let searched = match kind {
            OperatorKind::Call => &operands[..1],
            _ => operands,
        };
        let (handle, hits) = self.operator_owner(kind, searched)?;

        let candidates: Vec<Candidate<'_>> = hits
            .iter()
            .map(|hit| Candidate {
                owner: hit.owner.type_hash(),
                overload: hit.member,
                receiver: None,
            })
            .collect();
        let selector = format!("{}:{}", handle.class().name(), kind);
        let resolved = resolve(&selector, &candidates, operands, self.env())?;
        let overload = resolved.candidate.overload;
        self.invoke(overload, None, operands, &resolved.matched)
    }

    /// Script-visible string form of a value.
    ///
    /// Objects use their [`OperatorKind::ToString`] overload when one is
    /// bound and fall back to `"<Class> object"`.
    pub fn to_string(&self, value: &Value) -> Result<String, DispatchError> {
        let Value::Object(handle) = value else {
            return Ok(value.to_string());
        };
        let class = handle.class();
        if class.find_operators(OperatorKind::ToString).is_empty() {
            return Ok(format!("{} object", class.name()));
        }
        match self.call_operator(OperatorKind::ToString, slice::from_ref(value))? {
            Value::Str(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    fn operator_owner<'v>(
        &self,
        kind: OperatorKind,
        operands: &'v [Value],
    ) -> Result<(&'v ObjectHandle, Vec<MemberHit<'v, Overload>>), DispatchError> {
        let mut first_object = None;
        for operand in operands {
            let Value::Object(_) = operand else { continue };
            let handle = self.receiver(operand, &kind.to_string())?;
            first_object.get_or_insert(handle);
            let hits = handle.class().find_operators(kind);
            if !hits.is_empty() {
                return Ok((handle, hits));
            }
        }
        Err(match first_object {
            Some(handle) => DispatchError::UnknownMember {
                class: handle.class().name().to_string(),
                member: kind.to_string(),
            },
            None => DispatchError::NotAnObject {
                selector: kind.to_string(),
                actual: operands.first().map_or("nil", Value::type_name),
            },
        })
    }
}
