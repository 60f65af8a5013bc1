//! Overload resolution
//!
//! Picks the method or constructor whose declared parameters are closest
//! to the runtime types of the arguments. Candidates are scored by the sum
//! of per-argument distances from the [`TypeMatcher`]; the first exact
//! match wins outright, otherwise the lowest score wins and ties go to the
//! candidate enumerated first.

use std::sync::Arc;

use hyperbridge_types::{Constructor, Method, NativeValue, Signature, TypeId, TypeRegistry};

use crate::error::{BridgeError, BridgeResult};
use crate::matcher::{TypeMatcher, EXACT};

/// Which methods a call may bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Any method (called on an instance)
    Instance,
    /// Static methods only
    Static,
}

/// A scored candidate
#[derive(Debug)]
struct Scored<T> {
    member: Arc<T>,
    distance: u32,
}

/// Resolves a name and argument list to a single member
pub struct OverloadResolver<'a> {
    registry: &'a TypeRegistry,
    matcher: &'a TypeMatcher,
}

impl<'a> OverloadResolver<'a> {
    /// Create a resolver over `registry`
    pub fn new(registry: &'a TypeRegistry, matcher: &'a TypeMatcher) -> Self {
        Self { registry, matcher }
    }

    /// Resolve method `name` on `ty` for `args`
    pub fn resolve_method(
        &self,
        ty: TypeId,
        name: &str,
        args: &[NativeValue],
        dispatch: Dispatch,
    ) -> BridgeResult<Arc<Method>> {
        let candidates: Vec<Arc<Method>> = self
            .registry
            .methods(ty)
            .into_iter()
            .filter(|m| m.name() == name && (dispatch == Dispatch::Instance || m.is_static()))
            .collect();

        if args.is_empty() {
            if let Some(exact) = candidates.iter().find(|m| m.parameter_types().is_empty()) {
                return Ok(exact.clone());
            }
        }

        if candidates.is_empty() {
            let type_name = self.registry.type_name(ty);
            return if self.registry.has_restricted_method(ty, name) {
                Err(BridgeError::access(format!(
                    "method {} on {} is not public or protected",
                    name, type_name
                )))
            } else {
                Err(BridgeError::not_found(format!("method {} on {}", name, type_name)))
            };
        }
        if let [only] = candidates.as_slice() {
            return Ok(only.clone());
        }
        self.select(name, candidates, args).ok_or_else(|| BridgeError::NoMatch {
            member: format!("method {}.{}", self.registry.type_name(ty), name),
            arguments: self.describe_arguments(args),
        })
    }

    /// Resolve a constructor of `ty` for `args`
    pub fn resolve_constructor(&self, ty: TypeId, args: &[NativeValue]) -> BridgeResult<Arc<Constructor>> {
        let candidates = self.registry.constructors(ty);

        if args.is_empty() {
            if let Some(exact) = candidates.iter().find(|c| c.parameter_types().is_empty()) {
                return Ok(exact.clone());
            }
        }

        if candidates.is_empty() {
            let type_name = self.registry.type_name(ty);
            return if self.registry.has_restricted_constructor(ty) {
                Err(BridgeError::access(format!(
                    "constructors of {} are not public or protected",
                    type_name
                )))
            } else {
                Err(BridgeError::not_found(format!("constructor of {}", type_name)))
            };
        }
        if let [only] = candidates.as_slice() {
            return Ok(only.clone());
        }
        self.select("<init>", candidates, args).ok_or_else(|| BridgeError::NoMatch {
            member: format!("constructor of {}", self.registry.type_name(ty)),
            arguments: self.describe_arguments(args),
        })
    }

    fn select<T: Signature>(&self, name: &str, candidates: Vec<Arc<T>>, args: &[NativeValue]) -> Option<Arc<T>> {
        let mut scored = Vec::new();
        for member in candidates {
            let params = member.parameter_types();
            let applicable = if member.is_varargs() {
                args.len() + 1 >= params.len()
            } else {
                args.len() == params.len()
            };
            if !applicable {
                continue;
            }
            let Some(distance) = self.score(member.as_ref(), args) else {
                continue;
            };
            if distance == EXACT {
                return Some(member);
            }
            scored.push(Scored { member, distance });
        }

        scored.sort_by_key(|s| s.distance);
        if let [first, second, ..] = scored.as_slice() {
            if first.distance == second.distance {
                tracing::warn!(
                    distance = first.distance,
                    first = %self.registry.describe(name, first.member.as_ref()),
                    second = %self.registry.describe(name, second.member.as_ref()),
                    "ambiguous overload, choosing the first candidate"
                );
            }
        }
        scored.into_iter().next().map(|s| s.member)
    }

    /// Aggregate distance of `args` against `member`, `None` if any argument cannot match
    pub fn score(&self, member: &dyn Signature, args: &[NativeValue]) -> Option<u32> {
        let params = member.parameter_types();
        let fixed = if member.is_varargs() {
            params.len().saturating_sub(1)
        } else {
            params.len()
        };
        if args.len() < fixed {
            return None;
        }

        let mut total = 0u32;
        for (param, arg) in params[..fixed].iter().zip(args) {
            total = total.saturating_add(self.matcher.match_argument(self.registry, *param, arg)?);
        }
        if member.is_varargs() {
            let component = self.registry.component_type(*params.last()?)?;
            for arg in &args[fixed..] {
                total = total.saturating_add(self.matcher.match_argument(self.registry, component, arg)?);
            }
        }
        Some(total)
    }

    fn describe_arguments(&self, args: &[NativeValue]) -> String {
        args.iter()
            .map(|arg| match self.registry.runtime_type(arg) {
                Some(ty) => self.registry.type_name(ty),
                None => "null".to_string(),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
