//! Static method resolution and overload narrowing
//!
//! # Resolution Steps
//!
//! 1. **Exact match**: a static method whose name and full declared parameter
//!    type sequence equal the request's name and converted argument types.
//!    Visibility is ignored.
//! 2. **Fallback by name**, only when step 1 finds nothing:
//!    - no static method with that name: method not found
//!    - several: ambiguous, listing every candidate signature
//!    - exactly one: its parameter count must equal the argument count, then
//!      each argument that is not already assignable is coerced to the
//!      declared type
//!
//! Nothing is cached; candidates are collected fresh for every call.

use hostcall_common::protocol::error::{InvocationError, Result};

use crate::registry::{HostRegistry, MethodDef, TypeDef};
use crate::runtime::conversions::change_type;
use crate::runtime::types::ParamType;
use crate::runtime::value::{Args, Value};

/// The method chosen for a call together with its final arguments.
#[derive(Debug)]
pub struct ResolvedCall<'a> {
    pub method: &'a MethodDef,
    pub args: Args,
    /// Whether step 1 matched; fallback calls may have coerced arguments.
    pub exact: bool,
}

pub struct MethodResolver<'a> {
    registry: &'a HostRegistry,
    ty: &'a TypeDef,
}

impl<'a> MethodResolver<'a> {
    pub fn new(registry: &'a HostRegistry, ty: &'a TypeDef) -> Self {
        Self { registry, ty }
    }

    /// Chooses the callable for `method` given the converted arguments.
    ///
    /// `args` and `arg_types` are parallel, in call order.
    ///
    /// # Errors
    ///
    /// - [`InvocationError::MethodNotFound`] when no static method has the name
    /// - [`InvocationError::AmbiguousMethod`] when several do and none matches exactly
    /// - [`InvocationError::Arity`] when the only candidate takes a different count
    /// - [`InvocationError::Coercion`] when an argument cannot be coerced
    pub fn resolve(
        &self,
        method: &str,
        args: Vec<Value>,
        arg_types: &[ParamType],
    ) -> Result<ResolvedCall<'a>> {
        if let Some(exact) = self.exact(method, arg_types) {
            tracing::debug!("Exact match {}.{}", self.ty.full_name(), exact.signature());
            return Ok(ResolvedCall {
                method: exact,
                args: Args::new(args),
                exact: true,
            });
        }

        let candidates: Vec<&'a MethodDef> = self
            .ty
            .static_methods()
            .filter(|candidate| candidate.name() == method)
            .collect();

        let candidate = match candidates.as_slice() {
            [] => {
                return Err(InvocationError::MethodNotFound {
                    type_name: self.ty.full_name().to_string(),
                    method: method.to_string(),
                })
            }
            [only] => *only,
            many => {
                return Err(InvocationError::AmbiguousMethod {
                    method: method.to_string(),
                    signatures: many.iter().map(|candidate| candidate.signature()).collect(),
                })
            }
        };

        if candidate.params().len() != args.len() {
            return Err(InvocationError::Arity {
                method: method.to_string(),
                expected: candidate.params().len(),
                provided: args.len(),
            });
        }

        tracing::debug!(
            "Falling back to {}.{}",
            self.ty.full_name(),
            candidate.signature()
        );
        let args = self.coerce(candidate, args, arg_types)?;
        Ok(ResolvedCall {
            method: candidate,
            args,
            exact: false,
        })
    }

    fn exact(&self, method: &str, arg_types: &[ParamType]) -> Option<&'a MethodDef> {
        self.ty
            .static_methods()
            .find(|candidate| candidate.name() == method && candidate.params() == arg_types)
    }

    fn coerce(&self, candidate: &MethodDef, args: Vec<Value>, arg_types: &[ParamType]) -> Result<Args> {
        let mut coerced = Vec::with_capacity(args.len());
        for (index, (value, declared)) in args.into_iter().zip(candidate.params()).enumerate() {
            let assignable = value.is_null()
                || arg_types
                    .get(index)
                    .is_some_and(|supplied| declared.is_assignable_from(supplied));

            let value = if assignable && !(value.is_null() && declared.is_scalar()) {
                value
            } else {
                change_type(value, declared, self.registry).map_err(|reason| {
                    InvocationError::Coercion {
                        index,
                        target: declared.short_name(),
                        reason,
                    }
                })?
            };
            coerced.push(value);
        }
        Ok(Args::new(coerced))
    }
}
