//! Parametric type inference for overload resolution and assignability.
//!
//! The context owns a pool of inference variables represented as
//! [`Type::TypeParam`]s with generated names. Bindings accumulate in an
//! insertion log so a failed overload candidate can be rolled back with a
//! constant-time mark and a truncate; successful candidates keep their
//! bindings for later finalization.

use std::collections::BTreeMap;

use tern_types::{Type, TypeKind};

use crate::env::{FunctionDecl, OverloadDecl};
use crate::trace::{AssignabilityStep, InferenceTrace, OverloadStep};

/// Result of resolving a call against a function declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadResolution {
    /// The common result type of every surviving overload, or `dyn` when
    /// the survivors disagree and the runtime must pick by value types.
    pub result_type: Type,
    /// Every overload that matched the argument types.
    pub overloads: Vec<OverloadDecl>,
}

/// A mark into the binding log, restoring both bindings and the variable
/// counter.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Snapshot {
    log_len: usize,
    next_var: u64,
}

/// Inference state for one check call.
#[derive(Debug, Default)]
pub struct TypeInferenceContext {
    bindings: BTreeMap<String, Type>,
    log: Vec<String>,
    next_var: u64,
    trace: Option<InferenceTrace>,
}

impl TypeInferenceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record assignability and overload decisions for observability tools.
    pub fn enable_tracing(&mut self) {
        self.trace = Some(InferenceTrace::default());
    }

    pub fn take_trace(&mut self) -> Option<InferenceTrace> {
        self.trace.take()
    }

    fn fresh_type_var(&mut self) -> Type {
        self.next_var += 1;
        Type::TypeParam(format!("T%{}", self.next_var))
    }

    /// Replace every distinct type parameter in `ty` with a fresh unbound
    /// inference variable.
    ///
    /// Used for declared variable types that carry parameters and for the
    /// free list/map skeletons assigned to empty aggregate literals.
    pub fn instantiate_type_params(&mut self, ty: &Type) -> Type {
        let mut mapping = BTreeMap::new();
        self.instantiate(ty, &mut mapping)
    }

    fn instantiate(&mut self, ty: &Type, mapping: &mut BTreeMap<String, Type>) -> Type {
        match ty {
            Type::TypeParam(name) => {
                if let Some(instantiated) = mapping.get(name) {
                    return instantiated.clone();
                }
                let fresh = self.fresh_type_var();
                mapping.insert(name.clone(), fresh.clone());
                fresh
            }
            Type::List(elem) => Type::list(self.instantiate(elem, mapping)),
            Type::Map { key, value } => {
                let key = self.instantiate(key, mapping);
                Type::map(key, self.instantiate(value, mapping))
            }
            Type::Opaque { name, params } => {
                let params = params
                    .iter()
                    .map(|param| self.instantiate(param, mapping))
                    .collect();
                Type::opaque(name.clone(), params)
            }
            Type::TypeValue(Some(param)) => {
                Type::TypeValue(Some(Box::new(self.instantiate(param, mapping))))
            }
            other => other.clone(),
        }
    }

    /// Whether `from` may be assigned where `to` is declared.
    ///
    /// Free variables on either side unify with the other. Bindings made
    /// along a failing path are rolled back before returning.
    pub fn is_assignable(&mut self, from: &Type, to: &Type) -> bool {
        let snapshot = self.snapshot();
        let assignable = self.is_assignable_internal(from, to);
        if !assignable {
            self.restore(snapshot);
        }
        if let Some(trace) = &mut self.trace {
            trace.assignability.push(AssignabilityStep {
                from: from.to_string(),
                to: to.to_string(),
                assignable,
            });
        }
        assignable
    }

    fn is_assignable_internal(&mut self, from: &Type, to: &Type) -> bool {
        let from = self.resolve_shallow(from);
        let to = self.resolve_shallow(to);

        match (&from, &to) {
            (Type::TypeParam(from_var), Type::TypeParam(to_var)) => {
                // Both free: the declared side adopts the actual side.
                if from_var != to_var {
                    self.bind(to_var.clone(), Type::TypeParam(from_var.clone()));
                }
                return true;
            }
            (_, Type::TypeParam(to_var)) => {
                if self.occurs_in(to_var, &from) {
                    return false;
                }
                self.bind(to_var.clone(), from.clone());
                return true;
            }
            (Type::TypeParam(from_var), _) => {
                if self.occurs_in(from_var, &to) {
                    return false;
                }
                self.bind(from_var.clone(), to.clone());
                return true;
            }
            _ => {}
        }

        // dyn and any are compatible with everything, without binding.
        if matches!(from.kind(), TypeKind::Dyn | TypeKind::Any)
            || matches!(to.kind(), TypeKind::Dyn | TypeKind::Any)
        {
            return true;
        }
        if from.kind() == TypeKind::Error || to.kind() == TypeKind::Error {
            return false;
        }
        // A wrapper accepts itself, its primitive, and null.
        if let Some(primitive) = to.wrapped() {
            return from == to || from == Type::Null || from == primitive;
        }
        if from == Type::Null {
            return to == Type::Null;
        }

        match (&from, &to) {
            (Type::List(from_elem), Type::List(to_elem)) => {
                self.is_assignable_internal(from_elem, to_elem)
            }
            (
                Type::Map {
                    key: from_key,
                    value: from_value,
                },
                Type::Map {
                    key: to_key,
                    value: to_value,
                },
            ) => {
                self.is_assignable_internal(from_key, to_key)
                    && self.is_assignable_internal(from_value, to_value)
            }
            (Type::Struct { name: from_name }, Type::Struct { name: to_name }) => {
                from_name == to_name
            }
            (
                Type::Opaque {
                    name: from_name,
                    params: from_params,
                },
                Type::Opaque {
                    name: to_name,
                    params: to_params,
                },
            ) => {
                from_name == to_name
                    && from_params.len() == to_params.len()
                    && from_params
                        .iter()
                        .zip(to_params)
                        .all(|(from_param, to_param)| {
                            self.is_assignable_internal(from_param, to_param)
                        })
            }
            (Type::TypeValue(None), Type::TypeValue(None)) => true,
            (Type::TypeValue(Some(from_param)), Type::TypeValue(Some(to_param))) => {
                self.is_assignable_internal(from_param, to_param)
            }
            _ => from == to,
        }
    }

    /// Resolve the applicable overloads for a call.
    ///
    /// Candidates are filtered by call style and arity, then each is
    /// instantiated fresh and checked pairwise against the argument types
    /// under a snapshot; failed candidates leave no bindings behind.
    /// Returns `None` when no candidate survives.
    pub fn resolve_overload(
        &mut self,
        decl: &FunctionDecl,
        arg_types: &[Type],
        is_receiver: bool,
    ) -> Option<OverloadResolution> {
        let mut matched = Vec::new();
        let mut result_types: Vec<Type> = Vec::new();

        for overload in decl.overloads() {
            if overload.member != is_receiver || overload.args.len() != arg_types.len() {
                continue;
            }
            let snapshot = self.snapshot();
            let mut mapping = BTreeMap::new();
            let params: Vec<Type> = overload
                .args
                .iter()
                .map(|ty| self.instantiate(ty, &mut mapping))
                .collect();
            let result = self.instantiate(&overload.result, &mut mapping);

            let assignable = arg_types
                .iter()
                .zip(&params)
                .all(|(arg, param)| self.is_assignable_internal(arg, param));

            if let Some(trace) = &mut self.trace {
                trace.overloads.push(OverloadStep {
                    function: decl.name().to_string(),
                    overload_id: overload.id.clone(),
                    matched: assignable,
                });
            }

            if assignable {
                matched.push(overload.clone());
                result_types.push(self.substitute(&result));
            } else {
                self.restore(snapshot);
            }
        }

        if matched.is_empty() {
            return None;
        }
        let first = &result_types[0];
        let result_type = if result_types.iter().all(|ty| ty == first) {
            first.clone()
        } else {
            Type::Dyn
        };
        Some(OverloadResolution {
            result_type,
            overloads: matched,
        })
    }

    /// Apply current bindings; free variables become `dyn`.
    ///
    /// Output types are ground: no type parameter survives finalization.
    pub fn finalize_type(&self, ty: &Type) -> Type {
        self.apply(ty, true)
    }

    /// Apply current bindings, leaving free variables in place.
    pub fn substitute(&self, ty: &Type) -> Type {
        self.apply(ty, false)
    }

    fn apply(&self, ty: &Type, free_to_dyn: bool) -> Type {
        match ty {
            Type::TypeParam(name) => match self.bindings.get(name) {
                Some(bound) => self.apply(bound, free_to_dyn),
                None if free_to_dyn => Type::Dyn,
                None => ty.clone(),
            },
            Type::List(elem) => Type::list(self.apply(elem, free_to_dyn)),
            Type::Map { key, value } => Type::map(
                self.apply(key, free_to_dyn),
                self.apply(value, free_to_dyn),
            ),
            Type::Opaque { name, params } => Type::opaque(
                name.clone(),
                params
                    .iter()
                    .map(|param| self.apply(param, free_to_dyn))
                    .collect(),
            ),
            Type::TypeValue(Some(param)) => {
                Type::TypeValue(Some(Box::new(self.apply(param, free_to_dyn))))
            }
            other => other.clone(),
        }
    }

    fn resolve_shallow(&self, ty: &Type) -> Type {
        let mut current = ty;
        while let Type::TypeParam(name) = current {
            match self.bindings.get(name) {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current.clone()
    }

    fn occurs_in(&self, var: &str, ty: &Type) -> bool {
        match ty {
            Type::TypeParam(name) => {
                if name == var {
                    return true;
                }
                match self.bindings.get(name) {
                    Some(bound) => self.occurs_in(var, bound),
                    None => false,
                }
            }
            Type::List(elem) => self.occurs_in(var, elem),
            Type::Map { key, value } => self.occurs_in(var, key) || self.occurs_in(var, value),
            Type::Opaque { params, .. } => params.iter().any(|param| self.occurs_in(var, param)),
            Type::TypeValue(Some(param)) => self.occurs_in(var, param),
            _ => false,
        }
    }

    fn bind(&mut self, name: String, ty: Type) {
        debug_assert!(!self.bindings.contains_key(&name), "rebinding {name}");
        self.log.push(name.clone());
        self.bindings.insert(name, ty);
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            log_len: self.log.len(),
            next_var: self.next_var,
        }
    }

    pub(crate) fn restore(&mut self, snapshot: Snapshot) {
        while self.log.len() > snapshot.log_len {
            let name = self.log.pop().expect("binding log shorter than snapshot");
            self.bindings.remove(&name);
        }
        self.next_var = snapshot.next_var;
    }
}
