//! Declarations, the check environment, and variable scopes.
//!
//! A [`TypeCheckEnv`] is built once by the embedder and then shared
//! read-only across any number of concurrent checks. Scopes chain local
//! comprehension bindings on top of it for the duration of one check.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tern_types::{wrapper_message_type, Type};

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// A declared variable: a name bound to a type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub name: String,
    pub ty: Type,
}

impl VariableDecl {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A single overload of a declared function.
///
/// `member` overloads are called receiver-style; the receiver occupies the
/// first parameter position. Type parameters are implicit: any
/// [`Type::TypeParam`] appearing in the signature is universally
/// quantified per call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverloadDecl {
    pub id: String,
    pub member: bool,
    pub args: Vec<Type>,
    pub result: Type,
}

impl OverloadDecl {
    pub fn global(id: impl Into<String>, args: Vec<Type>, result: Type) -> Self {
        Self {
            id: id.into(),
            member: false,
            args,
            result,
        }
    }

    pub fn member(id: impl Into<String>, args: Vec<Type>, result: Type) -> Self {
        Self {
            id: id.into(),
            member: true,
            args,
            result,
        }
    }

    /// Names of the type parameters quantified by this overload.
    pub fn type_params(&self) -> BTreeSet<String> {
        let mut params = BTreeSet::new();
        for arg in &self.args {
            collect_type_params(arg, &mut params);
        }
        collect_type_params(&self.result, &mut params);
        params
    }
}

fn collect_type_params(ty: &Type, out: &mut BTreeSet<String>) {
    match ty {
        Type::TypeParam(name) => {
            out.insert(name.clone());
        }
        Type::List(elem) => collect_type_params(elem, out),
        Type::Map { key, value } => {
            collect_type_params(key, out);
            collect_type_params(value, out);
        }
        Type::Opaque { params, .. } => {
            for param in params {
                collect_type_params(param, out);
            }
        }
        Type::TypeValue(Some(param)) => collect_type_params(param, out),
        _ => {}
    }
}

/// Error from declaration assembly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeclError {
    #[error("overload '{overload_id}' collides with an existing overload of '{function}'")]
    OverloadCollision {
        function: String,
        overload_id: String,
    },
}

/// A declared function: a name plus its overload set.
///
/// No two overloads may share call style, arity, and parameter types once
/// type parameters are renamed apart; such a pair would be indistinguishable
/// at any call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    name: String,
    overloads: Vec<OverloadDecl>,
}

impl FunctionDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overloads: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn overloads(&self) -> &[OverloadDecl] {
        &self.overloads
    }

    pub fn add_overload(&mut self, overload: OverloadDecl) -> Result<(), DeclError> {
        let signature = normalized_signature(overload.member, &overload.args);
        for existing in &self.overloads {
            if existing.id == overload.id
                || normalized_signature(existing.member, &existing.args) == signature
            {
                return Err(DeclError::OverloadCollision {
                    function: self.name.clone(),
                    overload_id: overload.id.clone(),
                });
            }
        }
        self.overloads.push(overload);
        Ok(())
    }

    /// Build a declaration from an overload list, failing on collision.
    pub fn with_overloads(
        name: impl Into<String>,
        overloads: Vec<OverloadDecl>,
    ) -> Result<Self, DeclError> {
        let mut decl = Self::new(name);
        for overload in overloads {
            decl.add_overload(overload)?;
        }
        Ok(decl)
    }
}

/// Free type parameters renamed by first occurrence so that signatures
/// differing only in parameter spelling compare equal.
fn normalized_signature(member: bool, args: &[Type]) -> (bool, Vec<Type>) {
    let mut mapping = BTreeMap::new();
    let args = args.iter().map(|ty| normalize(ty, &mut mapping)).collect();
    (member, args)
}

fn normalize(ty: &Type, mapping: &mut BTreeMap<String, String>) -> Type {
    match ty {
        Type::TypeParam(name) => {
            let next = format!("A{}", mapping.len());
            let canonical = mapping.entry(name.clone()).or_insert(next);
            Type::TypeParam(canonical.clone())
        }
        Type::List(elem) => Type::list(normalize(elem, mapping)),
        Type::Map { key, value } => {
            let key = normalize(key, mapping);
            Type::map(key, normalize(value, mapping))
        }
        Type::Opaque { name, params } => Type::opaque(
            name.clone(),
            params.iter().map(|p| normalize(p, mapping)).collect(),
        ),
        Type::TypeValue(Some(param)) => {
            Type::TypeValue(Some(Box::new(normalize(param, mapping))))
        }
        other => other.clone(),
    }
}

/// A declared field of a struct type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructTypeField {
    pub name: String,
    pub ty: Type,
}

impl StructTypeField {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Type providers
// ---------------------------------------------------------------------------

/// Failure inside a type provider, as distinct from "not found".
///
/// Surfacing one of these aborts the check as a [`tern_diag::CheckError`];
/// it never becomes a per-expression issue.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ProviderError {
    pub message: String,
}

impl ProviderError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Pluggable source of type and struct-field declarations.
///
/// Providers are consulted after the environment's own tables, in
/// registration order.
pub trait TypeProvider: Send + Sync {
    fn find_type(&self, name: &str) -> Result<Option<Type>, ProviderError>;

    fn find_struct_field(
        &self,
        struct_name: &str,
        field_name: &str,
    ) -> Result<Option<StructTypeField>, ProviderError>;
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// The read-only declaration environment a check runs against.
pub struct TypeCheckEnv {
    container: String,
    variables: BTreeMap<String, VariableDecl>,
    functions: BTreeMap<String, FunctionDecl>,
    type_names: BTreeMap<String, Type>,
    struct_fields: BTreeMap<String, BTreeMap<String, StructTypeField>>,
    providers: Vec<Box<dyn TypeProvider>>,
}

impl fmt::Debug for TypeCheckEnv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCheckEnv")
            .field("container", &self.container)
            .field("variables", &self.variables.len())
            .field("functions", &self.functions.len())
            .field("type_names", &self.type_names.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

impl TypeCheckEnv {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            variables: BTreeMap::new(),
            functions: BTreeMap::new(),
            type_names: BTreeMap::new(),
            struct_fields: BTreeMap::new(),
            providers: Vec::new(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn add_variable(&mut self, decl: VariableDecl) {
        self.variables.insert(decl.name.clone(), decl);
    }

    pub fn add_function(&mut self, decl: FunctionDecl) {
        self.functions.insert(decl.name().to_string(), decl);
    }

    pub fn add_type(&mut self, name: impl Into<String>, ty: Type) {
        self.type_names.insert(name.into(), ty);
    }

    pub fn add_struct_field(&mut self, struct_name: impl Into<String>, field: StructTypeField) {
        self.struct_fields
            .entry(struct_name.into())
            .or_default()
            .insert(field.name.clone(), field);
    }

    /// Register a struct type together with its fields.
    pub fn declare_struct(&mut self, name: impl Into<String>, fields: Vec<StructTypeField>) {
        let name = name.into();
        self.add_type(name.clone(), Type::struct_type(name.clone()));
        for field in fields {
            self.add_struct_field(name.clone(), field);
        }
    }

    pub fn add_type_provider(&mut self, provider: Box<dyn TypeProvider>) {
        self.providers.push(provider);
    }

    pub fn find_variable(&self, name: &str) -> Option<&VariableDecl> {
        self.variables.get(name)
    }

    pub fn find_function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions.get(name)
    }

    /// Resolve a qualified type name.
    ///
    /// Well-known wrapper message names resolve without registration.
    pub fn find_type_name(&self, name: &str) -> Result<Option<Type>, ProviderError> {
        if let Some(ty) = self.type_names.get(name) {
            return Ok(Some(ty.clone()));
        }
        if let Some(ty) = wrapper_message_type(name) {
            return Ok(Some(ty));
        }
        for provider in &self.providers {
            if let Some(ty) = provider.find_type(name)? {
                return Ok(Some(ty));
            }
        }
        Ok(None)
    }

    /// Resolve a field of a named struct type.
    ///
    /// Wrapper messages expose a single `value` field holding the wrapped
    /// primitive.
    pub fn find_struct_field(
        &self,
        struct_name: &str,
        field_name: &str,
    ) -> Result<Option<StructTypeField>, ProviderError> {
        if let Some(fields) = self.struct_fields.get(struct_name) {
            if let Some(field) = fields.get(field_name) {
                return Ok(Some(field.clone()));
            }
        }
        if field_name == "value" {
            if let Some(wrapper) = wrapper_message_type(struct_name) {
                if let Some(primitive) = wrapper.wrapped() {
                    return Ok(Some(StructTypeField::new("value", primitive)));
                }
            }
        }
        for provider in &self.providers {
            if let Some(field) = provider.find_struct_field(struct_name, field_name)? {
                return Ok(Some(field));
            }
        }
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Variable scopes
// ---------------------------------------------------------------------------

/// Handle to one scope in a [`VariableScopes`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeId(usize);

#[derive(Debug, Default)]
struct Scope {
    parent: Option<ScopeId>,
    vars: BTreeMap<String, VariableDecl>,
}

/// Chained local scopes over an environment.
///
/// Lookup walks the chain from the given scope to the root and then falls
/// through to the environment's declared variables. Scopes live only as
/// long as one check; the arena is dropped with the resolver.
#[derive(Debug)]
pub struct VariableScopes<'env> {
    env: &'env TypeCheckEnv,
    scopes: Vec<Scope>,
}

impl<'env> VariableScopes<'env> {
    pub fn new(env: &'env TypeCheckEnv) -> Self {
        Self {
            env,
            scopes: vec![Scope::default()],
        }
    }

    pub fn root(&self) -> ScopeId {
        ScopeId(0)
    }

    pub fn nested(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            parent: Some(parent),
            vars: BTreeMap::new(),
        });
        id
    }

    /// Bind a variable in `scope` unless that exact name is already bound
    /// there.
    pub fn insert_variable_if_absent(&mut self, scope: ScopeId, decl: VariableDecl) {
        self.scopes[scope.0]
            .vars
            .entry(decl.name.clone())
            .or_insert(decl);
    }

    pub fn lookup_variable(&self, scope: ScopeId, name: &str) -> Option<&VariableDecl> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let scope = &self.scopes[id.0];
            if let Some(decl) = scope.vars.get(name) {
                return Some(decl);
            }
            current = scope.parent;
        }
        self.env.find_variable(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_collision_by_id() {
        let mut decl = FunctionDecl::new("f");
        decl.add_overload(OverloadDecl::global("f_int", vec![Type::Int], Type::Int))
            .unwrap();
        let err = decl
            .add_overload(OverloadDecl::global("f_int", vec![Type::String], Type::Int))
            .unwrap_err();
        assert!(matches!(err, DeclError::OverloadCollision { .. }));
    }

    #[test]
    fn overload_collision_after_type_param_renaming() {
        let mut decl = FunctionDecl::new("f");
        decl.add_overload(OverloadDecl::global(
            "f_list",
            vec![Type::list(Type::type_param("A"))],
            Type::Int,
        ))
        .unwrap();
        // Same shape under a different parameter name collides.
        let err = decl
            .add_overload(OverloadDecl::global(
                "f_list2",
                vec![Type::list(Type::type_param("B"))],
                Type::Int,
            ))
            .unwrap_err();
        assert!(matches!(err, DeclError::OverloadCollision { .. }));
    }

    #[test]
    fn member_and_global_overloads_do_not_collide() {
        let mut decl = FunctionDecl::new("size");
        decl.add_overload(OverloadDecl::global(
            "size_list",
            vec![Type::list(Type::type_param("A"))],
            Type::Int,
        ))
        .unwrap();
        decl.add_overload(OverloadDecl::member(
            "list_size",
            vec![Type::list(Type::type_param("A"))],
            Type::Int,
        ))
        .unwrap();
        assert_eq!(decl.overloads().len(), 2);
    }

    #[test]
    fn overload_type_params_are_collected() {
        let overload = OverloadDecl::global(
            "zip",
            vec![Type::list(Type::type_param("A")), Type::list(Type::type_param("B"))],
            Type::map(Type::type_param("A"), Type::type_param("B")),
        );
        let params = overload.type_params();
        assert_eq!(
            params.into_iter().collect::<Vec<_>>(),
            vec!["A".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn scope_lookup_walks_chain_then_env() {
        let mut env = TypeCheckEnv::new("");
        env.add_variable(VariableDecl::new("outer", Type::String));

        let mut scopes = VariableScopes::new(&env);
        let root = scopes.root();
        let accu = scopes.nested(root);
        let iter = scopes.nested(accu);
        scopes.insert_variable_if_absent(accu, VariableDecl::new("acc", Type::Int));
        scopes.insert_variable_if_absent(iter, VariableDecl::new("x", Type::Bool));

        assert_eq!(scopes.lookup_variable(iter, "x").unwrap().ty, Type::Bool);
        assert_eq!(scopes.lookup_variable(iter, "acc").unwrap().ty, Type::Int);
        assert_eq!(
            scopes.lookup_variable(iter, "outer").unwrap().ty,
            Type::String
        );
        // The accu scope does not see the iteration variable.
        assert!(scopes.lookup_variable(accu, "x").is_none());
    }

    #[test]
    fn insert_if_absent_keeps_first_binding() {
        let env = TypeCheckEnv::new("");
        let mut scopes = VariableScopes::new(&env);
        let root = scopes.root();
        scopes.insert_variable_if_absent(root, VariableDecl::new("x", Type::Int));
        scopes.insert_variable_if_absent(root, VariableDecl::new("x", Type::String));
        assert_eq!(scopes.lookup_variable(root, "x").unwrap().ty, Type::Int);
    }

    #[test]
    fn wrapper_messages_resolve_without_registration() {
        let env = TypeCheckEnv::new("");
        assert_eq!(
            env.find_type_name("types.IntValue").unwrap(),
            Some(Type::IntWrapper)
        );
        let field = env
            .find_struct_field("types.IntValue", "value")
            .unwrap()
            .unwrap();
        assert_eq!(field.ty, Type::Int);
        assert!(env
            .find_struct_field("types.IntValue", "other")
            .unwrap()
            .is_none());
    }

    struct FailingProvider;

    impl TypeProvider for FailingProvider {
        fn find_type(&self, _name: &str) -> Result<Option<Type>, ProviderError> {
            Err(ProviderError::new("backing store unavailable"))
        }

        fn find_struct_field(
            &self,
            _struct_name: &str,
            _field_name: &str,
        ) -> Result<Option<StructTypeField>, ProviderError> {
            Err(ProviderError::new("backing store unavailable"))
        }
    }

    #[test]
    fn provider_errors_propagate() {
        let mut env = TypeCheckEnv::new("");
        env.add_type_provider(Box::new(FailingProvider));
        assert!(env.find_type_name("pkg.Unknown").is_err());
        assert!(env.find_struct_field("pkg.Unknown", "f").is_err());
        // Declared names short-circuit before providers run.
        env.add_type("pkg.Known", Type::struct_type("pkg.Known"));
        assert!(env.find_type_name("pkg.Known").is_ok());
    }
}
