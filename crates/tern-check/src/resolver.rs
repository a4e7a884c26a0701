//! Name resolution and expression typing.
//!
//! One [`ResolveVisitor`] pass walks the AST in post-order, resolving
//! identifiers, selects, calls, struct creations, and comprehensions
//! against the environment. Results land in id-keyed side tables that the
//! rewriter folds into the output AST.
//!
//! Identifiers and selects are resolved jointly: a prefix of a select
//! chain may name a variable, a qualified declaration, or a namespaced
//! function. Selects that might be namespace qualifiers are deferred until
//! the chain's root (or enclosing call) decides what they are.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use tern_ast::{
    AstVisitor, CallExpr, ComprehensionArg, ComprehensionExpr, Constant, Expr, ExprId, ExprKind,
    IdentExpr, ListExpr, MapExpr, SelectExpr, SourceInfo, StructExpr,
};
use tern_diag::{CheckError, SourceLocation, TypeCheckIssue};
use tern_types::{is_wrapper_message_name, Type, TypeKind};

use crate::env::{
    DeclError, FunctionDecl, ProviderError, ScopeId, TypeCheckEnv, VariableDecl, VariableScopes,
};
use crate::infer::TypeInferenceContext;
use crate::namespace::NamespaceGenerator;

/// Skeleton assigned to empty list literals before inference.
static FREE_LIST_TYPE: LazyLock<Type> =
    LazyLock::new(|| Type::list(Type::type_param("element_type")));
/// Skeleton assigned to empty map literals before inference.
static FREE_MAP_TYPE: LazyLock<Type> = LazyLock::new(|| {
    Type::map(Type::type_param("key_type"), Type::type_param("value_type"))
});

/// Map the byte offset recorded for `id` to a 1-based line/column.
pub(crate) fn compute_source_location(source_info: &SourceInfo, id: ExprId) -> SourceLocation {
    let Some(position) = source_info.position(id) else {
        return SourceLocation::default();
    };
    let offsets = source_info.line_offsets();
    let line_index = match offsets.binary_search(&position) {
        Ok(index) => index,
        Err(0) => return SourceLocation::new(1, position as i32 + 1),
        Err(index) => index - 1,
    };
    SourceLocation::new(
        line_index as i32 + 1,
        (position - offsets[line_index]) as i32 + 1,
    )
}

/// A function resolved at a call site.
#[derive(Debug, Clone)]
pub(crate) struct FunctionResolution {
    /// Narrowed declaration holding only the surviving overloads.
    pub decl: FunctionDecl,
    /// Whether the call's receiver target was a namespace qualifier and
    /// must be erased in the rewrite.
    pub namespace_rewrite: bool,
}

/// Side tables produced by one resolver pass.
#[derive(Debug, Default)]
pub(crate) struct ResolveOutputs {
    pub functions: BTreeMap<ExprId, FunctionResolution>,
    pub attributes: BTreeMap<ExprId, VariableDecl>,
    pub struct_types: BTreeMap<ExprId, String>,
    pub types: BTreeMap<ExprId, Type>,
}

struct ComprehensionScope {
    comprehension_id: ExprId,
    parent: ScopeId,
    accu_scope: ScopeId,
    iter_scope: ScopeId,
}

pub(crate) struct ResolveVisitor<'a> {
    env: &'a TypeCheckEnv,
    namespaces: &'a NamespaceGenerator,
    source_info: &'a SourceInfo,
    inference: TypeInferenceContext,
    issues: Vec<TypeCheckIssue>,

    scopes: VariableScopes<'a>,
    current_scope: ScopeId,
    expr_stack: Vec<&'a Expr>,
    /// Receiver calls whose target chain may be a namespace qualifier,
    /// keyed by call id with the accumulated qualifier segments.
    maybe_namespaced_functions: BTreeMap<ExprId, Vec<String>>,
    /// Selects whose resolution is deferred to the qualified-identifier or
    /// namespaced-call paths.
    deferred_select_operations: BTreeSet<ExprId>,
    comprehension_scopes: Vec<ComprehensionScope>,

    functions: BTreeMap<ExprId, FunctionResolution>,
    attributes: BTreeMap<ExprId, VariableDecl>,
    struct_types: BTreeMap<ExprId, String>,
    types: BTreeMap<ExprId, Type>,

    fatal: Option<CheckError>,
}

impl<'a> ResolveVisitor<'a> {
    pub(crate) fn new(
        env: &'a TypeCheckEnv,
        namespaces: &'a NamespaceGenerator,
        source_info: &'a SourceInfo,
        inference: TypeInferenceContext,
    ) -> Self {
        let scopes = VariableScopes::new(env);
        let current_scope = scopes.root();
        Self {
            env,
            namespaces,
            source_info,
            inference,
            issues: Vec::new(),
            scopes,
            current_scope,
            expr_stack: Vec::new(),
            maybe_namespaced_functions: BTreeMap::new(),
            deferred_select_operations: BTreeSet::new(),
            comprehension_scopes: Vec::new(),
            functions: BTreeMap::new(),
            attributes: BTreeMap::new(),
            struct_types: BTreeMap::new(),
            types: BTreeMap::new(),
            fatal: None,
        }
    }

    /// Tear down the visitor, surfacing the first fatal failure if any.
    pub(crate) fn finish(
        self,
    ) -> Result<(ResolveOutputs, TypeInferenceContext, Vec<TypeCheckIssue>), CheckError> {
        if let Some(fatal) = self.fatal {
            return Err(fatal);
        }
        let outputs = ResolveOutputs {
            functions: self.functions,
            attributes: self.attributes,
            struct_types: self.struct_types,
            types: self.types,
        };
        Ok((outputs, self.inference, self.issues))
    }

    fn location(&self, id: ExprId) -> SourceLocation {
        compute_source_location(self.source_info, id)
    }

    fn type_or_dyn(&self, id: ExprId) -> Type {
        self.types.get(&id).cloned().unwrap_or(Type::Dyn)
    }

    fn record_fatal(&mut self, error: CheckError) {
        if self.fatal.is_none() {
            self.fatal = Some(error);
        }
    }

    fn report_missing_reference(&mut self, id: ExprId, name: &str) {
        self.issues.push(TypeCheckIssue::error(
            self.location(id),
            format!(
                "undeclared reference to '{name}' (in container '{}')",
                self.env.container()
            ),
        ));
    }

    fn report_undefined_field(&mut self, id: ExprId, field_name: &str, struct_name: &str) {
        self.issues.push(TypeCheckIssue::error(
            self.location(id),
            format!("undefined field '{field_name}' not found in struct '{struct_name}'"),
        ));
    }

    fn resolve_simple_identifier(&mut self, expr: &Expr, name: &str) {
        let mut found: Option<VariableDecl> = None;
        self.namespaces.generate_candidates(name, |candidate| {
            match self.scopes.lookup_variable(self.current_scope, candidate) {
                Some(decl) => {
                    found = Some(decl.clone());
                    false
                }
                None => true,
            }
        });

        let Some(decl) = found else {
            self.report_missing_reference(expr.id, name);
            return;
        };
        let ty = self.inference.instantiate_type_params(&decl.ty);
        self.attributes.insert(expr.id, decl);
        self.types.insert(expr.id, ty);
    }

    /// Resolve a select chain whose segments are in `qualifiers`.
    ///
    /// The longest qualifier prefix naming a variable wins; the remaining
    /// segments are plain selects over that variable's type, resolved here
    /// because they were deferred during the identifier walk.
    fn resolve_qualified_identifier(&mut self, root: &'a Expr, qualifiers: &[String]) {
        if qualifiers.len() == 1 {
            self.resolve_simple_identifier(root, &qualifiers[0]);
            return;
        }

        let mut found: Option<VariableDecl> = None;
        let mut matched_segment = 0usize;
        self.namespaces
            .generate_qualified_candidates(qualifiers, |candidate, segment_index| {
                match self.scopes.lookup_variable(self.current_scope, candidate) {
                    Some(decl) => {
                        found = Some(decl.clone());
                        matched_segment = segment_index;
                        false
                    }
                    None => true,
                }
            });

        let Some(decl) = found else {
            self.report_missing_reference(root.id, &qualifiers.join("."));
            return;
        };

        let num_selects = qualifiers.len() - matched_segment - 1;
        let mut node = root;
        let mut selects: Vec<&'a Expr> = Vec::with_capacity(num_selects);
        for _ in 0..num_selects {
            selects.push(node);
            let ExprKind::Select(select) = &node.kind else {
                // The qualifier list was accumulated from this very chain.
                unreachable!("qualified identifier root is not a select chain");
            };
            node = &select.operand;
        }

        let ty = self.inference.instantiate_type_params(&decl.ty);
        self.attributes.insert(node.id, decl);
        self.types.insert(node.id, ty);

        // Resolve the deferred selects from the variable outward.
        for select_expr in selects.into_iter().rev() {
            let ExprKind::Select(select) = &select_expr.kind else {
                unreachable!("qualified identifier root is not a select chain");
            };
            self.resolve_select_operation(
                select_expr,
                &select.field,
                &select.operand,
                select.test_only,
            );
        }
    }

    /// Find a declaration whose name resolves in the container and which
    /// has at least one overload of the right call style and arity.
    fn resolve_function_call_shape(
        &self,
        function_name: &str,
        arg_count: usize,
        is_receiver: bool,
    ) -> Option<FunctionDecl> {
        let mut found: Option<FunctionDecl> = None;
        self.namespaces.generate_candidates(function_name, |candidate| {
            match self.env.find_function(candidate) {
                Some(decl) => {
                    let shape_matches = decl
                        .overloads()
                        .iter()
                        .any(|overload| {
                            overload.member == is_receiver && overload.args.len() == arg_count
                        });
                    if shape_matches {
                        found = Some(decl.clone());
                        false
                    } else {
                        // Name match without a matching shape: keep looking
                        // at shorter prefixes.
                        true
                    }
                }
                None => true,
            }
        });
        found
    }

    fn resolve_function_overloads(
        &mut self,
        expr: &Expr,
        call: &CallExpr,
        decl: &FunctionDecl,
        is_receiver: bool,
        is_namespaced: bool,
    ) {
        let mut arg_types = Vec::with_capacity(call.args.len() + usize::from(is_receiver));
        if is_receiver {
            let target = call.target.as_deref().expect("receiver call has a target");
            arg_types.push(self.type_or_dyn(target.id));
        }
        for arg in &call.args {
            arg_types.push(self.type_or_dyn(arg.id));
        }

        let Some(resolution) = self
            .inference
            .resolve_overload(decl, &arg_types, is_receiver)
        else {
            let rendered = arg_types
                .iter()
                .map(Type::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            self.issues.push(TypeCheckIssue::error(
                self.location(expr.id),
                format!(
                    "found no matching overload for '{}' applied to ({rendered})",
                    decl.name()
                ),
            ));
            return;
        };

        let mut narrowed = FunctionDecl::new(decl.name());
        for overload in &resolution.overloads {
            if let Err(DeclError::OverloadCollision { overload_id, .. }) =
                narrowed.add_overload(overload.clone())
            {
                // The survivors are a filtered subset of one declaration; a
                // collision here means an invariant was broken upstream.
                self.record_fatal(CheckError::OverloadNarrowing {
                    function: decl.name().to_string(),
                    overload_id,
                });
            }
        }

        self.functions.insert(
            expr.id,
            FunctionResolution {
                decl: narrowed,
                namespace_rewrite: is_namespaced,
            },
        );
        self.types.insert(expr.id, resolution.result_type);
    }

    fn resolve_select_operation(
        &mut self,
        expr: &Expr,
        field: &str,
        operand: &Expr,
        test_only: bool,
    ) {
        let operand_type = self.type_or_dyn(operand.id);
        // Short-hand optional chaining: select on the held type. The
        // runtime re-wraps the projection; the checked type is the
        // projected field type itself.
        let subject = operand_type
            .optional_parameter()
            .cloned()
            .unwrap_or(operand_type);

        let Some(result_type) = self.select_result_type(expr.id, field, &subject) else {
            return;
        };
        let ty = if test_only { Type::Bool } else { result_type };
        self.types.insert(expr.id, ty);
    }

    fn select_result_type(&mut self, expr_id: ExprId, field: &str, operand_type: &Type) -> Option<Type> {
        match operand_type {
            Type::Dyn | Type::Any => return Some(Type::Dyn),
            Type::Struct { name } => {
                return match self.env.find_struct_field(name, field) {
                    Err(error) => {
                        self.record_fatal(CheckError::Lookup {
                            name: format!("{name}.{field}"),
                            message: error.to_string(),
                        });
                        None
                    }
                    Ok(None) => {
                        self.report_undefined_field(expr_id, field, name);
                        None
                    }
                    Ok(Some(field_decl)) => Some(field_decl.ty),
                };
            }
            Type::Map { key, value } => {
                if self.inference.is_assignable(&Type::String, key) {
                    return Some((**value).clone());
                }
                // Non-string keys fall through to the unsupported-operand
                // issue below.
            }
            _ => {}
        }

        self.issues.push(TypeCheckIssue::error(
            self.location(expr_id),
            format!("expression of type '{operand_type}' cannot be the operand of a select operation"),
        ));
        None
    }

    fn check_field_assignments(&mut self, strct: &StructExpr, resolved_name: &str) {
        for field in &strct.fields {
            let value_type = self.type_or_dyn(field.value.id);
            let field_info = match self.env.find_struct_field(resolved_name, &field.name) {
                Err(error) => {
                    self.record_fatal(CheckError::Lookup {
                        name: format!("{resolved_name}.{}", field.name),
                        message: error.to_string(),
                    });
                    return;
                }
                Ok(None) => {
                    self.report_undefined_field(field.id, &field.name, resolved_name);
                    continue;
                }
                Ok(Some(info)) => info,
            };

            let mut field_type = field_info.ty;
            if field.optional {
                field_type = Type::optional(field_type);
            }
            if !self.inference.is_assignable(&value_type, &field_type) {
                self.issues.push(TypeCheckIssue::error(
                    self.location(field.id),
                    format!(
                        "expected type of field '{}' is '{field_type}' but provided type is '{value_type}'",
                        field_info.name
                    ),
                ));
            }
        }
    }

    fn comprehension_scope(&mut self, expr: &Expr) -> Option<(ScopeId, ScopeId, ScopeId)> {
        let Some(scope) = self.comprehension_scopes.last() else {
            self.record_fatal(CheckError::ScopeDesync { expr_id: expr.id.0 });
            return None;
        };
        if scope.comprehension_id != expr.id {
            self.record_fatal(CheckError::ScopeDesync { expr_id: expr.id.0 });
            return None;
        }
        Some((scope.parent, scope.accu_scope, scope.iter_scope))
    }
}

fn widen(current: Option<Type>, next: Type) -> Option<Type> {
    Some(match current {
        None => next,
        Some(current) if current == next => current,
        Some(_) => Type::Dyn,
    })
}

fn is_supported_key_kind(ty: &Type) -> bool {
    matches!(
        ty.kind(),
        TypeKind::Bool | TypeKind::Int | TypeKind::Uint | TypeKind::String | TypeKind::Dyn
    )
}

impl<'a> AstVisitor<'a> for ResolveVisitor<'a> {
    fn pre_visit_expr(&mut self, expr: &'a Expr) {
        self.expr_stack.push(expr);
    }

    fn post_visit_expr(&mut self, _expr: &'a Expr) {
        self.expr_stack.pop();
    }

    fn post_visit_const(&mut self, expr: &'a Expr, constant: &'a Constant) {
        let ty = match constant {
            Constant::Null => Type::Null,
            Constant::Bool(_) => Type::Bool,
            Constant::Int(_) => Type::Int,
            Constant::Uint(_) => Type::Uint,
            Constant::Double(_) => Type::Double,
            Constant::String(_) => Type::String,
            Constant::Bytes(_) => Type::Bytes,
            Constant::Duration { .. } => Type::Duration,
            Constant::Timestamp { .. } => Type::Timestamp,
        };
        self.types.insert(expr.id, ty);
    }

    fn post_visit_ident(&mut self, expr: &'a Expr, ident: &'a IdentExpr) {
        if self.expr_stack.len() == 1 {
            self.resolve_simple_identifier(expr, &ident.name);
            return;
        }

        // Walk up the ancestor stack accumulating the select chain rooted
        // at this identifier. A chain that ends up as the target of a
        // receiver call is recorded for namespace disambiguation at the
        // call instead of being resolved here.
        let mut stack_pos = self.expr_stack.len() - 1;
        let mut qualifiers = vec![ident.name.clone()];
        let mut receiver_call: Option<&'a Expr> = None;
        let mut root_candidate = self.expr_stack[stack_pos];

        while stack_pos > 0 {
            stack_pos -= 1;
            let parent = self.expr_stack[stack_pos];
            match &parent.kind {
                ExprKind::Call(call)
                    if call.target.as_deref().map(|target| target.id)
                        == Some(root_candidate.id) =>
                {
                    receiver_call = Some(parent);
                    break;
                }
                ExprKind::Select(select) => {
                    qualifiers.push(select.field.clone());
                    self.deferred_select_operations.insert(parent.id);
                    root_candidate = parent;
                    if select.test_only {
                        break;
                    }
                }
                _ => break,
            }
        }

        match receiver_call {
            None => self.resolve_qualified_identifier(root_candidate, &qualifiers),
            Some(call) => {
                self.maybe_namespaced_functions.insert(call.id, qualifiers);
            }
        }
    }

    fn post_visit_select(&mut self, expr: &'a Expr, select: &'a SelectExpr) {
        if !self.deferred_select_operations.contains(&expr.id) {
            self.resolve_select_operation(expr, &select.field, &select.operand, select.test_only);
        }
    }

    fn post_visit_call(&mut self, expr: &'a Expr, call: &'a CallExpr) {
        // Disambiguate a possibly namespaced receiver call first.
        if let Some(qualifiers) = self.maybe_namespaced_functions.get(&expr.id).cloned() {
            let namespaced_name = format!("{}.{}", qualifiers.join("."), call.function);
            if let Some(decl) =
                self.resolve_function_call_shape(&namespaced_name, call.args.len(), false)
            {
                self.resolve_function_overloads(expr, call, &decl, false, true);
                return;
            }
            // No namespaced function: the target is an attribute after all;
            // resolve it, then treat this as a plain receiver call.
            let target = call.target.as_deref().expect("namespaced call has a target");
            self.resolve_qualified_identifier(target, &qualifiers);
        }

        let arg_count = call.args.len() + usize::from(call.target.is_some());
        match self.resolve_function_call_shape(&call.function, arg_count, call.target.is_some()) {
            Some(decl) => {
                self.resolve_function_overloads(expr, call, &decl, call.target.is_some(), false);
            }
            None => self.report_missing_reference(expr.id, &call.function),
        }
    }

    fn post_visit_list(&mut self, expr: &'a Expr, list: &'a ListExpr) {
        let mut overall: Option<Type> = None;
        for element in &list.elements {
            let mut value_type = self.type_or_dyn(element.expr.id);
            if element.optional {
                if let Some(param) = value_type.optional_parameter() {
                    value_type = param.clone();
                }
            }
            overall = widen(overall, value_type);
        }

        let ty = match overall {
            Some(elem) => Type::list(elem),
            None => self.inference.instantiate_type_params(&FREE_LIST_TYPE),
        };
        self.types.insert(expr.id, ty);
    }

    fn post_visit_map(&mut self, expr: &'a Expr, map: &'a MapExpr) {
        // Homogeneous widening, keys and values independently: the first
        // unequal entry collapses that side to dyn and runtime checks take
        // over.
        let mut overall_key: Option<Type> = None;
        let mut overall_value: Option<Type> = None;

        for entry in &map.entries {
            let key_type = self.type_or_dyn(entry.key.id);
            if !is_supported_key_kind(&key_type) {
                self.issues.push(TypeCheckIssue::warning(
                    self.location(entry.key.id),
                    format!("unsupported map key type: {key_type}"),
                ));
            }
            overall_key = widen(overall_key, key_type);

            let mut value_type = self.type_or_dyn(entry.value.id);
            if entry.optional {
                if let Some(param) = value_type.optional_parameter() {
                    value_type = param.clone();
                }
            }
            overall_value = widen(overall_value, value_type);
        }

        match (overall_key, overall_value) {
            (Some(key), Some(value)) => {
                self.types.insert(expr.id, Type::map(key, value));
            }
            (None, None) => {
                let ty = self.inference.instantiate_type_params(&FREE_MAP_TYPE);
                self.types.insert(expr.id, ty);
            }
            _ => self.record_fatal(CheckError::MapInference),
        }
    }

    fn post_visit_struct(&mut self, expr: &'a Expr, strct: &'a StructExpr) {
        let mut resolved: Option<(String, Type)> = None;
        let mut lookup_error: Option<ProviderError> = None;
        self.namespaces.generate_candidates(&strct.name, |candidate| {
            match self.env.find_type_name(candidate) {
                Err(error) => {
                    lookup_error = Some(error);
                    false
                }
                Ok(Some(ty)) => {
                    resolved = Some((candidate.to_string(), ty));
                    false
                }
                Ok(None) => true,
            }
        });

        if let Some(error) = lookup_error {
            self.record_fatal(CheckError::Lookup {
                name: strct.name.clone(),
                message: error.to_string(),
            });
            return;
        }
        let Some((resolved_name, resolved_type)) = resolved else {
            self.report_missing_reference(expr.id, &strct.name);
            return;
        };

        if resolved_type.kind() != TypeKind::Struct && !is_wrapper_message_name(&resolved_name) {
            self.issues.push(TypeCheckIssue::error(
                self.location(expr.id),
                format!("type '{resolved_name}' does not support message creation"),
            ));
            return;
        }

        self.types.insert(expr.id, resolved_type);
        self.struct_types.insert(expr.id, resolved_name.clone());
        self.check_field_assignments(strct, &resolved_name);
    }

    fn pre_visit_comprehension(&mut self, expr: &'a Expr, _comp: &'a ComprehensionExpr) {
        let accu_scope = self.scopes.nested(self.current_scope);
        let iter_scope = self.scopes.nested(accu_scope);
        self.comprehension_scopes.push(ComprehensionScope {
            comprehension_id: expr.id,
            parent: self.current_scope,
            accu_scope,
            iter_scope,
        });
    }

    fn post_visit_comprehension(&mut self, expr: &'a Expr, comp: &'a ComprehensionExpr) {
        self.comprehension_scopes.pop();
        let result_type = self.type_or_dyn(comp.result.id);
        self.types.insert(expr.id, result_type);
    }

    fn pre_visit_comprehension_subexpr(
        &mut self,
        expr: &'a Expr,
        _comp: &'a ComprehensionExpr,
        arg: ComprehensionArg,
    ) {
        let Some((parent, accu_scope, iter_scope)) = self.comprehension_scope(expr) else {
            return;
        };
        self.current_scope = match arg {
            ComprehensionArg::IterRange | ComprehensionArg::AccuInit => parent,
            ComprehensionArg::LoopCondition | ComprehensionArg::Result => accu_scope,
            ComprehensionArg::LoopStep => iter_scope,
        };
    }

    fn post_visit_comprehension_subexpr(
        &mut self,
        expr: &'a Expr,
        comp: &'a ComprehensionExpr,
        arg: ComprehensionArg,
    ) {
        let Some((parent, accu_scope, iter_scope)) = self.comprehension_scope(expr) else {
            return;
        };
        self.current_scope = parent;

        // The traversal visits the range and init before any sub-expression
        // that can reference the corresponding variable.
        match arg {
            ComprehensionArg::AccuInit => {
                let ty = self.type_or_dyn(comp.accu_init.id);
                self.scopes.insert_variable_if_absent(
                    accu_scope,
                    VariableDecl::new(comp.accu_var.clone(), ty),
                );
            }
            ComprehensionArg::IterRange => {
                let range_type = self.type_or_dyn(comp.iter_range.id);
                let iter_type = match &range_type {
                    Type::List(elem) => (**elem).clone(),
                    Type::Map { key, .. } => (**key).clone(),
                    Type::Dyn => Type::Dyn,
                    _ => {
                        self.issues.push(TypeCheckIssue::error(
                            self.location(expr.id),
                            format!(
                                "expression of type '{range_type}' cannot be the range of a comprehension (must be list, map, or dynamic)"
                            ),
                        ));
                        Type::Dyn
                    }
                };
                self.scopes.insert_variable_if_absent(
                    iter_scope,
                    VariableDecl::new(comp.iter_var.clone(), iter_type),
                );
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tern_ast::ExprFactory;

    #[test]
    fn source_location_maps_offsets_to_line_and_column() {
        let mut fx = ExprFactory::new();
        let expr = fx.const_int(1);
        let mut info = SourceInfo::new(vec![0, 10, 25]);
        info.set_position(expr.id, 12);
        assert_eq!(
            compute_source_location(&info, expr.id),
            SourceLocation::new(2, 3)
        );

        // Exactly on a line start.
        info.set_position(expr.id, 25);
        assert_eq!(
            compute_source_location(&info, expr.id),
            SourceLocation::new(3, 1)
        );

        // First line.
        info.set_position(expr.id, 0);
        assert_eq!(
            compute_source_location(&info, expr.id),
            SourceLocation::new(1, 1)
        );
    }

    #[test]
    fn source_location_defaults_when_position_is_unknown() {
        let info = SourceInfo::new(vec![0]);
        assert_eq!(
            compute_source_location(&info, ExprId(99)),
            SourceLocation::default()
        );
    }

    #[test]
    fn source_location_without_line_offsets_is_line_one() {
        let mut fx = ExprFactory::new();
        let expr = fx.const_int(1);
        let mut info = SourceInfo::new(Vec::new());
        info.set_position(expr.id, 4);
        assert_eq!(
            compute_source_location(&info, expr.id),
            SourceLocation::new(1, 5)
        );
    }

    #[test]
    fn widening_collapses_on_first_mismatch() {
        assert_eq!(widen(None, Type::Int), Some(Type::Int));
        assert_eq!(widen(Some(Type::Int), Type::Int), Some(Type::Int));
        assert_eq!(widen(Some(Type::Int), Type::String), Some(Type::Dyn));
        // Once dyn, always dyn.
        assert_eq!(widen(Some(Type::Dyn), Type::Int), Some(Type::Dyn));
    }

    #[test]
    fn supported_map_key_kinds() {
        assert!(is_supported_key_kind(&Type::Int));
        assert!(is_supported_key_kind(&Type::Dyn));
        assert!(!is_supported_key_kind(&Type::Double));
        assert!(!is_supported_key_kind(&Type::list(Type::Int)));
    }
}
