//! Second pass: fold resolver side tables into the output AST.
//!
//! Runs only when no error-severity issue was found. Each node's rewrite
//! is independent: identifiers take their resolved names, calls take the
//! declaration name plus every surviving overload id, struct creations
//! take the resolved type name, and every typed node receives its
//! finalized, flattened type.

use tern_ast::{Ast, AstType, Expr, ExprKind, PrimitiveType, Reference, WellKnownType};
use tern_types::Type;

use crate::infer::TypeInferenceContext;
use crate::resolver::ResolveOutputs;

/// Stamp resolution results onto `ast` and mark it checked.
pub(crate) fn rewrite_checked_ast(
    ast: &mut Ast,
    outputs: &ResolveOutputs,
    inference: &TypeInferenceContext,
) {
    let Ast {
        root,
        reference_map,
        type_map,
        ..
    } = ast;

    let mut stack: Vec<&mut Expr> = vec![root];
    while let Some(expr) = stack.pop() {
        if let Some(decl) = outputs.attributes.get(&expr.id) {
            reference_map.insert(
                expr.id,
                Reference {
                    name: decl.name.clone(),
                    overload_ids: Vec::new(),
                },
            );
            if let ExprKind::Ident(ident) = &mut expr.kind {
                ident.name = decl.name.clone();
            }
        } else if let Some(resolution) = outputs.functions.get(&expr.id) {
            reference_map.insert(
                expr.id,
                Reference {
                    name: resolution.decl.name().to_string(),
                    overload_ids: resolution
                        .decl
                        .overloads()
                        .iter()
                        .map(|overload| overload.id.clone())
                        .collect(),
                },
            );
            if let ExprKind::Call(call) = &mut expr.kind {
                call.function = resolution.decl.name().to_string();
                if resolution.namespace_rewrite {
                    // The target was a namespace qualifier, now absorbed
                    // into the function name. Its sub-tree carries no side
                    // table entries, so dropping it here loses nothing.
                    call.target = None;
                }
            }
        } else if let Some(name) = outputs.struct_types.get(&expr.id) {
            reference_map.insert(
                expr.id,
                Reference {
                    name: name.clone(),
                    overload_ids: Vec::new(),
                },
            );
            if let ExprKind::Struct(strct) = &mut expr.kind {
                strct.name = name.clone();
            }
        }

        if let Some(ty) = outputs.types.get(&expr.id) {
            type_map.insert(expr.id, flatten_type(&inference.finalize_type(ty)));
        }

        match &mut expr.kind {
            ExprKind::Const(_) | ExprKind::Ident(_) => {}
            ExprKind::Select(select) => stack.push(&mut select.operand),
            ExprKind::Call(call) => {
                if let Some(target) = call.target.as_deref_mut() {
                    stack.push(target);
                }
                for arg in &mut call.args {
                    stack.push(arg);
                }
            }
            ExprKind::List(list) => {
                for element in &mut list.elements {
                    stack.push(&mut element.expr);
                }
            }
            ExprKind::Map(map) => {
                for entry in &mut map.entries {
                    stack.push(&mut entry.key);
                    stack.push(&mut entry.value);
                }
            }
            ExprKind::Struct(strct) => {
                for field in &mut strct.fields {
                    stack.push(&mut field.value);
                }
            }
            ExprKind::Comprehension(comp) => {
                stack.push(&mut comp.iter_range);
                stack.push(&mut comp.accu_init);
                stack.push(&mut comp.loop_condition);
                stack.push(&mut comp.loop_step);
                stack.push(&mut comp.result);
            }
        }
    }

    ast.is_checked = true;
}

/// Flatten a semantic type into the output form.
///
/// Free type parameters that survived finalization flatten to `dyn`.
pub(crate) fn flatten_type(ty: &Type) -> AstType {
    match ty {
        Type::Dyn => AstType::Dyn,
        Type::Error => AstType::Error,
        Type::Null => AstType::Null,
        Type::Bool => AstType::Primitive(PrimitiveType::Bool),
        Type::Int => AstType::Primitive(PrimitiveType::Int64),
        Type::Uint => AstType::Primitive(PrimitiveType::Uint64),
        Type::Double => AstType::Primitive(PrimitiveType::Double),
        Type::String => AstType::Primitive(PrimitiveType::String),
        Type::Bytes => AstType::Primitive(PrimitiveType::Bytes),
        Type::Duration => AstType::WellKnown(WellKnownType::Duration),
        Type::Timestamp => AstType::WellKnown(WellKnownType::Timestamp),
        Type::Any => AstType::WellKnown(WellKnownType::Any),
        Type::BoolWrapper => AstType::Wrapper(PrimitiveType::Bool),
        Type::IntWrapper => AstType::Wrapper(PrimitiveType::Int64),
        Type::UintWrapper => AstType::Wrapper(PrimitiveType::Uint64),
        Type::DoubleWrapper => AstType::Wrapper(PrimitiveType::Double),
        Type::StringWrapper => AstType::Wrapper(PrimitiveType::String),
        Type::BytesWrapper => AstType::Wrapper(PrimitiveType::Bytes),
        Type::List(elem) => AstType::List {
            elem_type: Box::new(flatten_type(elem)),
        },
        Type::Map { key, value } => AstType::Map {
            key_type: Box::new(flatten_type(key)),
            value_type: Box::new(flatten_type(value)),
        },
        Type::Struct { name } => AstType::Message { name: name.clone() },
        Type::Opaque { name, params } => AstType::Abstract {
            name: name.clone(),
            parameter_types: params.iter().map(flatten_type).collect(),
        },
        Type::TypeValue(None) => AstType::Type(None),
        Type::TypeValue(Some(param)) => AstType::Type(Some(Box::new(flatten_type(param)))),
        Type::TypeParam(_) => AstType::Dyn,
    }
}
