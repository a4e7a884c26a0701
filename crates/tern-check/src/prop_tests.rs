//! Property tests for the checker using proptest.
//!
//! These stress invariants that must hold for ANY input, not just
//! hand-picked examples:
//!
//! 1. Assignability is reflexive for every non-error type
//! 2. Assignability is transitive over ground, dyn-free chains
//! 3. Namespace candidates come in exact longest-prefix-first order,
//!    without repeats
//! 4. Checking is deterministic, and an error-severity issue is present
//!    exactly when the checked AST is absent
//! 5. Rechecking a stripped checked AST reproduces its maps
//! 6. Finalized types are ground

use proptest::prelude::*;

use tern_ast::{Ast, Expr, ExprFactory, SourceInfo};
use tern_types::Type;

use crate::env::{
    FunctionDecl, OverloadDecl, StructTypeField, TypeCheckEnv, VariableDecl,
};
use crate::infer::TypeInferenceContext;
use crate::namespace::NamespaceGenerator;
use crate::TypeChecker;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_leaf_type(include_dynamic: bool) -> BoxedStrategy<Type> {
    let mut leaves = vec![
        Just(Type::Bool),
        Just(Type::Int),
        Just(Type::Uint),
        Just(Type::Double),
        Just(Type::String),
        Just(Type::Bytes),
        Just(Type::Null),
        Just(Type::Duration),
        Just(Type::Timestamp),
        Just(Type::IntWrapper),
        Just(Type::StringWrapper),
        Just(Type::struct_type("pkg.M")),
        Just(Type::struct_type("pkg.N")),
    ];
    if include_dynamic {
        leaves.push(Just(Type::Dyn));
        leaves.push(Just(Type::Any));
    }
    proptest::strategy::Union::new(leaves).boxed()
}

/// Ground types (no type parameters), optionally including dyn/any.
fn arb_ground_type(include_dynamic: bool) -> impl Strategy<Value = Type> {
    arb_leaf_type(include_dynamic).prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            (inner.clone(), inner.clone()).prop_map(|(key, value)| Type::map(key, value)),
            inner.clone().prop_map(Type::optional),
            inner.prop_map(|ty| Type::TypeValue(Some(Box::new(ty)))),
        ]
    })
}

/// Types that may mention the type parameters `A` and `B`.
fn arb_parameterized_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::Int),
        Just(Type::String),
        Just(Type::type_param("A")),
        Just(Type::type_param("B")),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::list),
            (inner.clone(), inner.clone()).prop_map(|(key, value)| Type::map(key, value)),
            inner.prop_map(Type::optional),
        ]
    })
}

const SEGMENT_POOL: &[&str] = &["a", "b", "pkg", "inner"];
const IDENT_POOL: &[&str] = &["msg", "dict", "nothing"];
const FIELD_POOL: &[&str] = &["f", "g", "k"];
const STRING_POOL: &[&str] = &["x", "y", "z"];

/// Shape of a generated expression; ids are assigned when building.
#[derive(Debug, Clone)]
enum ExprShape {
    Int(i64),
    Str(usize),
    Ident(usize),
    Add(Box<ExprShape>, Box<ExprShape>),
    List(Vec<ExprShape>),
    Select(Box<ExprShape>, usize),
}

fn arb_expr_shape() -> impl Strategy<Value = ExprShape> {
    let leaf = prop_oneof![
        (-100i64..100).prop_map(ExprShape::Int),
        (0..STRING_POOL.len()).prop_map(ExprShape::Str),
        (0..IDENT_POOL.len()).prop_map(ExprShape::Ident),
    ];
    leaf.prop_recursive(4, 24, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(lhs, rhs)| ExprShape::Add(Box::new(lhs), Box::new(rhs))),
            prop::collection::vec(inner.clone(), 0..4).prop_map(ExprShape::List),
            (inner, 0..FIELD_POOL.len())
                .prop_map(|(operand, field)| ExprShape::Select(Box::new(operand), field)),
        ]
    })
}

fn build_expr(shape: &ExprShape, fx: &mut ExprFactory) -> Expr {
    match shape {
        ExprShape::Int(value) => fx.const_int(*value),
        ExprShape::Str(index) => fx.const_string(STRING_POOL[*index]),
        ExprShape::Ident(index) => fx.ident(IDENT_POOL[*index]),
        ExprShape::Add(lhs, rhs) => {
            let lhs = build_expr(lhs, fx);
            let rhs = build_expr(rhs, fx);
            fx.call("_+_", vec![lhs, rhs])
        }
        ExprShape::List(elements) => {
            let elements = elements
                .iter()
                .map(|element| build_expr(element, fx))
                .collect();
            fx.list(elements)
        }
        ExprShape::Select(operand, field) => {
            let operand = build_expr(operand, fx);
            fx.select(operand, FIELD_POOL[*field])
        }
    }
}

fn prop_env() -> TypeCheckEnv {
    let mut env = TypeCheckEnv::new("");
    env.add_function(
        FunctionDecl::with_overloads(
            "_+_",
            vec![
                OverloadDecl::global("add_int", vec![Type::Int, Type::Int], Type::Int),
                OverloadDecl::global(
                    "add_string",
                    vec![Type::String, Type::String],
                    Type::String,
                ),
                OverloadDecl::global(
                    "add_list",
                    vec![
                        Type::list(Type::type_param("A")),
                        Type::list(Type::type_param("A")),
                    ],
                    Type::list(Type::type_param("A")),
                ),
            ],
        )
        .unwrap(),
    );
    env.declare_struct("pkg.M", vec![StructTypeField::new("f", Type::Int)]);
    env.add_variable(VariableDecl::new("msg", Type::struct_type("pkg.M")));
    env.add_variable(VariableDecl::new(
        "dict",
        Type::map(Type::String, Type::Int),
    ));
    env
}

// ---------------------------------------------------------------------------
// Assignability properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn assignability_is_reflexive(ty in arb_ground_type(true)) {
        let mut context = TypeInferenceContext::new();
        prop_assert!(context.is_assignable(&ty, &ty), "{ty} should accept itself");
    }

    /// Transitivity over ground chains. dyn and any are excluded: both are
    /// universal sinks and sources, which breaks transitivity by design.
    #[test]
    fn assignability_is_transitive_without_dynamic(
        a in arb_ground_type(false),
        b in arb_ground_type(false),
        c in arb_ground_type(false),
    ) {
        let mut context = TypeInferenceContext::new();
        if context.is_assignable(&a, &b) && context.is_assignable(&b, &c) {
            prop_assert!(
                context.is_assignable(&a, &c),
                "chain broke: {a} -> {b} -> {c}"
            );
        }
    }

    #[test]
    fn finalized_types_are_ground(ty in arb_parameterized_type(), bound in arb_ground_type(true)) {
        let mut context = TypeInferenceContext::new();
        let instantiated = context.instantiate_type_params(&ty);
        // Bind some of the fresh variables by unifying against a ground type.
        let _ = context.is_assignable(&bound, &instantiated);
        let finalized = context.finalize_type(&instantiated);
        prop_assert!(!finalized.has_type_params(), "{finalized} is not ground");
    }
}

// ---------------------------------------------------------------------------
// Namespace generator properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn candidates_walk_prefixes_outermost_first(
        segments in prop::collection::vec(prop::sample::select(SEGMENT_POOL), 0..4),
        name in prop::sample::select(SEGMENT_POOL),
    ) {
        let container = segments.join(".");
        let generator = NamespaceGenerator::new(&container).unwrap();
        let mut candidates = Vec::new();
        generator.generate_candidates(name, |candidate| {
            candidates.push(candidate.to_string());
            true
        });

        prop_assert_eq!(candidates.len(), segments.len() + 1);
        prop_assert_eq!(candidates.last().unwrap().as_str(), name);
        for (index, candidate) in candidates.iter().enumerate() {
            let prefix_len = segments.len() - index;
            let expected = if prefix_len == 0 {
                name.to_string()
            } else {
                format!("{}.{}", segments[..prefix_len].join("."), name)
            };
            prop_assert_eq!(candidate, &expected);
        }
    }

    #[test]
    fn qualified_candidates_never_repeat_and_shrink(
        segments in prop::collection::vec(prop::sample::select(SEGMENT_POOL), 0..3),
        qualifiers in prop::collection::vec(prop::sample::select(SEGMENT_POOL), 1..4),
    ) {
        let container = segments.join(".");
        let generator = NamespaceGenerator::new(&container).unwrap();
        let qualifiers: Vec<String> = qualifiers.iter().map(|s| s.to_string()).collect();

        let mut seen = std::collections::HashSet::new();
        let mut last_index = usize::MAX;
        generator.generate_qualified_candidates(&qualifiers, |candidate, index| {
            assert!(seen.insert(candidate.to_string()), "repeated {candidate}");
            // The qualifier axis only ever shrinks.
            assert!(index <= last_index.min(qualifiers.len() - 1));
            last_index = index;
            true
        });
        prop_assert!(!seen.is_empty());
    }
}

// ---------------------------------------------------------------------------
// Whole-check properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn checking_is_deterministic_and_latches_errors(shape in arb_expr_shape()) {
        let checker = TypeChecker::new(prop_env());
        let mut fx = ExprFactory::new();
        let root = build_expr(&shape, &mut fx);
        let ast = Ast::new(root, SourceInfo::default());

        let first = checker.check(ast.clone()).unwrap();
        let second = checker.check(ast).unwrap();

        prop_assert_eq!(&first.issues, &second.issues);
        // An error-severity issue is present exactly when the AST is absent.
        prop_assert_eq!(first.has_errors(), first.ast.is_none());
        match (&first.ast, &second.ast) {
            (Some(first_ast), Some(second_ast)) => {
                prop_assert_eq!(&first_ast.reference_map, &second_ast.reference_map);
                prop_assert_eq!(&first_ast.type_map, &second_ast.type_map);
            }
            (None, None) => {}
            _ => prop_assert!(false, "runs disagreed on AST presence"),
        }
    }

    #[test]
    fn rechecking_reproduces_check_results(shape in arb_expr_shape()) {
        let checker = TypeChecker::new(prop_env());
        let mut fx = ExprFactory::new();
        let root = build_expr(&shape, &mut fx);
        let ast = Ast::new(root, SourceInfo::default());

        let first = checker.check(ast).unwrap();
        let Some(mut checked) = first.ast else {
            return Ok(());
        };
        let reference_map = checked.reference_map.clone();
        let type_map = checked.type_map.clone();

        checked.strip_check_results();
        let second = checker.check(checked).unwrap();
        let rechecked = second.ast.expect("clean AST stayed clean");
        prop_assert_eq!(rechecked.reference_map, reference_map);
        prop_assert_eq!(rechecked.type_map, type_map);
        prop_assert_eq!(first.issues, second.issues);
    }
}
