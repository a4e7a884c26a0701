use std::hint::black_box;

use divan::{AllocProfiler, Bencher};
use tern_ast::{Ast, Expr, ExprFactory, SourceInfo};
use tern_check::{
    FunctionDecl, OverloadDecl, StructTypeField, TypeCheckEnv, TypeChecker, VariableDecl,
};
use tern_types::Type;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

#[divan::bench(args = [16, 64, 256])]
fn check_addition_chain(bencher: Bencher, terms: usize) {
    let checker = bench_checker();
    let ast = build_addition_chain(terms);
    bencher.bench(|| {
        let result = checker
            .check(black_box(ast.clone()))
            .unwrap_or_else(|err| panic!("check failed in benchmark setup: {err}"));
        assert!(result.ast.is_some(), "benchmark expression should be clean");
        black_box(result.issues.len())
    });
}

#[divan::bench(args = [16, 64, 256])]
fn check_select_chain(bencher: Bencher, depth: usize) {
    let checker = bench_checker();
    let ast = build_select_chain(depth);
    bencher.bench(|| {
        let result = checker
            .check(black_box(ast.clone()))
            .unwrap_or_else(|err| panic!("check failed in benchmark setup: {err}"));
        assert!(result.ast.is_some(), "benchmark expression should be clean");
        black_box(result.issues.len())
    });
}

#[divan::bench(args = [8, 32, 128])]
fn check_comprehension_fold(bencher: Bencher, elements: usize) {
    let checker = bench_checker();
    let ast = build_comprehension_fold(elements);
    bencher.bench(|| {
        let result = checker
            .check(black_box(ast.clone()))
            .unwrap_or_else(|err| panic!("check failed in benchmark setup: {err}"));
        assert!(result.ast.is_some(), "benchmark expression should be clean");
        black_box(result.issues.len())
    });
}

#[divan::bench(args = [16, 64])]
fn check_struct_literals(bencher: Bencher, count: usize) {
    let checker = bench_checker();
    let ast = build_struct_literals(count);
    bencher.bench(|| {
        let result = checker
            .check(black_box(ast.clone()))
            .unwrap_or_else(|err| panic!("check failed in benchmark setup: {err}"));
        assert!(result.ast.is_some(), "benchmark expression should be clean");
        black_box(result.issues.len())
    });
}

fn bench_env() -> TypeCheckEnv {
    let mut env = TypeCheckEnv::new("bench");
    env.add_function(
        FunctionDecl::with_overloads(
            "_+_",
            vec![
                OverloadDecl::global("add_int", vec![Type::Int, Type::Int], Type::Int),
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
        .expect("benchmark overloads should not collide"),
    );
    env.declare_struct(
        "bench.Node",
        vec![
            StructTypeField::new("value", Type::Int),
            StructTypeField::new("child", Type::struct_type("bench.Node")),
        ],
    );
    env.add_variable(VariableDecl::new("root", Type::struct_type("bench.Node")));
    env
}

fn bench_checker() -> TypeChecker {
    TypeChecker::new(bench_env())
}

fn build_addition_chain(terms: usize) -> Ast {
    let mut fx = ExprFactory::new();
    let mut expr = fx.const_int(0);
    for value in 1..=terms.max(1) {
        let rhs = fx.const_int(value as i64);
        expr = fx.call("_+_", vec![expr, rhs]);
    }
    Ast::new(expr, SourceInfo::default())
}

fn build_select_chain(depth: usize) -> Ast {
    let mut fx = ExprFactory::new();
    let mut expr = fx.ident("root");
    for _ in 0..depth.max(1) {
        expr = fx.select(expr, "child");
    }
    expr = fx.select(expr, "value");
    Ast::new(expr, SourceInfo::default())
}

fn build_comprehension_fold(elements: usize) -> Ast {
    let mut fx = ExprFactory::new();
    let items: Vec<Expr> = (0..elements.max(1))
        .map(|value| fx.const_int(value as i64))
        .collect();
    let range = fx.list(items);
    let init = fx.list(vec![]);
    let cond = fx.const_bool(true);
    let accu = fx.ident("__result__");
    let item = fx.ident("item");
    let step_elem = fx.list(vec![item]);
    let step = fx.call("_+_", vec![accu, step_elem]);
    let result = fx.ident("__result__");
    let comp = fx.comprehension(range, "item", init, "__result__", cond, step, result);
    Ast::new(comp, SourceInfo::default())
}

fn build_struct_literals(count: usize) -> Ast {
    let mut fx = ExprFactory::new();
    let structs: Vec<Expr> = (0..count.max(1))
        .map(|value| {
            let value = fx.const_int(value as i64);
            let field = fx.struct_field("value", value);
            fx.struct_expr("bench.Node", vec![field])
        })
        .collect();
    let list = fx.list(structs);
    Ast::new(list, SourceInfo::default())
}