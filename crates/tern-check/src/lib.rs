//! Static type checking for Tern expressions.
//!
//! This crate implements the whole check pass:
//! - namespace-aware name resolution for identifiers, qualified
//!   identifiers, receiver-style calls, and struct type names
//! - expression typing for literals, aggregates, selects, calls, and
//!   comprehensions
//! - overload resolution with parametric type inference
//! - assignability checking for struct field initialisers
//! - a final rewrite stamping resolved names, overload ids, and flattened
//!   types onto the output AST
//!
//! A [`TypeChecker`] wraps a read-only [`TypeCheckEnv`] and may be shared
//! across threads; every [`check`] call owns its own inference state and
//! side tables.
//!
//! [`check`]: TypeChecker::check

pub mod env;
pub mod infer;
pub mod namespace;
pub mod trace;

mod resolver;
mod rewrite;

use tern_ast::{traverse, Ast};
use tern_diag::{CheckError, TypeCheckIssue};

use crate::resolver::ResolveVisitor;
use crate::rewrite::rewrite_checked_ast;

pub use crate::env::{
    DeclError, FunctionDecl, OverloadDecl, ProviderError, StructTypeField, TypeCheckEnv,
    TypeProvider, VariableDecl,
};
pub use crate::infer::{OverloadResolution, TypeInferenceContext};
pub use crate::namespace::NamespaceGenerator;
pub use crate::trace::InferenceTrace;

// Re-export for convenience.
pub use tern_diag::{Severity, SourceLocation};

/// Outcome of one check call.
///
/// `ast` is present only when no issue has error severity; the issues list
/// is in discovery order (AST post-order) either way.
#[derive(Debug)]
pub struct ValidationResult {
    pub issues: Vec<TypeCheckIssue>,
    pub ast: Option<Ast>,
    /// Inference trace, populated when tracing was enabled on the checker.
    pub trace: Option<InferenceTrace>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(TypeCheckIssue::is_error)
    }
}

/// A type checker bound to one environment.
#[derive(Debug)]
pub struct TypeChecker {
    env: TypeCheckEnv,
    tracing: bool,
}

impl TypeChecker {
    pub fn new(env: TypeCheckEnv) -> Self {
        Self {
            env,
            tracing: false,
        }
    }

    /// Record inference decisions of subsequent checks in the result.
    pub fn enable_tracing(&mut self) {
        self.tracing = true;
    }

    pub fn env(&self) -> &TypeCheckEnv {
        &self.env
    }

    /// Type-check `ast` against the environment.
    ///
    /// Returns `Err` only for broken internal invariants (bad container,
    /// failing environment lookups, scope desynchronisation); ordinary
    /// type problems come back as issues in the [`ValidationResult`].
    pub fn check(&self, ast: Ast) -> Result<ValidationResult, CheckError> {
        let namespaces = NamespaceGenerator::new(self.env.container())?;
        let mut inference = TypeInferenceContext::new();
        if self.tracing {
            inference.enable_tracing();
        }

        let mut visitor =
            ResolveVisitor::new(&self.env, &namespaces, &ast.source_info, inference);
        traverse(&ast.root, &mut visitor);
        let (outputs, mut inference, issues) = visitor.finish()?;
        let trace = inference.take_trace();

        if issues.iter().any(TypeCheckIssue::is_error) {
            return Ok(ValidationResult {
                issues,
                ast: None,
                trace,
            });
        }

        // Second pass over the tree, so resolution state is complete before
        // any node is mutated.
        let mut ast = ast;
        rewrite_checked_ast(&mut ast, &outputs, &inference);

        Ok(ValidationResult {
            issues,
            ast: Some(ast),
            trace,
        })
    }
}


#[cfg(test)]
mod prop_tests;
