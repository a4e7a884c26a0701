//! Diagnostics for the Tern type checker.
//!
//! Two channels exist: [`TypeCheckIssue`]s accumulate per expression and
//! are returned to the caller in discovery order, while [`CheckError`]
//! covers broken internal invariants that abort a check outright.
//!
//! Issues are created by `tern-check` and rendered here for display.

use std::fmt;

// ---------------------------------------------------------------------------
// Severity and source locations
// ---------------------------------------------------------------------------

/// How severe an issue is. Any `Error` issue suppresses the checked AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// A 1-based line/column position.
///
/// The zero value means the expression had no recorded source position.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub line: i32,
    pub column: i32,
}

impl SourceLocation {
    pub fn new(line: i32, column: i32) -> Self {
        Self { line, column }
    }
}

// ---------------------------------------------------------------------------
// Issues
// ---------------------------------------------------------------------------

/// A single problem found while checking an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCheckIssue {
    pub severity: Severity,
    pub location: SourceLocation,
    pub message: String,
}

impl TypeCheckIssue {
    pub fn error(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            location,
            message: message.into(),
        }
    }

    pub fn warning(location: SourceLocation, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            location,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for TypeCheckIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
        };
        write!(
            f,
            "{prefix}: {}:{}: {}",
            self.location.line, self.location.column, self.message
        )
    }
}

// ---------------------------------------------------------------------------
// Fatal check failures
// ---------------------------------------------------------------------------

/// An internal invariant violation that aborts the check.
///
/// These are operational failures, not diagnostics: they indicate a broken
/// environment or checker bug rather than a problem with the expression.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckError {
    #[error("invalid container '{0}'")]
    InvalidContainer(String),

    #[error("environment lookup of '{name}' failed: {message}")]
    Lookup { name: String, message: String },

    #[error("comprehension scope stack out of sync at expression {expr_id}")]
    ScopeDesync { expr_id: i64 },

    #[error("failed to add overload '{overload_id}' to narrowed declaration of '{function}'")]
    OverloadNarrowing {
        function: String,
        overload_id: String,
    },

    #[error("map literal produced mismatched key and value type resolution")]
    MapInference,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_display_includes_location() {
        let issue = TypeCheckIssue::error(
            SourceLocation::new(1, 5),
            "undeclared reference to 'x' (in container '')",
        );
        assert_eq!(
            issue.to_string(),
            "ERROR: 1:5: undeclared reference to 'x' (in container '')"
        );
        assert!(issue.is_error());
    }

    #[test]
    fn warning_is_not_error() {
        let issue = TypeCheckIssue::warning(SourceLocation::default(), "unsupported map key");
        assert!(!issue.is_error());
        assert!(issue.to_string().starts_with("WARNING: 0:0:"));
    }

    #[test]
    fn check_error_messages_are_stable() {
        let err = CheckError::InvalidContainer("1bad".to_string());
        assert_eq!(err.to_string(), "invalid container '1bad'");
        let err = CheckError::ScopeDesync { expr_id: 7 };
        assert!(err.to_string().contains("expression 7"));
    }
}
