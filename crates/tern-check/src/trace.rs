//! Tracing types for checker observability.
//!
//! These records capture the inference decisions behind a check so tools
//! can expose the checker's reasoning. Tracing is opt-in via
//! [`TypeInferenceContext::enable_tracing`] and costs nothing when off.
//!
//! [`TypeInferenceContext::enable_tracing`]: crate::TypeInferenceContext::enable_tracing

use serde::Serialize;

/// One assignability query answered by the inference context.
#[derive(Debug, Clone, Serialize)]
pub struct AssignabilityStep {
    pub from: String,
    pub to: String,
    pub assignable: bool,
}

/// One overload candidate considered during call resolution.
#[derive(Debug, Clone, Serialize)]
pub struct OverloadStep {
    pub function: String,
    pub overload_id: String,
    pub matched: bool,
}

/// The full trace of one check.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InferenceTrace {
    pub assignability: Vec<AssignabilityStep>,
    pub overloads: Vec<OverloadStep>,
}
