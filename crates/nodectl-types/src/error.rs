// ─────────────────────────────────────────────────────────────────────
// Director-Class AI — Controller Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all controller failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ControlError {
    /// Unsupported feature or invalid setting (dropout, unknown
    /// integrator, malformed config).
    #[error("config error: {0}")]
    Config(String),

    /// A value does not match the width inferred at construction.
    #[error("shape mismatch in {context}: expected {expected}, got {got}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        got: usize,
    },

    /// Time-tracking flag and state layout disagree. Indicates a
    /// construction bug; never coerced.
    #[error("state invariant violated: {0}")]
    StateInvariant(String),

    /// Numerical error (NaN/Inf in computation).
    #[error("numerical error: {0}")]
    Numerical(String),
}

impl ControlError {
    pub fn shape(context: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            got,
        }
    }
}

pub type ControlResult<T> = Result<T, ControlError>;
