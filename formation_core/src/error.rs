// formation_core/src/error.rs

use thiserror::Error;

/// Every failure the formation algorithms can surface to a caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormationError {
    /// An input collection did not have the size the algorithm requires.
    #[error("dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A geometric construction was asked for something with no valid shape.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A control loop used up its iteration budget without reaching the goal.
    #[error("controller did not converge after {iterations} iterations (residual {residual:.4})")]
    NonConvergence { iterations: usize, residual: f64 },

    /// A configuration value is outside the range the controllers accept.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, FormationError>;
