use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by system construction and by the evolution engine.
///
/// Everything here is raised at the point of detection and propagated
/// unchanged; nothing is retried or recovered internally.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum SystemError {
    /// The update rule and the initial state disagree about the dimension
    /// of the state space.
    #[error("Dimension mismatch: rule is {rule}-dimensional, state has length {state}.")]
    DimensionMismatch { rule: usize, state: usize },

    /// A large system was built without an in-place update rule. Derivatives
    /// can be synthesized; update rules cannot.
    #[error("Large system requires an explicit in-place update rule.")]
    MissingRule,

    /// A trajectory of fewer than one point was requested.
    #[error("Step count must be at least 1, got {0}.")]
    InvalidStepCount(usize),
}
