//! Error taxonomy of the assignment pipeline.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// Structurally invalid input, detected while building the repositories. Nothing is solved.
    #[error("Malformed input: {0}")]
    MalformedInput(String),
    /// No assignment satisfies all constraints. Expected for over-constrained quorum, capacity or
    /// balance settings.
    #[error("Problem is infeasible: {0}")]
    InfeasibleProblem(String),
    /// The solved values contradict the model's own invariants.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),
    /// The solver failed for another reason than infeasibility
    #[error("Solver failure: {0}")]
    Solver(String),
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}
