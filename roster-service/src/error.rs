use shared::vocabulary::SolveStatus;
use thiserror::Error;

// Roster generation error taxonomy. Everything inside a single generation is
// converted to one of these; nothing panics across the crate boundary.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Infeasible input: {0}")]
    InfeasibleInput(String),

    #[error("No solution ({status}): {detail}")]
    NoSolution { status: SolveStatus, detail: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenerationError {
    pub fn no_solution(status: SolveStatus, detail: impl Into<String>) -> Self {
        Self::NoSolution {
            status,
            detail: detail.into(),
        }
    }
}
