use rendezvous_core::{InputError, SolverBackend};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("malformed input: {0}")]
    MalformedInput(#[from] InputError),
    #[error(
        "big-M {configured} does not exceed the widest level gap this instance can produce ({required})"
    )]
    BigMTooSmall { configured: f64, required: f64 },
    #[error(
        "level range {level_range} cannot count the {seats} people {person}'s car may carry; use at least {required}"
    )]
    LevelRangeTooNarrow {
        person: String,
        seats: u32,
        level_range: u32,
        required: u32,
    },
    #[error("solver `{name}` is not available on the {backend:?} backend")]
    UnsupportedSolver { name: String, backend: SolverBackend },
    #[error("the model is infeasible")]
    InfeasibleModel,
    #[error("the solver did not finish within its time limit")]
    OracleTimeout,
    #[error("the solver failed: {0}")]
    OracleFailure(String),
    #[error("the solver returned an inconsistent assignment: {0}")]
    InconsistentSolution(String),
}
