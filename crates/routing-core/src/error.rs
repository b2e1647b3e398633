//! Error kinds from spec §7, shared by every crate in the workspace.

use thiserror::Error;

/// The six abstract error kinds from §7, each carrying enough context to
/// explain itself without a backtrace.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error("construction error: {0}")]
    Construction(String),

    #[error("model is infeasible")]
    InfeasibleModel,

    #[error("deadline exceeded before a complete solve finished")]
    DeadlineExceeded,

    #[error("linear solver reported infeasible: {0}")]
    LinearSolverInfeasible(String),

    #[error("saturating arithmetic overflow while accumulating {0}")]
    Overflow(&'static str),

    #[error("invalid routes input: {0}")]
    InvalidRoutesInput(String),
}

pub type Result<T> = std::result::Result<T, RoutingError>;
