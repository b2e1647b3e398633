//! C3: a uniform interface over a continuous LP back-end (`good_lp` /
//! `microlp`) and an exact MIP back-end (`highs`), per spec §4.3/§6.
//!
//! Callers in `routing-scheduler` and `routing-resources` build their model
//! against the `LinearSolver` trait and pick whichever back-end the
//! constraint mix requires: plain chain/span/cumul constraints run fine on
//! the pure-LP back-end, while break placement, inter-break "cover" chains,
//! and travel-start-dependent compression cost need the MIP back-end's
//! enforcement literals, product and maximum constraints.

mod handle;
mod lp_backend;
mod mip_backend;
mod traits;

pub use handle::{ConstraintHandle, SolveStatus, VarHandle};
pub use lp_backend::LpBackend;
pub use mip_backend::MipBackend;
pub use traits::LinearSolver;
