//! The linear-solver contract from spec §6, as a Rust trait so
//! `routing-scheduler` and `routing-resources` can target either back-end
//! uniformly.

use crate::handle::{ConstraintHandle, SolveStatus, VarHandle};
use routing_core::error::Result;
use std::time::Duration;

pub trait LinearSolver {
    fn new_continuous_var(&mut self, lb: f64, ub: f64) -> VarHandle;

    /// MIP-only; LP back-ends return `Err`.
    fn new_int_var(&mut self, lb: f64, ub: f64) -> Result<VarHandle>;

    fn set_variable_bounds(&mut self, v: VarHandle, lb: f64, ub: f64);

    fn add_linear_constraint(&mut self, lb: f64, ub: f64, terms: &[(VarHandle, f64)]) -> ConstraintHandle;

    /// MIP-only: `literal = 1 => constraint holds`. `literal` must be binary.
    fn set_enforcement_literal(&mut self, ct: ConstraintHandle, literal: VarHandle) -> Result<()>;

    /// MIP-only: `out = x * y`.
    fn add_product_constraint(&mut self, out: VarHandle, x: VarHandle, y: VarHandle) -> Result<()>;

    /// MIP-only: `out = max(vars)`.
    fn add_maximum_constraint(&mut self, out: VarHandle, vars: &[VarHandle]) -> Result<()>;

    /// MIP-only: `literal = 1 <=> sum(terms) in [lb, ub]`.
    fn add_reified_linear_constraint(
        &mut self,
        literal: VarHandle,
        lb: f64,
        ub: f64,
        terms: &[(VarHandle, f64)],
    ) -> Result<()>;

    fn set_objective_coefficient(&mut self, v: VarHandle, coeff: f64);

    /// Pins the objective to at most (if minimizing) the given limit, for a
    /// secondary optimization pass (spec §4.5.5 packing).
    fn add_objective_constraint(&mut self, limit: f64);

    fn solve(&mut self, time_budget: Duration) -> SolveStatus;

    fn get_value(&self, v: VarHandle) -> f64;
    fn get_objective_value(&self) -> f64;

    fn clear(&mut self);
    fn model_is_empty(&self) -> bool;
}
