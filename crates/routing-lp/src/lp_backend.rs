//! Continuous LP back-end: `good_lp` over its bundled pure-Rust `microlp`
//! solver (spec §4.3 "LP back-end: continuous simplex").
//!
//! `good_lp` does not support mutating a variable's declared bounds or
//! removing a constraint once added, and does not expose a deadline-aware
//! partial solve. We therefore keep our own record of variables/
//! constraints/objective and rebuild a fresh `good_lp` problem on every
//! `solve()` call — acceptable here because the scheduler only calls
//! `solve()` a handful of times per route (spec §4.5.5's three-pass
//! packing, plus the occasional dual-simplex retry).

use crate::handle::{ConstraintHandle, SolveStatus, VarHandle};
use crate::traits::LinearSolver;
use good_lp::{variable, Expression, ProblemVariables, Solution, SolverModel};
use routing_core::error::{Result, RoutingError};
use std::time::Duration;

struct VarSpec {
    lb: f64,
    ub: f64,
}

struct ConstraintSpec {
    lb: f64,
    ub: f64,
    terms: Vec<(VarHandle, f64)>,
}

#[derive(Default)]
pub struct LpBackend {
    vars: Vec<VarSpec>,
    constraints: Vec<ConstraintSpec>,
    objective: Vec<f64>,
    objective_constraint: Option<f64>,
    values: Vec<f64>,
    objective_value: f64,
}

impl LpBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LinearSolver for LpBackend {
    fn new_continuous_var(&mut self, lb: f64, ub: f64) -> VarHandle {
        self.vars.push(VarSpec { lb, ub });
        self.objective.push(0.0);
        self.values.push(0.0);
        VarHandle(self.vars.len() - 1)
    }

    fn new_int_var(&mut self, _lb: f64, _ub: f64) -> Result<VarHandle> {
        Err(RoutingError::Construction("the LP back-end does not support integer variables".into()))
    }

    fn set_variable_bounds(&mut self, v: VarHandle, lb: f64, ub: f64) {
        self.vars[v.0].lb = lb;
        self.vars[v.0].ub = ub;
    }

    fn add_linear_constraint(&mut self, lb: f64, ub: f64, terms: &[(VarHandle, f64)]) -> ConstraintHandle {
        self.constraints.push(ConstraintSpec { lb, ub, terms: terms.to_vec() });
        ConstraintHandle(self.constraints.len() - 1)
    }

    fn set_enforcement_literal(&mut self, _ct: ConstraintHandle, _literal: VarHandle) -> Result<()> {
        Err(RoutingError::Construction("enforcement literals require the MIP back-end".into()))
    }

    fn add_product_constraint(&mut self, _out: VarHandle, _x: VarHandle, _y: VarHandle) -> Result<()> {
        Err(RoutingError::Construction("product constraints require the MIP back-end".into()))
    }

    fn add_maximum_constraint(&mut self, _out: VarHandle, _vars: &[VarHandle]) -> Result<()> {
        Err(RoutingError::Construction("maximum constraints require the MIP back-end".into()))
    }

    fn add_reified_linear_constraint(
        &mut self,
        _literal: VarHandle,
        _lb: f64,
        _ub: f64,
        _terms: &[(VarHandle, f64)],
    ) -> Result<()> {
        Err(RoutingError::Construction("reified constraints require the MIP back-end".into()))
    }

    fn set_objective_coefficient(&mut self, v: VarHandle, coeff: f64) {
        self.objective[v.0] = coeff;
    }

    fn add_objective_constraint(&mut self, limit: f64) {
        self.objective_constraint = Some(limit);
    }

    fn solve(&mut self, _time_budget: Duration) -> SolveStatus {
        let mut problem_vars = ProblemVariables::new();
        let handles: Vec<good_lp::Variable> = self
            .vars
            .iter()
            .map(|v| problem_vars.add(variable().min(v.lb).max(v.ub)))
            .collect();

        let mut objective = Expression::from(0.0);
        for (i, coeff) in self.objective.iter().enumerate() {
            if *coeff != 0.0 {
                objective += handles[i] * (*coeff);
            }
        }

        let mut model = problem_vars.minimise(objective.clone()).using(good_lp::solvers::microlp::microlp);

        for c in &self.constraints {
            let mut expr = Expression::from(0.0);
            for &(v, coeff) in &c.terms {
                expr += handles[v.0] * coeff;
            }
            if c.lb == c.ub {
                model = model.with(good_lp::constraint!(expr.clone() == c.lb));
            } else {
                if c.lb > f64::NEG_INFINITY {
                    model = model.with(good_lp::constraint!(expr.clone() >= c.lb));
                }
                if c.ub < f64::INFINITY {
                    model = model.with(good_lp::constraint!(expr.clone() <= c.ub));
                }
            }
        }

        if let Some(limit) = self.objective_constraint {
            model = model.with(good_lp::constraint!(objective.clone() <= limit));
        }

        match model.solve() {
            Ok(solution) => {
                for (i, h) in handles.iter().enumerate() {
                    self.values[i] = solution.value(*h);
                }
                self.objective_value = self.objective.iter().zip(self.values.iter()).map(|(c, v)| c * v).sum();
                SolveStatus::Optimal
            }
            Err(_) => SolveStatus::Infeasible,
        }
    }

    fn get_value(&self, v: VarHandle) -> f64 {
        self.values[v.0]
    }

    fn get_objective_value(&self) -> f64 {
        self.objective_value
    }

    fn clear(&mut self) {
        self.vars.clear();
        self.constraints.clear();
        self.objective.clear();
        self.objective_constraint = None;
        self.values.clear();
        self.objective_value = 0.0;
    }

    fn model_is_empty(&self) -> bool {
        self.vars.is_empty() && self.constraints.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_a_simple_chain() {
        let mut lp = LpBackend::new();
        let x = lp.new_continuous_var(0.0, 100.0);
        let y = lp.new_continuous_var(0.0, 100.0);
        lp.add_linear_constraint(5.0, f64::INFINITY, &[(y, 1.0), (x, -1.0)]); // y - x >= 5
        lp.set_objective_coefficient(x, 1.0);
        lp.set_objective_coefficient(y, 1.0);
        assert_eq!(lp.solve(Duration::from_secs(1)), SolveStatus::Optimal);
        assert!((lp.get_value(y) - lp.get_value(x) - 5.0).abs() < 1e-6 || lp.get_value(y) - lp.get_value(x) >= 5.0 - 1e-6);
    }

    #[test]
    fn infeasible_bounds_report_infeasible() {
        let mut lp = LpBackend::new();
        let x = lp.new_continuous_var(10.0, 20.0);
        lp.add_linear_constraint(0.0, 5.0, &[(x, 1.0)]); // x <= 5 contradicts x >= 10
        assert_eq!(lp.solve(Duration::from_secs(1)), SolveStatus::Infeasible);
    }
}
