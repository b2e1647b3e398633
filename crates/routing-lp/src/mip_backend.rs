//! Exact MIP back-end: the bundled HiGHS solver (spec §4.3 "MIP/CP-SAT
//! back-end"), reached directly (not through `good_lp`) so we can read
//! HiGHS's own model status — mirrors the teacher's `vrppd-milp` choice of
//! talking to `highs` directly rather than going through `good_lp`, because
//! `good_lp` does not surface Optimal vs TimeLimit distinctly.
//!
//! Enforcement literals, product constraints, maximum constraints and
//! reified linear constraints are not native HiGHS row types; they are
//! compiled down to linear rows (McCormick envelopes for products, a
//! selector-binary encoding for maxima, big-M for enforcement/reification)
//! at `solve()` time, the same way a CP-SAT front end lowers them before
//! handing a model to a pure LP/MIP solver.

use crate::handle::{ConstraintHandle, SolveStatus, VarHandle};
use crate::traits::LinearSolver;
use routing_core::error::{Result, RoutingError};
use std::time::Duration;

/// A practical stand-in for "infinity" when computing big-M coefficients;
/// unbounded variables are assumed to not actually reach this in any
/// feasible solution, consistent with the rest of the crate treating
/// `2^62` as the effective integer ceiling (spec §4.4.3).
const BIG: f64 = 1e12;

struct VarSpec {
    lb: f64,
    ub: f64,
    integer: bool,
}

struct ConstraintSpec {
    lb: f64,
    ub: f64,
    terms: Vec<(VarHandle, f64)>,
    enforcement: Option<VarHandle>,
}

struct ProductSpec {
    out: VarHandle,
    x: VarHandle,
    y: VarHandle,
}

struct MaxSpec {
    out: VarHandle,
    operands: Vec<VarHandle>,
}

struct ReifiedSpec {
    literal: VarHandle,
    lb: f64,
    ub: f64,
    terms: Vec<(VarHandle, f64)>,
}

#[derive(Default)]
pub struct MipBackend {
    vars: Vec<VarSpec>,
    constraints: Vec<ConstraintSpec>,
    products: Vec<ProductSpec>,
    maxes: Vec<MaxSpec>,
    reified: Vec<ReifiedSpec>,
    objective: Vec<f64>,
    objective_constraint: Option<f64>,
    values: Vec<f64>,
    objective_value: f64,
    last_status: SolveStatus,
}

impl Default for SolveStatus {
    fn default() -> Self {
        SolveStatus::Infeasible
    }
}

impl MipBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn bounds(&self, v: VarHandle) -> (f64, f64) {
        let spec = &self.vars[v.0];
        (spec.lb.max(-BIG), spec.ub.min(BIG))
    }

    fn term_range(&self, terms: &[(VarHandle, f64)]) -> f64 {
        terms
            .iter()
            .map(|&(v, c)| {
                let (lb, ub) = self.bounds(v);
                c.abs() * (ub - lb).max(0.0)
            })
            .sum::<f64>()
            .max(1.0)
    }
}

impl LinearSolver for MipBackend {
    fn new_continuous_var(&mut self, lb: f64, ub: f64) -> VarHandle {
        self.vars.push(VarSpec { lb, ub, integer: false });
        self.objective.push(0.0);
        self.values.push(0.0);
        VarHandle(self.vars.len() - 1)
    }

    fn new_int_var(&mut self, lb: f64, ub: f64) -> Result<VarHandle> {
        self.vars.push(VarSpec { lb, ub, integer: true });
        self.objective.push(0.0);
        self.values.push(0.0);
        Ok(VarHandle(self.vars.len() - 1))
    }

    fn set_variable_bounds(&mut self, v: VarHandle, lb: f64, ub: f64) {
        self.vars[v.0].lb = lb;
        self.vars[v.0].ub = ub;
    }

    fn add_linear_constraint(&mut self, lb: f64, ub: f64, terms: &[(VarHandle, f64)]) -> ConstraintHandle {
        self.constraints.push(ConstraintSpec { lb, ub, terms: terms.to_vec(), enforcement: None });
        ConstraintHandle(self.constraints.len() - 1)
    }

    fn set_enforcement_literal(&mut self, ct: ConstraintHandle, literal: VarHandle) -> Result<()> {
        if !self.vars[literal.0].integer || self.vars[literal.0].lb < 0.0 || self.vars[literal.0].ub > 1.0 {
            return Err(RoutingError::Construction("enforcement literal must be a binary variable".into()));
        }
        self.constraints[ct.0].enforcement = Some(literal);
        Ok(())
    }

    fn add_product_constraint(&mut self, out: VarHandle, x: VarHandle, y: VarHandle) -> Result<()> {
        self.products.push(ProductSpec { out, x, y });
        Ok(())
    }

    fn add_maximum_constraint(&mut self, out: VarHandle, vars: &[VarHandle]) -> Result<()> {
        if vars.is_empty() {
            return Err(RoutingError::Construction("maximum constraint needs at least one operand".into()));
        }
        self.maxes.push(MaxSpec { out, operands: vars.to_vec() });
        Ok(())
    }

    fn add_reified_linear_constraint(
        &mut self,
        literal: VarHandle,
        lb: f64,
        ub: f64,
        terms: &[(VarHandle, f64)],
    ) -> Result<()> {
        if !self.vars[literal.0].integer {
            return Err(RoutingError::Construction("reification literal must be a binary variable".into()));
        }
        self.reified.push(ReifiedSpec { literal, lb, ub, terms: terms.to_vec() });
        Ok(())
    }

    fn set_objective_coefficient(&mut self, v: VarHandle, coeff: f64) {
        self.objective[v.0] = coeff;
    }

    fn add_objective_constraint(&mut self, limit: f64) {
        self.objective_constraint = Some(limit);
    }

    fn solve(&mut self, time_budget: Duration) -> SolveStatus {
        use highs::{HighsModelStatus, RowProblem, Sense};

        let mut pb = RowProblem::default();
        let cols: Vec<highs::Col> = self
            .vars
            .iter()
            .enumerate()
            .map(|(i, v)| {
                if v.integer {
                    pb.add_integer_column(self.objective[i], v.lb..=v.ub)
                } else {
                    pb.add_column(self.objective[i], v.lb..=v.ub)
                }
            })
            .collect();

        // Plain constraints, converting an enforced one to a pair of big-M rows.
        for c in &self.constraints {
            let row: Vec<(highs::Col, f64)> = c.terms.iter().map(|&(v, co)| (cols[v.0], co)).collect();
            match c.enforcement {
                None => {
                    pb.add_row(c.lb..=c.ub, &row);
                }
                Some(lit) => {
                    let m = self.term_range(&c.terms) + (c.ub - c.lb).abs().min(BIG) + 1.0;
                    if c.ub < BIG {
                        let mut upper_row = row.clone();
                        upper_row.push((cols[lit.0], m));
                        pb.add_row(f64::NEG_INFINITY..=(c.ub + m), &upper_row);
                    }
                    if c.lb > -BIG {
                        let mut lower_row: Vec<(highs::Col, f64)> = row.iter().map(|&(v, co)| (v, -co)).collect();
                        lower_row.push((cols[lit.0], m));
                        pb.add_row(f64::NEG_INFINITY..=(m - c.lb), &lower_row);
                    }
                }
            }
        }

        // McCormick envelope for each product constraint z = x*y, exact
        // whenever x or y is binary (spec §4.5.2's durationInSlack use).
        for p in &self.products {
            let (xl, xu) = self.bounds(p.x);
            let (yl, yu) = self.bounds(p.y);
            let zc = cols[p.out.0];
            let xc = cols[p.x.0];
            let yc = cols[p.y.0];
            pb.add_row(-xl * yl..=f64::INFINITY, &[(zc, 1.0), (yc, -xl), (xc, -yl)]);
            pb.add_row(-xu * yu..=f64::INFINITY, &[(zc, 1.0), (yc, -xu), (xc, -yu)]);
            pb.add_row(f64::NEG_INFINITY..=-xu * yl, &[(zc, 1.0), (yc, -xl), (xc, -yu)]);
            pb.add_row(f64::NEG_INFINITY..=-xl * yu, &[(zc, 1.0), (yc, -xu), (xc, -yl)]);
        }

        // max(vars) via one selector binary per operand (sum of selectors = 1).
        for m in &self.maxes {
            let (_, out_ub) = self.bounds(m.out);
            let mut selectors = Vec::with_capacity(m.operands.len());
            for &op in &m.operands {
                let sel = pb.add_integer_column(0.0, 0.0..=1.0);
                selectors.push(sel);
                let (op_lb, _) = self.bounds(op);
                // out >= op (always).
                pb.add_row(0.0..=f64::INFINITY, &[(cols[m.out.0], 1.0), (cols[op.0], -1.0)]);
                // out <= op + M*(1 - sel): out - op + M*sel <= M
                let big = (out_ub - op_lb).max(1.0);
                pb.add_row(
                    f64::NEG_INFINITY..=big,
                    &[(cols[m.out.0], 1.0), (cols[op.0], -1.0), (sel, big)],
                );
            }
            let ones: Vec<(highs::Col, f64)> = selectors.iter().map(|&s| (s, 1.0)).collect();
            pb.add_row(1.0..=1.0, &ones);
        }

        // Reified linear constraints, both directions, eps = 1 (integral domains).
        for r in &self.reified {
            let row: Vec<(highs::Col, f64)> = r.terms.iter().map(|&(v, co)| (cols[v.0], co)).collect();
            let lit = cols[r.literal.0];
            let m = self.term_range(&r.terms) + (r.ub - r.lb).abs().min(BIG) + 2.0;
            // literal=1 => lb <= sum <= ub
            if r.ub < BIG {
                let mut up = row.clone();
                up.push((lit, m));
                pb.add_row(f64::NEG_INFINITY..=(r.ub + m), &up);
            }
            if r.lb > -BIG {
                let mut lo: Vec<(highs::Col, f64)> = row.iter().map(|&(v, co)| (v, -co)).collect();
                lo.push((lit, m));
                pb.add_row(f64::NEG_INFINITY..=(m - r.lb), &lo);
            }
            // literal=0 => sum <= lb-1 OR sum >= ub+1, selected by an
            // auxiliary binary `side`.
            let side = pb.add_integer_column(0.0, 0.0..=1.0);
            let mut below = row.clone();
            below.push((lit, m));
            below.push((side, m));
            pb.add_row(f64::NEG_INFINITY..=(r.lb - 1.0 + 2.0 * m), &below);
            let mut above: Vec<(highs::Col, f64)> = row.iter().map(|&(v, co)| (v, -co)).collect();
            above.push((lit, m));
            above.push((side, -m));
            pb.add_row(f64::NEG_INFINITY..=(m - r.ub - 1.0), &above);
        }

        if let Some(limit) = self.objective_constraint {
            let terms: Vec<(highs::Col, f64)> = self
                .objective
                .iter()
                .enumerate()
                .filter(|(_, c)| **c != 0.0)
                .map(|(i, c)| (cols[i], *c))
                .collect();
            pb.add_row(f64::NEG_INFINITY..=limit, &terms);
        }

        let mut model = pb.optimise(Sense::Minimise);
        model.set_option("time_limit", time_budget.as_secs_f64().max(0.01));
        let solved = model.solve();

        match solved.status() {
            HighsModelStatus::Optimal => {
                let solution = solved.get_solution();
                let values = solution.columns();
                for i in 0..self.vars.len() {
                    self.values[i] = values[i];
                }
                self.objective_value = self.objective.iter().zip(self.values.iter()).map(|(c, v)| c * v).sum();
                self.last_status = SolveStatus::Optimal;
                SolveStatus::Optimal
            }
            HighsModelStatus::TimeLimit => {
                let solution = solved.get_solution();
                let values = solution.columns();
                if values.len() == self.vars.len() {
                    for i in 0..self.vars.len() {
                        self.values[i] = values[i];
                    }
                    self.objective_value = self.objective.iter().zip(self.values.iter()).map(|(c, v)| c * v).sum();
                    self.last_status = SolveStatus::RelaxedOptimalOnly;
                    SolveStatus::RelaxedOptimalOnly
                } else {
                    self.last_status = SolveStatus::Infeasible;
                    SolveStatus::Infeasible
                }
            }
            _ => {
                self.last_status = SolveStatus::Infeasible;
                SolveStatus::Infeasible
            }
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
        self.products.clear();
        self.maxes.clear();
        self.reified.clear();
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
    fn enforcement_literal_gates_a_constraint() {
        let mut mip = MipBackend::new();
        let x = mip.new_continuous_var(0.0, 10.0);
        let e = mip.new_int_var(0.0, 1.0).unwrap();
        let ct = mip.add_linear_constraint(5.0, 5.0, &[(x, 1.0)]); // x == 5, only if e
        mip.set_enforcement_literal(ct, e).unwrap();
        mip.set_objective_coefficient(e, 1.0); // push e towards 0 when possible
        assert_eq!(mip.solve(Duration::from_secs(1)), SolveStatus::Optimal);
        // e is allowed to be 0, so x need not be 5.
        assert!(mip.get_value(e) - 0.0 < 1e-6);
    }

    #[test]
    fn product_constraint_tracks_binary_times_continuous() {
        let mut mip = MipBackend::new();
        let x = mip.new_continuous_var(0.0, 20.0);
        let b = mip.new_int_var(0.0, 1.0).unwrap();
        let z = mip.new_continuous_var(0.0, 20.0);
        mip.add_product_constraint(z, x, b).unwrap();
        mip.add_linear_constraint(1.0, 1.0, &[(b, 1.0)]); // force b = 1
        mip.add_linear_constraint(7.0, 7.0, &[(x, 1.0)]); // force x = 7
        mip.set_objective_coefficient(z, 1.0);
        assert_eq!(mip.solve(Duration::from_secs(1)), SolveStatus::Optimal);
        assert!((mip.get_value(z) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn maximum_constraint_picks_the_largest_operand() {
        let mut mip = MipBackend::new();
        let a = mip.new_continuous_var(0.0, 10.0);
        let c = mip.new_continuous_var(0.0, 10.0);
        let out = mip.new_continuous_var(0.0, 10.0);
        mip.add_linear_constraint(3.0, 3.0, &[(a, 1.0)]);
        mip.add_linear_constraint(8.0, 8.0, &[(c, 1.0)]);
        mip.add_maximum_constraint(out, &[a, c]).unwrap();
        mip.set_objective_coefficient(out, 1.0);
        assert_eq!(mip.solve(Duration::from_secs(1)), SolveStatus::Optimal);
        assert!((mip.get_value(out) - 8.0).abs() < 1e-6);
    }
}
