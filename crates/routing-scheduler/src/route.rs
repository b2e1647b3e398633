//! Per-route LP/MIP construction (spec §4.5 steps 1-11): given a
//! CP-tightened cumul topology for one vehicle's route, builds the
//! dimension's chain/soft-bound/span/pickup-delivery/break constraints and
//! solves for optimal cumul, slack and break values.

use crate::breaks::{self, BreakBuildOutcome};
use crate::travel::{self, TravelBuildOutcome};
use log::{debug, warn};
use routing_core::dimension::{BreakRequest, Dimension, InterBreakDistance, SpanCost, TravelStartDependency};
use routing_core::error::{Result, RoutingError};
use routing_core::index::VarIndex;
use routing_lp::{LinearSolver, LpBackend, MipBackend, SolveStatus, VarHandle};
use std::time::Duration;

/// Everything the scheduler needs about one vehicle's route topology to
/// build its per-route LP; `path_len == min_transit.len() + 1`.
pub struct RouteInput<'a> {
    pub dimension: &'a Dimension,
    pub path_len: usize, // number of cumul positions (L+1)
    /// the dimension's `VarIndex` at each cumul position, for soft-bound lookup.
    pub var_indices: &'a [VarIndex],
    pub min_transit: &'a [i64],   // length L
    pub fixed_transit: &'a [i64], // length L, ignored on arcs with a travel dependency
    pub pre_travel: &'a [i64],    // length L
    pub post_travel: &'a [i64],   // length L
    pub cumul_bounds: &'a [(i64, i64)], // length L+1, already CP/bounds-propagator tightened
    pub pickup_delivery_limits: &'a [(usize, usize, i64)], // (pickup pos, delivery pos, limit)
    pub span_hard_upper_bound: Option<i64>,
    pub soft_span_upper_bound: Option<(i64, SpanCost)>,
    pub slack_cost_coefficient: i64,
    pub breaks: &'a [BreakRequest],
    pub inter_break: Option<InterBreakDistance>,
    pub travel_deps: &'a [Option<TravelStartDependency>], // length L
}

#[derive(Debug, Clone)]
pub struct BreakPlacement {
    pub start: i64,
    pub end: i64,
    pub duration: i64,
    pub slack_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct RouteSolution {
    pub status: SolveStatus,
    pub cumuls: Vec<i64>,
    pub slacks: Vec<i64>,
    pub cost: i64,
    pub breaks: Vec<BreakPlacement>,
}

/// The handles produced by `add_route`, independent of which solver
/// instance they live in — reused by both the single-route builder
/// (`PerRouteLp`) and the global stitcher (`routing_scheduler::global`),
/// which calls `add_route` once per vehicle against one shared solver.
pub struct RouteVars {
    pub cumul: Vec<VarHandle>,
    pub slack: Vec<VarHandle>,
    pub cumul_offset: i64,
    pub break_vars: Vec<breaks::BreakVars>,
    pub breaks: Vec<BreakRequest>,
    pub uses_mip: bool,
    /// the dimension objective terms set at build time, kept so packing
    /// passes (spec §4.5.5) can zero them out and substitute their own.
    pub objective_terms: Vec<(VarHandle, f64)>,
}

pub(crate) fn needs_mip(input: &RouteInput) -> bool {
    !input.breaks.is_empty()
        || input.inter_break.is_some()
        || input.travel_deps.iter().any(|d| d.is_some())
        || matches!(input.soft_span_upper_bound, Some((_, SpanCost::Quadratic { .. })))
}

/// Builds one route's chain/soft-bound/span/pickup-delivery/break
/// constraints (spec §4.5 steps 1-11) against `solver` and returns the
/// variable handles needed to read back a solution. `use_mip` must be
/// `true` whenever `needs_mip(input)` is; the global stitcher always
/// passes `true` since it shares one MIP solver across every route.
pub(crate) fn add_route(solver: &mut dyn LinearSolver, input: &RouteInput, use_mip: bool) -> Result<RouteVars> {
    let cumul_offset = input.cumul_bounds.iter().map(|&(lb, _)| lb).min().unwrap_or(0);

    let mut cumul = Vec::with_capacity(input.path_len);
    for &(lb, ub) in input.cumul_bounds {
        cumul.push(solver.new_continuous_var((lb - cumul_offset) as f64, (ub - cumul_offset) as f64));
    }

    let slack_max = input.dimension.slack_max as f64;
    let mut slack = Vec::with_capacity(input.path_len.saturating_sub(1));
    for _ in 0..input.path_len.saturating_sub(1) {
        slack.push(solver.new_continuous_var(0.0, slack_max));
    }

    // Step 4/5: chain constraints, replaced by the travel model on arcs
    // with a travel-start dependency.
    let mut travel_outcome = TravelBuildOutcome::default();
    for k in 0..input.path_len.saturating_sub(1) {
        match input.travel_deps.get(k).and_then(|d| d.as_ref()) {
            Some(dep) if use_mip => {
                let out = travel::build_arc(
                    solver,
                    cumul[k],
                    cumul[k + 1],
                    slack[k],
                    dep,
                    input.pre_travel[k],
                    input.post_travel[k],
                )?;
                travel_outcome.merge(out);
            }
            Some(_) => {
                warn!("travel-start dependency on arc {} ignored: LP back-end cannot model it", k);
                solver.add_linear_constraint(
                    input.fixed_transit[k] as f64,
                    input.fixed_transit[k] as f64,
                    &[(cumul[k + 1], 1.0), (cumul[k], -1.0), (slack[k], -1.0)],
                );
            }
            None => {
                solver.add_linear_constraint(
                    input.fixed_transit[k] as f64,
                    input.fixed_transit[k] as f64,
                    &[(cumul[k + 1], 1.0), (cumul[k], -1.0), (slack[k], -1.0)],
                );
            }
        }
    }

    // Step 6: soft bounds.
    let mut objective_terms: Vec<(VarHandle, f64)> = travel_outcome.objective_terms.clone();
    for k in 0..input.path_len {
        let node = input.var_indices[k];
        if let Some(sb) = input.dimension.soft_upper_bounds.get(&node) {
            let overshoot = solver.new_continuous_var(0.0, f64::INFINITY);
            // cumul[k] - overshoot <= bound - offset
            solver.add_linear_constraint(
                f64::NEG_INFINITY,
                (sb.bound - cumul_offset) as f64,
                &[(cumul[k], 1.0), (overshoot, -1.0)],
            );
            objective_terms.push((overshoot, sb.coefficient as f64));
        }
        if let Some(sb) = input.dimension.soft_lower_bounds.get(&node) {
            let undershoot = solver.new_continuous_var(0.0, f64::INFINITY);
            // cumul[k] + undershoot >= bound - offset
            solver.add_linear_constraint(
                (sb.bound - cumul_offset) as f64,
                f64::INFINITY,
                &[(cumul[k], 1.0), (undershoot, 1.0)],
            );
            objective_terms.push((undershoot, sb.coefficient as f64));
        }
    }

    // Step 7: pickup-to-delivery limits.
    for &(p, d, limit) in input.pickup_delivery_limits {
        solver.add_linear_constraint(f64::NEG_INFINITY, limit as f64, &[(cumul[d], 1.0), (cumul[p], -1.0)]);
    }

    // Step 8/9: span bound.
    if input.path_len >= 2 {
        let start = cumul[0];
        let end = cumul[input.path_len - 1];
        if let Some(ub) = input.span_hard_upper_bound {
            solver.add_linear_constraint(f64::NEG_INFINITY, ub as f64, &[(end, 1.0), (start, -1.0)]);
        }
        if let Some((soft_ub, cost)) = &input.soft_span_upper_bound {
            let overshoot = solver.new_continuous_var(0.0, f64::INFINITY);
            // end - start - overshoot <= soft_ub
            solver.add_linear_constraint(
                f64::NEG_INFINITY,
                *soft_ub as f64,
                &[(end, 1.0), (start, -1.0), (overshoot, -1.0)],
            );
            match cost {
                SpanCost::Linear { coefficient } => {
                    objective_terms.push((overshoot, *coefficient as f64));
                }
                SpanCost::Quadratic { coefficient } => {
                    if use_mip {
                        let squared = solver.new_continuous_var(0.0, f64::INFINITY);
                        solver.add_product_constraint(squared, overshoot, overshoot)?;
                        objective_terms.push((squared, *coefficient as f64));
                    } else {
                        warn!("quadratic soft span cost downgraded to linear on the LP back-end");
                        objective_terms.push((overshoot, *coefficient as f64));
                    }
                }
            }
        }
        if input.slack_cost_coefficient != 0 {
            for &s in &slack {
                objective_terms.push((s, input.slack_cost_coefficient as f64));
            }
        }
    }

    // Step 10: break placement and inter-break distance.
    let break_build = if !input.breaks.is_empty() && use_mip {
        breaks::build(solver, input, &cumul, &slack)?
    } else {
        if !input.breaks.is_empty() {
            warn!("breaks declared but LP back-end selected; breaks dropped for this route");
        }
        BreakBuildOutcome::default()
    };
    objective_terms.extend(break_build.objective_terms.clone());

    for (var, coeff) in &objective_terms {
        solver.set_objective_coefficient(*var, *coeff);
    }

    Ok(RouteVars {
        cumul,
        slack,
        cumul_offset,
        break_vars: break_build.vars,
        breaks: input.breaks.to_vec(),
        uses_mip: use_mip,
        objective_terms,
    })
}

/// A built, reusable per-route model (spec §4.5.6 / SPEC_FULL C.1):
/// callers with the same topology but different fixed cumul/break values
/// call `resolve_with` instead of rebuilding from scratch.
pub struct PerRouteLp {
    solver: Box<dyn LinearSolver>,
    vars: RouteVars,
    cost_offset: i64,
}

impl PerRouteLp {
    pub fn build(input: &RouteInput) -> Result<Self> {
        let use_mip = needs_mip(input);
        let mut solver: Box<dyn LinearSolver> =
            if use_mip { Box::new(MipBackend::new()) } else { Box::new(LpBackend::new()) };
        let vars = add_route(solver.as_mut(), input, use_mip)?;
        Ok(PerRouteLp { solver, vars, cost_offset: 0 })
    }

    /// Fixed transit cost the scheduler's LP objective does not model
    /// (spec SPEC_FULL C.4): added verbatim to the reported route cost.
    pub fn set_cost_offset(&mut self, offset: i64) {
        self.cost_offset = offset;
    }

    pub fn solve(&mut self, deadline: Duration) -> Result<RouteSolution> {
        read_solution(self.solver.as_mut(), &self.vars, self.cost_offset, deadline)
    }

    /// Re-pins the solution variables to fixed values and re-solves without
    /// rebuilding constraints (spec §4.5.6).
    pub fn resolve_with(&mut self, fixed_cumuls: &[Option<i64>], deadline: Duration) -> Result<RouteSolution> {
        for (k, fixed) in fixed_cumuls.iter().enumerate() {
            if let Some(value) = fixed {
                let offset_value = (*value - self.vars.cumul_offset) as f64;
                self.solver.set_variable_bounds(self.vars.cumul[k], offset_value, offset_value);
            }
        }
        self.solve(deadline)
    }

    /// Pins the dimension objective to at most `limit` (spec §4.5.5 step 1/3).
    pub fn pin_objective(&mut self, limit: i64) {
        for (var, coeff) in &self.vars.objective_terms {
            self.solver.set_objective_coefficient(*var, *coeff);
        }
        self.solver.add_objective_constraint(limit as f64);
    }

    /// Switches the objective to "minimize this route's end cumul" (step 2).
    pub fn minimize_end(&mut self) {
        for (var, _) in &self.vars.objective_terms {
            self.solver.set_objective_coefficient(*var, 0.0);
        }
        let end = *self.vars.cumul.last().expect("route must have a cumul position");
        self.solver.set_objective_coefficient(end, 1.0);
    }

    /// Pins this route's end cumul to at most `value` (step 3).
    pub fn pin_end(&mut self, value: i64) {
        let end = *self.vars.cumul.last().expect("route must have a cumul position");
        let offset_value = (value - self.vars.cumul_offset) as f64;
        self.solver.add_linear_constraint(f64::NEG_INFINITY, offset_value, &[(end, 1.0)]);
    }

    /// Switches the objective to "maximize this route's start cumul" (step 4),
    /// expressed as minimizing its negation since `LinearSolver` always minimizes.
    pub fn maximize_start(&mut self) {
        for (var, _) in &self.vars.objective_terms {
            self.solver.set_objective_coefficient(*var, 0.0);
        }
        let start = self.vars.cumul[0];
        self.solver.set_objective_coefficient(start, -1.0);
    }
}

pub(crate) fn read_solution(
    solver: &mut dyn LinearSolver,
    vars: &RouteVars,
    cost_offset: i64,
    deadline: Duration,
) -> Result<RouteSolution> {
    let status = solver.solve(deadline);
    if status == SolveStatus::Infeasible {
        return Err(RoutingError::LinearSolverInfeasible("per-route dimension LP".into()));
    }
    extract_solution(solver, vars, cost_offset, status)
}

/// Reads back a route's solution from an already-solved solver (used by
/// the global stitcher, which solves once for every route at once).
pub(crate) fn extract_solution(
    solver: &mut dyn LinearSolver,
    vars: &RouteVars,
    cost_offset: i64,
    status: SolveStatus,
) -> Result<RouteSolution> {
    let cumuls: Vec<i64> =
        vars.cumul.iter().map(|&v| solver.get_value(v).round() as i64 + vars.cumul_offset).collect();
    let slacks: Vec<i64> = vars.slack.iter().map(|&v| solver.get_value(v).round() as i64).collect();
    let breaks = vars
        .break_vars
        .iter()
        .map(|bv| BreakPlacement {
            start: solver.get_value(bv.start).round() as i64 + vars.cumul_offset,
            end: solver.get_value(bv.end).round() as i64 + vars.cumul_offset,
            duration: solver.get_value(bv.duration).round() as i64,
            slack_index: bv.chosen_slack(&*solver),
        })
        .collect();
    debug!("route LP solved: status={:?} uses_mip={}", status, vars.uses_mip);
    Ok(RouteSolution {
        status,
        cumuls,
        slacks,
        cost: route_objective_contribution(solver, vars) + cost_offset,
        breaks,
    })
}

/// This route's own share of whatever objective it was built against: the
/// sum of its own `objective_terms` at their solved values. Unlike
/// `solver.get_objective_value()`, this is safe to call when `solver` is a
/// shared global solver holding every route's variables at once (spec
/// §4.5.4) — each route only sums the terms `add_route` registered for it,
/// not the whole model's objective.
fn route_objective_contribution(solver: &mut dyn LinearSolver, vars: &RouteVars) -> i64 {
    vars.objective_terms
        .iter()
        .map(|(var, coeff)| coeff * solver.get_value(*var))
        .sum::<f64>()
        .round() as i64
}
