//! Global LP stitching and resource coupling (spec §4.5.4): combines every
//! vehicle's per-route model into one solver instance, adds inter-route
//! precedences and a global span cost, and constrains each resource-bearing
//! vehicle's start/end cumuls to its assigned resource's attribute window.
//!
//! Simplification: spec §4.5.4 describes resource coupling via
//! `assign[rc,v]` binaries living inside this same LP. We instead let
//! `routing-resources`'s min-cost-flow engine (§4.6) decide the assignment
//! first, then fold the winning resource's domain into this LP as plain
//! bound tightening — the combinatorial assignment decision is not
//! duplicated in two solvers. See DESIGN.md.

use crate::route::{self, RouteInput, RouteSolution, RouteVars};
use routing_core::dimension::Interval;
use routing_core::error::{Result, RoutingError};
use routing_lp::{LinearSolver, MipBackend, SolveStatus};
use std::time::Duration;

pub struct InterRoutePrecedence {
    pub a_vehicle: usize,
    pub a_pos: usize,
    pub b_vehicle: usize,
    pub b_pos: usize,
    pub offset: i64,
}

pub struct GlobalInput<'a> {
    pub routes: Vec<RouteInput<'a>>,
    pub precedences: &'a [InterRoutePrecedence],
    /// per vehicle: the resource domain already chosen by `routing-resources`.
    pub resource_domains: Vec<Option<(Interval, Interval)>>,
    pub global_span_coefficient: Option<i64>,
}

pub struct GlobalSolution {
    pub routes: Vec<RouteSolution>,
    pub total_cost: i64,
}

pub fn solve(global: GlobalInput, deadline: Duration) -> Result<GlobalSolution> {
    let mut solver = MipBackend::new();
    let mut all_vars: Vec<RouteVars> = Vec::with_capacity(global.routes.len());
    for input in &global.routes {
        let vars = route::add_route(&mut solver, input, true)?;
        all_vars.push(vars);
    }

    for p in global.precedences {
        let a = all_vars[p.a_vehicle].cumul[p.a_pos];
        let b = all_vars[p.b_vehicle].cumul[p.b_pos];
        let effective_offset =
            p.offset + all_vars[p.a_vehicle].cumul_offset - all_vars[p.b_vehicle].cumul_offset;
        solver.add_linear_constraint(effective_offset as f64, f64::INFINITY, &[(b, 1.0), (a, -1.0)]);
    }

    for (v, domain) in global.resource_domains.iter().enumerate() {
        let Some((start_domain, end_domain)) = domain else { continue };
        let rv = &all_vars[v];
        let start = rv.cumul[0];
        let end = *rv.cumul.last().expect("route must have at least one cumul position");
        solver.add_linear_constraint(
            (start_domain.lo - rv.cumul_offset) as f64,
            (start_domain.hi - rv.cumul_offset) as f64,
            &[(start, 1.0)],
        );
        solver.add_linear_constraint(
            (end_domain.lo - rv.cumul_offset) as f64,
            (end_domain.hi - rv.cumul_offset) as f64,
            &[(end, 1.0)],
        );
    }

    if let Some(coefficient) = global.global_span_coefficient {
        if !all_vars.is_empty() {
            let max_end = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
            let min_start = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
            for rv in &all_vars {
                let start = rv.cumul[0];
                let end = *rv.cumul.last().unwrap();
                // max_end >= end + offset
                solver.add_linear_constraint(
                    rv.cumul_offset as f64,
                    f64::INFINITY,
                    &[(max_end, 1.0), (end, -1.0)],
                );
                // min_start <= start + offset
                solver.add_linear_constraint(
                    f64::NEG_INFINITY,
                    rv.cumul_offset as f64,
                    &[(min_start, 1.0), (start, -1.0)],
                );
            }
            solver.set_objective_coefficient(max_end, coefficient as f64);
            solver.set_objective_coefficient(min_start, -(coefficient as f64));
        }
    }

    let status = solver.solve(deadline);
    if status == SolveStatus::Infeasible {
        return Err(RoutingError::LinearSolverInfeasible("global dimension LP".into()));
    }
    // Read the shared solver's combined objective exactly once: against the
    // global stitched MIP, `get_objective_value()` already covers every
    // route plus the global span terms, so it must not be read per route
    // and summed (that would multiply it by the route count).
    let total_cost = solver.get_objective_value().round() as i64;
    let mut routes = Vec::with_capacity(all_vars.len());
    for vars in &all_vars {
        // Each `RouteSolution.cost` is that route's own objective share
        // only (see `route_objective_contribution`), not the shared
        // solver's whole-model objective.
        let sol = route::extract_solution(&mut solver, vars, 0, status)?;
        routes.push(sol);
    }
    Ok(GlobalSolution { routes, total_cost })
}
