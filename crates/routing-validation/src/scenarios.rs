//! End-to-end scenarios: each builds a small model or route directly,
//! drives the relevant solving component, and checks the result against a
//! hand-derived expectation. Reused by the integration tests and by
//! `scenario-report`, so every scenario returns a plain `Result` rather
//! than asserting — the caller decides how to surface a failure.

use crate::{check_all_model_invariants, pair_vehicle_coherence, resource_capacity_respected};
use log::debug;
use routing_core::dimension::{BreakRequest, Dimension, Interval};
use routing_core::eval::TransitEvaluator;
use routing_core::index::{IndexManager, NodeIndex};
use routing_model::{routes_to_assignment, RoutingModel, SearchParameters};
use routing_resources::{assign_resources, ResourceClass};
use routing_scheduler::{PerRouteLp, RouteInput};
use std::rc::Rc;
use std::time::Duration;

/// A single scenario's outcome: the observed headline value, for a report
/// row, alongside the pass/fail verdict baked into the `Result`.
pub struct Outcome {
    pub detail: String,
}

fn ok(detail: impl Into<String>) -> Result<Outcome, String> {
    Ok(Outcome { detail: detail.into() })
}

/// A one-vehicle tour over nodes laid out on a line, with `|i - j|` arc
/// costs: nearest-neighbor construction alone already finds the optimal
/// tour, so this exercises `first_solution::path_cheapest_arc` plus the
/// model-level invariants without needing local search to improve anything.
pub fn tsp_on_a_line() -> Result<Outcome, String> {
    debug!("running tsp_on_a_line");
    let num_nodes = 4;
    let depots = [(NodeIndex(0), NodeIndex(0))];
    let index = IndexManager::new(num_nodes, &depots);
    let arc_cost = TransitEvaluator::Callback(Rc::new(move |from, to| {
        let a = index.index_to_node(from).0 as i64;
        let b = index.index_to_node(to).0 as i64;
        (a - b).abs()
    }));
    let mut model = RoutingModel::new(num_nodes, &depots, arc_cost);
    model.close().map_err(|e| e.to_string())?;

    let report = routing_search::solve(&model, &SearchParameters::default(), None).map_err(|e| e.to_string())?;
    let failures = check_all_model_invariants(&model, &report.assignment);
    if !failures.is_empty() {
        return Err(format!("invariant violations: {failures:?}"));
    }
    if report.final_cost != 6 {
        return Err(format!("expected cost 6, got {}", report.final_cost));
    }
    ok(format!("cost={} iterations={}", report.final_cost, report.iterations))
}

/// A single optional stop behind a disjunction: the constant arc cost (10)
/// makes visiting it twice as expensive as paying its penalty (7), so the
/// cheapest feasible plan leaves it unperformed.
pub fn disjunction_cheaper_unperformed() -> Result<Outcome, String> {
    debug!("running disjunction_cheaper_unperformed");
    let num_nodes = 3;
    let depots = [(NodeIndex(0), NodeIndex(0))];
    let mut model = RoutingModel::new(num_nodes, &depots, TransitEvaluator::Constant(10));
    let skip_var = model.index().node_to_index(NodeIndex(2));
    model.add_disjunction(vec![skip_var], 7).map_err(|e| e.to_string())?;
    model.close().map_err(|e| e.to_string())?;

    let report = routing_search::solve(&model, &SearchParameters::default(), None).map_err(|e| e.to_string())?;
    let failures = check_all_model_invariants(&model, &report.assignment);
    if !failures.is_empty() {
        return Err(format!("invariant violations: {failures:?}"));
    }
    if report.assignment.active[skip_var.0] {
        return Err("expected the disjunction's node to stay unperformed".into());
    }
    if report.final_cost != 27 {
        return Err(format!("expected cost 27 (2*10 arc + 7 penalty), got {}", report.final_cost));
    }
    ok(format!("cost={} node2_active={}", report.final_cost, report.assignment.active[skip_var.0]))
}

fn line_route_input<'a>(
    dimension: &'a Dimension,
    var_indices: &'a [routing_core::index::VarIndex],
    fixed_transit: &'a [i64],
    cumul_bounds: &'a [(i64, i64)],
) -> RouteInput<'a> {
    RouteInput {
        dimension,
        path_len: cumul_bounds.len(),
        var_indices,
        min_transit: fixed_transit,
        fixed_transit,
        pre_travel: &[0, 0],
        post_travel: &[0, 0],
        cumul_bounds,
        pickup_delivery_limits: &[],
        span_hard_upper_bound: None,
        soft_span_upper_bound: None,
        slack_cost_coefficient: 0,
        breaks: &[],
        inter_break: None,
        travel_deps: &[None, None],
    }
}

/// A narrow time window two hops away from a fixed-transit departure: with
/// no slack allowed the forced arrival time misses the window entirely;
/// allowing enough slack lets the route wait long enough to land inside it.
pub fn time_window_needs_slack() -> Result<Outcome, String> {
    debug!("running time_window_needs_slack");
    let var_indices = [
        routing_core::index::VarIndex(0),
        routing_core::index::VarIndex(1),
        routing_core::index::VarIndex(2),
    ];
    let fixed_transit = [1i64, 1i64];
    let cumul_bounds = [(0i64, 0i64), (0i64, 3i64), (8i64, 8i64)];

    let tight = Dimension::new("time", TransitEvaluator::Constant(1), i64::MAX, 0);
    let input = line_route_input(&tight, &var_indices, &fixed_transit, &cumul_bounds);
    let mut lp = PerRouteLp::build(&input).map_err(|e| e.to_string())?;
    match lp.solve(Duration::from_secs(1)) {
        Err(routing_core::error::RoutingError::LinearSolverInfeasible(_)) => {}
        Err(e) => return Err(format!("expected an infeasible LP, got a different error: {e}")),
        Ok(sol) => return Err(format!("expected infeasible with zero slack, got cumuls {:?}", sol.cumuls)),
    }

    let loose = Dimension::new("time", TransitEvaluator::Constant(1), i64::MAX, 6);
    let input = line_route_input(&loose, &var_indices, &fixed_transit, &cumul_bounds);
    let mut lp = PerRouteLp::build(&input).map_err(|e| e.to_string())?;
    let sol = lp.solve(Duration::from_secs(1)).map_err(|e| e.to_string())?;
    if sol.cumuls.last() != Some(&8) {
        return Err(format!("expected the route to land on cumul 8, got {:?}", sol.cumuls));
    }
    ok(format!("infeasible at slack_max=0, cumuls={:?} at slack_max=6", sol.cumuls))
}

/// A pickup and delivery bound to the same vehicle in the right order:
/// constructed directly (rather than via search, which has no guarantee of
/// ever re-discovering pair coherence once it is lost) to check that the
/// invariant checkers correctly recognize a coherent plan.
pub fn pickup_delivery_pair_coherent() -> Result<Outcome, String> {
    debug!("running pickup_delivery_pair_coherent");
    let num_nodes = 4;
    let depots = [(NodeIndex(0), NodeIndex(0))];
    let mut model = RoutingModel::new(num_nodes, &depots, TransitEvaluator::Constant(1));
    let pickup = model.index().node_to_index(NodeIndex(1));
    let delivery = model.index().node_to_index(NodeIndex(3));
    model.add_pair(pickup, delivery).map_err(|e| e.to_string())?;
    model.close().map_err(|e| e.to_string())?;

    let assignment = routes_to_assignment(&model, &[vec![NodeIndex(1), NodeIndex(2), NodeIndex(3)]])
        .map_err(|e| e.to_string())?;
    pair_vehicle_coherence(&model, &assignment)?;
    let failures = check_all_model_invariants(&model, &assignment);
    if !failures.is_empty() {
        return Err(format!("invariant violations: {failures:?}"));
    }
    ok("pickup and delivery share vehicle 0, pickup precedes delivery".to_string())
}

/// A single break request placed in the middle of a two-arc route: the
/// break's duration must appear in the route's total span even though
/// neither arc's own transit accounts for it.
pub fn break_extends_route_span() -> Result<Outcome, String> {
    debug!("running break_extends_route_span");
    let var_indices = [
        routing_core::index::VarIndex(0),
        routing_core::index::VarIndex(1),
        routing_core::index::VarIndex(2),
    ];
    let fixed_transit = [3i64, 3i64];
    let cumul_bounds = [(0i64, 0i64), (0i64, 100i64), (0i64, 100i64)];
    let breaks = [BreakRequest { start: Interval::new(4, 6), end: Interval::new(6, 8), duration: Interval::new(2, 2) }];

    let dim = Dimension::new("time", TransitEvaluator::Constant(3), i64::MAX, 100);
    let input = RouteInput {
        dimension: &dim,
        path_len: cumul_bounds.len(),
        var_indices: &var_indices,
        min_transit: &fixed_transit,
        fixed_transit: &fixed_transit,
        pre_travel: &[0, 0],
        post_travel: &[0, 0],
        cumul_bounds: &cumul_bounds,
        pickup_delivery_limits: &[],
        span_hard_upper_bound: None,
        soft_span_upper_bound: None,
        slack_cost_coefficient: 0,
        breaks: &breaks,
        inter_break: None,
        travel_deps: &[None, None],
    };
    let mut lp = PerRouteLp::build(&input).map_err(|e| e.to_string())?;
    let sol = lp.solve(Duration::from_secs(1)).map_err(|e| e.to_string())?;
    let end = *sol.cumuls.last().ok_or("empty cumul vector")?;
    if end < 8 {
        return Err(format!("expected the route end to land at or after 8 once the break is placed, got {end}"));
    }
    ok(format!("route end={end}, breaks={:?}", sol.breaks))
}

/// Three vehicles and two resource classes, one of which is infeasible for
/// one vehicle: the min-cost flow must respect both the per-class capacity
/// and the infeasible pairing.
pub fn resource_assignment_respects_capacity() -> Result<Outcome, String> {
    debug!("running resource_assignment_respects_capacity");
    let classes = vec![
        ResourceClass { available: 2, cost_per_vehicle: vec![0, 0, -1] },
        ResourceClass { available: 1, cost_per_vehicle: vec![-1, -1, 0] },
    ];
    let assignment = assign_resources(3, &classes).map_err(|e| e.to_string())?;
    resource_capacity_respected(&assignment.class_of, &classes.iter().map(|c| c.available).collect::<Vec<_>>())?;

    if assignment.class_of[2] != Some(1) {
        return Err(format!("expected vehicle 2 in class 1 (the only feasible one), got {:?}", assignment.class_of[2]));
    }
    if assignment.class_of[0].is_none() || assignment.class_of[1].is_none() {
        return Err(format!("expected vehicles 0 and 1 both assigned, got {:?}", assignment.class_of));
    }
    if assignment.total_cost != 0 {
        return Err(format!("expected zero total cost, got {}", assignment.total_cost));
    }
    ok(format!("class_of={:?} total_cost={}", assignment.class_of, assignment.total_cost))
}

/// Every scenario, in report order, for the CLI summary and the
/// integration-test suite to share.
pub fn all() -> Vec<(&'static str, fn() -> Result<Outcome, String>)> {
    vec![
        ("tsp_on_a_line", tsp_on_a_line),
        ("disjunction_cheaper_unperformed", disjunction_cheaper_unperformed),
        ("time_window_needs_slack", time_window_needs_slack),
        ("pickup_delivery_pair_coherent", pickup_delivery_pair_coherent),
        ("break_extends_route_span", break_extends_route_span),
        ("resource_assignment_respects_capacity", resource_assignment_respects_capacity),
    ]
}
