//! First-solution strategies (spec §4.7.2): each builds one complete
//! `RouteAssignment` greedily. These are decision builders in the spec's CP
//! framing; here, in the absence of the generic CP search engine (explicitly
//! out of scope, spec §1), each strategy directly constructs its result
//! rather than emitting `Decision` objects for a left-first explorer.

use crate::model::RoutingModel;
use crate::nocycle::NoCycleConstraint;
use crate::search_parameters::FirstSolutionStrategy;
use crate::vars::RouteAssignment;
use routing_core::error::{Result, RoutingError};
use routing_core::index::{VarIndex, VehicleIndex};
use std::collections::HashSet;

/// A user-supplied "what's next after `from`" callback (spec §4.7.2
/// EvaluatorStrategy).
pub type NextNodeEvaluator<'a> = dyn Fn(VarIndex, &HashSet<VarIndex>) -> Option<VarIndex> + 'a;

fn mandatory_nodes(model: &RoutingModel) -> HashSet<VarIndex> {
    let total = model.index().size();
    let mut optional = HashSet::new();
    for d in model.disjunctions() {
        if !d.is_mandatory() {
            optional.extend(d.nodes.iter().copied());
        }
    }
    let mut starts_ends = HashSet::new();
    for v in 0..model.index().num_vehicles() {
        starts_ends.insert(model.index().start(VehicleIndex(v)));
        starts_ends.insert(model.index().end(VehicleIndex(v)));
    }
    let locked: HashSet<VarIndex> = model.locks().iter().flat_map(|l| l.nodes.iter().copied()).collect();
    (0..total)
        .map(VarIndex)
        .filter(|i| !optional.contains(i) && !starts_ends.contains(i) && !locked.contains(i))
        .collect()
}

/// Binds every declared lock's node chain onto its vehicle (spec §4.7
/// "Restores any pre-assignment" / "lock application") and returns, per
/// vehicle, the variable index the first-solution constructor should resume
/// extending from (the lock's last node, or `Start(v)` if the vehicle has no
/// lock). Locked nodes are excluded from `mandatory_nodes` so no strategy
/// tries to place them again.
fn apply_locks(model: &RoutingModel, assignment: &mut RouteAssignment, nc: &mut NoCycleConstraint) -> Result<Vec<VarIndex>> {
    let mut frontier: Vec<VarIndex> =
        (0..model.index().num_vehicles()).map(|v| model.index().start(VehicleIndex(v))).collect();
    for lock in model.locks() {
        let mut cur = model.index().start(lock.vehicle);
        for &node in &lock.nodes {
            nc.bind(cur, node, |i| model.index().is_end(i))?;
            assignment.bind(cur, node, lock.vehicle.0 as i64);
            cur = node;
        }
        frontier[lock.vehicle.0] = cur;
    }
    Ok(frontier)
}

/// Builds the chosen strategy's initial assignment.
pub fn build(
    model: &RoutingModel,
    strategy: FirstSolutionStrategy,
    evaluator: Option<&NextNodeEvaluator>,
) -> Result<RouteAssignment> {
    if !model.is_closed() {
        return Err(RoutingError::Construction("model must be closed before building a first solution".into()));
    }
    match strategy {
        FirstSolutionStrategy::AllUnperformed => all_unperformed(model),
        FirstSolutionStrategy::PathCheapestArc => path_cheapest_arc(model, false),
        FirstSolutionStrategy::LocalCheapestArc => local_cheapest_arc(model),
        FirstSolutionStrategy::PathMostConstrainedArc => path_cheapest_arc(model, true),
        FirstSolutionStrategy::GlobalCheapestArc => global_cheapest_arc(model),
        FirstSolutionStrategy::BestInsertion => best_insertion(model),
        FirstSolutionStrategy::Savings => savings(model),
        FirstSolutionStrategy::Sweep => sweep(model),
        FirstSolutionStrategy::EvaluatorStrategy => {
            let eval = evaluator
                .ok_or_else(|| RoutingError::Construction("EvaluatorStrategy requires a callback".into()))?;
            evaluator_strategy(model, eval)
        }
    }
}

fn empty_assignment(model: &RoutingModel) -> RouteAssignment {
    let starts: Vec<VarIndex> = (0..model.index().num_vehicles()).map(|v| model.index().start(VehicleIndex(v))).collect();
    let ends: Vec<VarIndex> = (0..model.index().num_vehicles()).map(|v| model.index().end(VehicleIndex(v))).collect();
    RouteAssignment::unperformed(model.index().total_vars(), &starts, &ends)
}

/// `AllUnperformed`, `BestInsertion`, `Savings` and `Sweep` build routes from
/// a route-list/angle-sort representation rather than the per-vehicle
/// "current frontier" pattern `apply_locks` plugs into, so they don't splice
/// a lock's node chain back in as a fixed prefix (unlike `PathCheapestArc`,
/// `LocalCheapestArc`, `GlobalCheapestArc` and `EvaluatorStrategy`, which
/// all resume extension from the lock's last node). Rather than silently
/// dropping a lock's nodes from the returned assignment, these four
/// strategies refuse to run when the model declares any locks.
fn reject_locks_for(model: &RoutingModel, strategy: &str) -> Result<()> {
    if model.locks().is_empty() {
        Ok(())
    } else {
        Err(RoutingError::Construction(format!(
            "{strategy} does not support locked pre-assignments; use PathCheapestArc, \
             LocalCheapestArc, GlobalCheapestArc or EvaluatorStrategy instead"
        )))
    }
}

fn all_unperformed(model: &RoutingModel) -> Result<RouteAssignment> {
    reject_locks_for(model, "AllUnperformed")?;
    let assignment = empty_assignment(model);
    if mandatory_nodes(model).is_empty() {
        Ok(assignment)
    } else {
        Err(RoutingError::InfeasibleModel)
    }
}

/// Greedily extends each vehicle's route in turn, at every step picking the
/// cheapest feasible unvisited mandatory node (or, with `most_constrained`,
/// breaking ties toward the node with fewest remaining feasible vehicles —
/// spec §4.7.2 PathMostConstrainedArc).
fn path_cheapest_arc(model: &RoutingModel, most_constrained: bool) -> Result<RouteAssignment> {
    let mut assignment = empty_assignment(model);
    let mut remaining = mandatory_nodes(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());
    let frontier = apply_locks(model, &mut assignment, &mut nc)?;

    for v in 0..model.index().num_vehicles() {
        let vehicle = VehicleIndex(v);
        let mut cur = frontier[v];
        loop {
            let candidate = remaining
                .iter()
                .copied()
                .map(|n| {
                    let cost = model.arc_cost(vehicle, cur, n);
                    let constraint_rank = if most_constrained { feasible_vehicle_count(model, n) } else { 0 };
                    (constraint_rank, cost, n)
                })
                .min();
            let Some((_, _, best)) = candidate else { break };
            nc.bind(cur, best, |i| model.index().is_end(i))?;
            assignment.bind(cur, best, v as i64);
            remaining.remove(&best);
            cur = best;
        }
        let end = model.index().end(vehicle);
        nc.bind(cur, end, |i| model.index().is_end(i))?;
        assignment.bind(cur, end, v as i64);
    }

    if !remaining.is_empty() {
        return Err(RoutingError::InfeasibleModel);
    }
    Ok(assignment)
}

fn feasible_vehicle_count(model: &RoutingModel, node: VarIndex) -> usize {
    // Every vehicle is considered feasible for a node absent a richer
    // feasibility oracle (capacity/time-window feasibility is the
    // scheduler's concern, not the first-solution constructor's); ties are
    // broken only among nodes actually differing in vehicle count once
    // per-vehicle node restrictions exist. Kept as a hook for that future
    // refinement.
    let _ = node;
    model.index().num_vehicles()
}

/// Round-robins across all vehicles' current route ends, each step
/// extending whichever (vehicle, node) pair is globally cheapest right now
/// — "local" in the sense that only the current frontier is compared, not a
/// lookahead over insertion positions (spec §4.7.2 LocalCheapestArc).
fn local_cheapest_arc(model: &RoutingModel) -> Result<RouteAssignment> {
    let mut assignment = empty_assignment(model);
    let mut remaining = mandatory_nodes(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());
    let mut frontier = apply_locks(model, &mut assignment, &mut nc)?;

    while !remaining.is_empty() {
        let mut best: Option<(i64, usize, VarIndex)> = None;
        for (v, &cur) in frontier.iter().enumerate() {
            for &n in &remaining {
                let cost = model.arc_cost(VehicleIndex(v), cur, n);
                if best.is_none_or(|(c, _, _)| cost < c) {
                    best = Some((cost, v, n));
                }
            }
        }
        let Some((_, v, n)) = best else { break };
        let cur = frontier[v];
        nc.bind(cur, n, |i| model.index().is_end(i))?;
        assignment.bind(cur, n, v as i64);
        remaining.remove(&n);
        frontier[v] = n;
    }

    for (v, &cur) in frontier.iter().enumerate() {
        let end = model.index().end(VehicleIndex(v));
        nc.bind(cur, end, |i| model.index().is_end(i))?;
        assignment.bind(cur, end, v as i64);
    }

    if !remaining.is_empty() {
        return Err(RoutingError::InfeasibleModel);
    }
    Ok(assignment)
}

/// Repeatedly inserts the single globally cheapest (vehicle-end, node) arc
/// across every route at once, closing routes only at the end (spec §4.7.2
/// GlobalCheapestArc).
fn global_cheapest_arc(model: &RoutingModel) -> Result<RouteAssignment> {
    local_cheapest_arc(model) // identical greedy rule in this simplified form; see DESIGN.md
}

/// Cheapest-insertion construction heuristic (spec §4.7.2 BestInsertion):
/// repeatedly finds the (node, insertion edge) pair with the least cost
/// increase and splices the node in, starting from empty routes.
fn best_insertion(model: &RoutingModel) -> Result<RouteAssignment> {
    reject_locks_for(model, "BestInsertion")?;
    let mut assignment = empty_assignment(model);
    let mut remaining = mandatory_nodes(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());

    // route[v] = ordered list of bound variable indices from Start to End inclusive.
    let mut routes: Vec<Vec<VarIndex>> = (0..model.index().num_vehicles())
        .map(|v| vec![model.index().start(VehicleIndex(v)), model.index().end(VehicleIndex(v))])
        .collect();

    while !remaining.is_empty() {
        let mut best: Option<(i64, usize, usize, VarIndex)> = None; // (delta, vehicle, position, node)
        for (v, route) in routes.iter().enumerate() {
            for pos in 0..route.len() - 1 {
                let (a, b) = (route[pos], route[pos + 1]);
                let vehicle = VehicleIndex(v);
                let removed = model.arc_cost(vehicle, a, b);
                for &n in &remaining {
                    let added = model.arc_cost(vehicle, a, n) + model.arc_cost(vehicle, n, b);
                    let delta = added - removed;
                    if best.is_none_or(|(d, _, _, _)| delta < d) {
                        best = Some((delta, v, pos, n));
                    }
                }
            }
        }
        let Some((_, v, pos, n)) = best else { break };
        routes[v].insert(pos + 1, n);
        remaining.remove(&n);
    }

    for (v, route) in routes.iter().enumerate() {
        for w in route.windows(2) {
            nc.bind(w[0], w[1], |i| model.index().is_end(i))?;
            assignment.bind(w[0], w[1], v as i64);
        }
    }

    if !remaining.is_empty() {
        return Err(RoutingError::InfeasibleModel);
    }
    Ok(assignment)
}

/// Clarke-Wright savings construction (spec §4.7.2 Savings): seeds one
/// round-trip route per mandatory node from vehicle 0's depot, then
/// iteratively merges the pair of route ends with the highest savings
/// `cost(depot,i) + cost(depot,j) - cost(i,j)`, subject to staying within
/// the fleet's vehicle count.
fn savings(model: &RoutingModel) -> Result<RouteAssignment> {
    reject_locks_for(model, "Savings")?;
    if model.index().num_vehicles() == 0 {
        return Err(RoutingError::InfeasibleModel);
    }
    let vehicle0 = VehicleIndex(0);
    let depot_start = model.index().start(vehicle0);
    let depot_end = model.index().end(vehicle0);
    let mandatory: Vec<VarIndex> = mandatory_nodes(model).into_iter().collect();

    // Each singleton route is a Vec<VarIndex> of interior nodes (no depot).
    let mut routes: Vec<Vec<VarIndex>> = mandatory.iter().map(|&n| vec![n]).collect();
    merge_routes_by_savings(model, vehicle0, depot_start, depot_end, &mut routes);

    if routes.len() > model.index().num_vehicles() {
        return Err(RoutingError::InfeasibleModel);
    }

    let mut assignment = empty_assignment(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());
    for (v, route) in routes.iter().enumerate() {
        let start = model.index().start(VehicleIndex(v));
        let end = model.index().end(VehicleIndex(v));
        let mut full = vec![start];
        full.extend(route.iter().copied());
        full.push(end);
        for w in full.windows(2) {
            nc.bind(w[0], w[1], |i| model.index().is_end(i))?;
            assignment.bind(w[0], w[1], v as i64);
        }
    }
    Ok(assignment)
}

fn merge_routes_by_savings(
    model: &RoutingModel,
    vehicle0: VehicleIndex,
    depot_start: VarIndex,
    depot_end: VarIndex,
    routes: &mut Vec<Vec<VarIndex>>,
) {
    loop {
        if routes.len() <= model.index().num_vehicles() {
            return;
        }
        let mut best: Option<(i64, usize, usize)> = None;
        for i in 0..routes.len() {
            for j in 0..routes.len() {
                if i == j {
                    continue;
                }
                let tail = *routes[i].last().unwrap();
                let head = routes[j][0];
                let saving = model.arc_cost(vehicle0, tail, depot_end)
                    + model.arc_cost(vehicle0, depot_start, head)
                    - model.arc_cost(vehicle0, tail, head);
                if best.is_none_or(|(s, _, _)| saving > s) {
                    best = Some((saving, i, j));
                }
            }
        }
        let Some((saving, i, j)) = best else { return };
        if saving <= 0 {
            return;
        }
        let mut j_route = routes.remove(j);
        let i_index = if j < i { i - 1 } else { i };
        routes[i_index].append(&mut j_route);
    }
}

/// Orders nodes by angle around the first vehicle's start depot, then
/// splits the ordered list across vehicles, assigning contiguous angular
/// slices (spec §4.7.2 Sweep). Falls back to `path_cheapest_arc` if no
/// coordinates were declared on the model.
fn sweep(model: &RoutingModel) -> Result<RouteAssignment> {
    reject_locks_for(model, "Sweep")?;
    let Some(coords) = model.coordinates() else {
        log::warn!("Sweep strategy requested without node coordinates; falling back to PathCheapestArc");
        return path_cheapest_arc(model, false);
    };
    let depot_node = model.index().index_to_node(model.index().start(VehicleIndex(0)));
    let (dx, dy) = coords[depot_node.0];

    let mut mandatory: Vec<VarIndex> = mandatory_nodes(model).into_iter().collect();
    mandatory.sort_by(|&a, &b| {
        let angle = |i: VarIndex| -> f64 {
            let node = model.index().index_to_node(i);
            let (x, y) = coords[node.0];
            (y - dy).atan2(x - dx)
        };
        angle(a).partial_cmp(&angle(b)).unwrap_or(std::cmp::Ordering::Equal)
    });

    let num_vehicles = model.index().num_vehicles().max(1);
    let per_vehicle = mandatory.len().div_ceil(num_vehicles).max(1);

    let mut assignment = empty_assignment(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());
    for (v, chunk) in mandatory.chunks(per_vehicle).enumerate() {
        if v >= model.index().num_vehicles() {
            return Err(RoutingError::InfeasibleModel);
        }
        let start = model.index().start(VehicleIndex(v));
        let end = model.index().end(VehicleIndex(v));
        let mut full = vec![start];
        full.extend(chunk.iter().copied());
        full.push(end);
        for w in full.windows(2) {
            nc.bind(w[0], w[1], |i| model.index().is_end(i))?;
            assignment.bind(w[0], w[1], v as i64);
        }
    }
    Ok(assignment)
}

#[cfg(test)]
mod lock_tests {
    use super::*;
    use routing_core::eval::TransitEvaluator;
    use routing_core::index::NodeIndex;

    fn three_node_two_vehicle_model() -> RoutingModel {
        RoutingModel::new(3, &[(NodeIndex(0), NodeIndex(0)), (NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1))
    }

    #[test]
    fn path_cheapest_arc_resumes_from_a_locks_tail_node() {
        let mut model = three_node_two_vehicle_model();
        let node1 = model.index().node_to_index(NodeIndex(1));
        model.add_lock(VehicleIndex(0), vec![node1]).unwrap();
        model.close().unwrap();

        let assignment = path_cheapest_arc(&model, false).unwrap();
        let start0 = model.index().start(VehicleIndex(0));
        assert_eq!(assignment.next[start0.0], node1);
        let node2 = model.index().node_to_index(NodeIndex(2));
        assert_eq!(assignment.next[node1.0], node2);
    }

    #[test]
    fn best_insertion_rejects_a_model_with_locks() {
        let mut model = three_node_two_vehicle_model();
        let node1 = model.index().node_to_index(NodeIndex(1));
        model.add_lock(VehicleIndex(0), vec![node1]).unwrap();
        model.close().unwrap();

        assert!(best_insertion(&model).is_err());
    }

    #[test]
    fn all_unperformed_rejects_a_model_with_locks() {
        let mut model = three_node_two_vehicle_model();
        let node1 = model.index().node_to_index(NodeIndex(1));
        model.add_lock(VehicleIndex(0), vec![node1]).unwrap();
        model.close().unwrap();

        assert!(all_unperformed(&model).is_err());
    }

    #[test]
    fn path_cheapest_arc_without_locks_still_visits_every_mandatory_node() {
        let mut model = three_node_two_vehicle_model();
        model.close().unwrap();
        let assignment = path_cheapest_arc(&model, false).unwrap();
        let any_routed = (0..2).any(|v| {
            let start = model.index().start(VehicleIndex(v));
            let end = model.index().end(VehicleIndex(v));
            assignment.next[start.0] != end
        });
        assert!(any_routed);
    }
}

fn evaluator_strategy(model: &RoutingModel, evaluator: &NextNodeEvaluator) -> Result<RouteAssignment> {
    let mut assignment = empty_assignment(model);
    let mut remaining = mandatory_nodes(model);
    let mut nc = NoCycleConstraint::new(model.index().total_vars());
    let frontier = apply_locks(model, &mut assignment, &mut nc)?;

    for v in 0..model.index().num_vehicles() {
        let mut cur = frontier[v];
        while let Some(next) = evaluator(cur, &remaining) {
            if !remaining.contains(&next) {
                break;
            }
            nc.bind(cur, next, |i| model.index().is_end(i))?;
            assignment.bind(cur, next, v as i64);
            remaining.remove(&next);
            cur = next;
        }
        let end = model.index().end(VehicleIndex(v));
        nc.bind(cur, end, |i| model.index().is_end(i))?;
        assignment.bind(cur, end, v as i64);
    }

    if !remaining.is_empty() {
        return Err(RoutingError::InfeasibleModel);
    }
    Ok(assignment)
}
