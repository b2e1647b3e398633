//! `CompactAssignment` (spec §4.7.5): rearranges a solved assignment so that
//! all used vehicles occupy the lowest indices, by swapping an unused
//! vehicle's (empty) route with a higher-indexed used vehicle's route when
//! the swap cannot change total cost or the swapped-in vehicle's feasibility
//! — i.e. when the two vehicles share the same start/end depot and the same
//! effective arc cost along that route (spec §8 invariant 10: "compacted
//! cost equals the original").
//!
//! Cumul/break variables are not owned by this crate (they live in
//! `routing-scheduler`); a caller that needs them refreshed after compaction
//! re-runs the scheduler against the rewritten topology, per spec §4.7.5
//! "rebuilds cumul/transit variables along the reassigned route".

use crate::model::RoutingModel;
use crate::vars::RouteAssignment;
use routing_core::arith::cap_add;
use routing_core::index::VehicleIndex;

fn is_used(model: &RoutingModel, assignment: &RouteAssignment, v: usize) -> bool {
    let start = model.index().start(VehicleIndex(v));
    let end = model.index().end(VehicleIndex(v));
    assignment.next[start.0] != end
}

fn route_cost_under(model: &RoutingModel, assignment: &RouteAssignment, vehicle: VehicleIndex, from_start: bool) -> i64 {
    let start = model.index().start(vehicle);
    let mut total = 0i64;
    let mut cur = start;
    loop {
        let nxt = assignment.next[cur.0];
        total = cap_add(total, model.arc_cost(vehicle, cur, nxt));
        if model.index().is_end(nxt) {
            break;
        }
        cur = nxt;
    }
    let _ = from_start;
    total
}

/// Attempts to compact `assignment` in place. Returns `true` on success
/// (every used vehicle now occupies the lowest indices, or no rearrangement
/// was needed), `false` if a higher-indexed vehicle remains used with no
/// feasible lower-indexed swap available — per spec, the assignment is left
/// as-is in that case (not partially compacted with a dangling invariant).
pub fn compact_assignment(model: &RoutingModel, assignment: &mut RouteAssignment) -> bool {
    let num_vehicles = model.index().num_vehicles();
    // Snapshot so a failed attempt can be rolled back to "as-is".
    let snapshot = assignment.clone();

    for v in 0..num_vehicles {
        if is_used(model, assignment, v) {
            continue;
        }
        let v_start_node = model.index().index_to_node(model.index().start(VehicleIndex(v)));
        let v_end_node = model.index().index_to_node(model.index().end(VehicleIndex(v)));

        let mut swapped = false;
        for vp in (v + 1..num_vehicles).rev() {
            if !is_used(model, assignment, vp) {
                continue;
            }
            let vp_start_node = model.index().index_to_node(model.index().start(VehicleIndex(vp)));
            let vp_end_node = model.index().index_to_node(model.index().end(VehicleIndex(vp)));
            if v_start_node != vp_start_node || v_end_node != vp_end_node {
                continue;
            }

            let cost_under_vp = route_cost_under(model, assignment, VehicleIndex(vp), true);
            let cost_under_v = {
                // Re-evaluate the same chain of visited nodes under vehicle v's
                // (possibly distinct) arc-cost function.
                let start_vp = model.index().start(VehicleIndex(vp));
                let mut total = 0i64;
                let mut cur = start_vp;
                loop {
                    let nxt = assignment.next[cur.0];
                    total = cap_add(total, model.arc_cost(VehicleIndex(v), cur, nxt));
                    if model.index().is_end(nxt) {
                        break;
                    }
                    cur = nxt;
                }
                total
            };
            if cost_under_v != cost_under_vp {
                continue; // swap would change total cost; not a valid compaction
            }

            move_route(model, assignment, VehicleIndex(vp), VehicleIndex(v));
            swapped = true;
            break;
        }

        if !swapped && (v + 1..num_vehicles).any(|vp| is_used(model, assignment, vp)) {
            *assignment = snapshot;
            return false;
        }
    }
    true
}

/// Rewrites the bound chain currently owned by `from` so it is owned by
/// `to` instead, leaving `from` an empty (self-looped start/end) route.
fn move_route(model: &RoutingModel, assignment: &mut RouteAssignment, from: VehicleIndex, to: VehicleIndex) {
    let from_start = model.index().start(from);
    let from_end = model.index().end(from);
    let to_start = model.index().start(to);
    let to_end = model.index().end(to);

    let mut visited = Vec::new();
    let mut cur = assignment.next[from_start.0];
    while !model.index().is_end(cur) {
        visited.push(cur);
        cur = assignment.next[cur.0];
    }

    // Empty out `from`.
    assignment.next[from_start.0] = from_end;

    // Rebuild `to`'s chain over the same interior nodes.
    let mut prev = to_start;
    for &node in &visited {
        assignment.bind(prev, node, to.0 as i64);
        prev = node;
    }
    assignment.bind(prev, to_end, to.0 as i64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::eval::TransitEvaluator;
    use routing_core::index::NodeIndex;

    #[test]
    fn swaps_an_unused_vehicle_with_a_higher_indexed_used_one() {
        // 2 vehicles sharing depot 0; vehicle 0 unused, vehicle 1 visits node 1.
        let mut model = RoutingModel::new(
            2,
            &[(NodeIndex(0), NodeIndex(0)), (NodeIndex(0), NodeIndex(0))],
            TransitEvaluator::Constant(1),
        );
        model.close().unwrap();
        let starts: Vec<_> = (0..2).map(|v| model.index().start(VehicleIndex(v))).collect();
        let ends: Vec<_> = (0..2).map(|v| model.index().end(VehicleIndex(v))).collect();
        let mut assignment = RouteAssignment::unperformed(model.index().total_vars(), &starts, &ends);
        let node1 = model.index().node_to_index(NodeIndex(1));
        assignment.bind(starts[1], node1, 1);
        assignment.bind(node1, ends[1], 1);

        let before_cost = model.cost_of(&assignment);
        assert!(compact_assignment(&model, &mut assignment));
        let after_cost = model.cost_of(&assignment);
        assert_eq!(before_cost, after_cost);

        // Vehicle 0 now owns the route; vehicle 1 is empty.
        assert_ne!(assignment.next[starts[0].0], ends[0]);
        assert_eq!(assignment.next[starts[1].0], ends[1]);
    }

    #[test]
    fn already_compact_assignment_is_a_no_op() {
        let mut model =
            RoutingModel::new(2, &[(NodeIndex(0), NodeIndex(0)), (NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1));
        model.close().unwrap();
        let starts: Vec<_> = (0..2).map(|v| model.index().start(VehicleIndex(v))).collect();
        let ends: Vec<_> = (0..2).map(|v| model.index().end(VehicleIndex(v))).collect();
        let mut assignment = RouteAssignment::unperformed(model.index().total_vars(), &starts, &ends);
        let node1 = model.index().node_to_index(NodeIndex(1));
        assignment.bind(starts[0], node1, 0);
        assignment.bind(node1, ends[0], 0);
        let before = assignment.next.clone();
        assert!(compact_assignment(&model, &mut assignment));
        assert_eq!(assignment.next, before);
    }
}
