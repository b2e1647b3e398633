//! Flattens the bound `next` chain of each vehicle into an ordered
//! `Vec<VarIndex>` (Start..=End inclusive). Every operator in this crate
//! works off this snapshot rather than walking `next` directly, since a
//! scanning pass needs a stable view of the incumbent between
//! `next_neighbor` calls.

use routing_core::index::{VarIndex, VehicleIndex};
use routing_model::{RouteAssignment, RoutingModel};

pub fn route_of(model: &RoutingModel, assignment: &RouteAssignment, vehicle: VehicleIndex) -> Vec<VarIndex> {
    let start = model.index().start(vehicle);
    let mut path = vec![start];
    let mut cur = start;
    loop {
        let nxt = assignment.next[cur.0];
        path.push(nxt);
        if model.index().is_end(nxt) || nxt == cur {
            break;
        }
        cur = nxt;
    }
    path
}

pub fn all_routes(model: &RoutingModel, assignment: &RouteAssignment) -> Vec<Vec<VarIndex>> {
    (0..model.index().num_vehicles()).map(|v| route_of(model, assignment, VehicleIndex(v))).collect()
}

/// Interior nodes only (excludes Start/End).
pub fn interior(route: &[VarIndex]) -> &[VarIndex] {
    if route.len() <= 2 {
        &[]
    } else {
        &route[1..route.len() - 1]
    }
}
