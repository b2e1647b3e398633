//! Assignment I/O (spec §6) and the routes<->assignment round trip (spec §2
//! "route↔assignment conversion", one of C8's named responsibilities).

use crate::model::RoutingModel;
use crate::vars::RouteAssignment;
use routing_core::error::{Result, RoutingError};
use routing_core::index::{NodeIndex, VarIndex, VehicleIndex};
use serde::{Deserialize, Serialize};

/// A structured value map from variable index to integer value (spec §6
/// "Assignment I/O"), with a header recording the model size and vehicle
/// count so two assignments can be checked for compatibility before use.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    pub model_size: usize,
    pub num_vehicles: usize,
    pub next: Vec<usize>,
    pub vehicle: Vec<i64>,
    pub active: Vec<bool>,
}

impl Assignment {
    pub fn from_route_assignment(model: &RoutingModel, ra: &RouteAssignment) -> Self {
        Assignment {
            model_size: model.index().total_vars(),
            num_vehicles: model.index().num_vehicles(),
            next: ra.next.iter().map(|i| i.0).collect(),
            vehicle: ra.vehicle.clone(),
            active: ra.active.clone(),
        }
    }

    /// Rehydrates a `RouteAssignment`, failing if the header does not match
    /// `model` (spec §6: "compatible solutions match on both [size and
    /// vehicle count]").
    pub fn to_route_assignment(&self, model: &RoutingModel) -> Result<RouteAssignment> {
        if self.model_size != model.index().total_vars() || self.num_vehicles != model.index().num_vehicles() {
            return Err(RoutingError::InvalidRoutesInput(
                "assignment header does not match this model's size/vehicle count".into(),
            ));
        }
        Ok(RouteAssignment {
            next: self.next.iter().map(|&i| VarIndex(i)).collect(),
            vehicle: self.vehicle.clone(),
            active: self.active.clone(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| RoutingError::Construction(e.to_string()))
    }

    pub fn from_json(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| RoutingError::InvalidRoutesInput(e.to_string()))
    }
}

/// Builds a `RouteAssignment` from per-vehicle ordered node lists (depot
/// excluded). Nodes not mentioned in any route are left unperformed; this
/// fails if a mandatory (non-disjunction) node is omitted only once the
/// caller checks `RoutingModel::cost_of`'s downstream consumers — at this
/// layer any subset of nodes is accepted, since partial routes are also
/// legitimate preassignments (locks).
pub fn routes_to_assignment(model: &RoutingModel, routes: &[Vec<NodeIndex>]) -> Result<RouteAssignment> {
    if routes.len() != model.index().num_vehicles() {
        return Err(RoutingError::InvalidRoutesInput(format!(
            "expected {} routes, got {}",
            model.index().num_vehicles(),
            routes.len()
        )));
    }
    let starts: Vec<VarIndex> = (0..model.index().num_vehicles()).map(|v| model.index().start(VehicleIndex(v))).collect();
    let ends: Vec<VarIndex> = (0..model.index().num_vehicles()).map(|v| model.index().end(VehicleIndex(v))).collect();
    let mut assignment = RouteAssignment::unperformed(model.index().total_vars(), &starts, &ends);

    for (v, route) in routes.iter().enumerate() {
        let mut full = vec![starts[v]];
        for &node in route {
            full.push(model.index().node_to_index(node));
        }
        full.push(ends[v]);
        for w in full.windows(2) {
            assignment.bind(w[0], w[1], v as i64);
        }
    }
    Ok(assignment)
}

/// Walks every vehicle's bound `next` chain and reports the visited nodes
/// in order, excluding the start/end depot (spec §2 "route↔assignment
/// conversion").
pub fn assignment_to_routes(model: &RoutingModel, assignment: &RouteAssignment) -> Vec<Vec<NodeIndex>> {
    let mut routes = Vec::with_capacity(model.index().num_vehicles());
    for v in 0..model.index().num_vehicles() {
        let vehicle = VehicleIndex(v);
        let end = model.index().end(vehicle);
        let mut route = Vec::new();
        let mut cur = assignment.next[model.index().start(vehicle).0];
        let mut steps = 0;
        while cur != end && steps <= model.index().total_vars() {
            route.push(model.index().index_to_node(cur));
            cur = assignment.next[cur.0];
            steps += 1;
        }
        routes.push(route);
    }
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::eval::TransitEvaluator;

    #[test]
    fn routes_round_trip_through_an_assignment() {
        let mut model = RoutingModel::new(4, &[(NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1));
        model.close().unwrap();
        let routes = vec![vec![NodeIndex(1), NodeIndex(2), NodeIndex(3)]];
        let ra = routes_to_assignment(&model, &routes).unwrap();
        let back = assignment_to_routes(&model, &ra);
        assert_eq!(back, routes);
    }

    #[test]
    fn assignment_json_round_trips() {
        let mut model = RoutingModel::new(3, &[(NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1));
        model.close().unwrap();
        let routes = vec![vec![NodeIndex(1), NodeIndex(2)]];
        let ra = routes_to_assignment(&model, &routes).unwrap();
        let a = Assignment::from_route_assignment(&model, &ra);
        let json = a.to_json().unwrap();
        let back = Assignment::from_json(&json).unwrap();
        assert_eq!(a, back);
        let ra2 = back.to_route_assignment(&model).unwrap();
        assert_eq!(ra2.next, ra.next);
    }

    #[test]
    fn mismatched_header_is_rejected() {
        let mut model = RoutingModel::new(3, &[(NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1));
        model.close().unwrap();
        let bogus = Assignment { model_size: 999, num_vehicles: 1, next: vec![], vehicle: vec![], active: vec![] };
        assert!(bogus.to_route_assignment(&model).is_err());
    }
}
