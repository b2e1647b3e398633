//! Model construction and closing (spec §4.7 steps 1 and its cost-assembly
//! clause): nodes, vehicles, dimensions, disjunctions, pickup/delivery
//! pairs, locks and the arc-cost evaluator(s).

use crate::vars::RouteAssignment;
use routing_core::arith::cap_add;
use routing_core::dimension::Dimension;
use routing_core::disjunction::Disjunction;
use routing_core::error::{Result, RoutingError};
use routing_core::eval::TransitEvaluator;
use routing_core::index::{IndexManager, NodeIndex, VarIndex, VehicleIndex};
use routing_core::pair::PickupDeliveryPair;
use std::collections::HashMap;

/// A partial preassignment fixing a contiguous run of nodes on one vehicle's
/// route (spec §4.7 "lock application").
#[derive(Debug, Clone)]
pub struct Lock {
    pub vehicle: VehicleIndex,
    /// variable indices visited in order, excluding Start/End.
    pub nodes: Vec<VarIndex>,
}

/// Construction-time model state: nodes, vehicles, dimensions, disjunctions,
/// pickup/delivery pairs, locks, and the arc-cost evaluator(s) (spec §3,
/// §4.7). `close()` is the idempotent gate past which the model is treated
/// as fixed for the duration of a solve.
pub struct RoutingModel {
    index: IndexManager,
    default_arc_cost: TransitEvaluator,
    /// non-homogeneous per-vehicle cost overrides (spec §6 CLI surface,
    /// `useHomogeneousCosts = false`). Absent entries use `default_arc_cost`.
    vehicle_arc_cost: HashMap<usize, TransitEvaluator>,
    dimensions: HashMap<String, Dimension>,
    disjunctions: Vec<Disjunction>,
    pairs: Vec<PickupDeliveryPair>,
    locks: Vec<Lock>,
    /// 2D node coordinates, needed only by the Sweep first-solution strategy.
    coordinates: Option<Vec<(f64, f64)>>,
    closed: bool,
}

impl RoutingModel {
    pub fn new(num_nodes: usize, depots: &[(NodeIndex, NodeIndex)], default_arc_cost: TransitEvaluator) -> Self {
        RoutingModel {
            index: IndexManager::new(num_nodes, depots),
            default_arc_cost,
            vehicle_arc_cost: HashMap::new(),
            dimensions: HashMap::new(),
            disjunctions: Vec::new(),
            pairs: Vec::new(),
            locks: Vec::new(),
            coordinates: None,
            closed: false,
        }
    }

    pub fn index(&self) -> &IndexManager {
        &self.index
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn require_open(&self) -> Result<()> {
        if self.closed {
            return Err(RoutingError::Construction("model already closed".into()));
        }
        Ok(())
    }

    pub fn add_dimension(&mut self, dim: Dimension) -> Result<()> {
        self.require_open()?;
        self.dimensions.insert(dim.name.clone(), dim);
        Ok(())
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    pub fn dimension_mut(&mut self, name: &str) -> Option<&mut Dimension> {
        self.dimensions.get_mut(name)
    }

    pub fn dimension_names(&self) -> impl Iterator<Item = &str> {
        self.dimensions.keys().map(String::as_str)
    }

    pub fn add_disjunction(&mut self, nodes: Vec<VarIndex>, penalty: i64) -> Result<()> {
        self.require_open()?;
        if nodes.is_empty() {
            return Err(RoutingError::Construction("disjunction needs at least one node".into()));
        }
        self.disjunctions.push(Disjunction { nodes, penalty });
        Ok(())
    }

    pub fn disjunctions(&self) -> &[Disjunction] {
        &self.disjunctions
    }

    pub fn add_pair(&mut self, pickup: VarIndex, delivery: VarIndex) -> Result<()> {
        self.require_open()?;
        self.pairs.push(PickupDeliveryPair { pickup, delivery });
        Ok(())
    }

    pub fn pairs(&self) -> &[PickupDeliveryPair] {
        &self.pairs
    }

    pub fn add_lock(&mut self, vehicle: VehicleIndex, nodes: Vec<VarIndex>) -> Result<()> {
        self.require_open()?;
        self.locks.push(Lock { vehicle, nodes });
        Ok(())
    }

    pub fn locks(&self) -> &[Lock] {
        &self.locks
    }

    pub fn set_vehicle_arc_cost(&mut self, vehicle: usize, eval: TransitEvaluator) -> Result<()> {
        self.require_open()?;
        self.vehicle_arc_cost.insert(vehicle, eval);
        Ok(())
    }

    pub fn set_coordinates(&mut self, coordinates: Vec<(f64, f64)>) -> Result<()> {
        self.require_open()?;
        if coordinates.len() != self.index.num_nodes() {
            return Err(RoutingError::Construction("coordinate count must match node count".into()));
        }
        self.coordinates = Some(coordinates);
        Ok(())
    }

    pub fn coordinates(&self) -> Option<&[(f64, f64)]> {
        self.coordinates.as_deref()
    }

    /// The arc-cost evaluator effective for `vehicle` (spec §3/§6).
    pub fn arc_cost(&self, vehicle: VehicleIndex, from: VarIndex, to: VarIndex) -> i64 {
        self.vehicle_arc_cost.get(&vehicle.0).unwrap_or(&self.default_arc_cost).eval(from, to)
    }

    /// Closes the model (spec §4.7 step 1). Idempotent: a second call is a
    /// no-op. Validates that every pair/disjunction/lock references a valid
    /// variable index, since this is the last point at which construction
    /// mistakes can be reported before search begins.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        let total = self.index.total_vars();
        let in_range = |i: VarIndex| i.0 < total;
        for d in &self.disjunctions {
            if !d.nodes.iter().all(|&n| in_range(n)) {
                return Err(RoutingError::Construction("disjunction references an out-of-range node".into()));
            }
        }
        for p in &self.pairs {
            if !in_range(p.pickup) || !in_range(p.delivery) {
                return Err(RoutingError::Construction("pickup/delivery pair references an out-of-range node".into()));
            }
        }
        for lock in &self.locks {
            if lock.vehicle.0 >= self.index.num_vehicles() || !lock.nodes.iter().all(|&n| in_range(n)) {
                return Err(RoutingError::Construction("lock references an invalid vehicle or node".into()));
            }
        }
        self.closed = true;
        Ok(())
    }

    /// Σ arc cost along every bound route plus Σ disjunction penalties (spec
    /// §4.7 step 1's objective clause, routing-model's half — dimension soft
    /// bound/span costs are reported separately by `routing-scheduler` and
    /// summed in by the caller, per spec §2's data-flow description).
    pub fn cost_of(&self, assignment: &RouteAssignment) -> i64 {
        let mut total = 0i64;
        for v in 0..self.index.num_vehicles() {
            let start = self.index.start(VehicleIndex(v));
            let mut cur = start;
            loop {
                let nxt = assignment.next[cur.0];
                if nxt == cur {
                    break;
                }
                total = cap_add(total, self.arc_cost(VehicleIndex(v), cur, nxt));
                if self.index.is_end(nxt) {
                    break;
                }
                cur = nxt;
            }
        }
        for d in &self.disjunctions {
            let active_count = d.nodes.iter().filter(|&&n| assignment.active[n.0]).count();
            total = cap_add(total, d.cost(active_count));
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::index::NodeIndex;

    fn small_model() -> RoutingModel {
        RoutingModel::new(4, &[(NodeIndex(0), NodeIndex(0))], TransitEvaluator::Constant(1))
    }

    #[test]
    fn close_is_idempotent() {
        let mut m = small_model();
        m.close().unwrap();
        m.close().unwrap();
        assert!(m.is_closed());
    }

    #[test]
    fn construction_fails_after_close() {
        let mut m = small_model();
        m.close().unwrap();
        assert!(m.add_disjunction(vec![VarIndex(0)], 10).is_err());
    }

    #[test]
    fn cost_of_sums_arc_cost_and_mandatory_penalty() {
        let mut m = small_model();
        m.add_disjunction(vec![VarIndex(0)], -1).unwrap(); // mandatory
        m.close().unwrap();
        let starts = vec![m.index().start(VehicleIndex(0))];
        let ends = vec![m.index().end(VehicleIndex(0))];
        let mut assignment = RouteAssignment::unperformed(m.index().total_vars(), &starts, &ends);
        let node0 = m.index().node_to_index(NodeIndex(1));
        assignment.bind(starts[0], node0, 0);
        assignment.bind(node0, ends[0], 0);
        assignment.active[node0.0] = true;
        // arc cost is 1 per hop (constant evaluator), two hops.
        assert_eq!(m.cost_of(&assignment), 2);
    }
}
