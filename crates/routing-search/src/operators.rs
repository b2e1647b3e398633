//! C9: the local-search neighborhood operators (spec §4.7.3). Each operator
//! enumerates candidate deltas against a snapshot of the current incumbent's
//! routes, resuming from where it left off on each `next_neighbor` call and
//! returning `None` once that snapshot is exhausted (spec: "operators expose
//! `MakeNextNeighbor` returning true until exhausted").
//!
//! Candidates are enumerated via a single flat cursor decoded against the
//! snapshot's shape, rather than nested iterator state machines — simpler to
//! make resumable and to reset on resynchronization (spec §4.7.4's "On
//! synchronization ... rebuild incremental state").

use crate::delta::Move;
use crate::routes::{all_routes, interior};
use itertools::iproduct;
use routing_core::index::{VarIndex, VehicleIndex};
use routing_model::{RoutingModel, RouteAssignment};

/// Common interface every neighborhood operator implements (spec §4.7.3).
pub trait LocalSearchOperator {
    /// Re-synchronizes against the current incumbent. Must be called
    /// before the first `next_neighbor` after the incumbent changes.
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment);

    /// Produces the next candidate delta, or `None` when this operator is
    /// exhausted for the current incumbent.
    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move>;

    fn name(&self) -> &'static str;
}

/// A flattened `(vehicle, position-in-route)` locator for an interior node,
/// shared by most operators below.
#[derive(Debug, Clone, Copy)]
struct NodeSlot {
    vehicle: VehicleIndex,
    pos: usize, // index into the full route (Start..=End), always interior
}

fn interior_slots(routes: &[Vec<VarIndex>]) -> Vec<NodeSlot> {
    let mut slots = Vec::new();
    for (v, route) in routes.iter().enumerate() {
        for pos in 1..route.len().saturating_sub(1) {
            slots.push(NodeSlot { vehicle: VehicleIndex(v), pos });
        }
    }
    slots
}

/// Builds a `Move` that relinks `route` (vehicle `v`) to read as `new_route`
/// exactly, emitting a change only for variables whose `next` actually
/// differs from the snapshot (spec §4.7.4's touched-variable list should
/// stay tight so incremental filters don't over-scan).
fn relink(v: VehicleIndex, old_route: &[VarIndex], new_route: &[VarIndex], out: &mut Move) {
    let mut old_next = std::collections::HashMap::new();
    for w in old_route.windows(2) {
        old_next.insert(w[0], w[1]);
    }
    for w in new_route.windows(2) {
        if old_next.get(&w[0]) != Some(&w[1]) {
            out.push(w[0], Some(w[1]), v.0 as i64);
        }
    }
}

// ---------------------------------------------------------------------
// Relocate: move one node between two positions (possibly different routes).
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct RelocateOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for RelocateOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        let slots = interior_slots(&self.routes);
        if slots.is_empty() {
            return None;
        }
        // Destinations: every edge (including across routes) that isn't
        // adjacent to the node being moved.
        let num_edges: usize = self.routes.iter().map(|r| r.len().saturating_sub(1)).sum();
        let total = slots.len() * num_edges;

        while self.cursor < total {
            let node_idx = self.cursor / num_edges;
            let edge_idx = self.cursor % num_edges;
            self.cursor += 1;

            let slot = slots[node_idx];
            let (to_v, edge_pos) = decode_edge(&self.routes, edge_idx);
            let from_route = &self.routes[slot.vehicle.0];
            let node = from_route[slot.pos];

            // Skip edges touching the node's own incident arcs (no-op moves).
            let to_route = &self.routes[to_v.0];
            if to_route[edge_pos] == node || to_route[edge_pos + 1] == node {
                continue;
            }
            if slot.vehicle == to_v && (edge_pos == slot.pos - 1 || edge_pos == slot.pos) {
                continue;
            }

            let mut new_from = from_route.clone();
            new_from.remove(slot.pos);

            let mut mv = Move::new();
            if slot.vehicle == to_v {
                let mut new_to = new_from.clone();
                let insert_at = if edge_pos >= slot.pos { edge_pos } else { edge_pos + 1 };
                new_to.insert(insert_at, node);
                relink(to_v, from_route, &new_to, &mut mv);
            } else {
                let mut new_to = to_route.clone();
                new_to.insert(edge_pos + 1, node);
                relink(slot.vehicle, from_route, &new_from, &mut mv);
                relink(to_v, to_route, &new_to, &mut mv);
            }
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "Relocate"
    }
}

fn decode_edge(routes: &[Vec<VarIndex>], mut edge_idx: usize) -> (VehicleIndex, usize) {
    for (v, route) in routes.iter().enumerate() {
        let edges = route.len().saturating_sub(1);
        if edge_idx < edges {
            return (VehicleIndex(v), edge_idx);
        }
        edge_idx -= edges;
    }
    unreachable!("edge_idx out of range for route set")
}

// ---------------------------------------------------------------------
// Exchange: swap two nodes' positions.
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct ExchangeOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for ExchangeOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        let slots = interior_slots(&self.routes);
        let n = slots.len();
        if n < 2 {
            return None;
        }
        let total = n * n;
        while self.cursor < total {
            let i = self.cursor / n;
            let j = self.cursor % n;
            self.cursor += 1;
            if i >= j {
                continue;
            }
            let (a, b) = (slots[i], slots[j]);
            let mut routes = self.routes.clone();
            let node_a = routes[a.vehicle.0][a.pos];
            let node_b = routes[b.vehicle.0][b.pos];
            if a.vehicle == b.vehicle {
                routes[a.vehicle.0][a.pos] = node_b;
                routes[a.vehicle.0][b.pos] = node_a;
                let mut mv = Move::new();
                relink(a.vehicle, &self.routes[a.vehicle.0], &routes[a.vehicle.0], &mut mv);
                if !mv.changes.is_empty() {
                    return Some(mv);
                }
            } else {
                routes[a.vehicle.0][a.pos] = node_b;
                routes[b.vehicle.0][b.pos] = node_a;
                let mut mv = Move::new();
                relink(a.vehicle, &self.routes[a.vehicle.0], &routes[a.vehicle.0], &mut mv);
                relink(b.vehicle, &self.routes[b.vehicle.0], &routes[b.vehicle.0], &mut mv);
                if !mv.changes.is_empty() {
                    return Some(mv);
                }
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "Exchange"
    }
}

// ---------------------------------------------------------------------
// Cross: swap the suffixes of two routes after given split positions.
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct CrossOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for CrossOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        let num_vehicles = self.routes.len();
        if num_vehicles < 2 {
            return None;
        }
        loop {
            let pair_count = num_vehicles * (num_vehicles - 1) / 2;
            let max_splits = self.routes.iter().map(|r| r.len()).max().unwrap_or(0);
            let total = pair_count * max_splits * max_splits;
            if self.cursor >= total {
                return None;
            }
            let per_pair = max_splits * max_splits;
            let pair_idx = self.cursor / per_pair;
            let rem = self.cursor % per_pair;
            let (p1, p2) = (rem / max_splits, rem % max_splits);
            self.cursor += 1;

            let (v1, v2) = unrank_pair(pair_idx, num_vehicles);
            let r1 = &self.routes[v1];
            let r2 = &self.routes[v2];
            if p1 == 0 || p2 == 0 || p1 >= r1.len() - 1 || p2 >= r2.len() - 1 {
                continue;
            }
            let mut new1 = r1[..p1].to_vec();
            new1.extend_from_slice(&r2[p2..]);
            let mut new2 = r2[..p2].to_vec();
            new2.extend_from_slice(&r1[p1..]);

            let mut mv = Move::new();
            relink(VehicleIndex(v1), r1, &new1, &mut mv);
            relink(VehicleIndex(v2), r2, &new2, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
    }

    fn name(&self) -> &'static str {
        "Cross"
    }
}

fn unrank_pair(mut idx: usize, n: usize) -> (usize, usize) {
    for i in 0..n {
        let row_len = n - i - 1;
        if idx < row_len {
            return (i, i + 1 + idx);
        }
        idx -= row_len;
    }
    unreachable!("pair index out of range")
}

// ---------------------------------------------------------------------
// 2-opt: reverse a sub-chain within one route.
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct TwoOptOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for TwoOptOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        let max_len = self.routes.iter().map(|r| r.len()).max().unwrap_or(0);
        let per_route = max_len * max_len;
        let total = self.routes.len() * per_route;
        while self.cursor < total {
            let v = self.cursor / per_route;
            let rem = self.cursor % per_route;
            let (i, j) = (rem / max_len, rem % max_len);
            self.cursor += 1;

            let route = &self.routes[v];
            if i == 0 || j >= route.len() - 1 || i >= j {
                continue;
            }
            let mut new_route = route.clone();
            new_route[i..=j].reverse();

            let mut mv = Move::new();
            relink(VehicleIndex(v), route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "2-opt"
    }
}

// ---------------------------------------------------------------------
// Or-opt: move a chain of length 2 or 3 to another position.
// ---------------------------------------------------------------------
pub struct OrOptOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
    chain_len: usize,
}

impl OrOptOperator {
    pub fn new(chain_len: usize) -> Self {
        OrOptOperator { routes: Vec::new(), cursor: 0, chain_len }
    }
}

impl LocalSearchOperator for OrOptOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        let chain_len = self.chain_len;
        let chains: Vec<(VehicleIndex, usize)> = self
            .routes
            .iter()
            .enumerate()
            .flat_map(|(v, r)| (1..r.len().saturating_sub(chain_len)).map(move |p| (VehicleIndex(v), p)))
            .collect();
        if chains.is_empty() {
            return None;
        }
        let num_edges: usize = self.routes.iter().map(|r| r.len().saturating_sub(1)).sum();
        let total = chains.len() * num_edges;

        while self.cursor < total {
            let chain_idx = self.cursor / num_edges;
            let edge_idx = self.cursor % num_edges;
            self.cursor += 1;

            let (from_v, start) = chains[chain_idx];
            let (to_v, edge_pos) = decode_edge(&self.routes, edge_idx);
            let from_route = &self.routes[from_v.0];
            let chain: Vec<VarIndex> = from_route[start..start + self.chain_len].to_vec();
            let to_route = &self.routes[to_v.0];
            if chain.contains(&to_route[edge_pos]) || chain.contains(&to_route[edge_pos + 1]) {
                continue;
            }

            let mut new_from = from_route.clone();
            new_from.drain(start..start + self.chain_len);

            let mut mv = Move::new();
            if from_v == to_v {
                let mut new_to = new_from.clone();
                let insert_at = if edge_pos >= start { edge_pos + 1 - self.chain_len } else { edge_pos + 1 };
                for (k, &n) in chain.iter().enumerate() {
                    new_to.insert(insert_at + k, n);
                }
                relink(to_v, from_route, &new_to, &mut mv);
            } else {
                let mut new_to = to_route.clone();
                for (k, &n) in chain.iter().enumerate() {
                    new_to.insert(edge_pos + 1 + k, n);
                }
                relink(from_v, from_route, &new_from, &mut mv);
                relink(to_v, to_route, &new_to, &mut mv);
            }
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "Or-opt"
    }
}

// ---------------------------------------------------------------------
// LKH: a bounded Lin-Kernighan-style k-opt, k capped at 3 (spec names LKH
// as "Lin-Kernighan-style k-opt" without fixing k; the generic
// arbitrary-depth sequential edge exchange is out of scope for this core —
// see DESIGN.md — so this operator enumerates the 3-opt segment-reversal
// moves 2-opt cannot reach: reversing two disjoint sub-chains at once).
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct LkhOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for LkhOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        for (v, route) in self.routes.iter().enumerate() {
            let n = route.len();
            if n < 6 {
                continue;
            }
            // Triples of cut points i<j<k delimiting three interior segments.
            let triples = (n - 1) * (n - 1) * (n - 1);
            while self.cursor < triples {
                let idx = self.cursor;
                self.cursor += 1;
                let i = 1 + idx / ((n - 2) * (n - 2)).max(1);
                let rem = idx % ((n - 2) * (n - 2)).max(1);
                let j = i + 1 + rem / (n - 2).max(1);
                let k = j + 1 + rem % (n - 2).max(1);
                if !(i < j && j < k && k < n - 1) {
                    continue;
                }
                let mut new_route = route.clone();
                new_route[i..=j].reverse();
                new_route[j + 1..=k].reverse();
                let before = segment_cost(model, VehicleIndex(v), route);
                let after = segment_cost(model, VehicleIndex(v), &new_route);
                if after >= before {
                    continue;
                }
                let mut mv = Move::new();
                relink(VehicleIndex(v), route, &new_route, &mut mv);
                if !mv.changes.is_empty() {
                    return Some(mv);
                }
            }
            self.cursor = 0;
        }
        None
    }

    fn name(&self) -> &'static str {
        "LKH"
    }
}

fn segment_cost(model: &RoutingModel, vehicle: VehicleIndex, route: &[VarIndex]) -> i64 {
    route.windows(2).map(|w| model.arc_cost(vehicle, w[0], w[1])).fold(0i64, routing_core::arith::cap_add)
}

// ---------------------------------------------------------------------
// PairActive: insert a currently-inactive pickup+delivery pair.
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct PairActiveOperator {
    routes: Vec<Vec<VarIndex>>,
    pairs_cursor: usize,
}

impl LocalSearchOperator for PairActiveOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.pairs_cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        let pairs = model.pairs();
        while self.pairs_cursor < pairs.len() {
            let pair = pairs[self.pairs_cursor];
            self.pairs_cursor += 1;
            if assignment.active[pair.pickup.0] || assignment.active[pair.delivery.0] {
                continue;
            }
            // Insert both at the end of vehicle 0's route, pickup then delivery
            // (a minimal always-available placement; later PairRelocate
            // passes refine positioning).
            let v = VehicleIndex(0);
            let route = &self.routes[v.0];
            let mut new_route = route.clone();
            let insert_at = new_route.len() - 1;
            new_route.insert(insert_at, pair.delivery);
            new_route.insert(insert_at, pair.pickup);
            let mut mv = Move::new();
            relink(v, route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "PairActive"
    }
}

// ---------------------------------------------------------------------
// PairRelocate: move an already-active pair elsewhere, keeping order.
// ---------------------------------------------------------------------
#[derive(Default)]
pub struct PairRelocateOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for PairRelocateOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        let pairs: Vec<_> = model.pairs().iter().filter(|p| assignment.active[p.pickup.0] && assignment.active[p.delivery.0]).collect();
        if pairs.is_empty() {
            return None;
        }
        let num_vehicles = self.routes.len();
        let total = pairs.len() * num_vehicles;
        while self.cursor < total {
            let pair_idx = self.cursor / num_vehicles;
            let to_v = self.cursor % num_vehicles;
            self.cursor += 1;

            let pair = pairs[pair_idx];
            let from_v = assignment.vehicle[pair.pickup.0] as usize;
            if from_v == to_v {
                continue;
            }
            let from_route = &self.routes[from_v];
            let mut new_from = from_route.clone();
            new_from.retain(|&n| n != pair.pickup && n != pair.delivery);

            let to_route = &self.routes[to_v];
            let mut new_to = to_route.clone();
            let insert_at = new_to.len() - 1;
            new_to.insert(insert_at, pair.delivery);
            new_to.insert(insert_at, pair.pickup);

            let mut mv = Move::new();
            relink(VehicleIndex(from_v), from_route, &new_from, &mut mv);
            relink(VehicleIndex(to_v), to_route, &new_to, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "PairRelocate"
    }
}

// ---------------------------------------------------------------------
// MakeActive / SwapActive / MakeInactive / ExtendedSwapActive: toggle
// disjunction-optional node activity.
// ---------------------------------------------------------------------
fn optional_nodes(model: &RoutingModel) -> Vec<VarIndex> {
    model.disjunctions().iter().filter(|d| !d.is_mandatory()).flat_map(|d| d.nodes.iter().copied()).collect()
}

#[derive(Default)]
pub struct MakeActiveOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for MakeActiveOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        let inactive: Vec<VarIndex> = optional_nodes(model).into_iter().filter(|&n| !assignment.active[n.0]).collect();
        let num_edges: usize = self.routes.iter().map(|r| r.len().saturating_sub(1)).sum();
        if inactive.is_empty() || num_edges == 0 {
            return None;
        }
        let combos: Vec<(usize, usize)> = iproduct!(0..inactive.len(), 0..num_edges).collect();
        while self.cursor < combos.len() {
            let (node_idx, edge_idx) = combos[self.cursor];
            self.cursor += 1;
            let node = inactive[node_idx];
            let (v, pos) = decode_edge(&self.routes, edge_idx);
            let route = &self.routes[v.0];
            let mut new_route = route.clone();
            new_route.insert(pos + 1, node);
            let mut mv = Move::new();
            relink(v, route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "MakeActive"
    }
}

#[derive(Default)]
pub struct SwapActiveOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for SwapActiveOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        let active_optional: Vec<NodeSlot> = {
            let optional: std::collections::HashSet<VarIndex> = optional_nodes(model).into_iter().collect();
            interior_slots(&self.routes).into_iter().filter(|s| optional.contains(&self.routes[s.vehicle.0][s.pos])).collect()
        };
        let inactive: Vec<VarIndex> = optional_nodes(model).into_iter().filter(|&n| !assignment.active[n.0]).collect();
        if active_optional.is_empty() || inactive.is_empty() {
            return None;
        }
        let combos: Vec<(usize, usize)> = iproduct!(0..active_optional.len(), 0..inactive.len()).collect();
        while self.cursor < combos.len() {
            let (slot_idx, node_idx) = combos[self.cursor];
            self.cursor += 1;
            let slot = active_optional[slot_idx];
            let new_node = inactive[node_idx];
            let route = &self.routes[slot.vehicle.0];
            let mut new_route = route.clone();
            new_route[slot.pos] = new_node;
            let mut mv = Move::new();
            relink(slot.vehicle, route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                mv.push(route[slot.pos], None, -1); // the swapped-out node becomes unperformed
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "SwapActive"
    }
}

#[derive(Default)]
pub struct MakeInactiveOperator {
    slots: Vec<NodeSlot>,
    cursor: usize,
}

impl LocalSearchOperator for MakeInactiveOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        let routes = all_routes(model, assignment);
        let optional: std::collections::HashSet<VarIndex> = optional_nodes(model).into_iter().collect();
        self.slots = interior_slots(&routes).into_iter().filter(|s| optional.contains(&routes[s.vehicle.0][s.pos])).collect();
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        if self.cursor >= self.slots.len() {
            return None;
        }
        let slot = self.slots[self.cursor];
        self.cursor += 1;
        let route = crate::routes::route_of(model, assignment, slot.vehicle);
        let node = route[slot.pos];
        let mut new_route = route.clone();
        new_route.remove(slot.pos);
        let mut mv = Move::new();
        relink(slot.vehicle, &route, &new_route, &mut mv);
        mv.push(node, None, -1);
        Some(mv)
    }

    fn name(&self) -> &'static str {
        "MakeInactive"
    }
}

/// Like `SwapActive`, but also tries the swapped candidate one slot to
/// either side of its original position (spec names this operator without
/// detailing its extension over `SwapActive`; "extended" is read here as
/// widening the insertion window by one position each way — see
/// DESIGN.md).
#[derive(Default)]
pub struct ExtendedSwapActiveOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl LocalSearchOperator for ExtendedSwapActiveOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        let optional: std::collections::HashSet<VarIndex> = optional_nodes(model).into_iter().collect();
        let slots: Vec<NodeSlot> = interior_slots(&self.routes).into_iter().filter(|s| optional.contains(&self.routes[s.vehicle.0][s.pos])).collect();
        let inactive: Vec<VarIndex> = optional_nodes(model).into_iter().filter(|&n| !assignment.active[n.0]).collect();
        if slots.is_empty() || inactive.is_empty() {
            return None;
        }
        let offsets: [i64; 3] = [-1, 0, 1];
        let combos: Vec<(usize, usize, usize)> =
            iproduct!(0..slots.len(), 0..inactive.len(), 0..offsets.len()).collect();
        while self.cursor < combos.len() {
            let (slot_idx, node_idx, off_idx) = combos[self.cursor];
            self.cursor += 1;
            let off = offsets[off_idx];

            let slot = slots[slot_idx];
            let route = &self.routes[slot.vehicle.0];
            let target = slot.pos as i64 + off;
            if target <= 0 || target as usize >= route.len() - 1 {
                continue;
            }
            let new_node = inactive[node_idx];
            let mut new_route = route.clone();
            let old_node = new_route.remove(slot.pos);
            let insert_at = if (target as usize) > slot.pos { target as usize - 1 } else { target as usize };
            new_route.insert(insert_at, new_node);

            let mut mv = Move::new();
            relink(slot.vehicle, route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                mv.push(old_node, None, -1);
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "ExtendedSwapActive"
    }
}

// ---------------------------------------------------------------------
// TSPOpt / TSPLNS: re-solve a bounded sub-sequence to optimality via exact
// bitmask DFS (grounded on the teacher's `solver/tsp.rs` held-Karp-style
// exact search, generalized from 2-endpoint pickup/delivery nodes to a
// plain node window). Windows are capped at 8 nodes (2^8 subsets) to keep
// the DFS cheap; TSPLNS differs only in picking the window pseudo-randomly
// rather than by a fixed scan order, approximating the "destroy a random
// sub-sequence" LNS framing without a separate destroy/rebuild pass.
// ---------------------------------------------------------------------
const TSP_WINDOW_CAP: usize = 8;

fn exact_reorder(model: &RoutingModel, vehicle: VehicleIndex, before: VarIndex, window: &[VarIndex], after: VarIndex) -> Option<Vec<VarIndex>> {
    let n = window.len();
    if n == 0 || n > TSP_WINDOW_CAP {
        return None;
    }
    let full = 1usize << n;
    // memo[mask][last] = best cost to have visited `mask` ending at `last`.
    let mut memo = vec![vec![i64::MAX; n]; full];
    let mut parent = vec![vec![usize::MAX; n]; full];
    for i in 0..n {
        memo[1 << i][i] = model.arc_cost(vehicle, before, window[i]);
    }
    for mask in 1..full {
        for last in 0..n {
            if memo[mask][last] == i64::MAX || mask & (1 << last) == 0 {
                continue;
            }
            for next in 0..n {
                if mask & (1 << next) != 0 {
                    continue;
                }
                let cost = memo[mask][last].saturating_add(model.arc_cost(vehicle, window[last], window[next]));
                let nmask = mask | (1 << next);
                if cost < memo[nmask][next] {
                    memo[nmask][next] = cost;
                    parent[nmask][next] = last;
                }
            }
        }
    }
    let full_mask = full - 1;
    let (mut best_cost, mut best_last) = (i64::MAX, 0);
    for last in 0..n {
        if memo[full_mask][last] == i64::MAX {
            continue;
        }
        let cost = memo[full_mask][last].saturating_add(model.arc_cost(vehicle, window[last], after));
        if cost < best_cost {
            best_cost = cost;
            best_last = last;
        }
    }
    if best_cost == i64::MAX {
        return None;
    }
    let mut order = Vec::with_capacity(n);
    let mut mask = full_mask;
    let mut last = best_last;
    loop {
        order.push(window[last]);
        let p = parent[mask][last];
        mask &= !(1 << last);
        if p == usize::MAX {
            break;
        }
        last = p;
    }
    order.reverse();
    Some(order)
}

pub struct TspOptOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
}

impl Default for TspOptOperator {
    fn default() -> Self {
        TspOptOperator { routes: Vec::new(), cursor: 0 }
    }
}

impl LocalSearchOperator for TspOptOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        for (v, route) in self.routes.iter().enumerate() {
            let max_start = route.len().saturating_sub(TSP_WINDOW_CAP + 2);
            while self.cursor <= max_start {
                let start = self.cursor;
                self.cursor += 1;
                let end = (start + TSP_WINDOW_CAP).min(route.len() - 2);
                if end <= start {
                    continue;
                }
                let window = &route[start + 1..=end];
                let before = route[start];
                let after = route[end + 1];
                let Some(order) = exact_reorder(model, VehicleIndex(v), before, window, after) else { continue };
                if order == window {
                    continue;
                }
                let mut new_route = route.clone();
                new_route[start + 1..=end].copy_from_slice(&order);
                let mut mv = Move::new();
                relink(VehicleIndex(v), route, &new_route, &mut mv);
                if !mv.changes.is_empty() {
                    return Some(mv);
                }
            }
            self.cursor = 0;
        }
        None
    }

    fn name(&self) -> &'static str {
        "TSPOpt"
    }
}

pub struct TspLnsOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
    rng: rand_xoshiro::Xoshiro256PlusPlus,
}

impl TspLnsOperator {
    pub fn new(seed: u64) -> Self {
        use rand::SeedableRng;
        TspLnsOperator { routes: Vec::new(), cursor: 0, rng: rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed) }
    }
}

impl LocalSearchOperator for TspLnsOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        use rand::Rng;
        const MAX_TRIES: usize = 64;
        while self.cursor < MAX_TRIES {
            self.cursor += 1;
            let candidates: Vec<usize> = (0..self.routes.len()).filter(|&v| self.routes[v].len() > TSP_WINDOW_CAP + 2).collect();
            if candidates.is_empty() {
                return None;
            }
            let v = candidates[self.rng.gen_range(0..candidates.len())];
            let route = &self.routes[v];
            let max_start = route.len() - TSP_WINDOW_CAP - 2;
            let start = self.rng.gen_range(0..=max_start);
            let end = (start + TSP_WINDOW_CAP).min(route.len() - 2);
            if end <= start {
                continue;
            }
            let window = &route[start + 1..=end];
            let before = route[start];
            let after = route[end + 1];
            let Some(order) = exact_reorder(model, VehicleIndex(v), before, window, after) else { continue };
            if order == window {
                continue;
            }
            let mut new_route = route.clone();
            new_route[start + 1..=end].copy_from_slice(&order);
            let mut mv = Move::new();
            relink(VehicleIndex(v), route, &new_route, &mut mv);
            if !mv.changes.is_empty() {
                return Some(mv);
            }
        }
        None
    }

    fn name(&self) -> &'static str {
        "TSPLNS"
    }
}

// ---------------------------------------------------------------------
// PathLNS / InactiveLNS: destroy a random window (or the entire inactive
// set) and hand it back unbound for the caller's rebuild pass (spec
// glossary "LNS: destroy a sub-sequence and rebuild it to escape minima").
// ---------------------------------------------------------------------
pub struct PathLnsOperator {
    routes: Vec<Vec<VarIndex>>,
    cursor: usize,
    window: usize,
    rng: rand_xoshiro::Xoshiro256PlusPlus,
}

impl PathLnsOperator {
    pub fn new(seed: u64, window: usize) -> Self {
        use rand::SeedableRng;
        PathLnsOperator { routes: Vec::new(), cursor: 0, window: window.max(2), rng: rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed) }
    }
}

impl LocalSearchOperator for PathLnsOperator {
    fn reset(&mut self, model: &RoutingModel, assignment: &RouteAssignment) {
        self.routes = all_routes(model, assignment);
        self.cursor = 0;
    }

    fn next_neighbor(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) -> Option<Move> {
        use rand::Rng;
        const MAX_TRIES: usize = 32;
        while self.cursor < MAX_TRIES {
            self.cursor += 1;
            let candidates: Vec<usize> = (0..self.routes.len()).filter(|&v| self.routes[v].len() > self.window + 2).collect();
            if candidates.is_empty() {
                return None;
            }
            let v = candidates[self.rng.gen_range(0..candidates.len())];
            let route = &self.routes[v];
            let max_start = route.len() - self.window - 2;
            let start = self.rng.gen_range(0..=max_start);
            let mut mv = Move::new();
            for &node in &route[start + 1..start + 1 + self.window] {
                mv.push(node, None, -1);
            }
            return Some(mv);
        }
        None
    }

    fn name(&self) -> &'static str {
        "PathLNS"
    }
}

#[derive(Default)]
pub struct InactiveLnsOperator {
    served: bool,
}

impl LocalSearchOperator for InactiveLnsOperator {
    fn reset(&mut self, _model: &RoutingModel, _assignment: &RouteAssignment) {
        self.served = false;
    }

    fn next_neighbor(&mut self, model: &RoutingModel, assignment: &RouteAssignment) -> Option<Move> {
        if self.served {
            return None;
        }
        self.served = true;
        let mut mv = Move::new();
        // Re-expose every inactive optional node for the rebuild pass by
        // marking it unbound, uniform with the other LNS operators' contract.
        for node in optional_nodes(model).into_iter().filter(|&n| !assignment.active[n.0]) {
            mv.push(node, None, -1);
        }
        if mv.changes.is_empty() { None } else { Some(mv) }
    }

    fn name(&self) -> &'static str {
        "InactiveLNS"
    }
}
