//! C7: resource-assignment via min-cost flow (spec §4.6).
//!
//! The dimension scheduler (`routing-scheduler`) computes a per-(vehicle,
//! class) cost matrix (`-1` marking an infeasible pairing); this crate turns
//! that matrix into a bipartite min-cost-flow instance — source to each
//! vehicle, vehicle to each feasible class, class to sink with capacity
//! equal to the number of resources in the class — and reconstructs the
//! chosen resource per vehicle by walking positive-flow arcs.

use log::warn;
use routing_core::error::{Result, RoutingError};

const INFEASIBLE: i64 = -1;

/// One resource class: a count of identical resources and, per vehicle, the
/// cost of assigning that vehicle to this class (`-1` = infeasible).
pub struct ResourceClass {
    pub available: usize,
    /// indexed by vehicle.
    pub cost_per_vehicle: Vec<i64>,
}

pub struct Assignment {
    /// `assignment[vehicle] = Some(class_index)` when assigned, else `None`.
    pub class_of: Vec<Option<usize>>,
    pub total_cost: i64,
}

struct Edge {
    to: usize,
    cap: i64,
    cost: i64,
    flow: i64,
}

/// A minimal successive-shortest-augmenting-path min-cost flow solver over a
/// small residual graph (source, vehicles, classes, sink) — adequate at the
/// scale of one vehicle fleet per resource group, unlike a full network
/// simplex.
struct MinCostFlow {
    adj: Vec<Vec<usize>>,
    edges: Vec<Edge>,
}

impl MinCostFlow {
    fn new(num_nodes: usize) -> Self {
        MinCostFlow { adj: vec![Vec::new(); num_nodes], edges: Vec::new() }
    }

    fn add_edge(&mut self, from: usize, to: usize, cap: i64, cost: i64) -> usize {
        let fwd = self.edges.len();
        self.edges.push(Edge { to, cap, cost, flow: 0 });
        self.adj[from].push(fwd);
        let bwd = self.edges.len();
        self.edges.push(Edge { to: from, cap: 0, cost: -cost, flow: 0 });
        self.adj[to].push(bwd);
        fwd
    }

    /// Bellman-Ford shortest path by cost (handles negative-shifted costs
    /// safely since the graph is acyclic by construction: source -> vehicle
    /// -> class -> sink).
    fn shortest_path(&self, source: usize, sink: usize) -> Option<(Vec<i64>, Vec<usize>)> {
        let n = self.adj.len();
        let mut dist = vec![i64::MAX; n];
        let mut prev_edge = vec![usize::MAX; n];
        dist[source] = 0;
        let mut updated = true;
        let mut pass = 0;
        while updated && pass < n {
            updated = false;
            pass += 1;
            for u in 0..n {
                if dist[u] == i64::MAX {
                    continue;
                }
                for &e in &self.adj[u] {
                    let edge = &self.edges[e];
                    if edge.cap - edge.flow <= 0 {
                        continue;
                    }
                    let nd = dist[u] + edge.cost;
                    if nd < dist[edge.to] {
                        dist[edge.to] = nd;
                        prev_edge[edge.to] = e;
                        updated = true;
                    }
                }
            }
        }
        if dist[sink] == i64::MAX {
            None
        } else {
            Some((dist, prev_edge))
        }
    }

    fn min_cost_flow(&mut self, source: usize, sink: usize) -> (i64, i64) {
        let mut total_flow = 0i64;
        let mut total_cost = 0i64;
        loop {
            let Some((dist, prev_edge)) = self.shortest_path(source, sink) else { break };
            if dist[sink] == i64::MAX {
                break;
            }
            // Find bottleneck along the path.
            let mut node = sink;
            let mut bottleneck = i64::MAX;
            while node != source {
                let e = prev_edge[node];
                if e == usize::MAX {
                    return (total_flow, total_cost);
                }
                let edge = &self.edges[e];
                bottleneck = bottleneck.min(edge.cap - edge.flow);
                node = self.edges[e ^ 1].to;
            }
            if bottleneck <= 0 || bottleneck == i64::MAX {
                break;
            }
            let mut node = sink;
            while node != source {
                let e = prev_edge[node];
                self.edges[e].flow += bottleneck;
                self.edges[e ^ 1].flow -= bottleneck;
                node = self.edges[e ^ 1].to;
            }
            total_flow += bottleneck;
            total_cost += bottleneck * dist[sink];
        }
        (total_flow, total_cost)
    }
}

/// Computes `k` such that `4 * max_cost * num_nodes <= 2^63` (spec §4.6 cost
/// scaling), so accumulated flow costs cannot overflow `i64`.
fn scaling_shift(max_cost: i64, num_nodes: usize) -> u32 {
    let mut k = 0u32;
    let bound = (1i128) << 62;
    let mut scaled = (max_cost.max(1) as i128) * 4 * (num_nodes.max(1) as i128);
    while scaled > bound && k < 62 {
        scaled >>= 1;
        k += 1;
    }
    k
}

/// Assigns each vehicle in `vehicles_needing_resource` to a resource class,
/// minimizing total cost (spec §4.6). `classes[c].cost_per_vehicle[v]` must
/// be indexed by position in `vehicles_needing_resource`, not by raw vehicle
/// id; callers translate back via the returned assignment's index order.
pub fn assign_resources(vehicles_needing_resource: usize, classes: &[ResourceClass]) -> Result<Assignment> {
    if vehicles_needing_resource == 0 {
        return Ok(Assignment { class_of: Vec::new(), total_cost: 0 });
    }

    let total_capacity: usize = classes.iter().map(|c| c.available).sum();
    if total_capacity < vehicles_needing_resource {
        // A vehicle may legitimately have no feasible class at all, but if
        // raw capacity can't cover demand, fail fast rather than running
        // the flow only to discover infeasibility node-by-node.
        let has_any_feasible = (0..vehicles_needing_resource)
            .all(|v| classes.iter().any(|c| c.cost_per_vehicle[v] != INFEASIBLE));
        if !has_any_feasible || total_capacity == 0 {
            return Err(RoutingError::InfeasibleModel);
        }
    }

    let max_cost = classes
        .iter()
        .flat_map(|c| c.cost_per_vehicle.iter())
        .filter(|&&c| c != INFEASIBLE)
        .copied()
        .max()
        .unwrap_or(0);
    let num_nodes = 2 + vehicles_needing_resource + classes.len();
    let shift = scaling_shift(max_cost, num_nodes);

    // Node layout: 0 = source, 1..=V = vehicles, V+1..=V+C = classes, last = sink.
    let source = 0;
    let vehicle_base = 1;
    let class_base = vehicle_base + vehicles_needing_resource;
    let sink = class_base + classes.len();
    let mut flow = MinCostFlow::new(sink + 1);

    for v in 0..vehicles_needing_resource {
        flow.add_edge(source, vehicle_base + v, 1, 0);
    }
    let mut vehicle_class_edge: Vec<Vec<Option<usize>>> =
        vec![vec![None; classes.len()]; vehicles_needing_resource];
    for (c_idx, class) in classes.iter().enumerate() {
        for v in 0..vehicles_needing_resource {
            let cost = class.cost_per_vehicle[v];
            if cost == INFEASIBLE {
                continue;
            }
            let scaled = cost >> shift;
            let e = flow.add_edge(vehicle_base + v, class_base + c_idx, 1, scaled);
            vehicle_class_edge[v][c_idx] = Some(e);
        }
        flow.add_edge(class_base + c_idx, sink, class.available as i64, 0);
    }

    let (total_flow, total_cost_scaled) = flow.min_cost_flow(source, sink);
    if (total_flow as usize) < vehicles_needing_resource {
        warn!(
            "resource assignment found flow {} short of demand {}",
            total_flow, vehicles_needing_resource
        );
        return Err(RoutingError::InfeasibleModel);
    }

    let mut class_of = vec![None; vehicles_needing_resource];
    for (v, row) in vehicle_class_edge.iter().enumerate() {
        for (c_idx, maybe_edge) in row.iter().enumerate() {
            if let Some(e) = maybe_edge {
                if flow.edges[*e].flow > 0 {
                    class_of[v] = Some(c_idx);
                }
            }
        }
    }

    Ok(Assignment { class_of, total_cost: total_cost_scaled << shift })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_cheapest_feasible_class_per_vehicle() {
        let classes = vec![
            ResourceClass { available: 1, cost_per_vehicle: vec![10, 5] },
            ResourceClass { available: 1, cost_per_vehicle: vec![3, 8] },
        ];
        let result = assign_resources(2, &classes).unwrap();
        assert_eq!(result.class_of.len(), 2);
        assert!(result.class_of.iter().all(|c| c.is_some()));
        assert_eq!(result.total_cost, 8); // vehicle 0 -> class 1 (3), vehicle 1 -> class 0 (5)
    }

    #[test]
    fn insufficient_capacity_is_infeasible() {
        let classes = vec![ResourceClass { available: 1, cost_per_vehicle: vec![1, 1, 1] }];
        assert!(assign_resources(3, &classes).is_err());
    }

    #[test]
    fn infeasible_pairings_are_routed_around() {
        let classes = vec![
            ResourceClass { available: 1, cost_per_vehicle: vec![INFEASIBLE, 4] },
            ResourceClass { available: 1, cost_per_vehicle: vec![6, 9] },
        ];
        let result = assign_resources(2, &classes).unwrap();
        // vehicle 0 can only use class 1; vehicle 1 is cheapest on class 0.
        assert_eq!(result.class_of[0], Some(1));
        assert_eq!(result.class_of[1], Some(0));
    }

    #[test]
    fn a_vehicle_with_no_feasible_class_is_infeasible() {
        let classes = vec![ResourceClass { available: 2, cost_per_vehicle: vec![INFEASIBLE, 4] }];
        assert!(assign_resources(2, &classes).is_err());
    }
}
