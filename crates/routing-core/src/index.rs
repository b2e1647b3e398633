//! Two index spaces (spec §3): user-facing node indices and the internal,
//! dense variable-index space that gives every vehicle distinct start/end
//! indices.

use serde::{Deserialize, Serialize};

/// A user-facing node, dense over `[0, num_nodes)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeIndex(pub usize);

/// An internal variable index, dense over `[0, size + num_vehicles)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VarIndex(pub usize);

/// A vehicle identifier, dense over `[0, num_vehicles)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VehicleIndex(pub usize);

impl From<usize> for NodeIndex {
    fn from(v: usize) -> Self {
        NodeIndex(v)
    }
}
impl From<usize> for VarIndex {
    fn from(v: usize) -> Self {
        VarIndex(v)
    }
}
impl From<usize> for VehicleIndex {
    fn from(v: usize) -> Self {
        VehicleIndex(v)
    }
}

/// Bijection between node indices and variable indices, including the
/// vehicle start/end variables that have no corresponding plain node.
///
/// `Size = num_nodes + num_vehicles - start_end_count`: every (start, end)
/// pair that coincides with a single depot node is counted once in
/// `num_nodes` but needs two variable indices.
#[derive(Debug, Clone)]
pub struct IndexManager {
    num_nodes: usize,
    num_vehicles: usize,
    /// variable index -> node index, for every variable index (including ends).
    var_to_node: Vec<NodeIndex>,
    /// node index -> first variable index observed for it (a node may be
    /// shared by several vehicle starts/ends and carry more than one, but
    /// non-depot nodes have exactly one).
    node_to_var: Vec<VarIndex>,
    starts: Vec<VarIndex>,
    ends: Vec<VarIndex>,
    size: usize,
}

impl IndexManager {
    /// `depots` gives, for each vehicle, the (start_node, end_node) pair in
    /// node-index space. Depots may repeat across vehicles and a vehicle's
    /// start/end may coincide.
    pub fn new(num_nodes: usize, depots: &[(NodeIndex, NodeIndex)]) -> Self {
        let num_vehicles = depots.len();
        // Non-depot nodes get one variable index each, in node order.
        // Depot nodes are *not* reused across vehicles: each vehicle gets
        // its own Start/End variable index, per spec §3.
        let depot_nodes: std::collections::HashSet<usize> =
            depots.iter().flat_map(|&(s, e)| [s.0, e.0]).collect();
        let non_depot_count = num_nodes - depot_nodes.len();
        let size = non_depot_count + num_vehicles; // each vehicle contributes one "resident" slot besides end
        let total = size + num_vehicles;

        let mut var_to_node = vec![NodeIndex(usize::MAX); total];
        let mut node_to_var = vec![VarIndex(usize::MAX); num_nodes];
        let mut starts = Vec::with_capacity(num_vehicles);
        let mut ends = Vec::with_capacity(num_vehicles);

        let mut next_var = 0usize;
        for node in 0..num_nodes {
            if !depot_nodes.contains(&node) {
                var_to_node[next_var] = NodeIndex(node);
                node_to_var[node] = VarIndex(next_var);
                next_var += 1;
            }
        }
        for &(start_node, _) in depots {
            var_to_node[next_var] = start_node;
            if node_to_var[start_node.0].0 == usize::MAX {
                node_to_var[start_node.0] = VarIndex(next_var);
            }
            starts.push(VarIndex(next_var));
            next_var += 1;
        }
        debug_assert_eq!(next_var, size);
        for &(_, end_node) in depots {
            var_to_node[next_var] = end_node;
            if node_to_var[end_node.0].0 == usize::MAX {
                node_to_var[end_node.0] = VarIndex(next_var);
            }
            ends.push(VarIndex(next_var));
            next_var += 1;
        }
        debug_assert_eq!(next_var, total);

        IndexManager {
            num_nodes,
            num_vehicles,
            var_to_node,
            node_to_var,
            starts,
            ends,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
    pub fn num_vehicles(&self) -> usize {
        self.num_vehicles
    }
    pub fn num_nodes(&self) -> usize {
        self.num_nodes
    }
    pub fn total_vars(&self) -> usize {
        self.size + self.num_vehicles
    }

    pub fn start(&self, v: VehicleIndex) -> VarIndex {
        self.starts[v.0]
    }
    pub fn end(&self, v: VehicleIndex) -> VarIndex {
        self.ends[v.0]
    }
    pub fn is_end(&self, i: VarIndex) -> bool {
        i.0 >= self.size
    }
    pub fn is_start(&self, i: VarIndex) -> bool {
        self.starts.contains(&i)
    }

    /// `NodeToIndex`: user node -> its canonical (first-seen) variable index.
    pub fn node_to_index(&self, n: NodeIndex) -> VarIndex {
        self.node_to_var[n.0]
    }

    /// `IndexToNode`: variable index -> the node it represents.
    pub fn index_to_node(&self, i: VarIndex) -> NodeIndex {
        self.var_to_node[i.0]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_node_index_identity() {
        // 4 customers + 1 shared depot, 1 vehicle starting/ending at the depot.
        let im = IndexManager::new(5, &[(NodeIndex(0), NodeIndex(0))]);
        assert_eq!(im.size(), 4 + 1); // 4 non-depot + 1 start slot
        assert_eq!(im.total_vars(), 4 + 1 + 1);
        for node in 1..5 {
            let v = im.node_to_index(NodeIndex(node));
            assert_eq!(im.index_to_node(v), NodeIndex(node));
        }
        assert!(im.is_end(im.end(VehicleIndex(0))));
        assert!(!im.is_end(im.start(VehicleIndex(0))));
    }

    #[test]
    fn distinct_start_end_variables_per_vehicle() {
        let im = IndexManager::new(3, &[(NodeIndex(0), NodeIndex(0)), (NodeIndex(0), NodeIndex(0))]);
        assert_ne!(im.start(VehicleIndex(0)), im.start(VehicleIndex(1)));
        assert_ne!(im.end(VehicleIndex(0)), im.end(VehicleIndex(1)));
        assert_ne!(im.start(VehicleIndex(0)), im.end(VehicleIndex(0)));
    }
}
