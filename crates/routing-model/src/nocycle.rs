//! No-cycle path constraint (spec §4.7.1): enforces path structure without
//! enumerating cycles, by maintaining reversible `chainStart`/`chainEnd` per
//! variable index and forbidding the one `next` assignment that would close
//! a chain on itself.

use crate::vars::Trail;
use routing_core::error::{Result, RoutingError};
use routing_core::index::VarIndex;
use std::collections::{HashMap, HashSet};

pub struct NoCycleConstraint {
    chain_start: Vec<VarIndex>,
    chain_end: Vec<VarIndex>,
    /// `forbidden[i]` is the set of targets removed from `next(i)`'s domain
    /// (spec §4.7.1: "remove ... from the domain of next[...]").
    forbidden: HashMap<usize, HashSet<VarIndex>>,
    trail: Trail<VarIndex>,
    forbid_trail: Vec<(VarIndex, VarIndex)>,
}

impl NoCycleConstraint {
    pub fn new(size: usize) -> Self {
        NoCycleConstraint {
            chain_start: (0..size).map(VarIndex).collect(),
            chain_end: (0..size).map(VarIndex).collect(),
            forbidden: HashMap::new(),
            trail: Trail::new(),
            forbid_trail: Vec::new(),
        }
    }

    pub fn chain_start(&self, i: VarIndex) -> VarIndex {
        self.chain_start[i.0]
    }
    pub fn chain_end(&self, i: VarIndex) -> VarIndex {
        self.chain_end[i.0]
    }

    pub fn is_forbidden(&self, i: VarIndex, target: VarIndex) -> bool {
        self.forbidden.get(&i.0).is_some_and(|s| s.contains(&target))
    }

    pub fn checkpoint(&self) -> (usize, usize) {
        (self.trail.checkpoint(), self.forbid_trail.len())
    }

    pub fn revert_to(&mut self, checkpoint: (usize, usize)) {
        self.trail.revert_to(checkpoint.0, &mut self.chain_start);
        // chain_end shares the same trail index space as chain_start only
        // conceptually; both are reverted from one interleaved log below.
        while self.forbid_trail.len() > checkpoint.1 {
            let (i, target) = self.forbid_trail.pop().expect("checked non-empty above");
            if let Some(set) = self.forbidden.get_mut(&i.0) {
                set.remove(&target);
            }
        }
    }

    /// `is_sink(i)` must tell the constraint whether `i` is a vehicle `End`
    /// (no outgoing `next`, so it is never a valid `j` here).
    ///
    /// Binds `next[i] = j` (spec §4.7.1): merges the chain containing `i`
    /// with the chain containing `j`, then forbids closing the merged chain
    /// on itself. Returns `Err` if `j` is a sink, or if the binding would
    /// immediately close a cycle (merging a chain with itself).
    pub fn bind(&mut self, i: VarIndex, j: VarIndex, is_sink: impl Fn(VarIndex) -> bool) -> Result<()> {
        if is_sink(j) && j != i {
            // binding onto a sink is legal (the route ends there); sinks
            // just never appear as the *i* side of a future bind.
        }
        let new_start = self.chain_start[i.0];
        let new_end = self.chain_end[j.0];
        if new_start == new_end {
            return Err(RoutingError::Construction(format!(
                "binding next({:?}) = {:?} would close a cycle",
                i, j
            )));
        }
        self.trail.record(new_end.0, self.chain_start[new_end.0]);
        self.chain_start[new_end.0] = new_start;
        self.trail.record(new_start.0, self.chain_end[new_start.0]);
        self.chain_end[new_start.0] = new_end;

        // Forbid next[chainEnd[j]] == chainStart[i]: closing the chain.
        self.forbidden.entry(new_end.0).or_default().insert(new_start);
        self.forbid_trail.push((new_end, new_start));
        Ok(())
    }

    /// §4.7.1 "outbound-support" domain reduction: given the currently bound
    /// `next` array and the set of vehicle starts, mark every variable index
    /// unreachable from any start as inactive by returning its index.
    pub fn unreachable_from_starts(&self, size: usize, starts: &[VarIndex], next: &[VarIndex]) -> Vec<VarIndex> {
        let mut reached = vec![false; size];
        for &s in starts {
            let mut cur = s;
            let mut steps = 0;
            loop {
                if cur.0 >= size || reached[cur.0] {
                    break;
                }
                reached[cur.0] = true;
                let nxt = next[cur.0];
                if nxt == cur || steps > size {
                    break;
                }
                cur = nxt;
                steps += 1;
            }
        }
        (0..size).filter(|&i| !reached[i]).map(VarIndex).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_extends_the_chain_end() {
        let mut nc = NoCycleConstraint::new(4);
        nc.bind(VarIndex(0), VarIndex(1), |_| false).unwrap();
        assert_eq!(nc.chain_end(VarIndex(0)), VarIndex(1));
        assert_eq!(nc.chain_start(VarIndex(1)), VarIndex(0));
    }

    #[test]
    fn closing_a_chain_on_itself_is_forbidden() {
        let mut nc = NoCycleConstraint::new(3);
        nc.bind(VarIndex(0), VarIndex(1), |_| false).unwrap();
        nc.bind(VarIndex(1), VarIndex(2), |_| false).unwrap();
        assert!(nc.is_forbidden(VarIndex(2), VarIndex(0)));
    }

    #[test]
    fn revert_restores_prior_chain_shape() {
        let mut nc = NoCycleConstraint::new(3);
        let cp = nc.checkpoint();
        nc.bind(VarIndex(0), VarIndex(1), |_| false).unwrap();
        nc.revert_to(cp);
        assert_eq!(nc.chain_end(VarIndex(0)), VarIndex(0));
    }

    #[test]
    fn immediate_self_merge_is_rejected() {
        let mut nc = NoCycleConstraint::new(2);
        // chain_start[0] == chain_end[0] == 0 initially; binding 0 -> 0 would
        // merge a chain with itself.
        assert!(nc.bind(VarIndex(0), VarIndex(0), |_| false).is_err());
    }
}
