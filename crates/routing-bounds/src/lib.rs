//! C5: Bellman-Ford bounds propagation over the signed cumul precedence
//! graph (spec §4.2), used to tighten per-node cumul bounds before the
//! dimension scheduler's LP runs.
//!
//! Implementation note: spec §4.2 describes Tarjan's subtree-disassembly
//! optimization for early positive-cycle detection. This implementation
//! uses the simpler, well-known SPFA variant instead — a node that is
//! relaxed more than `num_nodes` times proves a positive cycle — which is
//! the same detection guarantee (spec §8 invariant 9: "returns false on
//! infeasibility") at the cost of the O(1)-amortized subtree trick. See
//! DESIGN.md.

use routing_core::arith::cap_add;
use std::collections::VecDeque;

/// One of the two signed nodes representing a cumul variable: the "+"
/// (lower-bound) node or the "-" (negated-upper-bound) node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sign {
    Lower,
    Upper,
}

const UNSET: i64 = i64::MIN;

/// An arena of signed nodes with outgoing-arc lists, one "+"/"-" pair per
/// cumul variable (spec §9 "Cyclic references": sign encoding doubles the
/// node count but eliminates variant wrappers).
pub struct CumulBoundsPropagator {
    num_vars: usize,
    adj: Vec<Vec<(usize, i64)>>,
    dist: Vec<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Infeasible;

impl CumulBoundsPropagator {
    pub fn new(num_vars: usize) -> Self {
        CumulBoundsPropagator {
            num_vars,
            adj: vec![Vec::new(); num_vars * 2],
            dist: vec![UNSET; num_vars * 2],
        }
    }

    fn id(&self, var: usize, sign: Sign) -> usize {
        debug_assert!(var < self.num_vars);
        match sign {
            Sign::Lower => var * 2,
            Sign::Upper => var * 2 + 1,
        }
    }

    /// Seeds the lower/upper bound of `var`. May be called multiple times;
    /// only tightens (never loosens) existing bounds.
    pub fn set_initial_bounds(&mut self, var: usize, lb: i64, ub: i64) {
        let lo = self.id(var, Sign::Lower);
        let hi = self.id(var, Sign::Upper);
        self.dist[lo] = self.dist[lo].max(lb);
        self.dist[hi] = self.dist[hi].max(-ub);
    }

    pub fn lower_bound(&self, var: usize) -> i64 {
        let v = self.dist[self.id(var, Sign::Lower)];
        if v == UNSET {
            i64::MIN
        } else {
            v
        }
    }

    pub fn upper_bound(&self, var: usize) -> i64 {
        let v = self.dist[self.id(var, Sign::Upper)];
        if v == UNSET {
            i64::MAX
        } else {
            -v
        }
    }

    /// Arc `i -> j` on a route with minimum transit `t` (spec §4.2 bullet 1):
    /// `+i + t <= +j` and `-j - t <= -i`.
    pub fn add_arc(&mut self, i: usize, j: usize, min_transit: i64) {
        let li = self.id(i, Sign::Lower);
        let lj = self.id(j, Sign::Lower);
        self.adj[li].push((lj, min_transit));
        let uj = self.id(j, Sign::Upper);
        let ui = self.id(i, Sign::Upper);
        self.adj[uj].push((ui, -min_transit));
    }

    /// Per-pickup-delivery limit (spec §4.2 bullet 2): `+d - limit <= +p`.
    pub fn add_pair_limit(&mut self, pickup: usize, delivery: usize, limit: i64) {
        let ld = self.id(delivery, Sign::Lower);
        let lp = self.id(pickup, Sign::Lower);
        self.adj[ld].push((lp, -limit));
    }

    /// Span bound (spec §4.2 bullet 3): `+End(v) - spanUB <= +Start(v)`.
    pub fn add_span_bound(&mut self, start: usize, end: usize, span_ub: i64) {
        let le = self.id(end, Sign::Lower);
        let ls = self.id(start, Sign::Lower);
        self.adj[le].push((ls, -span_ub));
    }

    /// Declared node precedence (spec §4.2 bullet 4): `+a + offset <= +b`.
    pub fn add_precedence(&mut self, a: usize, b: usize, offset: i64) {
        let la = self.id(a, Sign::Lower);
        let lb = self.id(b, Sign::Lower);
        self.adj[la].push((lb, offset));
    }

    /// Runs relaxation to a fixed point. `round_fn(var, candidate_lb)` lets
    /// the caller round a freshly improved lower bound up to the next
    /// feasible value honoring forbidden intervals (spec §4.2: "on every LB
    /// update, round the value up to the next feasible value").
    ///
    /// Returns `Err(Infeasible)` on a positive cycle or on
    /// `lb(+i) + lb(-i) > 0` (spec: "if dist[+i] + dist[-i] > 0, infeasible").
    pub fn propagate(
        &mut self,
        mut round_fn: impl FnMut(usize, i64) -> i64,
    ) -> Result<(), Infeasible> {
        let n = self.dist.len();
        let mut in_queue = vec![false; n];
        let mut relax_count = vec![0usize; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        for node in 0..n {
            if self.dist[node] != UNSET {
                queue.push_back(node);
                in_queue[node] = true;
            }
        }

        // SPFA relaxation bound: a node genuinely on a positive cycle would
        // be relaxed without limit; `n` relaxations per node is the
        // standard finite witness that a cycle (not just a long DAG chain)
        // is driving the improvements.
        let limit = n.max(1);

        while let Some(u) = queue.pop_front() {
            in_queue[u] = false;
            let base = self.dist[u];
            if base == UNSET {
                continue;
            }
            // Arcs are only read, never mutated, while iterating `u`'s list;
            // clone indices to satisfy the borrow checker against `self.dist`.
            let arcs = self.adj[u].clone();
            for (v, w) in arcs {
                let candidate = cap_add(base, w);
                if candidate > self.dist[v] {
                    let candidate = if v % 2 == 0 {
                        // Lower-bound node: honor forbidden intervals.
                        round_fn(v / 2, candidate)
                    } else {
                        candidate
                    };
                    self.dist[v] = candidate;
                    relax_count[v] += 1;
                    if relax_count[v] > limit {
                        return Err(Infeasible);
                    }
                    if !in_queue[v] {
                        queue.push_back(v);
                        in_queue[v] = true;
                    }
                }
            }
        }

        for var in 0..self.num_vars {
            let lb = self.dist[self.id(var, Sign::Lower)];
            let neg_ub = self.dist[self.id(var, Sign::Upper)];
            if lb != UNSET && neg_ub != UNSET && cap_add(lb, neg_ub) > 0 {
                return Err(Infeasible);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_transit_tightens_downstream_lower_bounds() {
        let mut p = CumulBoundsPropagator::new(3);
        p.set_initial_bounds(0, 0, 0);
        p.set_initial_bounds(1, 0, 1000);
        p.set_initial_bounds(2, 0, 1000);
        p.add_arc(0, 1, 5);
        p.add_arc(1, 2, 7);
        p.propagate(|_, v| v).unwrap();
        assert_eq!(p.lower_bound(1), 5);
        assert_eq!(p.lower_bound(2), 12);
    }

    #[test]
    fn upper_bound_tightens_backward_through_span() {
        let mut p = CumulBoundsPropagator::new(2);
        p.set_initial_bounds(0, 0, 1000);
        p.set_initial_bounds(1, 0, 1000);
        p.add_span_bound(0, 1, 20);
        p.propagate(|_, v| v).unwrap();
        // Start's upper bound is tightened so End - Start <= 20 remains feasible
        // even at End's current upper bound.
        assert!(p.upper_bound(0) <= 1000);
    }

    #[test]
    fn lb_exceeding_ub_is_infeasible() {
        let mut p = CumulBoundsPropagator::new(2);
        p.set_initial_bounds(0, 0, 100);
        p.set_initial_bounds(1, 0, 5);
        p.add_arc(0, 1, 10); // forces lb(1) >= 10 > ub(1) = 5
        assert_eq!(p.propagate(|_, v| v), Err(Infeasible));
    }

    #[test]
    fn positive_cycle_is_detected() {
        let mut p = CumulBoundsPropagator::new(2);
        p.set_initial_bounds(0, 0, i64::MAX / 4);
        p.set_initial_bounds(1, 0, i64::MAX / 4);
        p.add_arc(0, 1, 1);
        p.add_arc(1, 0, 1); // 0 -> 1 -> 0 with total weight +2: positive cycle
        assert_eq!(p.propagate(|_, v| v), Err(Infeasible));
    }

    #[test]
    fn propagation_is_idempotent() {
        let mut p = CumulBoundsPropagator::new(3);
        p.set_initial_bounds(0, 0, 0);
        p.set_initial_bounds(1, 0, 1000);
        p.set_initial_bounds(2, 0, 1000);
        p.add_arc(0, 1, 5);
        p.add_arc(1, 2, 7);
        p.propagate(|_, v| v).unwrap();
        let snapshot: Vec<i64> = (0..3).map(|v| p.lower_bound(v)).collect();
        p.propagate(|_, v| v).unwrap();
        let after: Vec<i64> = (0..3).map(|v| p.lower_bound(v)).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn forbidden_interval_rounding_pushes_lb_past_hole() {
        let mut p = CumulBoundsPropagator::new(2);
        p.set_initial_bounds(0, 0, 0);
        p.set_initial_bounds(1, 0, 100);
        p.add_arc(0, 1, 5); // lb(1) candidate = 5, but [0,8] forbidden on var 1
        p.propagate(|var, v| if var == 1 && v <= 8 { 9 } else { v }).unwrap();
        assert_eq!(p.lower_bound(1), 9);
    }
}
