//! Reversible memory (spec §1 "treated as a black box offering ... reversible
//! memory") and the concrete decision-variable state the routing model
//! constructs and mutates: `next`, `vehicle`, `active` per spec §3.
//!
//! The generic CP engine (trail, demons, domain holes) is explicitly out of
//! scope; what this module owns is the one piece of reversible state the
//! spec names concretely — the no-cycle constraint's `chainStart`/`chainEnd`
//! (§4.7.1) — plus the plain bound-variable arrays that first-solution
//! builders and local-search operators read and write directly.

use routing_core::index::VarIndex;

/// A minimal undo log: records `(index, old_value)` pairs so a batch of
/// mutations to some `Vec<T>` can be unwound to an earlier checkpoint
/// without re-deriving the previous state.
#[derive(Debug, Default)]
pub struct Trail<T: Copy> {
    entries: Vec<(usize, T)>,
}

impl<T: Copy> Trail<T> {
    pub fn new() -> Self {
        Trail { entries: Vec::new() }
    }

    /// Records `arr[index]`'s current value before the caller overwrites it.
    pub fn record(&mut self, index: usize, old_value: T) {
        self.entries.push((index, old_value));
    }

    pub fn checkpoint(&self) -> usize {
        self.entries.len()
    }

    /// Unwinds every recorded mutation back to `checkpoint`, restoring `arr`.
    pub fn revert_to(&mut self, checkpoint: usize, arr: &mut [T]) {
        while self.entries.len() > checkpoint {
            let (index, old_value) = self.entries.pop().expect("checked non-empty above");
            arr[index] = old_value;
        }
    }
}

/// The bound (or partially bound) state of every routing decision variable
/// (spec §3). `next[i] == i` and `vehicle[i] == -1` together encode
/// `active[i] = 0`, matching the spec's invariant
/// `active(i)=0 ⇔ next(i)=i ⇔ vehicle(i)=−1` — `active` is kept as an
/// explicit redundant array purely for readability at call sites.
#[derive(Debug, Clone)]
pub struct RouteAssignment {
    pub next: Vec<VarIndex>,
    pub vehicle: Vec<i64>,
    pub active: Vec<bool>,
}

impl RouteAssignment {
    /// All nodes start unperformed (self-looped, no vehicle) except vehicle
    /// starts/ends, which are bound to each other directly (empty route).
    pub fn unperformed(total_vars: usize, starts: &[VarIndex], ends: &[VarIndex]) -> Self {
        let mut next: Vec<VarIndex> = (0..total_vars).map(VarIndex).collect();
        let mut vehicle = vec![-1i64; total_vars];
        let mut active = vec![false; total_vars];
        for (v, (&s, &e)) in starts.iter().zip(ends.iter()).enumerate() {
            next[s.0] = e;
            vehicle[s.0] = v as i64;
            vehicle[e.0] = v as i64;
            active[s.0] = true;
            active[e.0] = true;
        }
        RouteAssignment { next, vehicle, active }
    }

    /// Binds `next[i] = j` and marks both endpoints active on `vehicle_id`
    /// (spec §3: a bound `next` implies `active=1` and a shared `vehicle`).
    pub fn bind(&mut self, i: VarIndex, j: VarIndex, vehicle_id: i64) {
        self.next[i.0] = j;
        self.vehicle[i.0] = vehicle_id;
        self.active[i.0] = true;
    }

    /// Marks `i` unperformed: self-loop, no vehicle.
    pub fn deactivate(&mut self, i: VarIndex) {
        self.next[i.0] = i;
        self.vehicle[i.0] = -1;
        self.active[i.0] = false;
    }

    /// Walks `next` from `from` to the first node whose `next` is itself (a
    /// sink/end) or until `limit` steps are exhausted (cycle guard for
    /// partially-built assignments).
    pub fn walk_to_end(&self, from: VarIndex, limit: usize) -> Vec<VarIndex> {
        let mut path = vec![from];
        let mut cur = from;
        for _ in 0..limit {
            let nxt = self.next[cur.0];
            if nxt == cur {
                break;
            }
            path.push(nxt);
            if nxt == from {
                break; // defensive: never trust an unclosed cycle
            }
            cur = nxt;
        }
        path
    }
}
