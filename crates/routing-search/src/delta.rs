//! The unit of change operators propose and filters judge (spec §4.7.3
//! "propose a delta to `next` variables (and secondary `vehicle` variables
//! when costs are non-homogeneous)").

use routing_model::RouteAssignment;
use routing_core::index::VarIndex;

/// One variable's proposed new binding. `next = None` marks a variable the
/// operator deliberately leaves unbound — an LNS destroy step (spec §4.7.4:
/// "when the delta contains any unbound variable ... filters accept and
/// defer to full propagation").
#[derive(Debug, Clone, Copy)]
pub struct NextChange {
    pub var: VarIndex,
    pub next: Option<VarIndex>,
    pub vehicle: i64,
}

/// A candidate neighbor: the set of `next`/`vehicle` changes an operator
/// proposes (spec §4.7.3). Touched-variable order matters only for
/// filters' incremental touched-path detection, not for correctness.
#[derive(Debug, Clone, Default)]
pub struct Move {
    pub changes: Vec<NextChange>,
}

impl Move {
    pub fn new() -> Self {
        Move { changes: Vec::new() }
    }

    pub fn push(&mut self, var: VarIndex, next: Option<VarIndex>, vehicle: i64) {
        self.changes.push(NextChange { var, next, vehicle });
    }

    pub fn touched_vars(&self) -> impl Iterator<Item = VarIndex> + '_ {
        self.changes.iter().map(|c| c.var)
    }

    /// Whether this delta has any unbound variable (spec §4.7.4 deferral
    /// case).
    pub fn has_unbound(&self) -> bool {
        self.changes.iter().any(|c| c.next.is_none())
    }

    /// Applies the bound portion of this move to `assignment` in place,
    /// returning a snapshot of what it overwrote so the caller can `undo`.
    pub fn apply(&self, assignment: &mut RouteAssignment) -> Vec<(VarIndex, VarIndex, i64, bool)> {
        let mut undo = Vec::with_capacity(self.changes.len());
        for c in &self.changes {
            undo.push((c.var, assignment.next[c.var.0], assignment.vehicle[c.var.0], assignment.active[c.var.0]));
            if let Some(next) = c.next {
                assignment.bind(c.var, next, c.vehicle);
            } else {
                assignment.deactivate(c.var);
            }
        }
        undo
    }

    /// Reverts a prior `apply`'s `undo` snapshot.
    pub fn undo(assignment: &mut RouteAssignment, undo: Vec<(VarIndex, VarIndex, i64, bool)>) {
        for (var, next, vehicle, active) in undo {
            assignment.next[var.0] = next;
            assignment.vehicle[var.0] = vehicle;
            assignment.active[var.0] = active;
        }
    }
}
