//! Break placement and inter-break distance (spec §4.5.2/§4.5.3). Requires
//! the MIP back-end throughout: break slot selection, the exact
//! duration-in-slack product, and the eligibility/coverage reifications are
//! all MIP-only constraint kinds.
//!
//! Simplification: breaks are only placed inside a route's slack intervals
//! here (the `beforeRoute`/`afterRoute` placement spec §4.5.2 mentions for
//! the MIP variant is not modeled); see DESIGN.md.

use crate::route::RouteInput;
use log::warn;
use routing_core::error::Result;
use routing_lp::{LinearSolver, VarHandle};

#[derive(Clone)]
pub struct BreakVars {
    pub start: VarHandle,
    pub end: VarHandle,
    pub duration: VarHandle,
    in_slack: Vec<VarHandle>,
}

impl BreakVars {
    /// Reads back which slack the break landed in, post-solve.
    pub fn chosen_slack(&self, solver: &dyn LinearSolver) -> Option<usize> {
        self.in_slack.iter().position(|&v| solver.get_value(v) > 0.5)
    }
}

#[derive(Default)]
pub struct BreakBuildOutcome {
    pub vars: Vec<BreakVars>,
    pub objective_terms: Vec<(VarHandle, f64)>,
}

pub fn build(
    solver: &mut dyn LinearSolver,
    input: &RouteInput,
    cumul: &[VarHandle],
    slack: &[VarHandle],
) -> Result<BreakBuildOutcome> {
    let mut outcome = BreakBuildOutcome::default();
    let mut duration_in_slack_by_slack: Vec<Vec<VarHandle>> = vec![Vec::new(); slack.len()];

    let mut break_vars = Vec::with_capacity(input.breaks.len());
    let mut eligibility = Vec::with_capacity(input.breaks.len());

    for br in input.breaks {
        let start = solver.new_continuous_var(br.start.lo as f64, br.start.hi as f64);
        let end = solver.new_continuous_var(br.end.lo as f64, br.end.hi as f64);
        let duration = solver.new_continuous_var(br.duration.lo as f64, br.duration.hi as f64);
        solver.add_linear_constraint(0.0, 0.0, &[(start, 1.0), (duration, 1.0), (end, -1.0)]);

        let mut in_slack = Vec::with_capacity(slack.len());
        for k in 0..slack.len() {
            let sel = solver.new_int_var(0.0, 1.0)?;
            in_slack.push(sel);

            let ct_after = solver.add_linear_constraint(0.0, f64::INFINITY, &[(start, 1.0), (cumul[k], -1.0)]);
            solver.set_enforcement_literal(ct_after, sel)?;
            let ct_before =
                solver.add_linear_constraint(f64::NEG_INFINITY, 0.0, &[(end, 1.0), (cumul[k + 1], -1.0)]);
            solver.set_enforcement_literal(ct_before, sel)?;

            let duration_in_slack = solver.new_continuous_var(0.0, input.dimension.slack_max as f64);
            solver.add_product_constraint(duration_in_slack, sel, duration)?;
            duration_in_slack_by_slack[k].push(duration_in_slack);
        }
        solver.add_linear_constraint(1.0, 1.0, &in_slack.iter().map(|&s| (s, 1.0)).collect::<Vec<_>>());

        break_vars.push(BreakVars { start, end, duration, in_slack });
    }

    for (k, terms) in duration_in_slack_by_slack.into_iter().enumerate() {
        if terms.is_empty() {
            continue;
        }
        let mut row: Vec<(VarHandle, f64)> = terms.iter().map(|&v| (v, 1.0)).collect();
        row.push((slack[k], -1.0));
        solver.add_linear_constraint(f64::NEG_INFINITY, 0.0, &row);
    }

    if let Some(ibd) = &input.inter_break {
        if input.breaks.is_empty() {
            warn!("inter-break distance configured with no breaks on this route");
        } else {
            let route_start = cumul[0];
            let route_end = *cumul.last().unwrap();
            let limit = ibd.limit as f64;

            let mut cover_prev = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
            solver.add_linear_constraint(limit, limit, &[(cover_prev, 1.0), (route_start, -1.0)]);

            for (br_idx, bv) in break_vars.iter().enumerate() {
                let eligible = solver.new_int_var(0.0, 1.0)?;
                let not_eligible = solver.new_int_var(0.0, 1.0)?;
                solver.add_linear_constraint(1.0, 1.0, &[(eligible, 1.0), (not_eligible, 1.0)]);
                solver.add_reified_linear_constraint(
                    eligible,
                    ibd.min_break_duration as f64,
                    f64::INFINITY,
                    &[(bv.duration, 1.0)],
                )?;
                eligibility.push(eligible);

                let cover = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
                let ct_true = solver.add_linear_constraint(limit, limit, &[(cover, 1.0), (bv.end, -1.0)]);
                solver.set_enforcement_literal(ct_true, eligible)?;
                let ct_false = solver.add_linear_constraint(limit, limit, &[(cover, 1.0), (route_start, -1.0)]);
                solver.set_enforcement_literal(ct_false, not_eligible)?;

                let next_cover = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
                solver.add_maximum_constraint(next_cover, &[cover_prev, cover])?;

                let below_end = solver.new_int_var(0.0, 1.0)?;
                solver.add_reified_linear_constraint(
                    below_end,
                    f64::NEG_INFINITY,
                    -1.0,
                    &[(cover_prev, 1.0), (route_end, -1.0)],
                )?;
                let ct_chain =
                    solver.add_linear_constraint(f64::NEG_INFINITY, 0.0, &[(bv.start, 1.0), (cover_prev, -1.0)]);
                solver.set_enforcement_literal(ct_chain, below_end)?;

                cover_prev = next_cover;
                let _ = br_idx;
            }
            solver.add_linear_constraint(0.0, f64::INFINITY, &[(cover_prev, 1.0), (route_end, -1.0)]);
        }
    }

    outcome.vars = break_vars;
    Ok(outcome)
}
