//! `Solve` (spec §2, §5): builds a first solution, then repeatedly applies
//! local-search operators filtered through the fixed filter chain and
//! judged by the configured metaheuristic's acceptance policy, until the
//! time limit, solution limit, or operator exhaustion ends the run.
//!
//! Spec §5 names three suspension points where the deadline is polled:
//! between CP decisions, between LP/MIP calls, between local-search moves.
//! `routing-model::first_solution` covers the first; `routing-bounds` and
//! `routing-scheduler` the second; this module is the third.

use crate::filters::{accept_all, FilterVerdict, LocalSearchFilter, NodePrecedenceFilter, ObjectiveFilter, PathCumulFilter};
use crate::metaheuristic::build_policy;
use crate::operators::{
    CrossOperator, ExchangeOperator, ExtendedSwapActiveOperator, InactiveLnsOperator, LkhOperator, LocalSearchOperator,
    MakeActiveOperator, MakeInactiveOperator, OrOptOperator, PairActiveOperator, PairRelocateOperator, PathLnsOperator,
    RelocateOperator, SwapActiveOperator, TspLnsOperator, TspOptOperator, TwoOptOperator,
};
use routing_core::error::{Result, RoutingError};
use routing_model::{compact_assignment, first_solution, RouteAssignment, RoutingModel, SearchParameters};
use std::time::Instant;

/// Outcome of a solve, including the metrics SPEC_FULL §B's CLI surface
/// reports (iteration count, final cost, whether the time limit was hit).
#[derive(Debug, Clone)]
pub struct SolveReport {
    pub assignment: RouteAssignment,
    pub initial_cost: i64,
    pub final_cost: i64,
    pub iterations: u64,
    pub accepted_moves: u64,
    pub deadline_exceeded: bool,
}

pub(crate) fn build_operators(params: &SearchParameters) -> Vec<Box<dyn LocalSearchOperator>> {
    let t = params.operators;
    let mut ops: Vec<Box<dyn LocalSearchOperator>> = Vec::new();
    if t.relocate {
        ops.push(Box::new(RelocateOperator::default()));
    }
    if t.exchange {
        ops.push(Box::new(ExchangeOperator::default()));
    }
    if t.cross {
        ops.push(Box::new(CrossOperator::default()));
    }
    if t.two_opt {
        ops.push(Box::new(TwoOptOperator::default()));
    }
    if t.or_opt {
        ops.push(Box::new(OrOptOperator::new(2)));
        ops.push(Box::new(OrOptOperator::new(3)));
    }
    if t.lkh {
        ops.push(Box::new(LkhOperator::default()));
    }
    if t.pair_active {
        ops.push(Box::new(PairActiveOperator::default()));
    }
    if t.pair_relocate {
        ops.push(Box::new(PairRelocateOperator::default()));
    }
    if t.make_active {
        ops.push(Box::new(MakeActiveOperator::default()));
    }
    if t.swap_active {
        ops.push(Box::new(SwapActiveOperator::default()));
    }
    if t.make_inactive {
        ops.push(Box::new(MakeInactiveOperator::default()));
    }
    if t.extended_swap_active {
        ops.push(Box::new(ExtendedSwapActiveOperator::default()));
    }
    if t.tsp_opt {
        ops.push(Box::new(TspOptOperator::default()));
    }
    if t.tsp_lns {
        ops.push(Box::new(TspLnsOperator::new(0xC0FFEE)));
    }
    if t.path_lns {
        ops.push(Box::new(PathLnsOperator::new(0xBADF00D, 4)));
    }
    if t.inactive_lns {
        ops.push(Box::new(InactiveLnsOperator::default()));
    }
    ops
}

pub(crate) fn build_filters(params: &SearchParameters) -> Vec<Box<dyn LocalSearchFilter>> {
    // Fixed order per spec §5: objective, then path-cumul, then
    // node-precedence.
    let mut filters: Vec<Box<dyn LocalSearchFilter>> = Vec::new();
    if params.filters.objective {
        filters.push(Box::new(ObjectiveFilter { optimization_step: params.optimization_step }));
    }
    if params.filters.path_cumul {
        filters.push(Box::new(PathCumulFilter));
    }
    if params.filters.node_precedence {
        filters.push(Box::new(NodePrecedenceFilter));
    }
    filters
}

/// Runs first-solution construction followed by the local-search /
/// metaheuristic loop until `params.time_limit` elapses, `solution_limit`
/// accepted moves have been made, or every operator is simultaneously
/// exhausted (a true local optimum under the active operator set).
pub fn solve(model: &RoutingModel, params: &SearchParameters, evaluator: Option<&first_solution::NextNodeEvaluator>) -> Result<SolveReport> {
    if !model.is_closed() {
        return Err(RoutingError::Construction("model must be closed before solving".into()));
    }
    let start_time = Instant::now();
    let mut assignment = first_solution::build(model, params.first_solution_strategy, evaluator)?;
    let initial_cost = model.cost_of(&assignment);

    let mut operators = build_operators(params);
    let mut filters = build_filters(params);
    let mut policy = build_policy(params.metaheuristic, params.gls_lambda, params.optimization_step, 0x5EED);

    for op in operators.iter_mut() {
        op.reset(model, &assignment);
    }

    let mut iterations = 0u64;
    let mut accepted_moves = 0u64;
    let mut deadline_exceeded = false;
    let mut current_cost = initial_cost;
    let mut best_cost = initial_cost;

    'outer: loop {
        if start_time.elapsed() >= params.time_limit {
            deadline_exceeded = true;
            break;
        }
        if let Some(limit) = params.solution_limit {
            if accepted_moves >= limit {
                break;
            }
        }

        let mut any_progress = false;
        for op in operators.iter_mut() {
            if start_time.elapsed() >= params.time_limit {
                deadline_exceeded = true;
                break 'outer;
            }
            let Some(mv) = op.next_neighbor(model, &assignment) else {
                continue;
            };
            iterations += 1;
            any_progress = true;

            let undo = mv.apply(&mut assignment);
            let candidate_cost = model.cost_of(&assignment);
            let delta = candidate_cost - current_cost;

            let verdict = accept_all(&mut filters, model, &assignment, &mv);
            let accept = verdict == FilterVerdict::Accept && policy.accept(delta, &mv);

            if accept {
                current_cost = candidate_cost;
                policy.on_commit(&mv);
                accepted_moves += 1;
                if current_cost < best_cost {
                    best_cost = current_cost;
                }
                for reset_op in operators.iter_mut() {
                    reset_op.reset(model, &assignment);
                }
                break;
            } else {
                crate::delta::Move::undo(&mut assignment, undo);
            }
        }

        if !any_progress {
            break;
        }
    }

    if params.check_compact_assignment {
        compact_assignment(model, &mut assignment);
    }

    Ok(SolveReport {
        final_cost: model.cost_of(&assignment),
        assignment,
        initial_cost,
        iterations,
        accepted_moves,
        deadline_exceeded,
    })
}
