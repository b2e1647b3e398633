//! Multi-worker parallel solve (spec §5 concurrency model): independent
//! per-thread model instances exchanging solutions only at checkpoints —
//! never sharing CP/LP state mid-search. `RoutingModel` holds `Rc`-based
//! evaluator handles (see `routing_core::eval::TransitEvaluator`) and is
//! therefore neither `Send` nor `Sync`; each worker thread builds its own
//! model from the caller-supplied factory rather than borrowing a shared
//! one, which is what "independent per-thread model instances" requires
//! here rather than merely permits.

use crate::filters::{accept_all, FilterVerdict};
use crate::metaheuristic::build_policy;
use crate::solve::{build_filters, build_operators, SolveReport};
use routing_core::error::{Result, RoutingError};
use routing_model::{compact_assignment, first_solution, RouteAssignment, RoutingModel, SearchParameters};
use std::time::Instant;

struct ExchangeMsg {
    worker_id: usize,
    cost: i64,
    assignment: RouteAssignment,
}

/// Runs `num_workers` independent local-search workers against models built
/// by `build_model`, exchanging improved incumbents through a coordinator
/// that fans each improvement out to every other worker (spec §5: "workers
/// exchange complete solutions at checkpoints; no shared CP/LP state"). The
/// overall winner is the lowest-cost solution any worker produced.
pub fn solve_parallel<F>(build_model: F, params: &SearchParameters, num_workers: usize) -> Result<SolveReport>
where
    F: Fn() -> RoutingModel + Sync,
{
    if num_workers == 0 {
        return Err(RoutingError::Construction("solve_parallel requires at least one worker".into()));
    }

    let (report_tx, report_rx) = crossbeam_channel::unbounded::<ExchangeMsg>();
    let inbound: Vec<(crossbeam_channel::Sender<ExchangeMsg>, crossbeam_channel::Receiver<ExchangeMsg>)> =
        (0..num_workers).map(|_| crossbeam_channel::unbounded()).collect();

    let results: Vec<Result<SolveReport>> = std::thread::scope(|scope| {
        let inbound_txs: Vec<_> = inbound.iter().map(|(tx, _)| tx.clone()).collect();
        scope.spawn(move || {
            while let Ok(msg) = report_rx.recv() {
                for (id, tx) in inbound_txs.iter().enumerate() {
                    if id != msg.worker_id {
                        let _ = tx.send(ExchangeMsg { worker_id: msg.worker_id, cost: msg.cost, assignment: msg.assignment.clone() });
                    }
                }
            }
        });

        let handles: Vec<_> = (0..num_workers)
            .map(|id| {
                let build_model = &build_model;
                let report_tx = report_tx.clone();
                let my_rx = inbound[id].1.clone();
                scope.spawn(move || run_worker(id, build_model(), params, report_tx, my_rx))
            })
            .collect();
        drop(report_tx);

        handles.into_iter().map(|h| h.join().expect("worker thread panicked")).collect()
    });

    results
        .into_iter()
        .collect::<Result<Vec<_>>>()?
        .into_iter()
        .min_by_key(|r| r.final_cost)
        .ok_or_else(|| RoutingError::Construction("no worker produced a solution".into()))
}

fn run_worker(
    worker_id: usize,
    model: RoutingModel,
    params: &SearchParameters,
    report_tx: crossbeam_channel::Sender<ExchangeMsg>,
    inbound: crossbeam_channel::Receiver<ExchangeMsg>,
) -> Result<SolveReport> {
    if !model.is_closed() {
        return Err(RoutingError::Construction("model must be closed before solving".into()));
    }
    let start_time = Instant::now();
    let mut assignment = first_solution::build(&model, params.first_solution_strategy, None)?;
    let initial_cost = model.cost_of(&assignment);

    let mut operators = build_operators(params);
    let mut filters = build_filters(params);
    let mut policy = build_policy(params.metaheuristic, params.gls_lambda, params.optimization_step, 0x5EED ^ (worker_id as u64));

    for op in operators.iter_mut() {
        op.reset(&model, &assignment);
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

        // Checkpoint: adopt a peer's incumbent if it beats ours.
        while let Ok(msg) = inbound.try_recv() {
            if msg.cost < current_cost {
                assignment = msg.assignment;
                current_cost = msg.cost;
                best_cost = best_cost.min(current_cost);
                for op in operators.iter_mut() {
                    op.reset(&model, &assignment);
                }
            }
        }

        let mut any_progress = false;
        for op in operators.iter_mut() {
            if start_time.elapsed() >= params.time_limit {
                deadline_exceeded = true;
                break 'outer;
            }
            let Some(mv) = op.next_neighbor(&model, &assignment) else {
                continue;
            };
            iterations += 1;
            any_progress = true;

            let undo = mv.apply(&mut assignment);
            let candidate_cost = model.cost_of(&assignment);
            let delta = candidate_cost - current_cost;

            let verdict = accept_all(&mut filters, &model, &assignment, &mv);
            let accept = verdict == FilterVerdict::Accept && policy.accept(delta, &mv);

            if accept {
                current_cost = candidate_cost;
                policy.on_commit(&mv);
                accepted_moves += 1;
                if current_cost < best_cost {
                    best_cost = current_cost;
                    let _ = report_tx.send(ExchangeMsg { worker_id, cost: current_cost, assignment: assignment.clone() });
                }
                for reset_op in operators.iter_mut() {
                    reset_op.reset(&model, &assignment);
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
        compact_assignment(&model, &mut assignment);
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
