//! The metaheuristic escape policy sitting above local search (spec §6
//! `metaheuristic`: GreedyDescent | GLS | SimulatedAnnealing | TabuSearch).
//! Each policy decides whether to accept a candidate move whose objective
//! delta is known, and is given a chance to update its own state once a
//! move is actually committed.

use crate::delta::Move;
use rand::Rng;
use routing_core::index::VarIndex;
use routing_model::Metaheuristic;
use std::collections::{HashMap, VecDeque};

pub trait AcceptancePolicy {
    /// `delta = candidate_cost - incumbent_cost`; negative is an
    /// improvement. Touched vars are supplied so GLS/Tabu can weigh or
    /// forbid specific arcs.
    fn accept(&mut self, delta: i64, mv: &Move) -> bool;

    /// Called once a move this policy accepted is actually committed, so
    /// state (penalty counts, temperature, tabu list) can advance.
    fn on_commit(&mut self, mv: &Move);

    fn name(&self) -> &'static str;
}

pub struct GreedyDescent {
    pub optimization_step: i64,
}

impl AcceptancePolicy for GreedyDescent {
    fn accept(&mut self, delta: i64, _mv: &Move) -> bool {
        delta < -self.optimization_step
    }
    fn on_commit(&mut self, _mv: &Move) {}
    fn name(&self) -> &'static str {
        "GreedyDescent"
    }
}

/// Guided Local Search: penalizes the arcs most frequently present at a
/// local optimum so subsequent passes are steered away from them (spec §6
/// `glsLambda`). `penalty[(i,j)]` counts how many times arc `i -> j` has
/// been part of a committed move that did not improve the incumbent.
pub struct GuidedLocalSearch {
    pub lambda: f64,
    pub optimization_step: i64,
    penalty: HashMap<(VarIndex, VarIndex), u32>,
}

impl GuidedLocalSearch {
    pub fn new(lambda: f64) -> Self {
        GuidedLocalSearch { lambda, optimization_step: 0, penalty: HashMap::new() }
    }

    fn penalty_of(&self, mv: &Move) -> f64 {
        mv.changes
            .iter()
            .filter_map(|c| c.next.map(|n| *self.penalty.get(&(c.var, n)).unwrap_or(&0) as f64))
            .sum()
    }
}

impl AcceptancePolicy for GuidedLocalSearch {
    fn accept(&mut self, delta: i64, mv: &Move) -> bool {
        let guided = delta as f64 + self.lambda * self.penalty_of(mv);
        guided < -(self.optimization_step as f64)
    }

    fn on_commit(&mut self, mv: &Move) {
        for c in &mv.changes {
            if let Some(n) = c.next {
                *self.penalty.entry((c.var, n)).or_insert(0) += 1;
            }
        }
    }

    fn name(&self) -> &'static str {
        "GuidedLocalSearch"
    }
}

/// Accepts worsening moves with probability `exp(-delta / temperature)`,
/// cooling geometrically after every committed move.
pub struct SimulatedAnnealing<R: Rng> {
    pub temperature: f64,
    pub cooling_rate: f64,
    rng: R,
}

impl<R: Rng> SimulatedAnnealing<R> {
    pub fn new(initial_temperature: f64, cooling_rate: f64, rng: R) -> Self {
        SimulatedAnnealing { temperature: initial_temperature, cooling_rate, rng }
    }
}

impl<R: Rng> AcceptancePolicy for SimulatedAnnealing<R> {
    fn accept(&mut self, delta: i64, _mv: &Move) -> bool {
        if delta < 0 {
            return true;
        }
        if self.temperature <= 0.0 {
            return false;
        }
        let p = (-(delta as f64) / self.temperature).exp();
        self.rng.gen::<f64>() < p
    }

    fn on_commit(&mut self, _mv: &Move) {
        self.temperature *= self.cooling_rate;
    }

    fn name(&self) -> &'static str {
        "SimulatedAnnealing"
    }
}

/// Forbids re-touching a variable that was part of a recently committed
/// move, for `tenure` commits, unless the candidate is itself an
/// improvement over the best incumbent seen so far (aspiration).
pub struct TabuSearch {
    pub tenure: usize,
    recent: VecDeque<(VarIndex, usize)>,
    commit_count: usize,
    best_delta_seen: i64,
}

impl TabuSearch {
    pub fn new(tenure: usize) -> Self {
        TabuSearch { tenure, recent: VecDeque::new(), commit_count: 0, best_delta_seen: 0 }
    }

    fn is_tabu(&self, var: VarIndex) -> bool {
        self.recent.iter().any(|&(v, at)| v == var && self.commit_count - at < self.tenure)
    }
}

impl AcceptancePolicy for TabuSearch {
    fn accept(&mut self, delta: i64, mv: &Move) -> bool {
        let any_tabu = mv.touched_vars().any(|v| self.is_tabu(v));
        if !any_tabu {
            return delta < 0;
        }
        // Aspiration: allow a tabu move if it strictly improves on the best
        // improvement this search has made so far.
        delta < self.best_delta_seen
    }

    fn on_commit(&mut self, mv: &Move) {
        self.commit_count += 1;
        for v in mv.touched_vars() {
            self.recent.push_back((v, self.commit_count));
        }
        while self.recent.len() > 4096 {
            self.recent.pop_front();
        }
    }

    fn name(&self) -> &'static str {
        "TabuSearch"
    }
}

/// Selects the concrete policy named by `SearchParameters::metaheuristic`.
pub fn build_policy(kind: Metaheuristic, gls_lambda: f64, optimization_step: i64, seed: u64) -> Box<dyn AcceptancePolicy> {
    use rand::SeedableRng;
    match kind {
        Metaheuristic::GreedyDescent => Box::new(GreedyDescent { optimization_step }),
        Metaheuristic::GuidedLocalSearch => {
            let mut gls = GuidedLocalSearch::new(gls_lambda);
            gls.optimization_step = optimization_step;
            Box::new(gls)
        }
        Metaheuristic::SimulatedAnnealing => {
            Box::new(SimulatedAnnealing::new(100.0, 0.995, rand_xoshiro::Xoshiro256PlusPlus::seed_from_u64(seed)))
        }
        Metaheuristic::TabuSearch => Box::new(TabuSearch::new(50)),
    }
}
