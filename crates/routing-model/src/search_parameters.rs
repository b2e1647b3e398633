//! `SearchParameters` (SPEC_FULL §B): the immutable configuration record
//! passed by value into `Solve`, replacing the teacher's pattern of a
//! global mutable flags struct (spec §9 REDESIGN FLAG "Globally mutable
//! flags").

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstSolutionStrategy {
    GlobalCheapestArc,
    LocalCheapestArc,
    PathCheapestArc,
    PathMostConstrainedArc,
    EvaluatorStrategy,
    AllUnperformed,
    BestInsertion,
    Savings,
    Sweep,
}

impl Default for FirstSolutionStrategy {
    fn default() -> Self {
        FirstSolutionStrategy::PathCheapestArc
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metaheuristic {
    GreedyDescent,
    GuidedLocalSearch,
    SimulatedAnnealing,
    TabuSearch,
}

impl Default for Metaheuristic {
    fn default() -> Self {
        Metaheuristic::GreedyDescent
    }
}

/// Per-operator enable/disable toggles (spec §6 CLI surface).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorToggles {
    pub relocate: bool,
    pub exchange: bool,
    pub cross: bool,
    pub two_opt: bool,
    pub or_opt: bool,
    pub lkh: bool,
    pub pair_active: bool,
    pub pair_relocate: bool,
    pub make_active: bool,
    pub swap_active: bool,
    pub make_inactive: bool,
    pub extended_swap_active: bool,
    pub tsp_opt: bool,
    pub tsp_lns: bool,
    pub path_lns: bool,
    pub inactive_lns: bool,
}

impl Default for OperatorToggles {
    fn default() -> Self {
        OperatorToggles {
            relocate: true,
            exchange: true,
            cross: true,
            two_opt: true,
            or_opt: true,
            lkh: false,
            pair_active: true,
            pair_relocate: true,
            make_active: true,
            swap_active: true,
            make_inactive: true,
            extended_swap_active: false,
            tsp_opt: false,
            tsp_lns: false,
            path_lns: false,
            inactive_lns: false,
        }
    }
}

/// Filter enable toggles (spec §4.7.4): all three default on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterToggles {
    pub path_cumul: bool,
    pub node_precedence: bool,
    pub objective: bool,
}

impl Default for FilterToggles {
    fn default() -> Self {
        FilterToggles { path_cumul: true, node_precedence: true, objective: true }
    }
}

/// SPEC_FULL §B / spec §6's CLI surface table, minus the boundary-only
/// entries (file I/O, logging sinks) that are explicitly out of scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParameters {
    pub first_solution_strategy: FirstSolutionStrategy,
    pub metaheuristic: Metaheuristic,
    pub gls_lambda: f64,
    pub solution_limit: Option<u64>,
    pub time_limit: Duration,
    pub lns_time_limit: Duration,
    pub optimization_step: i64,
    pub filters: FilterToggles,
    pub operators: OperatorToggles,
    pub cache_callbacks: bool,
    pub max_cache_size: usize,
    pub use_homogeneous_costs: bool,
    /// depth-first (vs. best-first) exploration of the first-solution
    /// decision builder.
    pub dfs: bool,
    pub check_compact_assignment: bool,
}

impl Default for SearchParameters {
    fn default() -> Self {
        SearchParameters {
            first_solution_strategy: FirstSolutionStrategy::default(),
            metaheuristic: Metaheuristic::default(),
            gls_lambda: 0.1,
            solution_limit: None,
            time_limit: Duration::from_secs(10),
            lns_time_limit: Duration::from_millis(200),
            optimization_step: 1,
            filters: FilterToggles::default(),
            operators: OperatorToggles::default(),
            cache_callbacks: true,
            max_cache_size: 1_000_000,
            use_homogeneous_costs: true,
            dfs: true,
            check_compact_assignment: false,
        }
    }
}

impl SearchParameters {
    pub fn with_first_solution_strategy(mut self, strategy: FirstSolutionStrategy) -> Self {
        self.first_solution_strategy = strategy;
        self
    }

    pub fn with_metaheuristic(mut self, metaheuristic: Metaheuristic) -> Self {
        self.metaheuristic = metaheuristic;
        self
    }

    pub fn with_time_limit(mut self, time_limit: Duration) -> Self {
        self.time_limit = time_limit;
        self
    }

    pub fn with_solution_limit(mut self, limit: u64) -> Self {
        self.solution_limit = Some(limit);
        self
    }
}
