//! C6: the dimension optimizer core (spec §4.5) — per-route and global
//! LP/MIP construction and solving, travel-start-dependent travel,
//! break/inter-break placement, three-pass packing, and per-route LP reuse.

mod breaks;
mod global;
mod packing;
mod route;
mod travel;

pub use global::{solve as solve_global, GlobalInput, GlobalSolution, InterRoutePrecedence};
pub use packing::pack_route;
pub use route::{BreakPlacement, PerRouteLp, RouteInput, RouteSolution};

#[cfg(test)]
mod tests {
    use super::*;
    use routing_core::dimension::{BreakRequest, Dimension, Interval, SpanCost};
    use routing_core::eval::TransitEvaluator;
    use routing_core::index::VarIndex;
    use std::time::Duration;

    fn simple_dimension() -> Dimension {
        Dimension::new("time", TransitEvaluator::Constant(10), 1000, 50)
    }

    #[test]
    fn plain_chain_route_respects_fixed_transit() {
        let dim = simple_dimension();
        let var_indices = vec![VarIndex(0), VarIndex(1), VarIndex(2)];
        let input = RouteInput {
            dimension: &dim,
            path_len: 3,
            var_indices: &var_indices,
            min_transit: &[10, 10],
            fixed_transit: &[10, 10],
            pre_travel: &[0, 0],
            post_travel: &[0, 0],
            cumul_bounds: &[(0, 0), (0, 1000), (0, 1000)],
            pickup_delivery_limits: &[],
            span_hard_upper_bound: Some(100),
            soft_span_upper_bound: None,
            slack_cost_coefficient: 0,
            breaks: &[],
            inter_break: None,
            travel_deps: &[None, None],
        };
        let mut lp = PerRouteLp::build(&input).unwrap();
        let sol = lp.solve(Duration::from_secs(1)).unwrap();
        assert_eq!(sol.cumuls[0], 0);
        assert_eq!(sol.cumuls[1], 10);
        assert_eq!(sol.cumuls[2], 20);
    }

    #[test]
    fn soft_upper_bound_overshoot_is_penalized_in_cost() {
        let mut dim = simple_dimension();
        dim.soft_upper_bounds.insert(
            VarIndex(2),
            routing_core::dimension::SoftBound { bound: 15, coefficient: 5 },
        );
        let var_indices = vec![VarIndex(0), VarIndex(1), VarIndex(2)];
        let input = RouteInput {
            dimension: &dim,
            path_len: 3,
            var_indices: &var_indices,
            min_transit: &[10, 10],
            fixed_transit: &[10, 10],
            pre_travel: &[0, 0],
            post_travel: &[0, 0],
            cumul_bounds: &[(0, 0), (0, 1000), (0, 1000)],
            pickup_delivery_limits: &[],
            span_hard_upper_bound: None,
            soft_span_upper_bound: None,
            slack_cost_coefficient: 0,
            breaks: &[],
            inter_break: None,
            travel_deps: &[None, None],
        };
        let mut lp = PerRouteLp::build(&input).unwrap();
        let sol = lp.solve(Duration::from_secs(1)).unwrap();
        // cumul[2] settles at 20 (10+10), 5 over the soft bound of 15, at coefficient 5.
        assert_eq!(sol.cost, 25);
    }

    #[test]
    fn pickup_delivery_limit_bounds_delivery_cumul() {
        let dim = simple_dimension();
        let var_indices = vec![VarIndex(0), VarIndex(1), VarIndex(2)];
        let input = RouteInput {
            dimension: &dim,
            path_len: 3,
            var_indices: &var_indices,
            min_transit: &[5, 5],
            fixed_transit: &[5, 5],
            pre_travel: &[0, 0],
            post_travel: &[0, 0],
            cumul_bounds: &[(0, 0), (0, 1000), (0, 1000)],
            pickup_delivery_limits: &[(1, 2, 7)],
            span_hard_upper_bound: None,
            soft_span_upper_bound: Some((20, SpanCost::Linear { coefficient: 1 })),
            slack_cost_coefficient: 0,
            breaks: &[],
            inter_break: None,
            travel_deps: &[None, None],
        };
        // fixed transit alone already pushes cumul[2]-cumul[1] = 5, satisfying the limit of 7.
        let mut lp = PerRouteLp::build(&input).unwrap();
        let sol = lp.solve(Duration::from_secs(1)).unwrap();
        assert!(sol.cumuls[2] - sol.cumuls[1] <= 7);
    }

    #[test]
    fn route_with_a_break_places_it_inside_slack() {
        let mut dim = simple_dimension();
        dim.slack_max = 100;
        let var_indices = vec![VarIndex(0), VarIndex(1), VarIndex(2)];
        let br = BreakRequest {
            start: Interval::new(0, 100),
            end: Interval::new(0, 200),
            duration: Interval::new(10, 10),
        };
        let breaks = vec![br];
        let input = RouteInput {
            dimension: &dim,
            path_len: 3,
            var_indices: &var_indices,
            min_transit: &[10, 10],
            fixed_transit: &[10, 10],
            pre_travel: &[0, 0],
            post_travel: &[0, 0],
            cumul_bounds: &[(0, 0), (0, 1000), (0, 1000)],
            pickup_delivery_limits: &[],
            span_hard_upper_bound: None,
            soft_span_upper_bound: None,
            slack_cost_coefficient: 0,
            breaks: &breaks,
            inter_break: None,
            travel_deps: &[None, None],
        };
        let mut lp = PerRouteLp::build(&input).unwrap();
        let sol = lp.solve(Duration::from_secs(1)).unwrap();
        assert_eq!(sol.breaks.len(), 1);
        assert_eq!(sol.breaks[0].duration, 10);
    }

    #[test]
    fn hard_span_bound_is_respected() {
        let dim = simple_dimension();
        let var_indices = vec![VarIndex(0), VarIndex(1)];
        let input = RouteInput {
            dimension: &dim,
            path_len: 2,
            var_indices: &var_indices,
            min_transit: &[10],
            fixed_transit: &[10],
            pre_travel: &[0],
            post_travel: &[0],
            cumul_bounds: &[(0, 0), (0, 1000)],
            pickup_delivery_limits: &[],
            span_hard_upper_bound: Some(10),
            soft_span_upper_bound: None,
            slack_cost_coefficient: 0,
            breaks: &[],
            inter_break: None,
            travel_deps: &[None],
        };
        let mut lp = PerRouteLp::build(&input).unwrap();
        let sol = lp.solve(Duration::from_secs(1)).unwrap();
        assert!(sol.cumuls[1] - sol.cumuls[0] <= 10);
    }
}
