//! Travel-start-dependent travel (spec §4.5.1): a monotone non-decreasing
//! PWL mapping travel-start time to ideal travel value, plus a convex PWL
//! "compression penalty" for traveling faster than ideal. Requires the MIP
//! back-end (region selection needs binaries).

use routing_core::dimension::TravelStartDependency;
use routing_core::error::Result;
use routing_lp::{LinearSolver, VarHandle};

#[derive(Default, Clone)]
pub struct TravelBuildOutcome {
    pub objective_terms: Vec<(VarHandle, f64)>,
}

impl TravelBuildOutcome {
    pub fn merge(&mut self, other: TravelBuildOutcome) {
        self.objective_terms.extend(other.objective_terms);
    }
}

pub fn build_arc(
    solver: &mut dyn LinearSolver,
    cumul_k: VarHandle,
    cumul_k1: VarHandle,
    slack_k: VarHandle,
    dep: &TravelStartDependency,
    pre_travel: i64,
    post_travel: i64,
) -> Result<TravelBuildOutcome> {
    let anchors = dep.travel.anchors();
    let t_min = anchors.iter().map(|a| a.y).fold(f64::INFINITY, f64::min);
    let t_max = anchors.iter().map(|a| a.y).fold(f64::NEG_INFINITY, f64::max);

    let travel_start = solver.new_continuous_var(f64::NEG_INFINITY, f64::INFINITY);
    let travel_value = solver.new_continuous_var(t_min, t_max);
    let compressed_travel = solver.new_continuous_var(t_min, t_max);
    let compression = solver.new_continuous_var(0.0, f64::INFINITY);

    // travelStart = cumul[k] + preTravel
    solver.add_linear_constraint(
        pre_travel as f64,
        pre_travel as f64,
        &[(travel_start, 1.0), (cumul_k, -1.0)],
    );
    // cumul[k+1] - cumul[k] - slack[k] - compressedTravel = preTravel + postTravel
    let rhs = (pre_travel + post_travel) as f64;
    solver.add_linear_constraint(
        rhs,
        rhs,
        &[(cumul_k1, 1.0), (cumul_k, -1.0), (slack_k, -1.0), (compressed_travel, -1.0)],
    );
    // compression = travelValue - compressedTravel
    solver.add_linear_constraint(
        0.0,
        0.0,
        &[(travel_value, 1.0), (compressed_travel, -1.0), (compression, -1.0)],
    );

    let regions = dep.travel.convex_regions();
    let segments = dep.travel.segments();
    let mut selectors = Vec::with_capacity(regions.len());
    for region in &regions {
        let sel = solver.new_int_var(0.0, 1.0)?;
        selectors.push(sel);
        let x_start = segments[region[0]].x_start;
        let x_end = segments[*region.last().unwrap()].x_end;

        let ct_lo = solver.add_linear_constraint(x_start, f64::INFINITY, &[(travel_start, 1.0)]);
        solver.set_enforcement_literal(ct_lo, sel)?;
        let ct_hi = solver.add_linear_constraint(f64::NEG_INFINITY, x_end, &[(travel_start, 1.0)]);
        solver.set_enforcement_literal(ct_hi, sel)?;

        for &seg_idx in region {
            let seg = segments[seg_idx];
            // travelValue >= slope * travelStart + intercept - 0.5, gated on this region's binary.
            let ct = solver.add_linear_constraint(
                seg.intercept - 0.5,
                f64::INFINITY,
                &[(travel_value, 1.0), (travel_start, -seg.slope)],
            );
            solver.set_enforcement_literal(ct, sel)?;
        }
    }
    solver.add_linear_constraint(1.0, 1.0, &selectors.iter().map(|&s| (s, 1.0)).collect::<Vec<_>>());

    // Convex compression-cost epigraph: compressionCost >= slope*compression + intercept,
    // unconditionally over every segment (valid because the cost function is convex).
    let compression_cost = solver.new_continuous_var(0.0, f64::INFINITY);
    for seg in dep.compression_cost.segments() {
        solver.add_linear_constraint(
            seg.intercept,
            f64::INFINITY,
            &[(compression_cost, 1.0), (compression, -seg.slope)],
        );
    }

    let mut outcome = TravelBuildOutcome::default();
    outcome.objective_terms.push((travel_value, dep.travel_cost_coefficient as f64));
    outcome.objective_terms.push((compression_cost, 1.0));
    Ok(outcome)
}
