//! Integration tests for the end-to-end scenarios: each just runs its
//! scenario function and unwraps, so a failure prints the scenario's own
//! diagnostic rather than a generic assertion message.

use routing_validation::scenarios;

#[test]
fn tsp_on_a_line() {
    scenarios::tsp_on_a_line().unwrap();
}

#[test]
fn disjunction_cheaper_unperformed() {
    scenarios::disjunction_cheaper_unperformed().unwrap();
}

#[test]
fn time_window_needs_slack() {
    scenarios::time_window_needs_slack().unwrap();
}

#[test]
fn pickup_delivery_pair_coherent() {
    scenarios::pickup_delivery_pair_coherent().unwrap();
}

#[test]
fn break_extends_route_span() {
    scenarios::break_extends_route_span().unwrap();
}

#[test]
fn resource_assignment_respects_capacity() {
    scenarios::resource_assignment_respects_capacity().unwrap();
}

#[test]
fn every_registered_scenario_passes() {
    for (name, f) in scenarios::all() {
        if let Err(e) = f() {
            panic!("scenario {name} failed: {e}");
        }
    }
}
