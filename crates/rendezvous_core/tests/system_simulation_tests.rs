mod support;

use std::sync::{Arc, Mutex};

use h3o::LatLng;
use rendezvous_core::lifecycle::RendezvousStatus;
use rendezvous_core::store::RecordStore;
use rendezvous_core::test_helpers::{
    confirm_target, test_route, test_target, FixedRouteProvider,
};

use support::world::{TestEngineBuilder, TestHarness, RECORD_ID};

fn start_handoff(harness: &mut TestHarness) {
    harness.submit();
    harness.engine.start_polling().expect("polling starts");
    confirm_target(&harness.store, RECORD_ID, test_target(), "Tempelhofer Feld", 100);
    harness.engine.advance(3000);
    assert_eq!(harness.engine.status(), RendezvousStatus::InProgress);
}

#[test]
fn the_routed_path_is_consumed_point_by_point() {
    let route = test_route();
    let mut harness = TestEngineBuilder::new()
        .with_route_provider(Box::new(FixedRouteProvider(route.clone())))
        .build();
    start_handoff(&mut harness);

    let state = harness.engine.current_state();
    assert_eq!(state.remaining, route.points);
    assert_eq!(state.consumed, vec![route.points[0]]);

    // Half way: the first leg is behind us.
    harness.engine.advance(15_000);
    let state = harness.engine.current_state();
    assert_eq!(state.progress, 0.5);
    assert!(state.consumed.len() >= 2);
    assert_eq!(state.consumed[0], route.points[0]);

    harness.engine.advance(15_000);
    let state = harness.engine.current_state();
    assert_eq!(state.consumed, route.points);
    assert_eq!(state.remaining, vec![route.points[2]]);
}

#[test]
fn subscribers_see_monotonic_progress_and_eta() {
    let mut harness = TestEngineBuilder::new()
        .with_route_provider(Box::new(FixedRouteProvider(test_route())))
        .build();

    let observed: Arc<Mutex<Vec<(f64, f64)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = observed.clone();
    harness.engine.subscribe(move |state| {
        if let Ok(mut states) = sink.lock() {
            states.push((state.progress, state.remaining_time_secs));
        }
    });

    start_handoff(&mut harness);
    harness.engine.advance(30_000);

    let states = observed.lock().expect("states");
    assert_eq!(states.len(), 31);
    for pair in states.windows(2) {
        assert!(pair[1].0 > pair[0].0);
        assert!(pair[1].1 <= pair[0].1);
    }
    assert_eq!(states.last().expect("terminal").1, 0.0);
}

#[test]
fn cancellation_mid_run_publishes_nothing_further() {
    let mut harness = TestEngineBuilder::new().build();
    start_handoff(&mut harness);

    harness.engine.advance(10_000);
    let frozen = harness.engine.current_state();
    assert!(frozen.is_animating);
    assert!(frozen.progress > 0.0 && frozen.progress < 1.0);

    harness.engine.cancel().expect("cancellation succeeds");
    assert_eq!(harness.engine.status(), RendezvousStatus::Cancelled);
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "CANCELLED");

    // Queued ticks fire into a deactivated run and publish nothing.
    harness.engine.advance(60_000);
    assert_eq!(harness.engine.current_state(), frozen);
    assert_eq!(harness.engine.status(), RendezvousStatus::Cancelled);
}

#[test]
fn completing_early_stops_the_animation() {
    let mut harness = TestEngineBuilder::new().build();
    start_handoff(&mut harness);

    harness.engine.advance(5_000);
    harness.engine.complete().expect("completion succeeds");
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "COMPLETED");

    let frozen = harness.engine.current_state();
    harness.engine.advance(60_000);
    assert_eq!(harness.engine.current_state(), frozen);
}

#[test]
fn material_gps_drift_restarts_the_run_from_the_sample() {
    let mut harness = TestEngineBuilder::new().build();
    start_handoff(&mut harness);

    harness.engine.advance(10_000);
    let before = harness.engine.current_state();
    assert!(before.progress > 0.0);

    // A sample far off the animated position: re-route and start over.
    let sample = LatLng::new(52.5500, 13.5000).expect("coordinate");
    harness.engine.update_position(sample);

    let state = harness.engine.current_state();
    assert_eq!(state.progress, 0.0);
    assert!(state.is_animating);
    assert_eq!(state.position, Some(sample));
    assert_eq!(state.remaining[0], sample);

    // The fresh run still animates to arrival.
    harness.engine.advance(30_000);
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);
    let state = harness.engine.current_state();
    assert_eq!(state.progress, 1.0);
    assert_eq!(state.position, Some(test_target()));
}

#[test]
fn minor_gps_drift_does_not_restart_the_run() {
    let mut harness = TestEngineBuilder::new().build();
    start_handoff(&mut harness);

    harness.engine.advance(10_000);
    let before = harness.engine.current_state();
    let position = before.position.expect("animated position");

    // A few metres of drift stays within the re-anchor threshold.
    let sample =
        LatLng::new(position.lat() + 0.0001, position.lng()).expect("coordinate");
    harness.engine.update_position(sample);

    assert_eq!(harness.engine.current_state(), before);

    harness.engine.advance(20_000);
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);
}
