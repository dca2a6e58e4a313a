mod support;

use std::sync::Arc;

use rendezvous_core::engine::RendezvousEngine;
use rendezvous_core::lifecycle::{RendezvousStatus, TransitionError};
use rendezvous_core::params::EngineParams;
use rendezvous_core::store::{InMemoryRecordStore, RecordStore};
use rendezvous_core::test_helpers::{confirm_target, test_origin, test_parties, test_target};

use support::world::{TestEngineBuilder, RECORD_ID};

#[test]
fn full_lifecycle_reaches_completion() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();

    assert_eq!(
        harness.engine.status(),
        RendezvousStatus::WaitingForCounterpart
    );
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "REQUESTED");
    assert_eq!(record.requested_at, Some(0));
    assert!(record.target_lat.is_none());

    harness.engine.start_polling().expect("polling starts");

    // First refresh: the counterpart has not confirmed yet.
    harness.engine.advance(3000);
    assert_eq!(
        harness.engine.status(),
        RendezvousStatus::WaitingForCounterpart
    );
    assert_eq!(harness.engine.telemetry().polls_issued, 1);

    // The counterpart confirms with a return location.
    confirm_target(
        &harness.store,
        RECORD_ID,
        test_target(),
        "Tempelhofer Feld",
        3500,
    );

    // The next refresh observes the confirmation and starts the handoff.
    harness.engine.advance(3000);
    assert_eq!(harness.engine.status(), RendezvousStatus::InProgress);
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "IN_PROGRESS");

    let state = harness.engine.current_state();
    assert_eq!(state.progress, 0.0);
    assert!(state.is_animating);
    assert_eq!(state.position, Some(test_origin()));

    // Thirty seconds of animation later the vehicle has arrived.
    harness.engine.advance(30_000);
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "COMPLETED");

    let state = harness.engine.current_state();
    assert_eq!(state.progress, 1.0);
    assert_eq!(state.remaining_km, 0.0);
    assert!(!state.is_animating);
    assert_eq!(state.position, Some(test_target()));

    let trail = harness.engine.telemetry().status_trail();
    assert_eq!(
        trail,
        vec![
            RendezvousStatus::WaitingForCounterpart,
            RendezvousStatus::CounterpartConfirmed,
            RendezvousStatus::InProgress,
            RendezvousStatus::Completed,
        ]
    );
}

#[test]
fn manual_handoff_waits_for_the_caller() {
    let mut harness = TestEngineBuilder::new()
        .with_params(EngineParams::default().with_auto_begin_handoff(false))
        .build();
    harness.submit();
    harness.engine.start_polling().expect("polling starts");
    confirm_target(&harness.store, RECORD_ID, test_target(), "Tempelhofer Feld", 100);

    harness.engine.advance(3000);
    assert_eq!(
        harness.engine.status(),
        RendezvousStatus::CounterpartConfirmed
    );
    // Nothing has been animated yet.
    assert_eq!(harness.engine.current_state(), Default::default());

    harness.engine.begin_handoff().expect("handoff begins");
    assert_eq!(harness.engine.status(), RendezvousStatus::InProgress);
    assert!(harness.engine.current_state().is_animating);

    harness.engine.advance(30_000);
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);
}

#[test]
fn submit_fails_for_an_unknown_rental() {
    let store = InMemoryRecordStore::new();
    let mut engine = RendezvousEngine::new(EngineParams::default(), Arc::new(store));
    let (requester, counterpart) = test_parties();
    let err = engine
        .submit_request("missing", requester, counterpart, test_origin())
        .expect_err("submission must fail");
    assert_eq!(err, TransitionError::RecordNotFound("missing".to_string()));
}

#[test]
fn submit_twice_is_an_invalid_transition() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();

    let (requester, counterpart) = test_parties();
    let err = harness
        .engine
        .submit_request(RECORD_ID, requester, counterpart, test_origin())
        .expect_err("second submission must fail");
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));
}

#[test]
fn begin_handoff_requires_a_confirmed_target() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();

    let err = harness
        .engine
        .begin_handoff()
        .expect_err("handoff must be refused while waiting");
    assert_eq!(
        err,
        TransitionError::InvalidTransition {
            from: RendezvousStatus::WaitingForCounterpart,
            action: "begin handoff",
        }
    );
    // The refused attempt did not touch the record.
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "REQUESTED");
}

#[test]
fn complete_requires_an_in_progress_handoff() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();

    let err = harness
        .engine
        .complete()
        .expect_err("completion must be refused while waiting");
    assert!(matches!(err, TransitionError::InvalidTransition { .. }));
}

#[test]
fn terminal_states_refuse_further_transitions() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();
    harness.engine.start_polling().expect("polling starts");
    confirm_target(&harness.store, RECORD_ID, test_target(), "Tempelhofer Feld", 100);
    harness.engine.advance(3000);
    harness.engine.advance(30_000);
    assert_eq!(harness.engine.status(), RendezvousStatus::Completed);

    assert!(matches!(
        harness.engine.cancel(),
        Err(TransitionError::InvalidTransition { .. })
    ));
    assert!(matches!(
        harness.engine.complete(),
        Err(TransitionError::InvalidTransition { .. })
    ));
    assert!(matches!(
        harness.engine.begin_handoff(),
        Err(TransitionError::InvalidTransition { .. })
    ));
}

#[test]
fn cancellation_while_waiting_terminates_the_rendezvous() {
    let mut harness = TestEngineBuilder::new().build();
    harness.submit();
    harness.engine.start_polling().expect("polling starts");

    harness.engine.cancel().expect("cancellation succeeds");
    assert_eq!(harness.engine.status(), RendezvousStatus::Cancelled);
    let record = harness.store.get(RECORD_ID).expect("record");
    assert_eq!(record.status, "CANCELLED");

    // The stopped loop issues no further fetches.
    harness.engine.advance(30_000);
    assert_eq!(harness.engine.telemetry().polls_issued, 0);
}
