//! Drive one early-return rendezvous end-to-end and print live progress.
//!
//! Run with: cargo run -p rendezvous_core --example rendezvous_run

use std::sync::Arc;

use rendezvous_core::ecs::Party;
use rendezvous_core::engine::RendezvousEngine;
use rendezvous_core::eta::{format_duration, TransportMode};
use rendezvous_core::lifecycle::RendezvousStatus;
use rendezvous_core::params::EngineParams;
use rendezvous_core::store::{InMemoryRecordStore, RecordStore, RentalRecord};
use rendezvous_core::test_helpers::{confirm_target, test_origin, test_target};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    const RECORD_ID: &str = "rental-42";

    // The record store both devices converge on; the demo plays the
    // counterpart by writing to a cloned handle.
    let store = InMemoryRecordStore::new();
    store.seed(RentalRecord::new(RECORD_ID, "ACTIVE"));

    let mut engine = RendezvousEngine::new(EngineParams::default(), Arc::new(store.clone()));
    engine.subscribe(|state| {
        let eta = format_duration(state.remaining_time_secs);
        let position = state
            .position
            .map(|p| format!("({:.5}, {:.5})", p.lat(), p.lng()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5.1}%  {:>7.3} km left  eta {:<22} at {}",
            state.progress * 100.0,
            state.remaining_km,
            eta,
            position,
        );
    });

    println!("--- Early return of {RECORD_ID} ---");
    engine
        .submit_request(
            RECORD_ID,
            Party::new("renter-7", TransportMode::Vehicle),
            Party::new("owner-3", TransportMode::Walking),
            test_origin(),
        )
        .expect("request submission should succeed");
    engine.start_polling().expect("polling should start");
    println!("request submitted; polling for the owner's confirmation");

    // Two refresh intervals pass before the owner answers.
    engine.advance(6000);
    println!(
        "t+6s: status {:?}, {} polls so far",
        engine.status(),
        engine.telemetry().polls_issued
    );

    confirm_target(&store, RECORD_ID, test_target(), "Tempelhofer Feld", 6500);
    println!("owner confirmed: Tempelhofer Feld");

    // The next refresh observes the confirmation and starts the drive.
    engine.advance(3000);
    println!("t+9s: status {:?}, driving to the return point", engine.status());

    let mut elapsed = 0;
    while engine.status() == RendezvousStatus::InProgress && elapsed < 60_000 {
        engine.advance(1000);
        elapsed += 1000;
    }

    println!("final status: {:?}", engine.status());
    let record = store.get(RECORD_ID).expect("record should exist");
    println!(
        "record: status={} requested_at={:?} confirmed_at={:?}",
        record.status, record.requested_at, record.confirmed_at
    );
    println!(
        "telemetry: {} polls, {} route fallbacks, {} transitions",
        engine.telemetry().polls_issued,
        engine.telemetry().route_fallbacks,
        engine.telemetry().transitions.len()
    );
}
