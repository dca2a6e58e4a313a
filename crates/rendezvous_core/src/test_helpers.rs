//! Test helpers for common setup and utilities.
//!
//! Shared fixtures used across unit and integration tests: Berlin-area
//! coordinates, canned route providers, and a seeded in-memory store whose
//! cloned handle lets a test act as the counterpart.

use h3o::LatLng;

use crate::ecs::Party;
use crate::eta::TransportMode;
use crate::routing::{Route, RouteProvider};
use crate::store::{InMemoryRecordStore, RecordStore, RentalRecord};

/// Alexanderplatz, Berlin.
pub fn test_origin() -> LatLng {
    LatLng::new(52.5219, 13.4132).expect("test origin should be a valid coordinate")
}

/// Tempelhofer Feld, Berlin, a few kilometres south of the origin.
pub fn test_target() -> LatLng {
    LatLng::new(52.4731, 13.4036).expect("test target should be a valid coordinate")
}

/// A renter driving the vehicle and an owner on foot.
pub fn test_parties() -> (Party, Party) {
    (
        Party::new("renter-1", TransportMode::Vehicle),
        Party::new("owner-1", TransportMode::Walking),
    )
}

/// A store holding one rental that has not been requested for return yet.
pub fn seeded_store(record_id: &str) -> InMemoryRecordStore {
    let store = InMemoryRecordStore::new();
    store.seed(RentalRecord::new(record_id, "ACTIVE"));
    store
}

/// Play the counterpart: populate the target triple and confirmation time on
/// the shared record, the way the other device would.
pub fn confirm_target(
    store: &InMemoryRecordStore,
    record_id: &str,
    point: LatLng,
    address: &str,
    at_ms: u64,
) {
    let mut record = store.get(record_id).expect("record to confirm should exist");
    record.target_lat = Some(point.lat());
    record.target_lon = Some(point.lng());
    record.target_address = Some(address.to_string());
    record.confirmed_at = Some(at_ms);
    store
        .update(&record)
        .expect("confirming the target should succeed");
}

/// Route provider that always returns a clone of the given route.
pub struct FixedRouteProvider(pub Route);

impl RouteProvider for FixedRouteProvider {
    fn route(&self, _from: LatLng, _to: LatLng) -> Option<Route> {
        Some(self.0.clone())
    }
}

/// Route provider that always fails, for fallback tests.
pub struct FailingRouteProvider;

impl RouteProvider for FailingRouteProvider {
    fn route(&self, _from: LatLng, _to: LatLng) -> Option<Route> {
        None
    }
}

/// A three-leg route between the test origin and target, via a detour point.
pub fn test_route() -> Route {
    let via = LatLng::new(52.5000, 13.4300).expect("valid via point");
    let points = vec![test_origin(), via, test_target()];
    let distance_km = crate::spatial::path_distance_km(&points);
    Route {
        points,
        distance_km,
        duration_secs: 600.0,
    }
}
