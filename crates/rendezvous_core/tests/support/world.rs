#![allow(dead_code)]

use std::sync::Arc;

use rendezvous_core::engine::RendezvousEngine;
use rendezvous_core::params::EngineParams;
use rendezvous_core::routing::RouteProvider;
use rendezvous_core::store::InMemoryRecordStore;
use rendezvous_core::test_helpers::{seeded_store, test_origin, test_parties};

pub const RECORD_ID: &str = "rental-1";

/// Builder that wires an engine to a seeded in-memory store, keeping a store
/// handle so tests can act as the counterpart.
pub struct TestEngineBuilder {
    params: EngineParams,
    provider: Option<Box<dyn RouteProvider>>,
}

impl Default for TestEngineBuilder {
    fn default() -> Self {
        Self {
            params: EngineParams::default(),
            provider: None,
        }
    }
}

impl TestEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(mut self, params: EngineParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_route_provider(mut self, provider: Box<dyn RouteProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn build(self) -> TestHarness {
        let store = seeded_store(RECORD_ID);
        let mut engine = RendezvousEngine::new(self.params, Arc::new(store.clone()));
        if let Some(provider) = self.provider {
            engine = engine.with_route_provider(provider);
        }
        TestHarness { engine, store }
    }
}

pub struct TestHarness {
    pub engine: RendezvousEngine,
    pub store: InMemoryRecordStore,
}

impl TestHarness {
    /// Submit the return request from the test origin with the stock
    /// parties.
    pub fn submit(&mut self) {
        let (requester, counterpart) = test_parties();
        self.engine
            .submit_request(RECORD_ID, requester, counterpart, test_origin())
            .expect("submitting the request should succeed");
    }
}
