use bevy_ecs::prelude::Resource;

use crate::clock::ONE_SEC_MS;
use crate::routing::RouteProviderKind;
use crate::simulation::SimulationConfig;

/// Default refresh interval while waiting for the counterpart.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 3;

/// Polling behavior while the rendezvous waits on the counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Resource)]
pub struct PollConfig {
    /// Time between remote-record refreshes.
    pub interval_ms: u64,
    /// When true, the first confirmed-with-target observation starts the
    /// handoff without a separate caller action.
    pub auto_begin_handoff: bool,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_SECS * ONE_SEC_MS,
            auto_begin_handoff: true,
        }
    }
}

/// Parameters for building a [`crate::engine::RendezvousEngine`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineParams {
    pub poll_interval_ms: u64,
    pub auto_begin_handoff: bool,
    pub total_steps: u32,
    pub step_ms: u64,
    pub reanchor_threshold_km: f64,
    /// Which routing backend to use. Defaults to the straight line.
    pub route_provider_kind: RouteProviderKind,
}

impl Default for EngineParams {
    fn default() -> Self {
        let poll = PollConfig::default();
        let sim = SimulationConfig::default();
        Self {
            poll_interval_ms: poll.interval_ms,
            auto_begin_handoff: poll.auto_begin_handoff,
            total_steps: sim.total_steps,
            step_ms: sim.step_ms,
            reanchor_threshold_km: sim.reanchor_threshold_km,
            route_provider_kind: RouteProviderKind::default(),
        }
    }
}

impl EngineParams {
    /// Set the record-refresh interval in seconds.
    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.poll_interval_ms = secs * ONE_SEC_MS;
        self
    }

    /// Whether a confirmed target observed by the poll loop starts the
    /// handoff automatically.
    pub fn with_auto_begin_handoff(mut self, enabled: bool) -> Self {
        self.auto_begin_handoff = enabled;
        self
    }

    /// Number of animation steps from start to arrival.
    pub fn with_total_steps(mut self, steps: u32) -> Self {
        self.total_steps = steps;
        self
    }

    /// Wall-clock milliseconds between animation steps.
    pub fn with_step_ms(mut self, step_ms: u64) -> Self {
        self.step_ms = step_ms;
        self
    }

    /// GPS drift beyond this distance re-routes and restarts the animation.
    pub fn with_reanchor_threshold_km(mut self, km: f64) -> Self {
        self.reanchor_threshold_km = km;
        self
    }

    /// Choose the routing backend.
    pub fn with_route_provider_kind(mut self, kind: RouteProviderKind) -> Self {
        self.route_provider_kind = kind;
        self
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval_ms: self.poll_interval_ms,
            auto_begin_handoff: self.auto_begin_handoff,
        }
    }

    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            total_steps: self.total_steps,
            step_ms: self.step_ms,
            reanchor_threshold_km: self.reanchor_threshold_km,
        }
    }
}
