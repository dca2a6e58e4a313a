//! Position-simulation state: what one animation step publishes and how it
//! is computed from a run.

use bevy_ecs::prelude::Resource;
use h3o::LatLng;

use crate::ecs::SimRun;
use crate::eta;
use crate::interpolate::position_at;

/// Published view of a simulation run at one step. Read by renderers; only
/// the step system writes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    /// Fraction of the route traversed, in [0, 1].
    pub progress: f64,
    pub position: Option<LatLng>,
    pub consumed: Vec<LatLng>,
    pub remaining: Vec<LatLng>,
    pub remaining_km: f64,
    pub remaining_time_secs: f64,
    pub is_animating: bool,
}

/// Fixed-step animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Resource)]
pub struct SimulationConfig {
    /// Number of steps from start to arrival.
    pub total_steps: u32,
    /// Wall-clock time between steps.
    pub step_ms: u64,
    /// GPS drift beyond this re-routes and restarts the animation.
    pub reanchor_threshold_km: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            total_steps: 30,
            step_ms: 1000,
            reanchor_threshold_km: 0.25,
        }
    }
}

/// Compute the state a run publishes at its current step.
///
/// The remaining distance is the linear share of the route's total,
/// `total × (1 − progress)`, forced to exactly zero on the terminal step.
pub fn state_at_step(run: &SimRun) -> SimulationState {
    let total = run.total_steps.max(1);
    let step = run.step.min(total);
    let progress = f64::from(step) / f64::from(total);
    let finished = step >= total;

    let interpolated = position_at(&run.route.points, progress);
    let remaining_km = if finished {
        0.0
    } else {
        (run.route.distance_km * (1.0 - progress)).max(0.0)
    };

    SimulationState {
        progress,
        position: interpolated.as_ref().map(|pos| pos.point),
        consumed: interpolated
            .as_ref()
            .map(|pos| pos.consumed.clone())
            .unwrap_or_default(),
        remaining: interpolated.map(|pos| pos.remaining).unwrap_or_default(),
        remaining_km,
        remaining_time_secs: eta::remaining_time_secs(remaining_km, run.mode),
        is_animating: !finished,
    }
}

/// Where simulation state is published for consumption: a renderer either
/// reads `state` directly or watches `updates` to detect new publishes.
#[derive(Debug, Default, Resource)]
pub struct SimulationFeed {
    pub state: SimulationState,
    /// Monotone publish counter.
    pub updates: u64,
}

impl SimulationFeed {
    pub fn publish(&mut self, state: SimulationState) {
        self.state = state;
        self.updates += 1;
    }
}
