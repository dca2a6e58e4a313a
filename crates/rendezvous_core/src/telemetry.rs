//! Engine telemetry: lifecycle transitions and loop health counters.

use bevy_ecs::prelude::Resource;

use crate::lifecycle::RendezvousStatus;

/// One derived-status change, recorded when it is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRecord {
    pub record_id: String,
    pub from: RendezvousStatus,
    pub to: RendezvousStatus,
    /// Engine-timeline milliseconds.
    pub at_ms: u64,
}

/// Collects engine telemetry. Insert as a resource to record transitions and
/// counters; read it back after a run for assertions or export.
#[derive(Debug, Default, Resource)]
pub struct EngineTelemetry {
    pub transitions: Vec<TransitionRecord>,
    pub polls_issued: u64,
    pub stale_reads_discarded: u64,
    pub route_fallbacks: u64,
    pub invalid_transitions: u64,
}

impl EngineTelemetry {
    pub fn record_transition(
        &mut self,
        record_id: &str,
        from: RendezvousStatus,
        to: RendezvousStatus,
        at_ms: u64,
    ) {
        self.transitions.push(TransitionRecord {
            record_id: record_id.to_string(),
            from,
            to,
            at_ms,
        });
    }

    /// The statuses reached so far, in order.
    pub fn status_trail(&self) -> Vec<RendezvousStatus> {
        self.transitions.iter().map(|t| t.to).collect()
    }
}
