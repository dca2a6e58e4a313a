use bevy_ecs::prelude::{Component, Entity};
use h3o::LatLng;

use crate::eta::TransportMode;
use crate::lifecycle::RendezvousStatus;
use crate::routing::Route;

/// One side of a rendezvous: an externally-resolved identity plus how that
/// party travels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Party {
    pub id: String,
    pub mode: TransportMode,
}

impl Party {
    pub fn new(id: impl Into<String>, mode: TransportMode) -> Self {
        Self {
            id: id.into(),
            mode,
        }
    }
}

/// The agreed meeting point, set by the counterpart's confirmation.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetLocation {
    pub point: LatLng,
    pub address: String,
}

/// A rendezvous session: the local view of one rental's handoff negotiation.
///
/// `status` is always derived state; the remote record is the source of
/// truth and is only written through the lifecycle transitions.
#[derive(Debug, Clone, PartialEq, Component)]
pub struct Rendezvous {
    pub record_id: String,
    pub requester: Party,
    pub counterpart: Party,
    pub status: RendezvousStatus,
    pub target: Option<TargetLocation>,
    /// Engine-timeline milliseconds; `None` until the request is submitted.
    pub requested_at: Option<u64>,
    pub confirmed_at: Option<u64>,
}

/// Repeating remote-record refresh while the counterpart has not acted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct PollLoop {
    pub interval_ms: u64,
    /// Cleared by the loop itself on leaving the waiting state, or externally
    /// via stop; queued ticks for an inactive loop are no-ops.
    pub active: bool,
    pub next_fetch_seq: u64,
    pub last_applied_seq: Option<u64>,
    /// Ensures the confirmed-with-target observation starts at most one
    /// handoff.
    pub handoff_triggered: bool,
}

impl PollLoop {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            // A zero interval would spin the event loop.
            interval_ms: interval_ms.max(1),
            active: true,
            next_fetch_seq: 0,
            last_applied_seq: None,
            handoff_triggered: false,
        }
    }
}

/// One fixed-length animation run along a routed path. Spawned as its own
/// entity so a superseded run can be deactivated while a fresh one starts.
#[derive(Debug, Clone, Component)]
pub struct SimRun {
    pub session: Entity,
    pub route: Route,
    /// The step the next tick will publish; step 0 is published when the run
    /// starts.
    pub step: u32,
    pub total_steps: u32,
    pub step_ms: u64,
    pub mode: TransportMode,
    pub active: bool,
}

/// Points at the session's current simulation run, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Component)]
pub struct ActiveRun(pub Entity);

/// Last known position of the tracked vehicle. Updated by GPS re-anchoring;
/// read when a route is computed.
#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct CurrentPosition(pub LatLng);
