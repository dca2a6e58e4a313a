//! The engine facade: owns the world and schedule, exposes the lifecycle
//! operations, and pumps wall time into the event loop.
//!
//! One engine drives one rendezvous session. The polling loop and the
//! position animation are cooperative tasks on the engine clock; each has an
//! explicit stop that takes effect before its next tick. The caller advances
//! the engine with [`RendezvousEngine::advance`] (live use) or
//! [`RendezvousEngine::run_until_idle`] (tests, batch).

use std::sync::Arc;

use bevy_ecs::prelude::{Entity, Schedule, World};
use h3o::LatLng;

use crate::clock::{EngineClock, EventKind, EventSubject};
use crate::ecs::{ActiveRun, CurrentPosition, Party, PollLoop, Rendezvous, SimRun};
use crate::lifecycle::{
    observe_remote_state, RendezvousStatus, TransitionError, RAW_CANCELLED, RAW_REQUESTED,
};
use crate::messaging::{open_channel, ChannelProvider, ChannelProviderResource, NoopChannelProvider};
use crate::params::{EngineParams, PollConfig};
use crate::routing::{build_route_provider, route_or_straight_line, RouteProvider, RouteProviderResource};
use crate::runner::{rendezvous_schedule, run_next_event_with_hook};
use crate::simulation::{state_at_step, SimulationConfig, SimulationFeed, SimulationState};
use crate::spatial::distance_km_between_points;
use crate::store::{write_raw_status, RecordStore, RecordStoreResource};
use crate::telemetry::EngineTelemetry;

/// Handle to a started polling loop; pass it back to
/// [`RendezvousEngine::stop_polling`] to cancel before the next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollHandle {
    entity: Entity,
}

type StateCallback = Box<dyn FnMut(&SimulationState) + Send>;

pub struct RendezvousEngine {
    pub world: World,
    pub schedule: Schedule,
    session: Option<Entity>,
    callbacks: Vec<StateCallback>,
    last_seen_update: u64,
}

impl RendezvousEngine {
    pub fn new(params: EngineParams, store: Arc<dyn RecordStore>) -> Self {
        let mut world = World::new();
        world.insert_resource(EngineClock::default());
        world.insert_resource(EngineTelemetry::default());
        world.insert_resource(SimulationFeed::default());
        world.insert_resource(params.poll_config());
        world.insert_resource(params.simulation_config());
        world.insert_resource(RouteProviderResource(build_route_provider(
            &params.route_provider_kind,
        )));
        world.insert_resource(RecordStoreResource(store));
        world.insert_resource(ChannelProviderResource(Arc::new(NoopChannelProvider)));

        Self {
            world,
            schedule: rendezvous_schedule(),
            session: None,
            callbacks: Vec::new(),
            last_seen_update: 0,
        }
    }

    /// Replace the messaging backend.
    pub fn with_channel_provider(mut self, provider: Arc<dyn ChannelProvider>) -> Self {
        self.world
            .insert_resource(ChannelProviderResource(provider));
        self
    }

    /// Replace the routing backend with an arbitrary provider.
    pub fn with_route_provider(mut self, provider: Box<dyn RouteProvider>) -> Self {
        self.world.insert_resource(RouteProviderResource(provider));
        self
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn session_entity(&self) -> Option<Entity> {
        self.session
    }

    /// Current derived lifecycle status.
    pub fn status(&self) -> RendezvousStatus {
        self.session
            .and_then(|entity| self.world.get::<Rendezvous>(entity))
            .map(|rendezvous| rendezvous.status)
            .unwrap_or(RendezvousStatus::NotRequested)
    }

    /// Latest published simulation state.
    pub fn current_state(&self) -> SimulationState {
        self.world.resource::<SimulationFeed>().state.clone()
    }

    /// Register a callback invoked after every published simulation update.
    pub fn subscribe(&mut self, callback: impl FnMut(&SimulationState) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
    }

    pub fn telemetry(&self) -> &EngineTelemetry {
        self.world.resource::<EngineTelemetry>()
    }

    /// Milliseconds until the next scheduled tick, if any. Lets a live
    /// caller sleep exactly as long as needed between [`advance`] calls.
    ///
    /// [`advance`]: RendezvousEngine::advance
    pub fn next_event_in_ms(&self) -> Option<u64> {
        let clock = self.world.resource::<EngineClock>();
        clock
            .next_event_time()
            .map(|ts| ts.saturating_sub(clock.now()))
    }

    // -----------------------------------------------------------------------
    // Lifecycle operations
    // -----------------------------------------------------------------------

    /// Submit the rendezvous request. Valid only before any request exists;
    /// writes the raw status and request timestamp to the record and opens
    /// the party channel (channel failure never blocks the transition).
    pub fn submit_request(
        &mut self,
        record_id: &str,
        requester: Party,
        counterpart: Party,
        position: LatLng,
    ) -> Result<(), TransitionError> {
        let current = self.status();
        if self.session.is_some() {
            return Err(TransitionError::InvalidTransition {
                from: current,
                action: "submit request",
            });
        }

        let store = self.world.resource::<RecordStoreResource>().0.clone();
        let mut record = store.get(record_id)?;
        let remote = observe_remote_state(Some(&record));
        if remote != RendezvousStatus::NotRequested {
            return Err(TransitionError::InvalidTransition {
                from: remote,
                action: "submit request",
            });
        }

        let now = self.world.resource::<EngineClock>().now();
        record.status = RAW_REQUESTED.to_string();
        record.requested_at = Some(now);
        store.update(&record)?;

        self.world.resource_mut::<EngineTelemetry>().record_transition(
            record_id,
            RendezvousStatus::NotRequested,
            RendezvousStatus::WaitingForCounterpart,
            now,
        );

        let channels = self.world.resource::<ChannelProviderResource>().0.clone();
        open_channel(
            channels.as_ref(),
            &requester.id,
            &counterpart.id,
            record_id,
            RAW_REQUESTED,
        );

        let entity = self
            .world
            .spawn((
                Rendezvous {
                    record_id: record_id.to_string(),
                    requester,
                    counterpart,
                    status: RendezvousStatus::WaitingForCounterpart,
                    target: None,
                    requested_at: Some(now),
                    confirmed_at: None,
                },
                CurrentPosition(position),
            ))
            .id();
        self.session = Some(entity);
        Ok(())
    }

    /// Start the record-refresh loop. The first fetch happens one interval
    /// from now; the loop self-cancels once the derived status leaves
    /// waiting.
    pub fn start_polling(&mut self) -> Result<PollHandle, TransitionError> {
        let entity = self.require_session("start polling")?;
        let status = self.status();
        if status != RendezvousStatus::WaitingForCounterpart {
            return Err(TransitionError::InvalidTransition {
                from: status,
                action: "start polling",
            });
        }
        // One refresh chain per session; a second start while the loop runs
        // would double the fetch rate.
        if self
            .world
            .get::<PollLoop>(entity)
            .map_or(false, |poll| poll.active)
        {
            return Err(TransitionError::InvalidTransition {
                from: status,
                action: "start polling",
            });
        }

        let interval_ms = self.world.resource::<PollConfig>().interval_ms.max(1);
        self.world
            .entity_mut(entity)
            .insert(PollLoop::new(interval_ms));
        self.world.resource_mut::<EngineClock>().schedule_in(
            interval_ms,
            EventKind::PollTick,
            Some(EventSubject::Session(entity)),
        );
        Ok(PollHandle { entity })
    }

    /// Cancel the polling loop before its next tick.
    pub fn stop_polling(&mut self, handle: &PollHandle) {
        if let Some(mut poll) = self.world.get_mut::<PollLoop>(handle.entity) {
            poll.active = false;
        }
    }

    /// Begin the handoff: route to the confirmed target and start the
    /// animation. Valid only when the counterpart has confirmed and a full
    /// target location is present.
    pub fn begin_handoff(&mut self) -> Result<(), TransitionError> {
        let entity = self.require_session("begin handoff")?;
        let status = self.status();
        if status != RendezvousStatus::CounterpartConfirmed {
            return Err(TransitionError::InvalidTransition {
                from: status,
                action: "begin handoff",
            });
        }
        let has_target = self
            .world
            .get::<Rendezvous>(entity)
            .map_or(false, |rendezvous| rendezvous.target.is_some());
        if !has_target {
            return Err(TransitionError::MissingTarget);
        }

        self.world.resource_mut::<EngineClock>().schedule_in(
            0,
            EventKind::HandoffRequested,
            Some(EventSubject::Session(entity)),
        );
        self.pump_due_events();
        Ok(())
    }

    /// Complete the handoff ahead of (or at) arrival. Valid only while in
    /// progress; stops the animation.
    pub fn complete(&mut self) -> Result<(), TransitionError> {
        let entity = self.require_session("complete")?;
        let status = self.status();
        if status != RendezvousStatus::InProgress {
            return Err(TransitionError::InvalidTransition {
                from: status,
                action: "complete",
            });
        }

        self.deactivate_run(entity);
        self.world.resource_mut::<EngineClock>().schedule_in(
            0,
            EventKind::HandoffCompleted,
            Some(EventSubject::Session(entity)),
        );
        self.pump_due_events();
        Ok(())
    }

    /// Cancel the rendezvous from any non-terminal state. Stops both loops;
    /// no further simulation updates are published.
    pub fn cancel(&mut self) -> Result<(), TransitionError> {
        let entity = self.require_session("cancel")?;
        let status = self.status();
        if status.is_terminal() {
            return Err(TransitionError::InvalidTransition {
                from: status,
                action: "cancel",
            });
        }

        if let Some(mut poll) = self.world.get_mut::<PollLoop>(entity) {
            poll.active = false;
        }
        self.deactivate_run(entity);

        let record_id = {
            let mut rendezvous = self
                .world
                .get_mut::<Rendezvous>(entity)
                .expect("session entity always carries a Rendezvous");
            rendezvous.status = RendezvousStatus::Cancelled;
            rendezvous.record_id.clone()
        };
        let now = self.world.resource::<EngineClock>().now();
        self.world.resource_mut::<EngineTelemetry>().record_transition(
            &record_id,
            status,
            RendezvousStatus::Cancelled,
            now,
        );

        let store = self.world.resource::<RecordStoreResource>().0.clone();
        if let Err(err) = write_raw_status(store.as_ref(), &record_id, RAW_CANCELLED) {
            tracing::warn!(record_id = %record_id, %err, "failed to persist cancellation");
        }
        Ok(())
    }

    /// Feed a device GPS sample. Material drift from the animated position
    /// re-routes from the sample and restarts the animation; minor drift
    /// only updates the stored position.
    pub fn update_position(&mut self, position: LatLng) {
        let Some(entity) = self.session else {
            return;
        };

        if let Some(mut current) = self.world.get_mut::<CurrentPosition>(entity) {
            current.0 = position;
        }

        let Some(run_entity) = self.world.get::<ActiveRun>(entity).map(|run| run.0) else {
            return;
        };
        let run_is_active = self
            .world
            .get::<SimRun>(run_entity)
            .map_or(false, |run| run.active);
        if !run_is_active {
            return;
        }

        let threshold_km = self
            .world
            .resource::<SimulationConfig>()
            .reanchor_threshold_km;
        let animated = self.world.resource::<SimulationFeed>().state.position;
        let drifted = animated
            .map(|animated| distance_km_between_points(animated, position) > threshold_km)
            .unwrap_or(false);
        if !drifted {
            return;
        }

        let Some(target) = self
            .world
            .get::<Rendezvous>(entity)
            .and_then(|rendezvous| rendezvous.target.clone())
        else {
            return;
        };

        // Supersede the old run and animate a fresh route from the sample.
        let (route, fell_back) = {
            let provider = self.world.resource::<RouteProviderResource>();
            route_or_straight_line(provider.0.as_ref(), position, target.point)
        };
        if fell_back {
            self.world.resource_mut::<EngineTelemetry>().route_fallbacks += 1;
        }

        let (mode, step_ms, total_steps) = {
            let old = self
                .world
                .get_mut::<SimRun>(run_entity)
                .expect("active run entity always carries a SimRun");
            (old.mode, old.step_ms, old.total_steps)
        };
        self.world.despawn(run_entity);

        let mut run = SimRun {
            session: entity,
            route,
            step: 0,
            total_steps,
            step_ms,
            mode,
            active: true,
        };
        {
            let state = state_at_step(&run);
            self.world.resource_mut::<SimulationFeed>().publish(state);
        }
        run.step = 1;
        let new_run = self.world.spawn(run).id();
        self.world.entity_mut(entity).insert(ActiveRun(new_run));
        self.world.resource_mut::<EngineClock>().schedule_in(
            step_ms,
            EventKind::SimStep,
            Some(EventSubject::Run(new_run)),
        );
        self.dispatch_pending_state();
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Advance the engine by `elapsed_ms` of wall time, processing every
    /// event that falls due.
    pub fn advance(&mut self, elapsed_ms: u64) {
        let deadline = self.world.resource::<EngineClock>().now() + elapsed_ms;
        loop {
            let due = self
                .world
                .resource::<EngineClock>()
                .next_event_time()
                .map_or(false, |ts| ts <= deadline);
            if !due || !self.step_once() {
                break;
            }
        }
        self.world
            .resource_mut::<EngineClock>()
            .advance_to(deadline);
    }

    /// Process events until the queue drains or `max_steps` is reached.
    /// Returns the number of events processed.
    pub fn run_until_idle(&mut self, max_steps: usize) -> usize {
        let mut steps = 0;
        while steps < max_steps && self.step_once() {
            steps += 1;
        }
        steps
    }

    /// Process everything scheduled at or before the current instant.
    fn pump_due_events(&mut self) {
        loop {
            let now = self.world.resource::<EngineClock>().now();
            let due = self
                .world
                .resource::<EngineClock>()
                .next_event_time()
                .map_or(false, |ts| ts <= now);
            if !due || !self.step_once() {
                break;
            }
        }
    }

    fn step_once(&mut self) -> bool {
        let callbacks = &mut self.callbacks;
        let last_seen = &mut self.last_seen_update;
        run_next_event_with_hook(&mut self.world, &mut self.schedule, |world, _event| {
            let feed = world.resource::<SimulationFeed>();
            if feed.updates != *last_seen {
                *last_seen = feed.updates;
                for callback in callbacks.iter_mut() {
                    callback(&feed.state);
                }
            }
        })
    }

    /// Notify subscribers of a state published outside the event loop.
    fn dispatch_pending_state(&mut self) {
        let feed = self.world.resource::<SimulationFeed>();
        if feed.updates != self.last_seen_update {
            self.last_seen_update = feed.updates;
            let state = feed.state.clone();
            for callback in self.callbacks.iter_mut() {
                callback(&state);
            }
        }
    }

    fn deactivate_run(&mut self, entity: Entity) {
        let Some(run_entity) = self.world.get::<ActiveRun>(entity).map(|run| run.0) else {
            return;
        };
        if let Some(mut run) = self.world.get_mut::<SimRun>(run_entity) {
            run.active = false;
        }
    }

    fn require_session(&self, action: &'static str) -> Result<Entity, TransitionError> {
        self.session
            .ok_or(TransitionError::InvalidTransition {
                from: RendezvousStatus::NotRequested,
                action,
            })
    }
}
