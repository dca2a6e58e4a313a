//! Handoff start: routes the vehicle to the confirmed target and begins the
//! position animation.
//!
//! The route provider is queried inside the system; if it fails, the
//! straight-line path takes its place so the animation always has something
//! to move along. The routing outcome never blocks the lifecycle transition.

use bevy_ecs::prelude::{Commands, Query, Res, ResMut};

use crate::clock::{CurrentEvent, EngineClock, EventKind, EventSubject};
use crate::ecs::{ActiveRun, CurrentPosition, Rendezvous, SimRun};
use crate::lifecycle::{RendezvousStatus, RAW_IN_PROGRESS};
use crate::messaging::{open_channel, ChannelProviderResource};
use crate::routing::{route_or_straight_line, RouteProviderResource};
use crate::simulation::{state_at_step, SimulationConfig, SimulationFeed};
use crate::store::{write_raw_status, RecordStoreResource};
use crate::telemetry::EngineTelemetry;

#[allow(clippy::too_many_arguments)]
pub fn handoff_begin_system(
    mut commands: Commands,
    mut clock: ResMut<EngineClock>,
    event: Res<CurrentEvent>,
    store: Res<RecordStoreResource>,
    routes: Res<RouteProviderResource>,
    channels: Res<ChannelProviderResource>,
    config: Res<SimulationConfig>,
    mut feed: ResMut<SimulationFeed>,
    mut telemetry: ResMut<EngineTelemetry>,
    mut sessions: Query<(&mut Rendezvous, &CurrentPosition)>,
) {
    if event.0.kind != EventKind::HandoffRequested {
        return;
    }
    let Some(EventSubject::Session(entity)) = event.0.subject else {
        return;
    };
    let Ok((mut rendezvous, position)) = sessions.get_mut(entity) else {
        return;
    };

    if rendezvous.status != RendezvousStatus::CounterpartConfirmed {
        telemetry.invalid_transitions += 1;
        tracing::warn!(
            record_id = %rendezvous.record_id,
            status = ?rendezvous.status,
            "handoff requested out of order; ignoring"
        );
        return;
    }
    let Some(target) = rendezvous.target.clone() else {
        telemetry.invalid_transitions += 1;
        tracing::warn!(
            record_id = %rendezvous.record_id,
            "handoff requested without a target location; ignoring"
        );
        return;
    };

    let (route, fell_back) =
        route_or_straight_line(routes.0.as_ref(), position.0, target.point);
    if fell_back {
        telemetry.route_fallbacks += 1;
        tracing::warn!(
            record_id = %rendezvous.record_id,
            "routing unavailable; animating the straight-line path"
        );
    }

    let from = rendezvous.status;
    rendezvous.status = RendezvousStatus::InProgress;
    telemetry.record_transition(
        &rendezvous.record_id,
        from,
        RendezvousStatus::InProgress,
        clock.now(),
    );
    if let Err(err) = write_raw_status(store.0.as_ref(), &rendezvous.record_id, RAW_IN_PROGRESS) {
        // The local transition stands; the next poll from the other side
        // will catch up once the store recovers.
        tracing::warn!(record_id = %rendezvous.record_id, %err, "failed to persist handoff start");
    }

    open_channel(
        channels.0.as_ref(),
        &rendezvous.requester.id,
        &rendezvous.counterpart.id,
        &rendezvous.record_id,
        RAW_IN_PROGRESS,
    );

    let mut run = SimRun {
        session: entity,
        route,
        step: 0,
        total_steps: config.total_steps,
        // A zero step interval would spin the event loop.
        step_ms: config.step_ms.max(1),
        mode: rendezvous.requester.mode,
        active: true,
    };
    feed.publish(state_at_step(&run));
    run.step = 1;

    let step_ms = run.step_ms;
    let run_entity = commands.spawn(run).id();
    commands.entity(entity).insert(ActiveRun(run_entity));
    clock.schedule_in(
        step_ms,
        EventKind::SimStep,
        Some(EventSubject::Run(run_entity)),
    );
}
