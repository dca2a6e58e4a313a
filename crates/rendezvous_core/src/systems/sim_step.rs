//! Simulation step: advances the animation one tick and publishes the new
//! state.
//!
//! Exactly one terminal update is published per run (progress 1, zero
//! remaining, not animating); it schedules the completion event. A
//! deactivated run publishes nothing, so cancellation is effective before
//! the next tick.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EngineClock, EventKind, EventSubject};
use crate::ecs::SimRun;
use crate::simulation::{state_at_step, SimulationFeed};

pub fn sim_step_system(
    mut clock: ResMut<EngineClock>,
    event: Res<CurrentEvent>,
    mut feed: ResMut<SimulationFeed>,
    mut runs: Query<&mut SimRun>,
) {
    if event.0.kind != EventKind::SimStep {
        return;
    }
    let Some(EventSubject::Run(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut run) = runs.get_mut(entity) else {
        return;
    };
    if !run.active {
        return;
    }

    let state = state_at_step(&run);
    let finished = !state.is_animating;
    feed.publish(state);

    if finished {
        run.active = false;
        clock.schedule_in(
            0,
            EventKind::HandoffCompleted,
            Some(EventSubject::Session(run.session)),
        );
    } else {
        run.step += 1;
        clock.schedule_in(
            run.step_ms,
            EventKind::SimStep,
            Some(EventSubject::Run(entity)),
        );
    }
}
