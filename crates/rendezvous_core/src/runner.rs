//! Event runner: advances the clock and routes events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each
//! step pops the next event from [`EngineClock`], inserts it as
//! [`CurrentEvent`], then runs the schedule.

use bevy_ecs::prelude::Res;
use bevy_ecs::prelude::{Schedule, World};
use bevy_ecs::schedule::{apply_deferred, IntoSystemConfigs};

use crate::clock::{CurrentEvent, EngineClock, Event, EventKind};
use crate::systems::{
    handoff_begin::handoff_begin_system, handoff_completed::handoff_completed_system,
    poll_tick::poll_tick_system, sim_step::sim_step_system,
};

// Condition functions for each event kind
fn is_poll_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::PollTick)
        .unwrap_or(false)
}

fn is_handoff_requested(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::HandoffRequested)
        .unwrap_or(false)
}

fn is_sim_step(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::SimStep)
        .unwrap_or(false)
}

fn is_handoff_completed(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::HandoffCompleted)
        .unwrap_or(false)
}

/// Runs one step: pops the next event, inserts it as [`CurrentEvent`], then
/// runs the schedule. Returns `true` if an event was processed.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<EngineClock>().pop_next() {
        Some(event) => event,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs one step and invokes `hook` after the schedule completes.
pub fn run_next_event_with_hook<F>(world: &mut World, schedule: &mut Schedule, mut hook: F) -> bool
where
    F: FnMut(&World, &Event),
{
    let event = match world.resource_mut::<EngineClock>().pop_next() {
        Some(event) => event,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    hook(world, &event);
    true
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the engine schedule: all event-reacting systems plus
/// [`apply_deferred`] so entities spawned by one event (a fresh simulation
/// run) are applied before the next.
///
/// Systems are conditionally executed based on event type to reduce
/// overhead.
pub fn rendezvous_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.add_systems((
        // PollTick
        poll_tick_system.run_if(is_poll_tick),
        // HandoffRequested
        handoff_begin_system.run_if(is_handoff_requested),
        // SimStep
        sim_step_system.run_if(is_sim_step),
        // HandoffCompleted
        handoff_completed_system.run_if(is_handoff_completed),
        // Always run apply_deferred so spawned entities are available
        apply_deferred,
    ));

    schedule
}
