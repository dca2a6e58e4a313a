//! Terminal lifecycle transition when the animation arrives at the target.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EngineClock, EventKind, EventSubject};
use crate::ecs::Rendezvous;
use crate::lifecycle::{RendezvousStatus, RAW_COMPLETED};
use crate::store::{write_raw_status, RecordStoreResource};
use crate::telemetry::EngineTelemetry;

pub fn handoff_completed_system(
    clock: Res<EngineClock>,
    event: Res<CurrentEvent>,
    store: Res<RecordStoreResource>,
    mut telemetry: ResMut<EngineTelemetry>,
    mut sessions: Query<&mut Rendezvous>,
) {
    if event.0.kind != EventKind::HandoffCompleted {
        return;
    }
    let Some(EventSubject::Session(entity)) = event.0.subject else {
        return;
    };
    let Ok(mut rendezvous) = sessions.get_mut(entity) else {
        return;
    };

    if rendezvous.status != RendezvousStatus::InProgress {
        telemetry.invalid_transitions += 1;
        return;
    }

    let from = rendezvous.status;
    rendezvous.status = RendezvousStatus::Completed;
    telemetry.record_transition(
        &rendezvous.record_id,
        from,
        RendezvousStatus::Completed,
        clock.now(),
    );
    if let Err(err) = write_raw_status(store.0.as_ref(), &rendezvous.record_id, RAW_COMPLETED) {
        tracing::warn!(record_id = %rendezvous.record_id, %err, "failed to persist completion");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::Event;
    use crate::ecs::Party;
    use crate::eta::TransportMode;
    use crate::lifecycle::RAW_IN_PROGRESS;
    use crate::store::{InMemoryRecordStore, RecordStore, RentalRecord};
    use bevy_ecs::prelude::{Entity, Schedule, World};
    use std::sync::Arc;

    fn setup(status: RendezvousStatus) -> (World, InMemoryRecordStore, Entity) {
        let store = InMemoryRecordStore::new();
        store.seed(RentalRecord::new("rental-1", RAW_IN_PROGRESS));

        let mut world = World::new();
        world.insert_resource(EngineClock::default());
        world.insert_resource(EngineTelemetry::default());
        world.insert_resource(RecordStoreResource(Arc::new(store.clone())));
        let entity = world
            .spawn(Rendezvous {
                record_id: "rental-1".to_string(),
                requester: Party::new("renter-1", TransportMode::Vehicle),
                counterpart: Party::new("owner-1", TransportMode::Walking),
                status,
                target: None,
                requested_at: Some(0),
                confirmed_at: Some(0),
            })
            .id();
        (world, store, entity)
    }

    fn fire(world: &mut World, entity: Entity) {
        world.insert_resource(CurrentEvent(Event {
            timestamp: world.resource::<EngineClock>().now(),
            kind: EventKind::HandoffCompleted,
            subject: Some(EventSubject::Session(entity)),
        }));
        let mut schedule = Schedule::default();
        schedule.add_systems(handoff_completed_system);
        schedule.run(world);
    }

    #[test]
    fn completes_an_in_progress_handoff() {
        let (mut world, store, entity) = setup(RendezvousStatus::InProgress);
        fire(&mut world, entity);

        let rendezvous = world.get::<Rendezvous>(entity).expect("session");
        assert_eq!(rendezvous.status, RendezvousStatus::Completed);
        let record = store.get("rental-1").expect("record");
        assert_eq!(record.status, RAW_COMPLETED);
    }

    #[test]
    fn out_of_order_completion_is_a_counted_no_op() {
        let (mut world, store, entity) = setup(RendezvousStatus::WaitingForCounterpart);
        fire(&mut world, entity);

        let rendezvous = world.get::<Rendezvous>(entity).expect("session");
        assert_eq!(rendezvous.status, RendezvousStatus::WaitingForCounterpart);
        assert_eq!(world.resource::<EngineTelemetry>().invalid_transitions, 1);
        // The record is untouched.
        let record = store.get("rental-1").expect("record");
        assert_eq!(record.status, RAW_IN_PROGRESS);
    }

    #[test]
    fn a_second_completion_event_is_idempotent() {
        let (mut world, _store, entity) = setup(RendezvousStatus::InProgress);
        fire(&mut world, entity);
        fire(&mut world, entity);

        assert_eq!(world.resource::<EngineTelemetry>().invalid_transitions, 1);
        assert_eq!(world.resource::<EngineTelemetry>().transitions.len(), 1);
    }
}
