//! Polling synchronizer: re-fetches the remote record on an interval while
//! the rendezvous waits on the counterpart.
//!
//! Each tick fetches the record, re-derives the status and reschedules
//! itself; the loop self-cancels the first time the derived status is
//! anything but waiting. Because every fetch runs inside the single event
//! loop, polls never overlap; the sequence counters additionally discard any
//! result older than the last applied one.

use bevy_ecs::prelude::{Query, Res, ResMut};

use crate::clock::{CurrentEvent, EngineClock, EventKind, EventSubject};
use crate::ecs::{PollLoop, Rendezvous};
use crate::lifecycle::{observe_remote_state, RendezvousStatus};
use crate::params::PollConfig;
use crate::store::{RecordStore, RecordStoreResource, StoreError};
use crate::telemetry::EngineTelemetry;

pub fn poll_tick_system(
    mut clock: ResMut<EngineClock>,
    event: Res<CurrentEvent>,
    store: Res<RecordStoreResource>,
    config: Res<PollConfig>,
    mut telemetry: ResMut<EngineTelemetry>,
    mut sessions: Query<(&mut Rendezvous, &mut PollLoop)>,
) {
    if event.0.kind != EventKind::PollTick {
        return;
    }
    let Some(EventSubject::Session(entity)) = event.0.subject else {
        return;
    };
    let Ok((mut rendezvous, mut poll)) = sessions.get_mut(entity) else {
        return;
    };
    if !poll.active {
        return;
    }

    let fetch_seq = poll.next_fetch_seq;
    poll.next_fetch_seq += 1;
    telemetry.polls_issued += 1;

    let fetched = match store.0.get(&rendezvous.record_id) {
        Ok(record) => Some(record),
        Err(StoreError::NotFound(_)) => None,
        Err(err) => {
            // Nothing was observed, so nothing is derived; try again later.
            tracing::warn!(record_id = %rendezvous.record_id, %err, "record fetch failed");
            clock.schedule_in(
                poll.interval_ms,
                EventKind::PollTick,
                Some(EventSubject::Session(entity)),
            );
            return;
        }
    };

    // A result issued before the latest applied one must not overwrite
    // newer state.
    if poll
        .last_applied_seq
        .map_or(false, |applied| fetch_seq < applied)
    {
        telemetry.stale_reads_discarded += 1;
        clock.schedule_in(
            poll.interval_ms,
            EventKind::PollTick,
            Some(EventSubject::Session(entity)),
        );
        return;
    }
    poll.last_applied_seq = Some(fetch_seq);

    let derived = observe_remote_state(fetched.as_ref());
    if derived != rendezvous.status {
        telemetry.record_transition(&rendezvous.record_id, rendezvous.status, derived, clock.now());
    }
    rendezvous.status = derived;
    if let Some(record) = fetched.as_ref() {
        rendezvous.target = record.target_location();
        rendezvous.confirmed_at = record.confirmed_at;
    }

    if derived == RendezvousStatus::WaitingForCounterpart {
        clock.schedule_in(
            poll.interval_ms,
            EventKind::PollTick,
            Some(EventSubject::Session(entity)),
        );
        return;
    }

    // Anything else ends the loop.
    poll.active = false;
    tracing::debug!(record_id = %rendezvous.record_id, status = ?derived, "poll loop finished");

    if derived == RendezvousStatus::CounterpartConfirmed
        && config.auto_begin_handoff
        && !poll.handoff_triggered
    {
        poll.handoff_triggered = true;
        clock.schedule_in(
            0,
            EventKind::HandoffRequested,
            Some(EventSubject::Session(entity)),
        );
    }
}
