use std::cmp::Ordering;
use std::collections::BinaryHeap;

use bevy_ecs::prelude::{Entity, Resource};

pub const ONE_SEC_MS: u64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventKind {
    PollTick,
    HandoffRequested,
    SimStep,
    HandoffCompleted,
}

/// Entity the event is addressed to: the rendezvous session itself or one
/// simulation run spawned for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSubject {
    Session(Entity),
    Run(Entity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub timestamp: u64,
    pub kind: EventKind,
    pub subject: Option<EventSubject>,
}

impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap a min-heap by timestamp.
        other
            .timestamp
            .cmp(&self.timestamp)
            .then_with(|| self.kind.cmp(&other.kind))
            .then_with(|| self.subject.cmp(&other.subject))
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The event currently being processed, inserted by the runner before each
/// schedule pass.
#[derive(Debug, Clone, Copy, Resource)]
pub struct CurrentEvent(pub Event);

/// Engine clock: milliseconds on a timeline the caller advances 1:1 with
/// wall time, plus a min-heap of pending events.
#[derive(Debug, Default, Resource)]
pub struct EngineClock {
    now: u64,
    events: BinaryHeap<Event>,
}

impl EngineClock {
    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn schedule(&mut self, event: Event) {
        debug_assert!(
            event.timestamp >= self.now,
            "event timestamp must be >= current time"
        );
        self.events.push(event);
    }

    pub fn schedule_at(&mut self, timestamp: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule(Event {
            timestamp,
            kind,
            subject,
        });
    }

    pub fn schedule_in(&mut self, delay_ms: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_at(self.now + delay_ms, kind, subject);
    }

    pub fn schedule_in_secs(&mut self, secs: u64, kind: EventKind, subject: Option<EventSubject>) {
        self.schedule_in(secs * ONE_SEC_MS, kind, subject);
    }

    pub fn pop_next(&mut self) -> Option<Event> {
        let event = self.events.pop()?;
        self.now = event.timestamp;
        Some(event)
    }

    pub fn next_event_time(&self) -> Option<u64> {
        self.events.peek().map(|event| event.timestamp)
    }

    /// Move `now` forward to `timestamp` without processing anything, clamped
    /// so the clock never jumps past a pending event.
    pub fn advance_to(&mut self, timestamp: u64) {
        let limit = self
            .next_event_time()
            .map_or(timestamp, |next| timestamp.min(next));
        self.now = self.now.max(limit);
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
