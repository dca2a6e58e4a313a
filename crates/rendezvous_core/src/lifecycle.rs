//! The rendezvous lifecycle: the closed status set, the single projection
//! from raw record fields to a derived status, and the transition errors.
//!
//! No other code path branches on raw status strings; everything that looks
//! at the remote record goes through [`observe_remote_state`].

use std::fmt;

use crate::store::{RentalRecord, StoreError};

/// Raw status strings as persisted on the rental record.
pub const RAW_REQUESTED: &str = "REQUESTED";
pub const RAW_IN_PROGRESS: &str = "IN_PROGRESS";
pub const RAW_COMPLETED: &str = "COMPLETED";
pub const RAW_CANCELLED: &str = "CANCELLED";

/// Derived lifecycle state of a rendezvous.
///
/// `NotRequested → WaitingForCounterpart → CounterpartConfirmed →
/// InProgress → {Completed | Cancelled}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendezvousStatus {
    NotRequested,
    WaitingForCounterpart,
    CounterpartConfirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl RendezvousStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RendezvousStatus::Completed | RendezvousStatus::Cancelled)
    }
}

/// Derive the lifecycle status from the remote record.
///
/// Total over every input: explicit terminal raw statuses map directly; a
/// submitted request maps to waiting unless the target triple is fully
/// populated, which means the counterpart has confirmed; no record, a blank
/// status, or an unrecognized one all mean no request is in flight. Pure --
/// the result depends on nothing but the record passed in.
pub fn observe_remote_state(record: Option<&RentalRecord>) -> RendezvousStatus {
    let Some(record) = record else {
        return RendezvousStatus::NotRequested;
    };
    match record.status.as_str() {
        RAW_COMPLETED => RendezvousStatus::Completed,
        RAW_CANCELLED => RendezvousStatus::Cancelled,
        RAW_IN_PROGRESS => RendezvousStatus::InProgress,
        RAW_REQUESTED => {
            if record.target_location().is_some() {
                RendezvousStatus::CounterpartConfirmed
            } else {
                RendezvousStatus::WaitingForCounterpart
            }
        }
        _ => RendezvousStatus::NotRequested,
    }
}

/// Why a lifecycle operation was refused. Invalid transitions are no-ops:
/// they never mutate the record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    InvalidTransition {
        from: RendezvousStatus,
        action: &'static str,
    },
    RecordNotFound(String),
    MissingTarget,
    Store(String),
}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::InvalidTransition { from, action } => {
                write!(f, "cannot {action} while in state {from:?}")
            }
            TransitionError::RecordNotFound(id) => {
                write!(f, "rental record '{id}' does not exist")
            }
            TransitionError::MissingTarget => {
                write!(f, "no target location has been set for this rendezvous")
            }
            TransitionError::Store(message) => write!(f, "{message}"),
        }
    }
}

impl From<StoreError> for TransitionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => TransitionError::RecordNotFound(id),
            other => TransitionError::Store(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested_record() -> RentalRecord {
        let mut record = RentalRecord::new("rental-1", RAW_REQUESTED);
        record.requested_at = Some(1_000);
        record
    }

    #[test]
    fn absent_record_derives_not_requested() {
        assert_eq!(observe_remote_state(None), RendezvousStatus::NotRequested);
    }

    #[test]
    fn unknown_or_blank_status_derives_not_requested() {
        let record = RentalRecord::new("rental-1", "ACTIVE");
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::NotRequested
        );
        let blank = RentalRecord::new("rental-1", "");
        assert_eq!(
            observe_remote_state(Some(&blank)),
            RendezvousStatus::NotRequested
        );
    }

    #[test]
    fn requested_without_target_is_waiting() {
        let record = requested_record();
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::WaitingForCounterpart
        );
    }

    #[test]
    fn requested_with_full_target_is_confirmed() {
        let mut record = requested_record();
        record.target_lat = Some(1.0);
        record.target_lon = Some(2.0);
        record.target_address = Some("X".to_string());
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::CounterpartConfirmed
        );
    }

    #[test]
    fn partially_populated_target_still_reads_as_waiting() {
        let mut record = requested_record();
        record.target_lat = Some(1.0);
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::WaitingForCounterpart
        );
        record.target_lon = Some(2.0);
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::WaitingForCounterpart
        );
    }

    #[test]
    fn invalid_coordinates_in_target_read_as_waiting() {
        let mut record = requested_record();
        record.target_lat = Some(95.0);
        record.target_lon = Some(2.0);
        record.target_address = Some("X".to_string());
        assert_eq!(
            observe_remote_state(Some(&record)),
            RendezvousStatus::WaitingForCounterpart
        );
    }

    #[test]
    fn terminal_raw_statuses_map_directly() {
        for (raw, expected) in [
            (RAW_IN_PROGRESS, RendezvousStatus::InProgress),
            (RAW_COMPLETED, RendezvousStatus::Completed),
            (RAW_CANCELLED, RendezvousStatus::Cancelled),
        ] {
            let record = RentalRecord::new("rental-1", raw);
            assert_eq!(observe_remote_state(Some(&record)), expected);
        }
    }

    #[test]
    fn projection_is_a_pure_function_of_the_record() {
        let mut record = requested_record();
        record.target_lat = Some(1.0);
        record.target_lon = Some(2.0);
        record.target_address = Some("X".to_string());
        let first = observe_remote_state(Some(&record));
        let second = observe_remote_state(Some(&record));
        assert_eq!(first, second);
        assert_eq!(first, RendezvousStatus::CounterpartConfirmed);
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(RendezvousStatus::Completed.is_terminal());
        assert!(RendezvousStatus::Cancelled.is_terminal());
        assert!(!RendezvousStatus::InProgress.is_terminal());
        assert!(!RendezvousStatus::NotRequested.is_terminal());
    }

    #[test]
    fn store_errors_convert_into_transition_errors() {
        let err: TransitionError = StoreError::NotFound("rental-9".to_string()).into();
        assert_eq!(err, TransitionError::RecordNotFound("rental-9".to_string()));

        let err: TransitionError = StoreError::Io("disk on fire".to_string()).into();
        assert!(matches!(err, TransitionError::Store(_)));
    }
}
