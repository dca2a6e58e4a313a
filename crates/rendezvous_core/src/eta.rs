//! Arrival estimates: mode-dependent average speeds and human-readable
//! durations.
//!
//! The speeds are policy constants chosen to be plausible city averages, not
//! a live traffic model; estimates derived from them are approximations.

use serde::{Deserialize, Serialize};

/// How a party travels to the rendezvous point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransportMode {
    Vehicle,
    PublicTransport,
    Walking,
}

impl TransportMode {
    /// Assumed average speed in km/h.
    pub fn average_speed_kmh(self) -> f64 {
        match self {
            TransportMode::Vehicle => 40.0,
            TransportMode::PublicTransport => 25.0,
            TransportMode::Walking => 5.0,
        }
    }
}

/// Estimated seconds to cover `distance_km` at the mode's average speed.
pub fn remaining_time_secs(distance_km: f64, mode: TransportMode) -> f64 {
    if distance_km <= 0.0 {
        return 0.0;
    }
    (distance_km / mode.average_speed_kmh()) * 3600.0
}

/// Render a duration as "H hours M minutes", "M minutes", or
/// "less than a minute". Negative inputs clamp to zero.
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let minutes = total_secs / 60;
    if minutes == 0 {
        "less than a minute".to_string()
    } else if minutes < 60 {
        format!("{} minutes", minutes)
    } else {
        format!("{} hours {} minutes", minutes / 60, minutes % 60)
    }
}
