//! Pure path interpolation: maps a normalized progress value to a position
//! on a point sequence, together with the consumed and remaining sub-paths.

use h3o::LatLng;

use crate::spatial::{lerp_point, path_distance_km};

/// Position on a path at some progress, with the sub-paths on either side.
///
/// `consumed` ends with the interpolated point and `remaining` starts with
/// it, so both sub-paths are drawable as-is. At progress 1 the remaining
/// sub-path is exactly the final point.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedPosition {
    pub point: LatLng,
    pub consumed: Vec<LatLng>,
    pub remaining: Vec<LatLng>,
}

impl InterpolatedPosition {
    /// Kilometres left along the remaining sub-path.
    pub fn remaining_distance_km(&self) -> f64 {
        path_distance_km(&self.remaining)
    }
}

/// Interpolate along `points` at `progress` in [0, 1] (clamped).
///
/// The fractional index is `progress × (N−1)`; the integer part selects the
/// segment (clamped to the last one) and the fractional part interpolates
/// linearly within it. Returns `None` for paths with fewer than two points.
pub fn position_at(points: &[LatLng], progress: f64) -> Option<InterpolatedPosition> {
    if points.len() < 2 {
        return None;
    }
    let progress = progress.clamp(0.0, 1.0);
    let fractional = progress * (points.len() - 1) as f64;
    let segment = (fractional.floor() as usize).min(points.len() - 2);
    let t = fractional - segment as f64;
    let point = lerp_point(points[segment], points[segment + 1], t)?;

    let mut consumed = points[..=segment].to_vec();
    if t > 0.0 {
        consumed.push(point);
    }
    let mut remaining = Vec::with_capacity(points.len() - segment);
    if t < 1.0 {
        remaining.push(point);
    }
    remaining.extend_from_slice(&points[segment + 1..]);

    Some(InterpolatedPosition {
        point,
        consumed,
        remaining,
    })
}
