//! Geographic helpers: Haversine distance and segment interpolation over
//! WGS84 lat/lng points.

use h3o::LatLng;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometres between two points.
pub fn distance_km_between_points(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Length in kilometres of a point sequence, measured segment by segment.
pub fn path_distance_km(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|pair| distance_km_between_points(pair[0], pair[1]))
        .sum()
}

/// Linear interpolation between `a` and `b` at `t` in [0, 1], component-wise
/// over latitude and longitude. Returns `None` only if the result is not a
/// valid coordinate, which cannot happen for valid inputs and in-range `t`.
pub fn lerp_point(a: LatLng, b: LatLng, t: f64) -> Option<LatLng> {
    // Exact at the endpoints: callers rely on t=0 and t=1 reproducing the
    // input points bit-for-bit.
    if t <= 0.0 {
        return Some(a);
    }
    if t >= 1.0 {
        return Some(b);
    }
    let lat = a.lat() + (b.lat() - a.lat()) * t;
    let lng = a.lng() + (b.lng() - a.lng()) * t;
    LatLng::new(lat, lng).ok()
}
