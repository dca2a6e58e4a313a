//! Encoded-polyline decoding: the 5-decimal fixed-point delta encoding used
//! by OSRM and the Google directions APIs.

use h3o::LatLng;

/// Decode an encoded polyline into lat/lng points.
///
/// Returns `None` on malformed input: a truncated value, a byte outside the
/// encoding alphabet, or deltas that accumulate to an invalid coordinate.
/// The empty string decodes to an empty point list.
pub fn decode_polyline(encoded: &str) -> Option<Vec<LatLng>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while idx < bytes.len() {
        let (dlat, next) = decode_signed_value(bytes, idx)?;
        let (dlng, after) = decode_signed_value(bytes, next)?;
        idx = after;
        lat += dlat;
        lng += dlng;
        let point = LatLng::new(lat as f64 * 1e-5, lng as f64 * 1e-5).ok()?;
        points.push(point);
    }

    Some(points)
}

/// Decode one zigzag-encoded value starting at `idx`, returning the value
/// and the index just past it.
fn decode_signed_value(bytes: &[u8], mut idx: usize) -> Option<(i64, usize)> {
    let mut accumulator: i64 = 0;
    let mut shift = 0;
    loop {
        let chunk = i64::from(*bytes.get(idx)?) - 63;
        if chunk < 0 || shift > 60 {
            return None;
        }
        accumulator |= (chunk & 0x1f) << shift;
        shift += 5;
        idx += 1;
        if chunk < 0x20 {
            break;
        }
    }
    let value = if accumulator & 1 == 1 {
        !(accumulator >> 1)
    } else {
        accumulator >> 1
    };
    Some((value, idx))
}
