//! OSRM `/route` client: two coordinates in, one routed path out.
//!
//! The HTTP call is blocking with a hard timeout so a stuck routing service
//! can never hang the caller. Parsing is a pure function over the serde
//! response structs; geometry arrives either as GeoJSON coordinates or as an
//! encoded polyline and both normalize to the same point sequence.

use h3o::LatLng;
use reqwest::{blocking::Client, Url};
use std::time::Duration;

use super::polyline::decode_polyline;
use super::{Route, RouteProvider};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors encountered while querying or parsing a route.
#[derive(Debug)]
pub enum RouteClientError {
    Http(reqwest::Error),
    Json(reqwest::Error),
    Api(String),
    NoRoute,
    InvalidGeometry,
}

impl From<reqwest::Error> for RouteClientError {
    fn from(err: reqwest::Error) -> Self {
        RouteClientError::Http(err)
    }
}

/// Thin HTTP client for OSRM route queries.
#[derive(Debug, Clone)]
pub struct OsrmRouteProvider {
    client: Client,
    endpoint: String,
}

impl OsrmRouteProvider {
    /// Create a client for the given OSRM endpoint (e.g. `http://localhost:5000`).
    pub fn new(endpoint: &str) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        }
    }

    /// Query one route between `from` and `to`.
    pub fn get_route(&self, from: LatLng, to: LatLng) -> Result<Route, RouteClientError> {
        let base = format!(
            "{}/route/v1/driving/{:.6},{:.6};{:.6},{:.6}",
            self.endpoint,
            from.lng(),
            from.lat(),
            to.lng(),
            to.lat(),
        );
        let mut url = Url::parse(&base)
            .map_err(|err| RouteClientError::Api(format!("failed to build OSRM URL: {}", err)))?;
        url.query_pairs_mut()
            .append_pair("overview", "full")
            .append_pair("geometries", "geojson");

        let response = self.client.get(url).send().map_err(RouteClientError::Http)?;
        let parsed: OsrmRouteResponse = response.json().map_err(RouteClientError::Json)?;
        parse_route_response(parsed)
    }
}

impl RouteProvider for OsrmRouteProvider {
    fn route(&self, from: LatLng, to: LatLng) -> Option<Route> {
        match self.get_route(from, to) {
            Ok(route) => Some(route),
            Err(err) => {
                tracing::warn!(endpoint = %self.endpoint, ?err, "OSRM route query failed");
                None
            }
        }
    }
}

/// Minimal OSRM JSON response structures.
#[derive(serde::Deserialize)]
struct OsrmRouteResponse {
    code: String,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(serde::Deserialize)]
struct OsrmRoute {
    distance: f64, // metres
    duration: f64, // seconds
    geometry: OsrmGeometry,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum OsrmGeometry {
    Encoded(String),
    GeoJson(OsrmLineString),
}

#[derive(serde::Deserialize)]
struct OsrmLineString {
    coordinates: Vec<[f64; 2]>, // [lng, lat]
}

fn parse_route_response(resp: OsrmRouteResponse) -> Result<Route, RouteClientError> {
    if resp.code != "Ok" {
        return Err(RouteClientError::Api(resp.code));
    }

    let route = resp
        .routes
        .and_then(|routes| routes.into_iter().next())
        .ok_or(RouteClientError::NoRoute)?;

    let points: Vec<LatLng> = match route.geometry {
        OsrmGeometry::Encoded(encoded) => {
            decode_polyline(&encoded).ok_or(RouteClientError::InvalidGeometry)?
        }
        OsrmGeometry::GeoJson(line) => line
            .coordinates
            .iter()
            .filter_map(|c| LatLng::new(c[1], c[0]).ok()) // OSRM returns [lng, lat]
            .collect(),
    };

    if points.len() < 2 {
        return Err(RouteClientError::NoRoute);
    }

    Ok(Route {
        points,
        distance_km: route.distance / 1000.0,
        duration_secs: route.duration,
    })
}
