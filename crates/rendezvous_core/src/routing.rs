//! Pluggable route providers: trait abstraction for routing backends.
//!
//! Two implementations, selectable via [`RouteProviderKind`]:
//!
//! - **`StraightLineProvider`**: the 2-point direct path with Haversine
//!   distance. Zero dependencies, and the fallback every caller degrades to
//!   when the routing service is unavailable.
//! - **`OsrmRouteProvider`** (feature `osrm`): calls a local/remote OSRM
//!   HTTP endpoint.
//!
//! The provider is stored as a `Box<dyn RouteProvider>` ECS resource,
//! constructed from `RouteProviderKind` when the engine is built.

use bevy_ecs::prelude::Resource;
use h3o::LatLng;
use serde::{Deserialize, Serialize};

use crate::eta::{self, TransportMode};
use crate::spatial::distance_km_between_points;

pub mod polyline;

#[cfg(feature = "osrm")]
pub mod osrm;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// A routed path between two coordinates. Immutable once built; discarded
/// and recomputed when the start or the target moves materially.
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    /// Lat/lng waypoints along the road, at least two.
    pub points: Vec<LatLng>,
    /// Road-network distance in kilometres.
    pub distance_km: f64,
    /// Free-flow travel time in seconds (from the service, or estimated).
    pub duration_secs: f64,
}

impl Route {
    /// The degenerate 2-point path between `from` and `to`, with duration
    /// estimated at the vehicle average speed.
    pub fn straight_line(from: LatLng, to: LatLng) -> Self {
        let distance_km = distance_km_between_points(from, to);
        Self {
            points: vec![from, to],
            distance_km,
            duration_secs: eta::remaining_time_secs(distance_km, TransportMode::Vehicle),
        }
    }
}

/// Which routing backend to use. Serializes so it can travel inside a saved
/// engine configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub enum RouteProviderKind {
    /// Direct 2-point path, zero external dependencies.
    #[default]
    StraightLine,
    /// OSRM HTTP endpoint (e.g. `"http://localhost:5000"`).
    #[cfg(feature = "osrm")]
    Osrm { endpoint: String },
}

/// Trait for routing backends. Implementations must be `Send + Sync` so the
/// provider can be stored as a shared ECS resource.
pub trait RouteProvider: Send + Sync {
    /// Compute a route between two coordinates. Returns `None` if the
    /// backend cannot produce one.
    fn route(&self, from: LatLng, to: LatLng) -> Option<Route>;
}

/// ECS resource wrapping a boxed route provider.
#[derive(Resource)]
pub struct RouteProviderResource(pub Box<dyn RouteProvider>);

/// Query the provider, degrading to the straight line when it fails. The
/// boolean reports whether the fallback was taken, so callers can count it.
pub fn route_or_straight_line(
    provider: &dyn RouteProvider,
    from: LatLng,
    to: LatLng,
) -> (Route, bool) {
    match provider.route(from, to) {
        Some(route) => (route, false),
        None => (Route::straight_line(from, to), true),
    }
}

// ---------------------------------------------------------------------------
// Straight-line provider (always available)
// ---------------------------------------------------------------------------

/// Routes along the direct line between the two coordinates.
pub struct StraightLineProvider;

impl RouteProvider for StraightLineProvider {
    fn route(&self, from: LatLng, to: LatLng) -> Option<Route> {
        Some(Route::straight_line(from, to))
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Cache key: both endpoints quantized to the 1e-5 degree grid the wire
/// format uses anyway.
type QuantizedPair = ((i64, i64), (i64, i64));

fn quantize(point: LatLng) -> (i64, i64) {
    (
        (point.lat() * 1e5).round() as i64,
        (point.lng() * 1e5).round() as i64,
    )
}

/// LRU-cached wrapper around any [`RouteProvider`].
///
/// On cache miss the inner provider is queried; on inner failure the
/// optional straight-line fallback is tried before returning `None`.
pub struct CachedRouteProvider {
    inner: Box<dyn RouteProvider>,
    cache: Mutex<LruCache<QuantizedPair, Route>>,
    fallback_to_straight_line: bool,
}

impl CachedRouteProvider {
    pub fn new(
        inner: Box<dyn RouteProvider>,
        capacity: usize,
        fallback_to_straight_line: bool,
    ) -> Self {
        Self {
            inner,
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity.max(1)).expect("cache capacity must be > 0"),
            )),
            fallback_to_straight_line,
        }
    }
}

impl RouteProvider for CachedRouteProvider {
    fn route(&self, from: LatLng, to: LatLng) -> Option<Route> {
        let key = (quantize(from), quantize(to));

        // Fast path: cache hit
        {
            let mut cache = self.cache.lock().ok()?;
            if let Some(cached) = cache.get(&key) {
                return Some(cached.clone());
            }
        }

        // Slow path: query inner provider
        let result = self.inner.route(from, to).or_else(|| {
            if self.fallback_to_straight_line {
                StraightLineProvider.route(from, to)
            } else {
                None
            }
        });

        // Store in cache
        if let Some(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }
}

// ---------------------------------------------------------------------------
// Factory: build a provider from RouteProviderKind
// ---------------------------------------------------------------------------

/// Default route cache capacity for remote providers.
#[cfg(feature = "osrm")]
const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 512;

/// Construct a boxed [`RouteProvider`] from a [`RouteProviderKind`]
/// descriptor.
///
/// - `StraightLine` is returned without caching (it is pure arithmetic).
/// - `Osrm` is wrapped in a [`CachedRouteProvider`] with straight-line
///   fallback on failure.
pub fn build_route_provider(kind: &RouteProviderKind) -> Box<dyn RouteProvider> {
    match kind {
        RouteProviderKind::StraightLine => Box::new(StraightLineProvider),

        #[cfg(feature = "osrm")]
        RouteProviderKind::Osrm { endpoint } => {
            let inner = Box::new(osrm::OsrmRouteProvider::new(endpoint));
            Box::new(CachedRouteProvider::new(
                inner,
                DEFAULT_ROUTE_CACHE_CAPACITY,
                true, // fall back to the straight line on OSRM failure
            ))
        }
    }
}
