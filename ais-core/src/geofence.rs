//! Named circular geofence zones and point-in-zone resolution.
//!
//! `locate` is first-match in registration order, not nearest-match:
//! overlapping zones are resolved by configuration order. The zone set
//! is fixed once the engine is handed to the registry.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean Earth radius for great-circle distance.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A named circular zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    pub radius_km: f64,
}

/// Great-circle distance between two points in kilometres (haversine).
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlon / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Ordered list of zones with first-match lookup.
#[derive(Debug, Default)]
pub struct GeofenceEngine {
    zones: Vec<Zone>,
}

impl GeofenceEngine {
    pub fn new() -> Self {
        GeofenceEngine { zones: Vec::new() }
    }

    pub fn with_zones(zones: Vec<Zone>) -> Self {
        GeofenceEngine { zones }
    }

    /// Append a zone. Registration order is lookup order.
    pub fn add_zone(&mut self, zone: Zone) {
        self.zones.push(zone);
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Name of the first zone containing the point, if any.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<&str> {
        for zone in &self.zones {
            let distance = haversine_km(zone.lat, zone.lon, lat, lon);
            debug!(zone = %zone.name, distance_km = distance, radius_km = zone.radius_km);
            if distance <= zone.radius_km {
                return Some(&zone.name);
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
