//! Startup configuration: capacity, database path, and the ordered
//! zone list.
//!
//! Loaded from a JSON preference file; zones can also be given as
//! `name,lat,lon,radius_km` specs, which the CLI passes through
//! `parse_zone_spec`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geofence::Zone;
use crate::types::{AisError, Result};

pub const DEFAULT_MAX_TRACKED: usize = 50;
pub const DEFAULT_DB_PATH: &str = "data/ais.db";

/// Configuration consumed by the tracking core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Capacity of the in-memory registry. Must be positive.
    #[serde(default = "default_max_tracked")]
    pub max_tracked: usize,
    /// SQLite database path for the durable identity store.
    #[serde(default = "default_db_path")]
    pub database: String,
    /// Geofence zones, in lookup order.
    #[serde(default)]
    pub zones: Vec<Zone>,
}

fn default_max_tracked() -> usize {
    DEFAULT_MAX_TRACKED
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.into()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            max_tracked: DEFAULT_MAX_TRACKED,
            database: DEFAULT_DB_PATH.into(),
            zones: Vec::new(),
        }
    }
}

impl TrackerConfig {
    /// Parse config from JSON text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_tracked == 0 {
            return Err(AisError::Config("max_tracked must be positive".into()));
        }
        for zone in &self.zones {
            if zone.radius_km < 0.0 {
                return Err(AisError::Config(format!(
                    "zone `{}` has a negative radius",
                    zone.name
                )));
            }
        }
        Ok(())
    }
}

/// Parse a `name,lat,lon,radius_km` zone spec. Surrounding parentheses
/// and whitespace are tolerated.
pub fn parse_zone_spec(spec: &str) -> Result<Zone> {
    let trimmed = spec.trim().trim_start_matches('(').trim_end_matches(')');
    let parts: Vec<&str> = trimmed.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(AisError::Config(format!(
            "zone spec `{spec}` must be name,lat,lon,radius_km"
        )));
    }
    let name = parts[0].to_string();
    if name.is_empty() {
        return Err(AisError::Config(format!("zone spec `{spec}` has no name")));
    }
    let number = |label: &str, raw: &str| -> Result<f64> {
        raw.parse::<f64>()
            .map_err(|_| AisError::Config(format!("zone `{name}`: bad {label} `{raw}`")))
    };
    Ok(Zone {
        lat: number("latitude", parts[1])?,
        lon: number("longitude", parts[2])?,
        radius_km: number("radius", parts[3])?,
        name,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.max_tracked, DEFAULT_MAX_TRACKED);
        assert_eq!(config.database, DEFAULT_DB_PATH);
        assert!(config.zones.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let config = TrackerConfig::parse(
            r#"{
                "max_tracked": 25,
                "database": "/tmp/vessels.db",
                "zones": [
                    {"name": "Harbor", "lat": 51.5, "lon": -0.12, "radius_km": 5.0}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.max_tracked, 25);
        assert_eq!(config.database, "/tmp/vessels.db");
        assert_eq!(config.zones[0].name, "Harbor");
    }

    #[test]
    fn test_parse_applies_defaults() {
        let config = TrackerConfig::parse("{}").unwrap();
        assert_eq!(config.max_tracked, DEFAULT_MAX_TRACKED);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(TrackerConfig::parse(r#"{"max_tracked": 0}"#).is_err());
    }

    #[test]
    fn test_parse_zone_spec() {
        let zone = parse_zone_spec("Harbor, 51.5, -0.12, 5").unwrap();
        assert_eq!(zone.name, "Harbor");
        assert_eq!(zone.lat, 51.5);
        assert_eq!(zone.lon, -0.12);
        assert_eq!(zone.radius_km, 5.0);
    }

    #[test]
    fn test_parse_zone_spec_with_parens() {
        let zone = parse_zone_spec("(Dover,51.13,1.33,10)").unwrap();
        assert_eq!(zone.name, "Dover");
        assert_eq!(zone.radius_km, 10.0);
    }

    #[test]
    fn test_parse_zone_spec_errors() {
        assert!(parse_zone_spec("Harbor,51.5,-0.12").is_err());
        assert!(parse_zone_spec("Harbor,abc,-0.12,5").is_err());
        assert!(parse_zone_spec(",51.5,-0.12,5").is_err());
    }

    #[test]
    fn test_config_roundtrip() {
        let config = TrackerConfig {
            max_tracked: 10,
            database: "x.db".into(),
            zones: vec![parse_zone_spec("Harbor,51.5,-0.12,5").unwrap()],
        };
        let text = serde_json::to_string(&config).unwrap();
        let parsed = TrackerConfig::parse(&text).unwrap();
        assert_eq!(parsed.max_tracked, 10);
        assert_eq!(parsed.zones.len(), 1);
    }
}
