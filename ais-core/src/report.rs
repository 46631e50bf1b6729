//! Decoded AIS reports and their static/dynamic classification.
//!
//! The upstream AIS decoder delivers each report as a flat JSON object.
//! `classify` is the pure function that splits it into the typed
//! `StaticFields` (identity data, only trusted on type-5 reports) and
//! `DynamicFields` (everything else), so the registry never does
//! string-keyed lookups of its own.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::{AisError, Mmsi, Result};

/// Report subtype that carries static voyage/identity data.
pub const STATIC_REPORT_TYPE: i64 = 5;

/// Keys consumed by the static subset (or decoder bookkeeping), and
/// therefore excluded from the dynamic subset.
const STATIC_KEYS: &[&str] = &[
    "mmsi",
    "msg_type",
    "sentences",
    "imo",
    "shipname",
    "callsign",
    "ship_type",
    "to_bow",
    "to_stern",
    "to_port",
    "to_starboard",
];

// ---------------------------------------------------------------------------
// Raw report
// ---------------------------------------------------------------------------

/// A decoded AIS report, as delivered by the external decoder.
#[derive(Debug, Clone, Default)]
pub struct Report(Map<String, Value>);

impl Report {
    /// Parse one NDJSON line from the decoder.
    pub fn from_json(line: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(line)?)
    }

    /// Wrap an already-parsed JSON value. Anything but an object is a
    /// validation error, never a panic.
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Report(map)),
            _ => Err(AisError::NotAnObject),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Split the raw mapping into typed static and dynamic subsets.
    ///
    /// Fails if the identifier is missing or invalid, or if the report
    /// type is absent — both are fatal for this report only.
    pub fn classify(&self) -> Result<ClassifiedReport> {
        let mmsi_value = self.0.get("mmsi").ok_or(AisError::MissingField("mmsi"))?;
        let mmsi = Mmsi::from_value(mmsi_value)?;
        let msg_type = self
            .0
            .get("msg_type")
            .and_then(Value::as_i64)
            .ok_or(AisError::MissingField("msg_type"))?;

        let statics = StaticFields {
            mmsi,
            imo: string_field(&self.0, "imo"),
            shipname: string_field(&self.0, "shipname"),
            callsign: string_field(&self.0, "callsign"),
            ship_type: int_field(&self.0, "ship_type"),
            to_bow: int_field(&self.0, "to_bow"),
            to_stern: int_field(&self.0, "to_stern"),
            to_port: int_field(&self.0, "to_port"),
            to_starboard: int_field(&self.0, "to_starboard"),
        };

        let mut dynamics = DynamicFields {
            lat: float_field(&self.0, "lat"),
            lon: float_field(&self.0, "lon"),
            speed: float_field(&self.0, "speed"),
            course: float_field(&self.0, "course"),
            heading: float_field(&self.0, "heading"),
            destination: string_field(&self.0, "destination"),
            status: int_field(&self.0, "status"),
            extra: BTreeMap::new(),
        };
        for (key, value) in &self.0 {
            if STATIC_KEYS.contains(&key.as_str()) || DYNAMIC_KEYS.contains(&key.as_str()) {
                continue;
            }
            dynamics.extra.insert(key.clone(), value.clone());
        }

        Ok(ClassifiedReport {
            mmsi,
            msg_type,
            statics,
            dynamics,
        })
    }
}

const DYNAMIC_KEYS: &[&str] = &[
    "lat",
    "lon",
    "speed",
    "course",
    "heading",
    "destination",
    "status",
];

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn int_field(map: &Map<String, Value>, key: &str) -> Option<i64> {
    map.get(key).and_then(Value::as_i64)
}

fn float_field(map: &Map<String, Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(Value::as_f64)
}

// ---------------------------------------------------------------------------
// Classified subsets
// ---------------------------------------------------------------------------

/// A report after classification: identifier, subtype, and the two
/// field subsets.
#[derive(Debug, Clone)]
pub struct ClassifiedReport {
    pub mmsi: Mmsi,
    pub msg_type: i64,
    pub statics: StaticFields,
    pub dynamics: DynamicFields,
}

impl ClassifiedReport {
    /// Only type-5 reports may overwrite identity columns.
    pub fn has_static(&self) -> bool {
        self.msg_type == STATIC_REPORT_TYPE
    }
}

/// The static (identity) subset of a report. Fields the report did not
/// carry stay `None`; the identity store fills in its defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticFields {
    pub mmsi: Mmsi,
    pub imo: Option<String>,
    pub shipname: Option<String>,
    pub callsign: Option<String>,
    pub ship_type: Option<i64>,
    pub to_bow: Option<i64>,
    pub to_stern: Option<i64>,
    pub to_port: Option<i64>,
    pub to_starboard: Option<i64>,
}

/// The dynamic subset: position and voyage data that changes report to
/// report, plus any decoder fields the core does not model (`extra`),
/// carried so merge-on-write loses nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DynamicFields {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    pub heading: Option<f64>,
    pub destination: Option<String>,
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, Value>,
}

impl DynamicFields {
    pub fn has_position(&self) -> bool {
        self.lat.is_some() && self.lon.is_some()
    }

    /// Merge a newer report's fields over this state. A field is
    /// overwritten only when the newer report carries it.
    pub fn merge_from(&mut self, newer: &DynamicFields) {
        if newer.lat.is_some() {
            self.lat = newer.lat;
        }
        if newer.lon.is_some() {
            self.lon = newer.lon;
        }
        if newer.speed.is_some() {
            self.speed = newer.speed;
        }
        if newer.course.is_some() {
            self.course = newer.course;
        }
        if newer.heading.is_some() {
            self.heading = newer.heading;
        }
        if newer.destination.is_some() {
            self.destination = newer.destination.clone();
        }
        if newer.status.is_some() {
            self.status = newer.status;
        }
        for (key, value) in &newer.extra {
            self.extra.insert(key.clone(), value.clone());
        }
    }
}

impl StaticFields {
    /// An empty static subset for a known identifier, as produced by
    /// reports that carry no identity data.
    pub fn bare(mmsi: Mmsi) -> Self {
        StaticFields {
            mmsi,
            imo: None,
            shipname: None,
            callsign: None,
            ship_type: None,
            to_bow: None,
            to_stern: None,
            to_port: None,
            to_starboard: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
