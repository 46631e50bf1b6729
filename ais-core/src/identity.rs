//! Durable vessel identity: the `StaticFacts` row and the upsert
//! contract every identity store must honour.
//!
//! A row is created on first sighting and never deleted. Identity
//! columns are overwritten only when the caller allows a full update
//! (type-5 report); every accepted report refreshes `last_sight`. The
//! upsert must be atomic and must return the merged row, so the
//! registry can fold it into the tracked state.

use std::collections::HashMap;

use serde::Serialize;

use crate::report::StaticFields;
use crate::types::{Mmsi, StorageError};

/// Column defaults recorded when a type-5 report omits a field.
pub const DEFAULT_IMO: &str = "0";
pub const DEFAULT_NAME: &str = "Unknown";
pub const DEFAULT_CALLSIGN: &str = "????";
pub const DEFAULT_SHIP_TYPE: i64 = -1;

/// One durable row per vessel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StaticFacts {
    pub mmsi: Mmsi,
    pub imo: String,
    pub name: String,
    pub callsign: String,
    pub ship_type: i64,
    pub to_bow: i64,
    pub to_stern: i64,
    pub to_port: i64,
    pub to_starboard: i64,
    pub first_sight: i64,
    pub last_sight: i64,
}

impl StaticFacts {
    /// A default-filled row for a first sighting at `now`.
    pub fn from_fields(fields: &StaticFields, now: i64) -> Self {
        StaticFacts {
            mmsi: fields.mmsi,
            imo: fields.imo.clone().unwrap_or_else(|| DEFAULT_IMO.into()),
            name: fields
                .shipname
                .clone()
                .unwrap_or_else(|| DEFAULT_NAME.into()),
            callsign: fields
                .callsign
                .clone()
                .unwrap_or_else(|| DEFAULT_CALLSIGN.into()),
            ship_type: fields.ship_type.unwrap_or(DEFAULT_SHIP_TYPE),
            to_bow: fields.to_bow.unwrap_or(0),
            to_stern: fields.to_stern.unwrap_or(0),
            to_port: fields.to_port.unwrap_or(0),
            to_starboard: fields.to_starboard.unwrap_or(0),
            first_sight: now,
            last_sight: now,
        }
    }
}

/// The durable-store seam. Implementations: `MemoryStore` here and the
/// SQLite store in `ais-server`.
pub trait IdentityStore {
    /// Insert the vessel if unseen (`first_sight = last_sight = now`),
    /// otherwise update it: all identity columns when
    /// `allow_full_update` is true, only `last_sight` when it is false.
    ///
    /// Atomic — on error nothing is written and a typed error comes
    /// back; partial writes are never visible to a later call.
    fn upsert(
        &mut self,
        fields: &StaticFields,
        allow_full_update: bool,
        now: i64,
    ) -> Result<StaticFacts, StorageError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Non-persistent identity store. Used by tests and deployments that
/// do not need the registry to survive restarts.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: HashMap<Mmsi, StaticFacts>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, mmsi: Mmsi) -> Option<&StaticFacts> {
        self.rows.get(&mmsi)
    }
}

impl IdentityStore for MemoryStore {
    fn upsert(
        &mut self,
        fields: &StaticFields,
        allow_full_update: bool,
        now: i64,
    ) -> Result<StaticFacts, StorageError> {
        let row = self
            .rows
            .entry(fields.mmsi)
            .and_modify(|row| {
                if allow_full_update {
                    let fresh = StaticFacts::from_fields(fields, now);
                    row.imo = fresh.imo;
                    row.name = fresh.name;
                    row.callsign = fresh.callsign;
                    row.ship_type = fresh.ship_type;
                    row.to_bow = fresh.to_bow;
                    row.to_stern = fresh.to_stern;
                    row.to_port = fresh.to_port;
                    row.to_starboard = fresh.to_starboard;
                }
                row.last_sight = now;
            })
            .or_insert_with(|| StaticFacts::from_fields(fields, now));
        Ok(row.clone())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn mmsi() -> Mmsi {
        Mmsi::new(123_456_789).unwrap()
    }

    fn named_fields(name: &str) -> StaticFields {
        StaticFields {
            shipname: Some(name.into()),
            callsign: Some("H3RC".into()),
            ship_type: Some(70),
            ..StaticFields::bare(mmsi())
        }
    }

    #[test]
    fn test_insert_applies_defaults() {
        let mut store = MemoryStore::new();
        let row = store.upsert(&StaticFields::bare(mmsi()), false, 100).unwrap();
        assert_eq!(row.name, DEFAULT_NAME);
        assert_eq!(row.callsign, DEFAULT_CALLSIGN);
        assert_eq!(row.imo, DEFAULT_IMO);
        assert_eq!(row.ship_type, DEFAULT_SHIP_TYPE);
        assert_eq!(row.first_sight, 100);
        assert_eq!(row.last_sight, 100);
    }

    #[test]
    fn test_partial_update_touches_only_last_sight() {
        let mut store = MemoryStore::new();
        store.upsert(&named_fields("EVER GIVEN"), true, 100).unwrap();

        // A later non-static report must not erase identity columns,
        // even though its static subset is empty.
        let row = store.upsert(&StaticFields::bare(mmsi()), false, 200).unwrap();
        assert_eq!(row.name, "EVER GIVEN");
        assert_eq!(row.callsign, "H3RC");
        assert_eq!(row.first_sight, 100);
        assert_eq!(row.last_sight, 200);
    }

    #[test]
    fn test_full_update_overwrites_identity() {
        let mut store = MemoryStore::new();
        store.upsert(&named_fields("OLD NAME"), true, 100).unwrap();
        let row = store.upsert(&named_fields("NEW NAME"), true, 200).unwrap();
        assert_eq!(row.name, "NEW NAME");
        assert_eq!(row.first_sight, 100);
        assert_eq!(row.last_sight, 200);
    }

    #[test]
    fn test_rows_never_deleted() {
        let mut store = MemoryStore::new();
        store.upsert(&named_fields("A"), true, 1).unwrap();
        let other = StaticFields::bare(Mmsi::new(987_654_321).unwrap());
        store.upsert(&other, false, 2).unwrap();
        assert_eq!(store.len(), 2);
    }
}
