//! Bounded most-recently-seen vessel registry.
//!
//! The orchestrator: merges each decoded report through the identity
//! store and the geofence engine, keeps at most `max_tracked` vessels
//! in memory, and returns the events the caller publishes to the
//! outbound queue. No error from one report can halt processing of the
//! next — validation and storage failures are logged and the report is
//! dropped.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::geofence::GeofenceEngine;
use crate::identity::{IdentityStore, StaticFacts};
use crate::report::{DynamicFields, Report};
use crate::types::{unix_now, Mmsi};

// ---------------------------------------------------------------------------
// Tracked state and events
// ---------------------------------------------------------------------------

/// The merged view of one vessel: durable identity, latest dynamic
/// state, current zone. Event payloads are owned clones of this, never
/// references into the live map.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TrackedVessel {
    pub statics: StaticFacts,
    pub dynamics: DynamicFields,
    /// Name of the zone currently containing the vessel, if any.
    pub zone: Option<String>,
    pub last_update: i64,
    // Insertion order, used only to break eviction ties between equal
    // timestamps.
    #[serde(skip)]
    seq: u64,
}

impl TrackedVessel {
    pub fn mmsi(&self) -> Mmsi {
        self.statics.mmsi
    }
}

/// Events emitted by the registry for the caller to publish.
#[derive(Debug, Clone)]
pub enum VesselEvent {
    /// Emitted for every accepted report.
    Update(TrackedVessel),
    /// Emitted when the vessel's zone differs from its previous value.
    ZoneChange {
        vessel: TrackedVessel,
        previous_zone: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Tracks vessels from decoded reports.
///
/// Single-writer by construction: one worker calls `update` at a time,
/// so there is no interior locking. Constructed once at startup with
/// an explicit capacity and the full zone list.
pub struct VesselRegistry<S: IdentityStore> {
    vessels: HashMap<Mmsi, TrackedVessel>,
    max_tracked: usize,
    geofence: GeofenceEngine,
    store: S,
    next_seq: u64,

    // Counters
    pub accepted: u64,
    pub rejected: u64,
    pub store_failures: u64,
    pub evicted: u64,
}

impl<S: IdentityStore> VesselRegistry<S> {
    pub fn new(max_tracked: usize, geofence: GeofenceEngine, store: S) -> Self {
        VesselRegistry {
            vessels: HashMap::new(),
            max_tracked,
            geofence,
            store,
            next_seq: 0,
            accepted: 0,
            rejected: 0,
            store_failures: 0,
            evicted: 0,
        }
    }

    /// Process one decoded report with the wall clock.
    pub fn update(&mut self, report: &Report) -> Vec<VesselEvent> {
        self.update_at(report, unix_now())
    }

    /// Process one decoded report at an explicit timestamp.
    pub fn update_at(&mut self, report: &Report, now: i64) -> Vec<VesselEvent> {
        // 1-2. Validate the identifier and split static from dynamic.
        let classified = match report.classify() {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "skipping report");
                self.rejected += 1;
                return Vec::new();
            }
        };
        let mmsi = classified.mmsi;

        // 3-4. Record identity; a storage failure drops the report so a
        // partial record never reaches the tracked state.
        let statics = match self
            .store
            .upsert(&classified.statics, classified.has_static(), now)
        {
            Ok(row) => row,
            Err(e) => {
                warn!(%mmsi, error = %e, "identity upsert failed, dropping report");
                self.store_failures += 1;
                return Vec::new();
            }
        };

        // 5-6. Previous zone, then the new one if this report carries a
        // position; otherwise the zone is carried forward unchanged.
        let previous = self.vessels.get(&mmsi);
        let previous_zone = previous.and_then(|v| v.zone.clone());
        let seq = match previous {
            Some(v) => v.seq,
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        let zone = if classified.dynamics.has_position() {
            // has_position guarantees both coordinates
            let (lat, lon) = (
                classified.dynamics.lat.unwrap_or_default(),
                classified.dynamics.lon.unwrap_or_default(),
            );
            self.geofence.locate(lat, lon).map(str::to_string)
        } else {
            previous_zone.clone()
        };

        // 7-8. Merge previous dynamics under the new report and replace
        // the entry.
        let mut dynamics = previous.map(|v| v.dynamics.clone()).unwrap_or_default();
        dynamics.merge_from(&classified.dynamics);
        let vessel = TrackedVessel {
            statics,
            dynamics,
            zone: zone.clone(),
            last_update: now,
            seq,
        };
        self.vessels.insert(mmsi, vessel.clone());

        // 9. Trim the working set back to capacity.
        self.trim();

        self.accepted += 1;
        info!(
            ship = %vessel.statics.name,
            %mmsi,
            zone = vessel.zone.as_deref().unwrap_or("-"),
            "vessel update"
        );

        // 10-11. Update always; zone change only on an actual change.
        let mut events = vec![VesselEvent::Update(vessel.clone())];
        if zone != previous_zone {
            events.push(VesselEvent::ZoneChange {
                vessel,
                previous_zone,
            });
        }
        events
    }

    /// Evict least-recently-updated entries until the map fits. Equal
    /// timestamps fall back to insertion order.
    fn trim(&mut self) {
        while self.vessels.len() > self.max_tracked {
            let oldest = self
                .vessels
                .iter()
                .min_by_key(|(_, v)| (v.last_update, v.seq))
                .map(|(mmsi, _)| *mmsi);
            match oldest {
                Some(mmsi) => {
                    self.vessels.remove(&mmsi);
                    self.evicted += 1;
                    debug!(%mmsi, "evicted from registry");
                }
                None => break,
            }
        }
    }

    pub fn len(&self) -> usize {
        self.vessels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vessels.is_empty()
    }

    pub fn contains(&self, mmsi: Mmsi) -> bool {
        self.vessels.contains_key(&mmsi)
    }

    /// Owned snapshot of one vessel, safe to hand to other workers.
    pub fn snapshot(&self, mmsi: Mmsi) -> Option<TrackedVessel> {
        self.vessels.get(&mmsi).cloned()
    }

    /// All tracked vessels, most recently updated first.
    pub fn snapshot_all(&self) -> Vec<TrackedVessel> {
        let mut all: Vec<_> = self.vessels.values().cloned().collect();
        all.sort_by_key(|v| std::cmp::Reverse((v.last_update, v.seq)));
        all
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
