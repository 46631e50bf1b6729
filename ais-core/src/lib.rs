//! ais-core: vessel registry and geofence engine for decoded AIS
//! reports.
//!
//! No I/O of its own — the durable store comes in through the
//! `IdentityStore` trait, and `VesselRegistry::update` returns the
//! events for the caller to publish. This crate is the shared core
//! used by the `ais-server` daemon.

pub mod config;
pub mod geofence;
pub mod identity;
pub mod registry;
pub mod report;
pub mod types;

// Re-export commonly used types at crate root
pub use geofence::{GeofenceEngine, Zone};
pub use identity::{IdentityStore, MemoryStore, StaticFacts};
pub use registry::{TrackedVessel, VesselEvent, VesselRegistry};
pub use report::{ClassifiedReport, DynamicFields, Report, StaticFields};
pub use types::{unix_now, AisError, Mmsi, StorageError};
