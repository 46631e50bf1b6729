//! Report pipeline: unbounded input queue, one registry worker, and
//! the outbound event queue.
//!
//! Producers only enqueue raw NDJSON lines; the single worker thread
//! owns the registry and the durable store, so all mutation is
//! serialized without locks. Consumers read owned event snapshots from
//! the sink channel. Both queues are unbounded — reports are idempotent
//! snapshots, so a stalled consumer costs memory, not correctness.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::warn;

use ais_core::identity::IdentityStore;
use ais_core::registry::{VesselEvent, VesselRegistry};
use ais_core::report::Report;

/// Outbound side of the event queue. The registry worker publishes
/// every event here; presentation consumes the paired receiver.
pub struct EventSink {
    tx: Sender<VesselEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, Receiver<VesselEvent>) {
        let (tx, rx) = mpsc::channel();
        (EventSink { tx }, rx)
    }

    /// Publish a batch in order. A hung-up consumer is not an error
    /// for the worker; the events are simply discarded.
    pub fn publish(&self, events: Vec<VesselEvent>) {
        for event in events {
            if self.tx.send(event).is_err() {
                return;
            }
        }
    }
}

/// Consume raw report lines until the input channel closes. Returns
/// the registry (for the caller's summary) and the count of lines the
/// upstream decoder produced that were not valid JSON objects.
pub fn run_worker<S: IdentityStore>(
    mut registry: VesselRegistry<S>,
    reports: Receiver<String>,
    sink: EventSink,
) -> (VesselRegistry<S>, u64) {
    let mut undecodable = 0u64;
    for line in reports {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match Report::from_json(line) {
            Ok(report) => sink.publish(registry.update(&report)),
            Err(e) => {
                warn!(error = %e, "dropping undecodable report line");
                undecodable += 1;
            }
        }
    }
    (registry, undecodable)
}

/// Spawn the single registry worker thread.
pub fn spawn_worker<S: IdentityStore + Send + 'static>(
    registry: VesselRegistry<S>,
    reports: Receiver<String>,
    sink: EventSink,
) -> JoinHandle<(VesselRegistry<S>, u64)> {
    thread::spawn(move || run_worker(registry, reports, sink))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use ais_core::geofence::{GeofenceEngine, Zone};
    use ais_core::identity::MemoryStore;
    use ais_core::types::Mmsi;

    fn registry() -> VesselRegistry<MemoryStore> {
        let geofence = GeofenceEngine::with_zones(vec![Zone {
            name: "Harbor".into(),
            lat: 51.50,
            lon: -0.12,
            radius_km: 5.0,
        }]);
        VesselRegistry::new(10, geofence, MemoryStore::new())
    }

    #[test]
    fn test_pipeline_end_to_end() {
        let (report_tx, report_rx) = mpsc::channel();
        let (sink, events) = EventSink::channel();
        let worker = spawn_worker(registry(), report_rx, sink);

        let lines = [
            // A enters the harbor: update + zone change
            r#"{"mmsi": 123456789, "msg_type": 1, "lat": 51.50, "lon": -0.12}"#,
            // garbage from the decoder: dropped, loop continues
            "not json",
            // invalid identifier: rejected by the registry
            r#"{"mmsi": 42, "msg_type": 1, "lat": 51.50, "lon": -0.12}"#,
            // A again, still inside: update only
            r#"{"mmsi": 123456789, "msg_type": 1, "lat": 51.501, "lon": -0.121}"#,
        ];
        for line in lines {
            report_tx.send(line.to_string()).unwrap();
        }
        drop(report_tx);

        let collected: Vec<VesselEvent> = events.iter().collect();
        assert_eq!(collected.len(), 3);
        assert!(matches!(collected[0], VesselEvent::Update(_)));
        assert!(matches!(
            collected[1],
            VesselEvent::ZoneChange { previous_zone: None, .. }
        ));
        assert!(matches!(collected[2], VesselEvent::Update(_)));

        let (registry, undecodable) = worker.join().unwrap();
        assert_eq!(undecodable, 1);
        assert_eq!(registry.accepted, 2);
        assert_eq!(registry.rejected, 1);
        assert!(registry.contains(Mmsi::new(123_456_789).unwrap()));
    }

    #[test]
    fn test_worker_survives_closed_sink() {
        let (report_tx, report_rx) = mpsc::channel();
        let (sink, events) = EventSink::channel();
        drop(events);

        let worker = spawn_worker(registry(), report_rx, sink);
        report_tx
            .send(r#"{"mmsi": 123456789, "msg_type": 1, "lat": 0.0, "lon": 0.0}"#.into())
            .unwrap();
        drop(report_tx);

        let (registry, _) = worker.join().unwrap();
        assert_eq!(registry.accepted, 1);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let (report_tx, report_rx) = mpsc::channel();
        let (sink, _events) = EventSink::channel();
        let worker = spawn_worker(registry(), report_rx, sink);

        report_tx.send("   ".into()).unwrap();
        report_tx.send(String::new()).unwrap();
        drop(report_tx);

        let (registry, undecodable) = worker.join().unwrap();
        assert_eq!(undecodable, 0);
        assert_eq!(registry.accepted, 0);
    }
}
