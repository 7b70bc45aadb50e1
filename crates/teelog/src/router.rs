//! Fan-out of events to gated sinks.
//!
//! The [`Router`] owns one [`RouteEntry`] per bucket. For every event it asks
//! each entry's gate, then encodes and writes to every entry that accepts.
//! Failures stay inside the entry that hit them.

use std::sync::Arc;

use tracing::warn;

use crate::encoder::Encoder;
use crate::error::Result;
use crate::gate::{Bucket, LevelGate};
use crate::sink::RotatingSink;
use crate::types::{LogEvent, Severity};

/// A gate paired with the encoder and sink it guards.
#[derive(Clone)]
pub struct RouteEntry {
    gate: LevelGate,
    encoder: Arc<dyn Encoder>,
    sink: Arc<dyn RotatingSink>,
}

impl RouteEntry {
    /// Creates a route entry.
    #[must_use]
    pub fn new(gate: LevelGate, encoder: Arc<dyn Encoder>, sink: Arc<dyn RotatingSink>) -> Self {
        Self {
            gate,
            encoder,
            sink,
        }
    }

    /// Returns the entry's gate.
    #[must_use]
    pub const fn gate(&self) -> &LevelGate {
        &self.gate
    }

    /// Returns the bucket the entry delivers to.
    #[must_use]
    pub const fn bucket(&self) -> Bucket {
        self.gate.bucket()
    }

    /// Returns the entry's sink.
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn RotatingSink> {
        &self.sink
    }

    fn deliver(&self, event: &LogEvent) -> Result<()> {
        let record = self.encoder.encode(event)?;
        self.sink.write(&record)?;
        Ok(())
    }
}

impl std::fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteEntry")
            .field("gate", &self.gate)
            .field("path", &self.sink.path())
            .finish_non_exhaustive()
    }
}

/// Outcome of routing one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Entries that accepted and stored the event.
    pub delivered: usize,
    /// Entries that accepted the event but failed to store it.
    pub failed: usize,
}

impl Delivery {
    /// Returns true if no entry accepted the event.
    #[must_use]
    pub const fn is_dropped(&self) -> bool {
        self.delivered == 0 && self.failed == 0
    }
}

/// Immutable set of route entries.
#[derive(Debug, Default)]
pub struct Router {
    entries: Vec<RouteEntry>,
}

impl Router {
    /// Creates a router over `entries`, evaluated in the given order.
    #[must_use]
    pub fn new(entries: Vec<RouteEntry>) -> Self {
        Self { entries }
    }

    /// Returns the route entries.
    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Returns true if at least one entry accepts `severity`.
    #[must_use]
    pub fn accepts(&self, severity: Severity) -> bool {
        self.entries.iter().any(|e| e.gate.accepts(severity))
    }

    /// Delivers `event` to every accepting entry.
    ///
    /// Encode and write errors are logged and counted, never returned; one
    /// entry failing does not keep the event from the others.
    pub fn route(&self, event: &LogEvent) -> Delivery {
        let mut delivery = Delivery::default();
        for entry in self.entries.iter().filter(|e| e.gate.accepts(event.severity)) {
            match entry.deliver(event) {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    delivery.failed += 1;
                    warn!(
                        bucket = %entry.bucket(),
                        path = %entry.sink.path().display(),
                        error = %e,
                        "dropped log record"
                    );
                }
            }
        }
        delivery
    }

    /// Flushes every sink to stable storage.
    ///
    /// Returns the number of sinks that failed to flush.
    pub fn sync(&self) -> usize {
        let mut failed = 0;
        for entry in &self.entries {
            if let Err(e) = entry.sink.sync() {
                failed += 1;
                warn!(bucket = %entry.bucket(), error = %e, "failed to flush log sink");
            }
        }
        failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::JsonEncoder;
    use crate::error::LogError;
    use crate::gate::Mode;
    use crate::types::Caller;
    use parking_lot::Mutex;
    use std::path::{Path, PathBuf};

    /// In-memory sink recording every write.
    struct MemorySink {
        path: PathBuf,
        records: Mutex<Vec<Vec<u8>>>,
        fail: bool,
    }

    impl MemorySink {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                path: PathBuf::from(name),
                records: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                path: PathBuf::from(name),
                records: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn messages(&self) -> Vec<String> {
            self.records
                .lock()
                .iter()
                .map(|r| {
                    let value: serde_json::Value = serde_json::from_slice(r).expect("json");
                    value["msg"].as_str().unwrap_or_default().to_string()
                })
                .collect()
        }
    }

    impl RotatingSink for MemorySink {
        fn write(&self, record: &[u8]) -> Result<usize> {
            if self.fail {
                return Err(LogError::Io(std::io::Error::other("disk full")));
            }
            self.records.lock().push(record.to_vec());
            Ok(record.len())
        }

        fn sync(&self) -> Result<()> {
            if self.fail {
                return Err(LogError::Io(std::io::Error::other("disk full")));
            }
            Ok(())
        }

        fn path(&self) -> &Path {
            &self.path
        }
    }

    fn make_router(mode: Mode, info: Arc<MemorySink>, error: Arc<MemorySink>) -> Router {
        let encoder: Arc<dyn Encoder> = Arc::new(JsonEncoder::new());
        Router::new(vec![
            RouteEntry::new(LevelGate::new(Bucket::Info, mode), Arc::clone(&encoder), info),
            RouteEntry::new(LevelGate::new(Bucket::Error, mode), encoder, error),
        ])
    }

    fn event(severity: Severity, message: &str) -> LogEvent {
        LogEvent::new(severity, Caller::here(), message)
    }

    #[test]
    fn independent_mode_partitions_records() {
        let info = MemorySink::new("info");
        let error = MemorySink::new("error");
        let router = make_router(Mode::Independent, Arc::clone(&info), Arc::clone(&error));

        assert_eq!(router.route(&event(Severity::Warn, "warned")).delivered, 1);
        assert_eq!(router.route(&event(Severity::Error, "failed")).delivered, 1);

        assert_eq!(info.messages(), vec!["warned"]);
        assert_eq!(error.messages(), vec!["failed"]);
    }

    #[test]
    fn contain_mode_tees_errors() {
        let info = MemorySink::new("info");
        let error = MemorySink::new("error");
        let router = make_router(Mode::Contain, Arc::clone(&info), Arc::clone(&error));

        let delivery = router.route(&event(Severity::Error, "failed"));
        assert_eq!(delivery, Delivery { delivered: 2, failed: 0 });
        assert_eq!(info.messages(), vec!["failed"]);
        assert_eq!(error.messages(), vec!["failed"]);
    }

    #[test]
    fn debug_is_dropped() {
        let info = MemorySink::new("info");
        let error = MemorySink::new("error");
        let router = make_router(Mode::Contain, Arc::clone(&info), Arc::clone(&error));

        assert!(router.route(&event(Severity::Debug, "noise")).is_dropped());
        assert!(!router.accepts(Severity::Debug));
        assert!(info.messages().is_empty());
        assert!(error.messages().is_empty());
    }

    #[test]
    fn failing_sink_does_not_block_other_entry() {
        let info = MemorySink::failing("info");
        let error = MemorySink::new("error");
        let router = make_router(Mode::Contain, info, Arc::clone(&error));

        let delivery = router.route(&event(Severity::Fatal, "boom"));
        assert_eq!(delivery, Delivery { delivered: 1, failed: 1 });
        assert_eq!(error.messages(), vec!["boom"]);
    }

    #[test]
    fn sync_counts_failures() {
        let router = make_router(
            Mode::Contain,
            MemorySink::failing("info"),
            MemorySink::new("error"),
        );
        assert_eq!(router.sync(), 1);
    }

    #[test]
    fn per_sink_order_follows_route_order() {
        let info = MemorySink::new("info");
        let router = make_router(Mode::Contain, Arc::clone(&info), MemorySink::new("error"));

        for n in 0..20 {
            router.route(&event(Severity::Info, &format!("m{n}")));
        }
        let expected: Vec<String> = (0..20).map(|n| format!("m{n}")).collect();
        assert_eq!(info.messages(), expected);
    }

    #[test]
    fn empty_router_accepts_nothing() {
        let router = Router::default();
        assert!(router.entries().is_empty());
        assert!(router.route(&event(Severity::Fatal, "lost")).is_dropped());
        assert_eq!(router.sync(), 0);
    }

    #[test]
    fn router_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Router>();
    }
}
