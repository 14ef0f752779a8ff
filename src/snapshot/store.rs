//! Versioned, atomically replaceable configuration snapshot.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use serde::Serialize;
use tokio::sync::watch;

use crate::compiler::CompiledConfig;
use crate::observability::metrics;

/// An immutable compiled configuration tagged with its version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub version: u64,
    pub config: CompiledConfig,
}

/// Holds the current snapshot (and the one it replaced).
///
/// Readers load an `Arc` without locking and always see a complete snapshot.
/// Writers are serialized by `writer`, which also owns the version counter.
pub struct SnapshotStore {
    current: ArcSwapOption<Snapshot>,
    previous: ArcSwapOption<Snapshot>,
    writer: Mutex<u64>,
    version_tx: watch::Sender<u64>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (version_tx, _) = watch::channel(0);
        Self {
            current: ArcSwapOption::empty(),
            previous: ArcSwapOption::empty(),
            writer: Mutex::new(0),
            version_tx,
        }
    }

    /// Install a new snapshot and return its version.
    ///
    /// Versions start at 1 and increase by one per call. Subscribers are
    /// notified without waiting on any of them.
    pub fn publish(&self, config: CompiledConfig) -> u64 {
        let mut last = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let version = *last + 1;

        let snapshot = Arc::new(Snapshot { version, config });
        let replaced = self.current.swap(Some(snapshot));
        self.previous.store(replaced);
        *last = version;
        // Notify under the writer lock so the watched version never goes backwards.
        self.version_tx.send_replace(version);
        drop(last);

        metrics::record_snapshot_published(version);
        tracing::info!(version, "Snapshot published");
        version
    }

    /// The active snapshot, if anything has been published yet.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// The snapshot replaced by the most recent publish.
    pub fn previous(&self) -> Option<Arc<Snapshot>> {
        self.previous.load_full()
    }

    /// Version of the active snapshot, 0 before the first publish.
    pub fn version(&self) -> u64 {
        self.current().map(|s| s.version).unwrap_or(0)
    }

    /// Receive the latest published version whenever it changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version_tx.subscribe()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
