//! Applying manifest changes to a running process.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;

use crate::compiler::{compile, CompileError};
use crate::lifecycle::Shutdown;
use crate::manifest::Manifest;
use crate::snapshot::SnapshotStore;

/// Compile `manifest`, publish it and make it the routing manifest.
///
/// On a compile error nothing changes: the store keeps its snapshot and the
/// router keeps its manifest.
pub fn apply_manifest(
    manifest: Manifest,
    routing: &ArcSwap<Manifest>,
    store: &SnapshotStore,
) -> Result<u64, CompileError> {
    let config = compile(&manifest)?;
    let version = store.publish(config);
    routing.store(Arc::new(manifest));
    Ok(version)
}

/// Apply every manifest arriving on `updates` until shutdown.
pub async fn run_reloads(
    mut updates: mpsc::UnboundedReceiver<Manifest>,
    routing: Arc<ArcSwap<Manifest>>,
    store: Arc<SnapshotStore>,
    shutdown: Shutdown,
) {
    let stop = shutdown.signalled();
    tokio::pin!(stop);

    loop {
        let manifest = tokio::select! {
            update = updates.recv() => match update {
                Some(manifest) => manifest,
                None => break,
            },
            _ = &mut stop => break,
        };

        match apply_manifest(manifest, &routing, &store) {
            Ok(version) => tracing::info!(version, "Manifest reloaded"),
            Err(e) => tracing::error!(error = %e, "Reloaded manifest rejected; keeping current configuration"),
        }
    }
    tracing::debug!("Manifest reload loop stopped");
}
