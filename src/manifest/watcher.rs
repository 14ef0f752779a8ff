//! Manifest file watcher for hot reload.
//!
//! # Data Flow
//! ```text
//! notify thread ──(touch)──▶ forward_changes task ──(quiet period)──▶ load_manifest
//!                                                                        │
//!                                       unchanged? drop ◀───────────────┤
//!                                                                        ▼
//!                                                          mpsc::UnboundedSender<Manifest>
//! ```
//!
//! # Design Decisions
//! - The parent directory is watched, not the file: editors that save by
//!   writing a temporary file and renaming it replace the watched inode
//! - Events are collapsed until the file has been quiet for `debounce`
//! - A manifest identical to the last one delivered is not sent again

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::manifest::loader::load_manifest;
use crate::manifest::model::Manifest;

const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the manifest file and sends every new, parseable version.
pub struct ManifestWatcher {
    path: PathBuf,
    debounce: Duration,
    update_tx: mpsc::UnboundedSender<Manifest>,
}

impl ManifestWatcher {
    /// Returns the watcher and a receiver for freshly parsed manifests.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<Manifest>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                debounce: DEFAULT_DEBOUNCE,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Start watching. Must be called inside a tokio runtime.
    ///
    /// The returned watcher must be kept alive for events to keep flowing;
    /// dropping it also ends the forwarding task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self
            .path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| notify::Error::path_not_found().add_path(self.path.clone()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let (touch_tx, touch_rx) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = matches!(
                        event.kind,
                        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
                    );
                    let ours = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if relevant && ours {
                        let _ = touch_tx.send(());
                    }
                }
                Err(e) => tracing::error!(error = ?e, "Manifest watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let current = load_manifest(&self.path).ok();
        tokio::spawn(forward_changes(
            touch_rx,
            self.path.clone(),
            self.debounce,
            current,
            self.update_tx,
        ));

        tracing::info!(path = %self.path.display(), "Manifest watcher started");
        Ok(watcher)
    }
}

async fn forward_changes(
    mut touches: mpsc::UnboundedReceiver<()>,
    path: PathBuf,
    debounce: Duration,
    mut last: Option<Manifest>,
    updates: mpsc::UnboundedSender<Manifest>,
) {
    while touches.recv().await.is_some() {
        loop {
            match tokio::time::timeout(debounce, touches.recv()).await {
                Ok(Some(())) => continue,
                Ok(None) => return,
                Err(_) => break,
            }
        }

        match load_manifest(&path) {
            Ok(manifest) if last.as_ref() == Some(&manifest) => {
                tracing::debug!(path = %path.display(), "Manifest unchanged; skipping reload");
            }
            Ok(manifest) => {
                tracing::info!(path = %path.display(), "Manifest change detected, reloading");
                last = Some(manifest.clone());
                if updates.send(manifest).is_err() {
                    return;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to reload manifest; keeping current configuration");
            }
        }
    }
}
