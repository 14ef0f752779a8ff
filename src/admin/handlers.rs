use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::discovery::SessionInfo;
use crate::snapshot::Snapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub snapshot_version: u64,
    pub functions: usize,
    pub subscribers: usize,
}

#[derive(Serialize)]
pub struct SnapshotView {
    pub current: Option<Arc<Snapshot>>,
    pub previous: Option<Arc<Snapshot>>,
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        uptime_secs: state.started.elapsed().as_secs(),
        snapshot_version: state.discovery.store().version(),
        functions: state.invoker.manifest().paths.len(),
        subscribers: state.discovery.session_count(),
    })
}

pub async fn get_snapshot(State(state): State<AdminState>) -> Json<SnapshotView> {
    let store = state.discovery.store();
    Json(SnapshotView {
        current: store.current(),
        previous: store.previous(),
    })
}

pub async fn get_subscribers(State(state): State<AdminState>) -> Json<Vec<SessionInfo>> {
    Json(state.discovery.sessions())
}
