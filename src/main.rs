//! FaaS invoker (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────────────────┐
//!                     │                       FAAS INVOKER                       │
//!                     │                                                          │
//!   manifest.yaml ────┼─▶ manifest ──▶ compiler ──▶ snapshot store ──┐           │
//!        ▲            │      │                                        │           │
//!        │ (watch)    │      │                                        ▼           │
//!        └────────────┼── lifecycle::reload                  discovery server ◀──┼──▶ proxy nodes
//!                     │      │                                 (ws sessions)     │    (ACK / NACK)
//!                     │      ▼                                                   │
//!   HTTP request ─────┼─▶ http server ──▶ invocation router ──▶ handler registry  │
//!   ◀── JSON ─────────┼───────────────────────────────────────────┘              │
//!                     │                                                          │
//!                     │  admin API · metrics · logging · shutdown coordinator    │
//!                     └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use clap::Parser;
use tokio::task::JoinSet;

use faas_invoker::admin::{setup_admin_router, AdminState};
use faas_invoker::config::{load_config, validate_config, ConfigError, InvokerConfig};
use faas_invoker::discovery::{discovery_router, DiscoveryServer};
use faas_invoker::http::{serve_router, HttpServer};
use faas_invoker::invoker::{builtin_registry, InvocationRouter};
use faas_invoker::lifecycle::{
    bind_listener, bootstrap, run_reloads, shutdown_signal, Shutdown, StartupError,
};
use faas_invoker::manifest::ManifestWatcher;
use faas_invoker::observability::{init_logging, init_metrics};
use faas_invoker::snapshot::SnapshotStore;

#[derive(Parser)]
#[command(name = "faas-invoker", version)]
#[command(about = "Function invoker and proxy configuration server", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Manifest file, overriding `manifest.path`.
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// Handler artifact, overriding `manifest.artifact`.
    #[arg(long)]
    artifact: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run(Args::parse()).await {
        tracing::error!(error = %e, "Startup failed");
        eprintln!("faas-invoker: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn load(args: &Args) -> Result<InvokerConfig, ConfigError> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => InvokerConfig::default(),
    };
    if let Some(manifest) = &args.manifest {
        config.manifest.path = manifest.clone();
    }
    if let Some(artifact) = &args.artifact {
        config.manifest.artifact = Some(artifact.clone());
    }
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

async fn run(args: Args) -> Result<(), StartupError> {
    let config = load(&args)?;

    if let Err(e) = init_logging(&config.observability) {
        eprintln!("faas-invoker: logging already initialized: {}", e);
    }
    tracing::info!("faas-invoker v{} starting", env!("CARGO_PKG_VERSION"));

    let boot = bootstrap(&config.manifest.path, config.manifest.artifact.as_deref())?;

    let shutdown = Shutdown::new();
    let store = Arc::new(SnapshotStore::new());
    store.publish(boot.config);

    let manifest = Arc::new(ArcSwap::from_pointee(boot.manifest));
    let invoker = Arc::new(
        InvocationRouter::new(Arc::clone(&manifest), Arc::new(builtin_registry()))
            .with_timeout(config.invocation.timeout()),
    );
    let discovery = Arc::new(
        DiscoveryServer::new(Arc::clone(&store), config.discovery.channel_capacity)
            .with_shutdown(shutdown.clone()),
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let http_listener = bind_listener("invocation", &config.listener.bind_address).await?;
    let discovery_listener = bind_listener("discovery", &config.discovery.bind_address).await?;
    let admin_listener = if config.admin.enabled {
        Some(bind_listener("admin", &config.admin.bind_address).await?)
    } else {
        None
    };

    // Must outlive the servers; dropping it stops the notifications.
    let _watcher = if config.manifest.watch {
        let (watcher, updates) = ManifestWatcher::new(&config.manifest.path);
        match watcher.run() {
            Ok(watcher) => {
                tokio::spawn(run_reloads(
                    updates,
                    Arc::clone(&manifest),
                    Arc::clone(&store),
                    shutdown.clone(),
                ));
                Some(watcher)
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to watch manifest; hot reload disabled");
                None
            }
        }
    } else {
        None
    };

    let mut servers = JoinSet::new();
    servers.spawn(
        HttpServer::new(&config.listener, Arc::clone(&invoker)).run(http_listener, shutdown.clone()),
    );
    servers.spawn(serve_router(
        "discovery",
        discovery_listener,
        discovery_router(Arc::clone(&discovery)),
        shutdown.clone(),
    ));
    if let Some(listener) = admin_listener {
        let state = AdminState::new(
            Arc::clone(&discovery),
            Arc::clone(&invoker),
            config.admin.api_key.clone(),
        );
        servers.spawn(serve_router(
            "admin",
            listener,
            setup_admin_router(state),
            shutdown.clone(),
        ));
    }

    let trigger = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    while let Some(result) = servers.join_next().await {
        let failure = match result {
            Ok(Ok(())) => continue,
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        tracing::error!(error = %failure, "Server exited unexpectedly; shutting down");
        shutdown.trigger();
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
