/**
 * BALISE KERNEL - Point d'entrée du service de balises
 *
 * RÔLE : Orchestration de tous les modules : config, scan, ingestion, cycle
 * de publication, API HTTP, arrêt propre.
 *
 * ARCHITECTURE : scanner (simulé) -> canal de mesures -> store partagé ;
 * cycle périodique -> fan-out vers les sorties configurées ; API Axum en
 * consultation à tout moment. Un seul token d'arrêt pour tout le monde.
 */

mod config;
mod cycle;
mod http;
mod ingest;
mod models;
mod publishers;
mod scan;
mod shutdown;
mod store;

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::cycle::{spawn_publish_cycle, CycleCounter, PublishCycle};
use crate::http::AppState;
use crate::publishers::default_registry;
use crate::store::ReadingStore;

#[tokio::main]
async fn main() -> Result<()> {
    // variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = load_config().await;
    let host = gethostname::gethostname().to_string_lossy().into_owned();
    let started = OffsetDateTime::now_utc();
    let tick = Duration::from_secs(cfg.tick_seconds);

    // état partagé et signal d'arrêt
    let store = ReadingStore::new();
    let cycles = CycleCounter::new();
    let shutdown = CancellationToken::new();
    shutdown::spawn_signal_listener(shutdown.clone());

    // sorties configurées
    let registry = default_registry(&cfg);
    let outputs = registry.resolve(&cfg.outputs);
    if outputs.is_empty() {
        warn!(
            requested = ?cfg.outputs,
            available = ?registry.outputs(),
            "no output resolved, publish cycles will run empty"
        );
    }

    // scanner simulé -> canal -> ingestion
    let (readings_tx, readings_rx) = mpsc::channel(cfg.scanner_buffer);
    scan::spawn_simulated_scanner(
        cfg.scan.devices.clone(),
        Duration::from_secs(cfg.scan.interval_seconds),
        readings_tx,
        shutdown.clone(),
    );
    ingest::spawn_ingest_loop(store.clone(), readings_rx);

    // cycle de publication
    let cycle = PublishCycle::new(
        store.clone(),
        outputs,
        host.clone(),
        started,
        tick,
        cycles.clone(),
    );
    spawn_publish_cycle(cycle, shutdown.clone());

    // API HTTP
    let app_state = AppState {
        store: store.clone(),
        host,
        started,
        cycles,
    };
    let app = http::build_router(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on http://{addr}");

    shutdown::serve_until_shutdown(listener, app, shutdown, shutdown::DRAIN_GRACE)
        .await
        .context("query surface server error")?;

    info!(devices = store.len(), "shutting down ..");
    Ok(())
}
