//! Server assembly: store, durability, API, and the shutdown sequence.

use std::future::Future;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{error, info};

use monalert_api::{MetricService, build_router};
use monalert_state::{DurabilityManager, MetricStore, PersistMode, SnapshotFile};

use crate::config::ServerConfig;

/// Serve on `listener` until `shutdown` resolves.
///
/// On shutdown the listener stops accepting, the periodic snapshot task
/// is stopped, and one final snapshot is written.
pub async fn serve<F>(config: &ServerConfig, listener: TcpListener, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    // ── Store and durability ───────────────────────────────────

    let durability = DurabilityManager::new(
        MetricStore::new(),
        config.file_storage_path.as_ref().map(SnapshotFile::new),
        PersistMode::from_interval(config.store_interval),
    );
    if durability.is_enabled() {
        info!(mode = ?durability.mode(), file = ?config.file_storage_path, "persistence enabled");
    } else {
        info!("persistence disabled");
    }

    if config.restore {
        durability
            .restore()
            .await
            .context("cannot restore metrics snapshot")?;
    }

    // ── Background persistence ─────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let periodic = durability.clone();
    let persist_handle = tokio::spawn(async move {
        periodic.run(shutdown_rx).await;
    });

    // ── API server ─────────────────────────────────────────────

    let router = build_router(MetricService::new(durability.clone()));
    info!(addr = %listener.local_addr()?, "API server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    let _ = persist_handle.await;

    // Final snapshot on a clean stop.
    match durability.persist().await {
        Ok(count) if durability.is_enabled() => info!(metrics = count, "final snapshot written"),
        Ok(_) => {}
        Err(e) => error!(error = %e, "final snapshot failed"),
    }

    info!("monalert server stopped");
    Ok(())
}
