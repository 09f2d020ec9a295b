//! monalertd: the Monalert metrics server.
//!
//! Single binary that assembles:
//! - Metric store (in memory)
//! - Durability manager (snapshot file, synchronous or periodic)
//! - HTTP API with the gzip transport codec
//!
//! # Usage
//!
//! ```text
//! monalertd -a :8080 -i 300 -f /tmp/metrics-db.json -r true
//! ```

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use monalert_core::ProcessEnv;
use monalertd::config::{ServerArgs, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    let config = ServerConfig::resolve(args, &ProcessEnv).context("invalid server configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .context("invalid log level")?,
        )
        .init();

    info!(
        address = %config.address,
        store_interval_secs = config.store_interval.as_secs(),
        restore = config.restore,
        "monalert server starting"
    );

    let listener = tokio::net::TcpListener::bind(&config.address)
        .await
        .with_context(|| format!("cannot listen on {}", config.address))?;

    monalertd::server::serve(&config, listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "cannot listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    })
    .await
}
