//! monalert-agent: polls host gauges and reports them to monalertd.
//!
//! # Usage
//!
//! ```text
//! monalert-agent -a localhost:8080 -p 2 -r 10 -e json
//! ```

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use monalert_agent::config::AgentArgs;
use monalert_agent::{AgentConfig, BatchBuffer, Collector, Reporter};
use monalert_core::ProcessEnv;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = AgentArgs::parse();
    let config = AgentConfig::resolve(args, &ProcessEnv).context("invalid agent configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .context("invalid log level")?,
        )
        .init();

    info!(
        address = %config.address,
        poll_secs = config.poll_interval.as_secs(),
        report_secs = config.report_interval.as_secs(),
        encoding = %config.encoding,
        gzip = config.gzip,
        "monalert agent starting"
    );

    let buffer = BatchBuffer::new();
    let reporter = Reporter::new(config.address.clone(), config.encoding)
        .with_gzip(config.gzip)
        .with_timeout(config.request_timeout);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let collector_handle = tokio::spawn(Collector::new().run(
        buffer.clone(),
        config.poll_interval,
        shutdown_rx.clone(),
    ));

    let report_interval = config.report_interval;
    let report_buffer = buffer.clone();
    let reporter_handle = tokio::spawn(async move {
        reporter.run(report_buffer, report_interval, shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("cannot listen for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = collector_handle.await;
    let _ = reporter_handle.await;

    info!(unsent_batches = buffer.len().await, "monalert agent stopped");
    Ok(())
}
