//! Sample collector: one [`PollBatch`] per poll tick.
//!
//! Every batch carries the same fixed set of host gauges, a `RandomValue`
//! gauge, and a `PollCount` counter whose delta is always 1.

use std::time::Duration;

use sysinfo::System;
use tokio::sync::watch;
use tracing::{debug, info};

use monalert_core::MetricSample;

use crate::buffer::BatchBuffer;

/// Name of the per-poll counter.
pub const POLL_COUNT: &str = "PollCount";

/// Gauge names every batch contains, in emission order.
pub const GAUGE_NAMES: &[&str] = &[
    "TotalMemory",
    "UsedMemory",
    "FreeMemory",
    "AvailableMemory",
    "TotalSwap",
    "UsedSwap",
    "FreeSwap",
    "CPUUtilization",
    "CPUCount",
    "LoadAverage1",
    "LoadAverage5",
    "LoadAverage15",
    "RandomValue",
];

/// Samples taken in one poll tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PollBatch {
    /// Monotonic poll number, for logs only.
    pub seq: u64,
    pub samples: Vec<MetricSample>,
}

pub struct Collector {
    system: System,
    seq: u64,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            seq: 0,
        }
    }

    /// Refresh host readings and build the next batch.
    pub fn poll(&mut self) -> PollBatch {
        self.system.refresh_memory();
        self.system.refresh_cpu_usage();
        let load = System::load_average();

        let readings = [
            self.system.total_memory() as f64,
            self.system.used_memory() as f64,
            self.system.free_memory() as f64,
            self.system.available_memory() as f64,
            self.system.total_swap() as f64,
            self.system.used_swap() as f64,
            self.system.free_swap() as f64,
            f64::from(self.system.global_cpu_usage()),
            self.system.cpus().len() as f64,
            load.one,
            load.five,
            load.fifteen,
            rand::random::<f64>(),
        ];

        let mut samples = Vec::with_capacity(GAUGE_NAMES.len() + 1);
        for (name, value) in GAUGE_NAMES.iter().zip(readings) {
            match MetricSample::gauge(*name, value) {
                Ok(sample) => samples.push(sample),
                Err(e) => debug!(gauge = name, error = %e, "skipping unusable reading"),
            }
        }
        if let Ok(sample) = MetricSample::counter(POLL_COUNT, 1) {
            samples.push(sample);
        }

        self.seq += 1;
        PollBatch {
            seq: self.seq,
            samples,
        }
    }

    /// Poll every `interval` into `buffer` until shutdown.
    pub async fn run(
        mut self,
        buffer: BatchBuffer,
        interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(interval_ms = interval.as_millis() as u64, "collector started");
        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    let batch = self.poll();
                    debug!(seq = batch.seq, samples = batch.samples.len(), "polled");
                    buffer.push(batch).await;
                }
                _ = shutdown.changed() => {
                    info!("collector shutting down");
                    break;
                }
            }
        }
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}
