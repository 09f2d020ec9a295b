//! Metric service: the Apply step shared by both wire encodings.
//!
//! Handlers hand over validated samples only. The service applies them to
//! the store, then gives the durability manager a chance to persist. A
//! failed persist is logged and does not undo the in-memory update.

use tracing::{error, warn};

use monalert_core::{MetricKind, MetricSample, MetricValue, Metrics};
use monalert_state::{DurabilityManager, MetricStore, StateResult};

/// Store plus durability, cheap to clone into every request.
#[derive(Clone)]
pub struct MetricService {
    store: MetricStore,
    durability: DurabilityManager,
}

impl MetricService {
    pub fn new(durability: DurabilityManager) -> Self {
        Self {
            store: durability.store().clone(),
            durability,
        }
    }

    /// Apply `sample` and return the stored value.
    pub async fn update(&self, sample: &MetricSample) -> StateResult<MetricValue> {
        let stored = self.store.update(sample).await.inspect_err(|e| {
            warn!(op = "update", kind = %sample.kind(), name = sample.name(), error = %e, "store rejected update");
        })?;

        if let Err(e) = self.durability.after_update().await {
            error!(
                op = "persist",
                kind = %sample.kind(),
                name = sample.name(),
                error = %e,
                "snapshot write failed, update kept in memory"
            );
        }
        Ok(stored)
    }

    pub async fn value(&self, kind: MetricKind, name: &str) -> StateResult<MetricValue> {
        self.store.get(kind, name).await
    }

    /// Every metric as wire objects, sorted by name then kind.
    pub async fn list(&self) -> Vec<Metrics> {
        self.store.list_all().await.iter().map(Metrics::from).collect()
    }
}
