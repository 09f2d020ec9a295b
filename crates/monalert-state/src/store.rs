//! MetricStore: the server's in-memory metric state.
//!
//! A single map keyed by `(name, kind)` behind a `tokio::sync::RwLock`.
//! Queries and listings share the read lock; every update takes the
//! write lock for the duration of one map operation, so updates to the
//! same entry are applied one at a time in lock-acquisition order.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use monalert_core::{MetricEntry, MetricKind, MetricSample, MetricValue};

use crate::error::{StateError, StateResult};

/// Map key. Field order gives listings sorted by name, then kind.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MetricKey {
    name: String,
    kind: MetricKind,
}

/// Thread-safe metric store. Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct MetricStore {
    entries: Arc<RwLock<BTreeMap<MetricKey, MetricValue>>>,
}

impl MetricStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a sample and return the stored value afterwards.
    ///
    /// Gauges are replaced; counters add the delta to the previous total
    /// (zero when absent). An overflowing counter is left unchanged.
    pub async fn update(&self, sample: &MetricSample) -> StateResult<MetricValue> {
        let key = MetricKey {
            name: sample.name().to_string(),
            kind: sample.kind(),
        };
        let mut entries = self.entries.write().await;

        let stored = match sample.value() {
            MetricValue::Gauge(v) => MetricValue::Gauge(v),
            MetricValue::Counter(delta) => {
                let current = match entries.get(&key) {
                    Some(MetricValue::Counter(c)) => *c,
                    _ => 0,
                };
                let total = current
                    .checked_add(delta)
                    .ok_or_else(|| StateError::CounterOverflow {
                        name: key.name.clone(),
                        current,
                        delta,
                    })?;
                MetricValue::Counter(total)
            }
        };
        entries.insert(key, stored);
        drop(entries);

        debug!(kind = %sample.kind(), name = sample.name(), value = %stored, "metric updated");
        Ok(stored)
    }

    /// Current value of `(kind, name)`.
    pub async fn get(&self, kind: MetricKind, name: &str) -> StateResult<MetricValue> {
        let key = MetricKey {
            name: name.to_string(),
            kind,
        };
        let entries = self.entries.read().await;
        entries
            .get(&key)
            .copied()
            .ok_or_else(|| StateError::NotFound {
                kind,
                name: name.to_string(),
            })
    }

    /// Every current entry, sorted by name then kind.
    pub async fn list_all(&self) -> Vec<MetricEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|(key, value)| MetricEntry {
                name: key.name.clone(),
                value: *value,
            })
            .collect()
    }

    /// Replace the whole content with `entries`, taking each value as-is.
    ///
    /// Used by restore: a persisted counter total becomes the absolute
    /// stored value, not a delta on top of what was there. A later entry
    /// for the same `(kind, name)` wins.
    pub async fn replace_all(&self, entries: impl IntoIterator<Item = MetricEntry>) -> usize {
        let fresh: BTreeMap<MetricKey, MetricValue> = entries
            .into_iter()
            .map(|e| {
                (
                    MetricKey {
                        kind: e.kind(),
                        name: e.name,
                    },
                    e.value,
                )
            })
            .collect();
        let count = fresh.len();
        *self.entries.write().await = fresh;
        count
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
