//! Durability manager: keeps the snapshot file in step with the store.
//!
//! Two modes, chosen once at construction:
//! - [`PersistMode::Synchronous`]: [`DurabilityManager::after_update`]
//!   persists the whole store before the update is acknowledged.
//! - [`PersistMode::Periodic`]: [`DurabilityManager::run`] persists on a
//!   timer; `after_update` does nothing.
//!
//! Writes are serialized by a dedicated mutex, and the store copy is taken
//! while holding it, so the file only ever moves forward in time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use monalert_core::{MetricEntry, Metrics};

use crate::error::{StateError, StateResult};
use crate::snapshot::SnapshotFile;
use crate::store::MetricStore;

/// When the store is written to the snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// After every accepted update, before responding.
    Synchronous,
    /// On a fixed timer, independent of updates.
    Periodic(Duration),
}

impl PersistMode {
    /// A zero interval selects synchronous mode.
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            PersistMode::Synchronous
        } else {
            PersistMode::Periodic(interval)
        }
    }
}

/// Persists and restores a [`MetricStore`]. Cheap to clone.
///
/// Without a snapshot file every operation is a successful no-op.
#[derive(Clone)]
pub struct DurabilityManager {
    store: MetricStore,
    file: Option<Arc<SnapshotFile>>,
    mode: PersistMode,
    write_lock: Arc<Mutex<()>>,
}

impl DurabilityManager {
    pub fn new(store: MetricStore, file: Option<SnapshotFile>, mode: PersistMode) -> Self {
        Self {
            store,
            file: file.map(Arc::new),
            mode,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn mode(&self) -> PersistMode {
        self.mode
    }

    pub fn store(&self) -> &MetricStore {
        &self.store
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    /// Write the full store to the snapshot file. Returns the number of
    /// records written.
    pub async fn persist(&self) -> StateResult<usize> {
        let Some(file) = &self.file else {
            return Ok(0);
        };

        let _guard = self.write_lock.lock().await;
        let records: Vec<Metrics> = self.store.list_all().await.iter().map(Metrics::from).collect();
        file.write(&records).await?;
        Ok(records.len())
    }

    /// Load the snapshot file into the store, replacing its content.
    ///
    /// Counter totals are restored as absolute values. Any record that
    /// fails validation aborts the restore and leaves the store untouched.
    pub async fn restore(&self) -> StateResult<usize> {
        let Some(file) = &self.file else {
            return Ok(0);
        };

        let records = file.read().await?;
        let entries = records
            .iter()
            .enumerate()
            .map(|(index, record)| {
                record
                    .to_sample()
                    .map(|sample| MetricEntry {
                        name: sample.name().to_string(),
                        value: sample.value(),
                    })
                    .map_err(|source| StateError::InvalidRecord { index, source })
            })
            .collect::<StateResult<Vec<_>>>()?;

        let restored = self.store.replace_all(entries).await;
        info!(path = ?file.path(), metrics = restored, "store restored from snapshot");
        Ok(restored)
    }

    /// Hook for the write path: persists in synchronous mode only.
    pub async fn after_update(&self) -> StateResult<()> {
        if self.mode == PersistMode::Synchronous {
            self.persist().await?;
        }
        Ok(())
    }

    /// Periodic persist loop. Returns immediately in synchronous mode or
    /// without a file; otherwise runs until `shutdown` changes.
    pub async fn run(&self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let PersistMode::Periodic(interval) = self.mode else {
            return;
        };
        if self.file.is_none() {
            return;
        }

        info!(interval_secs = interval.as_secs(), "periodic snapshot started");

        loop {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {
                    match self.persist().await {
                        Ok(count) => debug!(metrics = count, "periodic snapshot persisted"),
                        Err(e) => warn!(error = %e, "periodic snapshot failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("periodic snapshot shutting down");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use monalert_core::{MetricKind, MetricSample, MetricValue};
    use tokio::sync::watch;

    fn manager(dir: &tempfile::TempDir, mode: PersistMode) -> DurabilityManager {
        DurabilityManager::new(
            MetricStore::new(),
            Some(SnapshotFile::new(dir.path().join("metrics-db.json"))),
            mode,
        )
    }

    #[test]
    fn zero_interval_is_synchronous() {
        assert_eq!(PersistMode::from_interval(Duration::ZERO), PersistMode::Synchronous);
        assert_eq!(
            PersistMode::from_interval(Duration::from_secs(300)),
            PersistMode::Periodic(Duration::from_secs(300))
        );
    }

    #[tokio::test]
    async fn restore_of_persist_reproduces_store() {
        let dir = tempfile::tempdir().unwrap();
        let before = manager(&dir, PersistMode::Synchronous);
        let store = before.store();
        store.update(&MetricSample::gauge("temperature", 42.5).unwrap()).await.unwrap();
        store.update(&MetricSample::counter("hits", 5).unwrap()).await.unwrap();
        store.update(&MetricSample::counter("hits", 7).unwrap()).await.unwrap();
        store.update(&MetricSample::gauge("hits", -1.25).unwrap()).await.unwrap();
        assert_eq!(before.persist().await.unwrap(), 3);

        let after = manager(&dir, PersistMode::Synchronous);
        assert_eq!(after.restore().await.unwrap(), 3);
        assert_eq!(after.store().list_all().await, before.store().list_all().await);
    }

    #[tokio::test]
    async fn restored_counter_is_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let first = manager(&dir, PersistMode::Synchronous);
        first.store().update(&MetricSample::counter("hits", 12).unwrap()).await.unwrap();
        first.persist().await.unwrap();

        let second = manager(&dir, PersistMode::Synchronous);
        second.restore().await.unwrap();
        // Restoring twice must not double the total.
        second.restore().await.unwrap();
        assert_eq!(
            second.store().get(MetricKind::Counter, "hits").await.unwrap(),
            MetricValue::Counter(12)
        );

        // Accumulation continues from the restored total.
        let v = second
            .store()
            .update(&MetricSample::counter("hits", 1).unwrap())
            .await
            .unwrap();
        assert_eq!(v, MetricValue::Counter(13));
    }

    #[tokio::test]
    async fn restore_without_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(&dir, PersistMode::Synchronous);
        assert_eq!(m.restore().await.unwrap(), 0);
        assert!(m.store().is_empty().await);
    }

    #[tokio::test]
    async fn restore_rejects_invalid_record() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("metrics-db.json"),
            r#"[{"id":"ok","type":"gauge","value":1.0},{"id":"bad","type":"counter"}]"#,
        )
        .unwrap();

        let m = manager(&dir, PersistMode::Synchronous);
        let err = m.restore().await.unwrap_err();
        assert!(matches!(err, StateError::InvalidRecord { index: 1, .. }));
        assert!(m.store().is_empty().await);
    }

    #[tokio::test]
    async fn restore_corrupt_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("metrics-db.json"), "not json").unwrap();
        let m = manager(&dir, PersistMode::Synchronous);
        assert!(matches!(m.restore().await, Err(StateError::Decode { .. })));
    }

    #[tokio::test]
    async fn after_update_persists_only_in_synchronous_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics-db.json");

        let periodic = manager(&dir, PersistMode::Periodic(Duration::from_secs(3600)));
        periodic.store().update(&MetricSample::counter("c", 1).unwrap()).await.unwrap();
        periodic.after_update().await.unwrap();
        assert!(!path.exists());

        let sync = manager(&dir, PersistMode::Synchronous);
        sync.store().update(&MetricSample::counter("c", 1).unwrap()).await.unwrap();
        sync.after_update().await.unwrap();
        let written = SnapshotFile::new(&path).read().await.unwrap();
        assert_eq!(written, vec![Metrics::from_value("c", MetricValue::Counter(1))]);
    }

    #[tokio::test]
    async fn disabled_manager_is_a_no_op() {
        let m = DurabilityManager::new(MetricStore::new(), None, PersistMode::Synchronous);
        m.store().update(&MetricSample::gauge("g", 1.0).unwrap()).await.unwrap();
        assert!(!m.is_enabled());
        assert_eq!(m.persist().await.unwrap(), 0);
        assert_eq!(m.restore().await.unwrap(), 0);
        // Restore without a file must not wipe the live store.
        assert_eq!(m.store().len().await, 1);
    }

    #[tokio::test]
    async fn periodic_loop_persists_and_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(&dir, PersistMode::Periodic(Duration::from_millis(20)));
        m.store().update(&MetricSample::gauge("g", 2.5).unwrap()).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let runner = m.clone();
        let handle = tokio::spawn(async move { runner.run(rx).await });

        let file = SnapshotFile::new(dir.path().join("metrics-db.json"));
        let mut persisted = Vec::new();
        for _ in 0..100 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if let Ok(records) = file.read().await {
                if !records.is_empty() {
                    persisted = records;
                    break;
                }
            }
        }
        assert_eq!(persisted, vec![Metrics::from_value("g", MetricValue::Gauge(2.5))]);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("loop did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn run_returns_immediately_in_synchronous_mode() {
        let dir = tempfile::tempdir().unwrap();
        let m = manager(&dir, PersistMode::Synchronous);
        let (_tx, rx) = watch::channel(false);
        tokio::time::timeout(Duration::from_secs(1), m.run(rx))
            .await
            .unwrap();
    }
}
