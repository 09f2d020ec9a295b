//! Snapshot file: the only durable artifact of the server.
//!
//! The file holds one JSON array of [`Metrics`] records describing the
//! full store. Writes go to a sibling temp file which is synced and then
//! renamed over the target, so a reader sees either the previous snapshot
//! or the new one, never a partial write.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::debug;

use monalert_core::Metrics;

use crate::error::{StateError, StateResult};

/// Location of the snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("snapshot"));
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Replace the snapshot with `records`.
    pub async fn write(&self, records: &[Metrics]) -> StateResult<()> {
        let data = serde_json::to_vec_pretty(records).map_err(StateError::Encode)?;

        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        }

        let tmp = self.temp_path();
        let mut file = tokio::fs::File::create(&tmp).await.map_err(io_error(&tmp))?;
        file.write_all(&data).await.map_err(io_error(&tmp))?;
        file.sync_all().await.map_err(io_error(&tmp))?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(io_error(&self.path))?;

        debug!(path = ?self.path, records = records.len(), bytes = data.len(), "snapshot written");
        Ok(())
    }

    /// Read all records. A missing or blank file yields no records.
    pub async fn read(&self) -> StateResult<Vec<Metrics>> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = ?self.path, "no snapshot file");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(StateError::Io {
                    path: self.path.clone(),
                    source: e,
                });
            }
        };

        if data.iter().all(u8::is_ascii_whitespace) {
            debug!(path = ?self.path, "snapshot file is empty");
            return Ok(Vec::new());
        }

        serde_json::from_slice(&data).map_err(|source| StateError::Decode {
            path: self.path.clone(),
            source,
        })
    }
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StateError + '_ {
    move |source| StateError::Io {
        path: path.to_path_buf(),
        source,
    }
}
