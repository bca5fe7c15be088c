//! JSON snapshot persistence for directory collections

use crate::error::{DirectoryError, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Path-addressed JSON array store for one entity type
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the snapshot
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let raw = fs::read(&self.path)
            .await
            .map_err(|source| DirectoryError::SnapshotIo {
                path: self.path.clone(),
                source,
            })?;

        serde_json::from_slice(&raw).map_err(|source| DirectoryError::SnapshotParse {
            path: self.path.clone(),
            source,
        })
    }

    /// Write the snapshot via a temp file so readers never see a partial file
    pub async fn save<T: Serialize>(&self, items: &[T]) -> Result<()> {
        let io_err = |source: std::io::Error| DirectoryError::SnapshotIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let data = serde_json::to_vec_pretty(items)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, data).await.map_err(io_err)?;
        fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        tracing::debug!(
            path = %self.path.display(),
            count = items.len(),
            "Snapshot written"
        );
        Ok(())
    }
}
