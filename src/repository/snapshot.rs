//! Snapshot storage backends

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::store::LibraryStore;
use crate::error::{AppError, AppResult};

/// Where the full-state snapshot lives. `save` replaces the previous
/// snapshot as a whole.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStorage: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet
    async fn load(&self) -> AppResult<Option<LibraryStore>>;

    async fn save(&self, store: &LibraryStore) -> AppResult<()>;
}

/// Render the snapshot document
pub fn encode(store: &LibraryStore) -> AppResult<Vec<u8>> {
    serde_json::to_vec_pretty(store).map_err(|e| AppError::Persistence(e.to_string()))
}

/// Parse a snapshot document
pub fn decode(bytes: &[u8]) -> AppResult<LibraryStore> {
    serde_json::from_slice(bytes).map_err(|e| AppError::CorruptSnapshot(e.to_string()))
}

/// Pretty-printed JSON file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
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
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "library_data.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write_atomically(&self, bytes: &[u8]) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let tmp = self.temp_path();
        let result = Self::write_then_rename(&tmp, &self.path, bytes).await;
        if result.is_err() {
            if let Err(e) = tokio::fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove {}: {}", tmp.display(), e);
                }
            }
        }
        result
    }

    async fn write_then_rename(tmp: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
        let mut file = tokio::fs::File::create(tmp).await?;
        file.write_all(bytes).await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(tmp, path).await
    }
}

#[async_trait]
impl SnapshotStorage for JsonFileStorage {
    async fn load(&self) -> AppResult<Option<LibraryStore>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No snapshot at {}, starting empty", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                tracing::error!("Failed to read snapshot {}: {}", self.path.display(), e);
                return Err(AppError::Io(e));
            }
        };

        let store = decode(&bytes).map_err(|e| {
            tracing::error!("Failed to parse snapshot {}: {}", self.path.display(), e);
            e
        })?;
        tracing::info!(
            "Loaded snapshot {} ({} books, {} members, {} transactions)",
            self.path.display(),
            store.book_count(),
            store.member_count(),
            store.transaction_count()
        );
        Ok(Some(store))
    }

    async fn save(&self, store: &LibraryStore) -> AppResult<()> {
        let bytes = encode(store)?;
        self.write_atomically(&bytes).await.map_err(|e| {
            tracing::error!("Failed to write snapshot {}: {}", self.path.display(), e);
            AppError::Persistence(e.to_string())
        })?;
        tracing::debug!("Snapshot written to {} ({} bytes)", self.path.display(), bytes.len());
        Ok(())
    }
}
