//! Repository layer: the single in-memory store and its snapshot

pub mod snapshot;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, MutexGuard};

pub use snapshot::{JsonFileStorage, SnapshotStorage};
pub use store::{IntegrityIssue, LibraryStore};

use crate::{
    config::{PolicyConfig, StorageConfig},
    error::{AppError, AppResult, Committed},
};

/// Retry behavior for snapshot writes
#[derive(Debug, Clone, Copy)]
pub struct SaveRetry {
    /// Maximum number of attempts (including the initial one)
    pub max_attempts: u32,
    /// Delay before the first retry, doubled after each further failure
    pub base_delay: Duration,
}

impl Default for SaveRetry {
    fn default() -> Self {
        Self::from(&StorageConfig::default())
    }
}

impl From<&StorageConfig> for SaveRetry {
    fn from(config: &StorageConfig) -> Self {
        Self {
            max_attempts: config.save_attempts.max(1),
            base_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Owns the store. All access goes through one lock, so every operation
/// sees and leaves a consistent state.
///
/// Mutation is reserved to the services:
///
/// ```compile_fail
/// # async fn f(repository: library_circulation::repository::Repository) {
/// let _ = repository.write(|store| Ok(store.book("B1000")?.clone())).await;
/// # }
/// ```
#[derive(Clone)]
pub struct Repository {
    store: Arc<Mutex<LibraryStore>>,
    storage: Arc<dyn SnapshotStorage>,
    retry: SaveRetry,
}

impl Repository {
    /// Load the last snapshot, or start empty if there is none
    pub async fn open(storage: Arc<dyn SnapshotStorage>, retry: SaveRetry) -> AppResult<Self> {
        let store = storage.load().await?.unwrap_or_default();
        Ok(Self {
            store: Arc::new(Mutex::new(store)),
            storage,
            retry,
        })
    }

    /// Lock the store for reading
    pub async fn read(&self) -> MutexGuard<'_, LibraryStore> {
        self.store.lock().await
    }

    /// Run `op` against the store, then write a snapshot if it succeeded.
    ///
    /// `op` must finish every check before it mutates anything: an `Err`
    /// from `op` means the store is untouched and nothing is written. When
    /// every write attempt fails the change stays in memory and the result
    /// comes back inside `AppError::Unsaved`.
    pub(crate) async fn write<T, F>(&self, op: F) -> AppResult<T>
    where
        F: FnOnce(&mut LibraryStore) -> AppResult<T>,
        T: Into<Committed>,
    {
        let mut store = self.store.lock().await;
        let value = op(&mut store)?;
        match self.save_with_retry(&store).await {
            Ok(()) => Ok(value),
            Err(e) => Err(AppError::Unsaved {
                reason: e.to_string(),
                committed: Box::new(value.into()),
            }),
        }
    }

    /// Write the current state again, e.g. after an unsaved change
    pub async fn flush(&self) -> AppResult<()> {
        let store = self.store.lock().await;
        self.save_with_retry(&store).await
    }

    /// Resolve fee fields that older snapshots did not record. Kept in
    /// memory only; the next write persists them.
    pub(crate) async fn fill_missing_fee_fields(&self, now: DateTime<Utc>, policy: &PolicyConfig) {
        let filled = self.store.lock().await.fill_missing_fee_fields(now, policy);
        if filled > 0 {
            tracing::info!("Filled membership fee defaults for {} member(s)", filled);
        }
    }

    async fn save_with_retry(&self, store: &LibraryStore) -> AppResult<()> {
        let mut attempt = 1;
        let mut delay = self.retry.base_delay;
        loop {
            match self.storage.save(store).await {
                Ok(()) => return Ok(()),
                Err(e) if attempt >= self.retry.max_attempts => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "Snapshot write attempt {}/{} failed: {}",
                        attempt,
                        self.retry.max_attempts,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Book, CreateBook};
    use snapshot::MockSnapshotStorage;

    fn book(id: String) -> Book {
        Book::new(
            id,
            CreateBook {
                title: "Beloved".into(),
                author: "Toni Morrison".into(),
                isbn: "978-1400033416".into(),
                genre: "Novel".into(),
                total_copies: 1,
            },
        )
    }

    fn no_wait(max_attempts: u32) -> SaveRetry {
        SaveRetry {
            max_attempts,
            base_delay: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn test_failed_op_does_not_save() {
        let mut storage = MockSnapshotStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage.expect_save().never();
        let repo = Repository::open(Arc::new(storage), no_wait(3)).await.unwrap();

        let result: AppResult<Book> = repo
            .write(|_| Err(AppError::Validation("nope".into())))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_change_and_returns_it() {
        let mut storage = MockSnapshotStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage
            .expect_save()
            .times(3)
            .returning(|_| Err(AppError::Persistence("disk full".into())));
        let repo = Repository::open(Arc::new(storage), no_wait(3)).await.unwrap();

        let err = repo.write(|s| Ok(s.add_book(book).clone())).await.unwrap_err();
        assert!(matches!(err.committed(), Some(Committed::Book(b)) if b.id == "B1000"));
        assert_eq!(repo.read().await.book_count(), 1);
    }

    #[tokio::test]
    async fn test_transient_save_failure_is_retried() {
        let mut storage = MockSnapshotStorage::new();
        let mut seq = mockall::Sequence::new();
        storage.expect_load().returning(|| Ok(None));
        storage
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AppError::Persistence("busy".into())));
        storage
            .expect_save()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let repo = Repository::open(Arc::new(storage), no_wait(3)).await.unwrap();

        let saved = repo.write(|s| Ok(s.add_book(book).clone())).await.unwrap();
        assert_eq!(saved.id, "B1000");
    }

    #[tokio::test]
    async fn test_successful_op_saves_once() {
        let mut storage = MockSnapshotStorage::new();
        storage.expect_load().returning(|| Ok(None));
        storage
            .expect_save()
            .times(1)
            .withf(|s: &LibraryStore| s.book_count() == 1)
            .returning(|_| Ok(()));
        let repo = Repository::open(Arc::new(storage), no_wait(3)).await.unwrap();

        let saved = repo.write(|s| Ok(s.add_book(book).clone())).await.unwrap();
        assert_eq!(saved.id, "B1000");
    }
}
