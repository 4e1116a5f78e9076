//! Library circulation core
//!
//! Catalog, membership and loan bookkeeping for a small lending library.
//! State lives in memory behind a single lock and is written out as a full
//! JSON snapshot after every change. Front ends (web handlers, text menus)
//! hold a [`Library`] and go through its services.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::{AppConfig, PolicyConfig};
pub use error::{AppError, AppResult};

use repository::{JsonFileStorage, Repository, SaveRetry, SnapshotStorage};
use services::clock::{Clock, SystemClock};

/// Application state handed to front ends
#[derive(Clone)]
pub struct Library {
    pub config: Arc<AppConfig>,
    pub repository: Repository,
    pub services: Arc<services::Services>,
}

impl Library {
    /// Open the snapshot named in the configuration, on the wall clock
    pub async fn open(config: AppConfig) -> AppResult<Self> {
        let storage = Arc::new(JsonFileStorage::new(config.storage.data_file.clone()));
        Self::with_storage(config, storage, Arc::new(SystemClock)).await
    }

    pub async fn with_storage(
        config: AppConfig,
        storage: Arc<dyn SnapshotStorage>,
        clock: Arc<dyn Clock>,
    ) -> AppResult<Self> {
        let repository = Repository::open(storage, SaveRetry::from(&config.storage)).await?;
        repository
            .fill_missing_fee_fields(clock.now(), &config.policy)
            .await;
        let services = services::Services::new(repository.clone(), config.policy.clone(), clock);
        Ok(Self {
            config: Arc::new(config),
            repository,
            services: Arc::new(services),
        })
    }
}
