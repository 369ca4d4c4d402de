//! Entry point that ties the color store to sync triggering.

use crate::connectivity::Connectivity;
use crate::coordinator::{TriggerCoordinator, TriggerOutcome};
use crate::db::{ColorRepository, StoreError};
use crate::models::{ColorRecord, HexCode};

/// Counts shown alongside the color list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncStatus {
    pub total: usize,
    pub unsynced: usize,
    pub connectivity: Option<Connectivity>,
}

/// Result of storing a new color.
#[derive(Debug, Clone)]
pub struct Created {
    pub record: ColorRecord,
    /// `None` when offline and no sync was requested.
    pub sync: Option<TriggerOutcome>,
}

pub struct Vault {
    repo: ColorRepository,
    coordinator: TriggerCoordinator,
}

impl Vault {
    pub fn new(repo: ColorRepository, coordinator: TriggerCoordinator) -> Self {
        Self { repo, coordinator }
    }

    pub fn repository(&self) -> &ColorRepository {
        &self.repo
    }

    pub fn coordinator(&self) -> &TriggerCoordinator {
        &self.coordinator
    }

    /// Store a random color.
    pub async fn generate(&self) -> Result<Created, StoreError> {
        self.add(HexCode::random()).await
    }

    /// Store `hex_code` and, when online, schedule a sync.
    ///
    /// Nothing is scheduled if the write fails.
    pub async fn add(&self, hex_code: HexCode) -> Result<Created, StoreError> {
        let record = self.repo.create(hex_code).await?;
        tracing::info!(hex = %record.hex_code, "generated color");

        let sync = self.coordinator.notify_created();
        Ok(Created { record, sync })
    }

    pub async fn list_all(&self) -> Result<Vec<ColorRecord>, StoreError> {
        self.repo.list_all().await
    }

    pub async fn list_unsynced(&self) -> Result<Vec<ColorRecord>, StoreError> {
        self.repo.list_unsynced().await
    }

    pub async fn status(&self) -> Result<SyncStatus, StoreError> {
        let records = self.repo.list_all().await?;
        let unsynced = records.iter().filter(|r| !r.synced).count();

        tracing::debug!(total = records.len(), unsynced, "fetched colors");

        Ok(SyncStatus {
            total: records.len(),
            unsynced,
            connectivity: self.coordinator.connectivity(),
        })
    }

    pub fn is_online(&self) -> bool {
        self.coordinator.is_online()
    }
}
