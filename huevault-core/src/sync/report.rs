use std::fmt;
use std::time::Duration;

use uuid::Uuid;

use super::error::RemoteSyncError;
use crate::models::HexCode;

/// Why one record was left unsynced by a run.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncFailureReason {
    #[error(transparent)]
    Remote(#[from] RemoteSyncError),
    /// The push went through (or was about to) but the local store failed.
    #[error("Local store error: {0}")]
    Persistence(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncFailure {
    pub id: Uuid,
    pub hex_code: HexCode,
    pub reason: SyncFailureReason,
}

/// What happened to a single record during a run.
#[derive(Debug)]
pub(crate) enum RecordOutcome {
    Synced,
    /// Another run owned the record, or it was already synced.
    Skipped,
    Failed(SyncFailure),
}

/// Summary of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    /// Records this run tried to push.
    pub attempted: usize,
    pub succeeded: usize,
    /// Records left alone because another run had them or they were already synced.
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
    /// Set when the unsynced records could not be read at all.
    pub store_error: Option<String>,
    pub elapsed: Duration,
}

impl SyncReport {
    pub(crate) fn unreadable(error: String) -> Self {
        Self {
            store_error: Some(error),
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: RecordOutcome) {
        match outcome {
            RecordOutcome::Synced => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed(failure) => {
                self.attempted += 1;
                self.failures.push(failure);
            }
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub fn failed_ids(&self) -> Vec<Uuid> {
        self.failures.iter().map(|f| f.id).collect()
    }

    /// True when nothing failed and the store could be read.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.store_error.is_none()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "attempted={} succeeded={} failed={} skipped={}",
            self.attempted,
            self.succeeded,
            self.failed(),
            self.skipped
        )
    }
}
