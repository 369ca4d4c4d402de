//! Pushes unsynced colors to the remote store and marks the accepted ones.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use uuid::Uuid;

use super::remote::{RemoteStore, RemoteSyncRequest};
use super::report::{RecordOutcome, SyncFailure, SyncFailureReason, SyncReport};
use super::RemoteSyncError;
use crate::db::ColorRepository;
use crate::models::ColorRecord;

/// Default deadline for a single remote push.
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of pushes allowed in flight at once.
pub const DEFAULT_MAX_CONCURRENT_PUSHES: usize = 4;
/// Extra time a claim is held beyond the push deadline.
const CLAIM_GRACE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ReconcilerOptions {
    pub push_timeout: Duration,
    pub max_concurrent_pushes: usize,
}

impl Default for ReconcilerOptions {
    fn default() -> Self {
        Self {
            push_timeout: DEFAULT_PUSH_TIMEOUT,
            max_concurrent_pushes: DEFAULT_MAX_CONCURRENT_PUSHES,
        }
    }
}

/// Runs reconciliation passes over the unsynced colors.
///
/// Each record is claimed in the store before it is pushed, so overlapping
/// runs never push the same record twice at once, whether they share this
/// reconciler or come from another process on the same database.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

struct Inner {
    repo: ColorRepository,
    remote: Arc<dyn RemoteStore>,
    sync_id: String,
    options: ReconcilerOptions,
}

impl Reconciler {
    /// `sync_id` is sent with every document as its sync identity.
    pub fn new(
        repo: ColorRepository,
        remote: Arc<dyn RemoteStore>,
        sync_id: impl Into<String>,
        options: ReconcilerOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                repo,
                remote,
                sync_id: sync_id.into(),
                options,
            }),
        }
    }

    /// Push every unsynced color once.
    ///
    /// Never fails: per-record problems end up in the report, and an
    /// unreadable store yields an empty run with `store_error` set.
    pub async fn reconcile(&self) -> SyncReport {
        let started = Instant::now();

        let unsynced = match self.inner.repo.list_unsynced().await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(error = %e, "could not read unsynced colors, skipping run");
                let mut report = SyncReport::unreadable(e.to_string());
                report.elapsed = started.elapsed();
                return report;
            }
        };

        tracing::info!(count = unsynced.len(), "found unsynced colors to sync");

        let concurrency = self.inner.options.max_concurrent_pushes.max(1);
        let outcomes: Vec<RecordOutcome> = stream::iter(unsynced)
            .map(|record| {
                let this = self.clone();
                async move { this.sync_record(record).await }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut report = SyncReport::default();
        for outcome in outcomes {
            report.record(outcome);
        }
        report.elapsed = started.elapsed();

        tracing::info!(%report, "reconciliation finished");
        report
    }

    /// How long a claim blocks other runs. Outlives the push it guards.
    fn claim_lease(&self) -> Duration {
        self.inner.options.push_timeout.saturating_add(CLAIM_GRACE)
    }

    async fn release(&self, id: Uuid, token: &str) {
        if let Err(e) = self.inner.repo.release(id, token).await {
            tracing::warn!(%id, error = %e, "could not release claim, it will expire");
        }
    }

    async fn sync_record(&self, record: ColorRecord) -> RecordOutcome {
        let failed = |reason: SyncFailureReason| {
            RecordOutcome::Failed(SyncFailure {
                id: record.id,
                hex_code: record.hex_code.clone(),
                reason,
            })
        };

        let token = Uuid::new_v4().to_string();
        match self.inner.repo.claim(record.id, &token, self.claim_lease()).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(
                    id = %record.id,
                    "already synced or claimed by another run, skipping"
                );
                return RecordOutcome::Skipped;
            }
            Err(e) => return failed(SyncFailureReason::Persistence(e.to_string())),
        }

        let request = RemoteSyncRequest::from_record(&record, &self.inner.sync_id);
        tracing::debug!(id = %record.id, hex = %record.hex_code, "pushing color");

        let push_timeout = self.inner.options.push_timeout;
        let pushed = match timeout(push_timeout, self.inner.remote.insert_document(&request)).await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteSyncError::Timeout(push_timeout)),
        };

        if let Err(e) = pushed {
            tracing::warn!(id = %record.id, hex = %record.hex_code, error = %e, "sync failed");
            self.release(record.id, &token).await;
            return failed(e.into());
        }

        match self.inner.repo.mark_synced(record.id).await {
            Ok(_) => {
                tracing::debug!(id = %record.id, hex = %record.hex_code, "sync successful");
                RecordOutcome::Synced
            }
            Err(e) => {
                tracing::error!(
                    id = %record.id,
                    error = %e,
                    "remote accepted color but marking it synced failed"
                );
                self.release(record.id, &token).await;
                failed(SyncFailureReason::Persistence(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use crate::models::HexCode;
    use crate::sync::FakeRemote;
    use tempfile::TempDir;

    struct TestContext {
        repo: ColorRepository,
        _temp_dir: TempDir, // Keep alive for duration of test
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_db(&temp_dir.path().join("test.db")).await.unwrap();
        TestContext {
            repo: ColorRepository::new(pool),
            _temp_dir: temp_dir,
        }
    }

    async fn seed(repo: &ColorRepository, n: u32) -> Vec<ColorRecord> {
        let mut records = Vec::new();
        for i in 1..=n {
            records.push(repo.create(HexCode::from_rgb(i)).await.unwrap());
        }
        records
    }

    fn reconciler(repo: &ColorRepository, remote: Arc<FakeRemote>) -> Reconciler {
        Reconciler::new(repo.clone(), remote, "device-1", ReconcilerOptions::default())
    }

    #[tokio::test]
    async fn test_all_accepted() {
        let ctx = setup().await;
        seed(&ctx.repo, 5).await;
        let remote = Arc::new(FakeRemote::accepting());

        let report = reconciler(&ctx.repo, remote.clone()).reconcile().await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 5);
        assert_eq!(report.failed(), 0);
        assert!(report.is_clean());
        assert!(ctx.repo.list_unsynced().await.unwrap().is_empty());
        assert_eq!(remote.inserted().len(), 5);
        assert!(remote
            .inserted()
            .iter()
            .all(|r| r.sync_attempt_id == "device-1"));
    }

    #[tokio::test]
    async fn test_partial_rejection_leaves_failed_unsynced() {
        let ctx = setup().await;
        let records = seed(&ctx.repo, 5).await;
        let remote = Arc::new(FakeRemote::rejecting([
            records[1].hex_code.clone(),
            records[3].hex_code.clone(),
        ]));

        let report = reconciler(&ctx.repo, remote).reconcile().await;

        assert_eq!(report.attempted, 5);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed(), 2);

        let mut failed = report.failed_ids();
        failed.sort();
        let mut expected = vec![records[1].id, records[3].id];
        expected.sort();
        assert_eq!(failed, expected);
        assert!(report.failures.iter().all(|f| matches!(
            f.reason,
            SyncFailureReason::Remote(RemoteSyncError::Rejected { .. })
        )));

        let mut unsynced: Vec<Uuid> = ctx
            .repo
            .list_unsynced()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        unsynced.sort();
        assert_eq!(unsynced, expected);
    }

    #[tokio::test]
    async fn test_empty_store_attempts_nothing() {
        let ctx = setup().await;
        let report = reconciler(&ctx.repo, Arc::new(FakeRemote::accepting()))
            .reconcile()
            .await;

        assert_eq!(report.attempted, 0);
        assert!(report.is_clean());
    }

    #[tokio::test]
    async fn test_concurrent_runs_push_each_record_once() {
        let ctx = setup().await;
        let records = seed(&ctx.repo, 5).await;
        let remote = Arc::new(FakeRemote::accepting().with_delay(Duration::from_millis(50)));
        let reconciler = reconciler(&ctx.repo, remote.clone());

        let (a, b) = tokio::join!(reconciler.reconcile(), reconciler.reconcile());

        assert_eq!(a.succeeded + b.succeeded, 5);
        assert_eq!(a.failed() + b.failed(), 0);
        for record in &records {
            assert_eq!(remote.insert_count(&record.hex_code), 1);
        }
        assert!(ctx.repo.list_unsynced().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_runs_from_separate_reconcilers_push_once() {
        let ctx = setup().await;
        let records = seed(&ctx.repo, 3).await;
        let remote = Arc::new(FakeRemote::accepting().with_delay(Duration::from_millis(50)));
        // Same database, nothing shared in memory, as with two processes.
        let first = reconciler(&ctx.repo, remote.clone());
        let second = reconciler(&ctx.repo, remote.clone());

        let (a, b) = tokio::join!(first.reconcile(), second.reconcile());

        assert_eq!(a.succeeded + b.succeeded, 3);
        assert_eq!(a.failed() + b.failed(), 0);
        for record in &records {
            assert_eq!(remote.insert_count(&record.hex_code), 1);
        }
        assert_eq!(remote.inserted().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_push_is_retried_by_next_run() {
        let ctx = setup().await;
        let records = seed(&ctx.repo, 2).await;
        let rejecting = Arc::new(FakeRemote::rejecting([records[0].hex_code.clone()]));

        let first = reconciler(&ctx.repo, rejecting).reconcile().await;
        assert_eq!(first.failed(), 1);

        // The failed record's claim was released, so it is not skipped.
        let accepting = Arc::new(FakeRemote::accepting());
        let second = reconciler(&ctx.repo, accepting.clone()).reconcile().await;
        assert_eq!(second.attempted, 1);
        assert_eq!(second.succeeded, 1);
        assert_eq!(accepting.insert_count(&records[0].hex_code), 1);
    }

    #[tokio::test]
    async fn test_separate_reconcilers_do_not_repush_synced() {
        let ctx = setup().await;
        let records = seed(&ctx.repo, 3).await;
        let remote = Arc::new(FakeRemote::accepting());

        let first = reconciler(&ctx.repo, remote.clone()).reconcile().await;
        let second = reconciler(&ctx.repo, remote.clone()).reconcile().await;

        assert_eq!(first.succeeded, 3);
        assert_eq!(second.attempted, 0);
        for record in &records {
            assert_eq!(remote.insert_count(&record.hex_code), 1);
        }
    }

    #[tokio::test]
    async fn test_push_timeout_is_reported_not_retried() {
        let ctx = setup().await;
        seed(&ctx.repo, 2).await;
        let remote = Arc::new(FakeRemote::accepting().with_delay(Duration::from_millis(500)));
        let reconciler = Reconciler::new(
            ctx.repo.clone(),
            remote,
            "device-1",
            ReconcilerOptions {
                push_timeout: Duration::from_millis(20),
                max_concurrent_pushes: 2,
            },
        );

        let report = reconciler.reconcile().await;

        assert_eq!(report.attempted, 2);
        assert_eq!(report.failed(), 2);
        assert!(report.failures.iter().all(|f| matches!(
            f.reason,
            SyncFailureReason::Remote(RemoteSyncError::Timeout(_))
        )));
        assert_eq!(ctx.repo.list_unsynced().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_pushes_respect_concurrency_limit() {
        let ctx = setup().await;
        seed(&ctx.repo, 6).await;
        let remote = Arc::new(FakeRemote::accepting().with_delay(Duration::from_millis(20)));
        let reconciler = Reconciler::new(
            ctx.repo.clone(),
            remote.clone(),
            "device-1",
            ReconcilerOptions {
                push_timeout: DEFAULT_PUSH_TIMEOUT,
                max_concurrent_pushes: 2,
            },
        );

        let report = reconciler.reconcile().await;

        assert_eq!(report.succeeded, 6);
        assert!(remote.max_in_flight() <= 2);
    }

    #[tokio::test]
    async fn test_unreadable_store_yields_empty_report() {
        let ctx = setup().await;
        seed(&ctx.repo, 2).await;
        ctx.repo.pool().close().await;

        let report = reconciler(&ctx.repo, Arc::new(FakeRemote::accepting()))
            .reconcile()
            .await;

        assert_eq!(report.attempted, 0);
        assert!(report.store_error.is_some());
    }
}
