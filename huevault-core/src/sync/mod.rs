//! Offline-first sync of local colors to a remote document store.
//!
//! Colors are written locally first and flagged unsynced. A reconciliation
//! run pushes every unsynced color independently and flags the ones the
//! remote accepted. Failed pushes stay unsynced and are picked up by the
//! next run.

mod error;
mod reconciler;
mod remote;
mod report;

pub use error::RemoteSyncError;
pub use reconciler::{
    Reconciler, ReconcilerOptions, DEFAULT_MAX_CONCURRENT_PUSHES, DEFAULT_PUSH_TIMEOUT,
};
pub use remote::{HttpRemoteStore, RemoteStore, RemoteSyncRequest};
pub use report::{SyncFailure, SyncFailureReason, SyncReport};

#[cfg(test)]
pub(crate) use remote::fake::FakeRemote;
