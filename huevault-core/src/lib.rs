//! HueVault Core Library
//!
//! Local-first color store with opportunistic sync to a remote document
//! store whenever the network comes back.

pub mod connectivity;
pub mod coordinator;
pub mod db;
pub mod models;
pub mod sync;
pub mod vault;

pub use connectivity::{
    Connectivity, ConnectivityEvent, ConnectivityMonitor, HttpProbe, ManualProbe,
    ReachabilityProbe,
};
pub use coordinator::{CompletedRun, RunState, Trigger, TriggerCoordinator, TriggerOutcome};
pub use db::{init_db, ColorRepository, MarkSynced, StoreError};
pub use models::{ColorRecord, HexCode, HexCodeError};
pub use sync::{
    HttpRemoteStore, Reconciler, ReconcilerOptions, RemoteStore, RemoteSyncError,
    RemoteSyncRequest, SyncFailure, SyncFailureReason, SyncReport,
};
pub use vault::{Created, SyncStatus, Vault};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
