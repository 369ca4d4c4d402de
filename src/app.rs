//! Shared setup for commands: database, remote store and reachability probe.

use std::sync::Arc;

use huevault_core::{
    init_db, ColorRepository, Connectivity, HttpProbe, HttpRemoteStore, ReachabilityProbe,
    Reconciler, ReconcilerOptions, StoreError,
};

use crate::config::Config;

pub struct App {
    pub config: Config,
    pub repo: ColorRepository,
}

impl App {
    /// Open the configured database, creating it on first use.
    pub async fn open(config: Config) -> Result<Self, StoreError> {
        let pool = init_db(&config.database_path.value).await?;
        Ok(Self {
            config,
            repo: ColorRepository::new(pool),
        })
    }

    /// Identity attached to every pushed color: the configured device id,
    /// otherwise the id generated for this install.
    pub async fn sync_identity(&self) -> Result<String, StoreError> {
        match &self.config.device_id.value {
            Some(id) => Ok(id.clone()),
            None => self.repo.install_id().await,
        }
    }

    /// Build a reconciler for the configured remote store, if there is one.
    pub async fn reconciler(&self) -> Result<Option<Reconciler>, StoreError> {
        let sync = &self.config.sync;
        let Some(server_url) = &sync.server_url else {
            return Ok(None);
        };

        let remote = HttpRemoteStore::new(
            server_url.clone(),
            sync.api_key.clone(),
            sync.collection.clone(),
        );
        let options = ReconcilerOptions {
            push_timeout: sync.push_timeout(),
            max_concurrent_pushes: sync.max_concurrent_pushes,
        };

        Ok(Some(Reconciler::new(
            self.repo.clone(),
            Arc::new(remote),
            self.sync_identity().await?,
            options,
        )))
    }

    pub fn probe(&self) -> Option<HttpProbe> {
        self.config
            .probe_url()
            .map(|url| HttpProbe::new(url).with_timeout(self.config.connectivity.probe_timeout()))
    }

    /// One reachability check; `None` when there is nothing to probe.
    pub async fn check_connectivity(&self) -> Option<Connectivity> {
        let probe = self.probe()?;
        Some(Connectivity::from_reachable(probe.is_reachable().await))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn open_app(temp_dir: &TempDir, device_id: Option<&str>) -> App {
        let mut config = Config::load(Some(temp_dir.path().join("missing.yaml"))).unwrap();
        config.database_path.value = temp_dir.path().join("test.db");
        config.device_id.value = device_id.map(str::to_string);
        config.sync.server_url = None;
        config.connectivity.probe_url = None;
        App::open(config).await.unwrap()
    }

    #[tokio::test]
    async fn test_sync_identity_prefers_configured_device_id() {
        let temp_dir = TempDir::new().unwrap();
        let app = open_app(&temp_dir, Some("tablet")).await;
        assert_eq!(app.sync_identity().await.unwrap(), "tablet");
    }

    #[tokio::test]
    async fn test_sync_identity_falls_back_to_install_id() {
        let temp_dir = TempDir::new().unwrap();
        let app = open_app(&temp_dir, None).await;

        let first = app.sync_identity().await.unwrap();
        assert_eq!(first, app.sync_identity().await.unwrap());
    }

    #[tokio::test]
    async fn test_no_reconciler_without_server() {
        let temp_dir = TempDir::new().unwrap();
        let app = open_app(&temp_dir, None).await;

        assert!(app.reconciler().await.unwrap().is_none());
        assert!(app.check_connectivity().await.is_none());
    }
}
