//! Commands that push unsynced colors to the remote store.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::sync::broadcast::error::RecvError;

use huevault_core::{ConnectivityMonitor, HexCode, StoreError, TriggerCoordinator, Vault};

use super::print_report;
use crate::app::App;

/// Push every unsynced color now
#[derive(Debug, Args)]
pub struct SyncCommand;

impl SyncCommand {
    pub async fn run(&self, app: &App) -> Result<(), SyncCommandError> {
        let reconciler = app
            .reconciler()
            .await?
            .ok_or(SyncCommandError::NotConfigured)?;

        println!("Syncing with server...");
        println!();

        let report = reconciler.reconcile().await;
        print_report(&report);

        if let Some(error) = report.store_error {
            return Err(SyncCommandError::Unreadable(error));
        }
        Ok(())
    }
}

/// Stay running and sync whenever the network comes back
#[derive(Debug, Args)]
pub struct WatchCommand {
    /// Also generate a random color every N seconds
    #[arg(long, value_name = "SECS")]
    generate_every: Option<u64>,
}

impl WatchCommand {
    pub async fn run(&self, app: &App) -> Result<(), SyncCommandError> {
        let reconciler = app
            .reconciler()
            .await?
            .ok_or(SyncCommandError::NotConfigured)?;
        let probe = app.probe().ok_or(SyncCommandError::NotConfigured)?;

        let poll_interval = app.config.connectivity.poll_interval();
        let (monitor, events) = ConnectivityMonitor::spawn(Arc::new(probe), poll_interval);
        let mut coordinator = TriggerCoordinator::spawn(reconciler, monitor.status());
        coordinator.listen(events);
        let mut runs = coordinator.subscribe();
        let vault = Vault::new(app.repo.clone(), coordinator);

        let mut generator = self
            .generate_every
            .filter(|secs| *secs > 0)
            .map(|secs| tokio::time::interval(Duration::from_secs(secs)));

        tracing::info!(?poll_interval, "watching connectivity");
        println!("Watching for connectivity changes. Press Ctrl-C to stop.");

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    println!();
                    println!("Stopping.");
                    break;
                }
                run = runs.recv() => match run {
                    Ok(completed) => {
                        println!("Run {} ({}):", completed.run, completed.trigger);
                        print_report(&completed.report);
                    }
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!(missed, "report output fell behind");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = tick(&mut generator) => {
                    let created = vault.add(HexCode::random()).await?;
                    println!(
                        "Generated color: {} ({})",
                        created.record.hex_code,
                        if created.sync.is_some() { "syncing" } else { "offline, kept locally" }
                    );
                }
            }
        }

        // Let an in-flight run finish so its records are marked.
        if !vault.coordinator().state().is_idle() {
            tracing::info!("waiting for the current run to finish");
            vault.coordinator().wait_idle().await;
        }

        let status = vault.status().await?;
        println!("{} color(s) still unsynced.", status.unsynced);
        Ok(())
    }
}

async fn tick(generator: &mut Option<tokio::time::Interval>) {
    match generator {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Errors from sync commands
#[derive(Debug)]
pub enum SyncCommandError {
    NotConfigured,
    Store(StoreError),
    Unreadable(String),
}

impl std::fmt::Display for SyncCommandError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncCommandError::NotConfigured => write!(
                f,
                "Sync not configured. Set sync.server_url in the config file or HUEVAULT_SYNC_URL"
            ),
            SyncCommandError::Store(e) => write!(f, "{}", e),
            SyncCommandError::Unreadable(e) => write!(f, "Could not read local colors: {}", e),
        }
    }
}

impl std::error::Error for SyncCommandError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SyncCommandError::Store(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StoreError> for SyncCommandError {
    fn from(e: StoreError) -> Self {
        SyncCommandError::Store(e)
    }
}
