use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::probe::ReachabilityProbe;
use super::tracker::ConnectivityTracker;
use super::{Connectivity, ConnectivityEvent};

/// Default time between reachability checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Background task that watches reachability.
///
/// The latest known state is readable at any time through [`is_online`],
/// and every transition is delivered, in order, on the event channel
/// returned by [`spawn`]. The task stops when the monitor is dropped.
///
/// [`is_online`]: ConnectivityMonitor::is_online
/// [`spawn`]: ConnectivityMonitor::spawn
pub struct ConnectivityMonitor {
    status: watch::Receiver<Option<Connectivity>>,
    handle: JoinHandle<()>,
}

impl ConnectivityMonitor {
    /// Start watching. Must be called from within a tokio runtime.
    pub fn spawn(
        probe: Arc<dyn ReachabilityProbe>,
        poll_interval: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectivityEvent>) {
        let (status_tx, status_rx) = watch::channel(None);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(run(probe, poll_interval, status_tx, events_tx));

        (
            Self {
                status: status_rx,
                handle,
            },
            events_rx,
        )
    }

    /// Last observed state, or `None` before the first check completes.
    pub fn current(&self) -> Option<Connectivity> {
        *self.status.borrow()
    }

    pub fn is_online(&self) -> bool {
        self.current().is_some_and(Connectivity::is_online)
    }

    /// Level view of connectivity for consumers that only need the latest state.
    pub fn status(&self) -> watch::Receiver<Option<Connectivity>> {
        self.status.clone()
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn run(
    probe: Arc<dyn ReachabilityProbe>,
    poll_interval: Duration,
    status_tx: watch::Sender<Option<Connectivity>>,
    events_tx: mpsc::UnboundedSender<ConnectivityEvent>,
) {
    let mut tracker = ConnectivityTracker::new();

    loop {
        let reachable = probe.is_reachable().await;

        if let Some(event) = tracker.observe(reachable) {
            tracing::info!(
                previous = ?event.previous,
                current = %event.current,
                "network status changed"
            );
            // Level first, so whoever handles the event reads the new state.
            status_tx.send_replace(Some(event.current));
            if events_tx.send(event).is_err() {
                tracing::debug!("no connectivity listener, event dropped");
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(poll_interval) => {}
            _ = probe.changed() => {}
        }
    }
}
