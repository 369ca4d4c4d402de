//! Decides when reconciliation runs happen.
//!
//! Runs are single-flight: while one is in progress, any number of triggers
//! collapse into at most one follow-up run that starts once the current one
//! ends. Further triggers while a follow-up is already pending are dropped.

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch, Notify};
use tokio::task::JoinHandle;

use crate::connectivity::{Connectivity, ConnectivityEvent};
use crate::sync::{Reconciler, SyncReport};

/// Capacity of the completed-run broadcast. Slow subscribers miss old runs.
const REPORT_CHANNEL_CAPACITY: usize = 16;

/// Why a run was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A color was created while online.
    Created,
    /// Connectivity went from offline (or unknown) to online.
    CameOnline,
    /// Explicit request, e.g. from a command.
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Created => write!(f, "created"),
            Trigger::CameOnline => write!(f, "came-online"),
            Trigger::Manual => write!(f, "manual"),
        }
    }
}

/// What happened to a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A run will start, now or right after the current one.
    Scheduled,
    /// A run was already pending; this trigger folded into it.
    Coalesced,
}

/// Snapshot of the coordinator's run state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunState {
    pub running: bool,
    pub pending: Option<Trigger>,
    pub completed: u64,
}

impl RunState {
    pub fn is_idle(&self) -> bool {
        !self.running && self.pending.is_none()
    }
}

/// A finished run, as delivered to subscribers.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    /// 1-based run number.
    pub run: u64,
    pub trigger: Trigger,
    pub report: SyncReport,
}

struct Shared {
    state: watch::Sender<RunState>,
    wake: Notify,
    connectivity: watch::Receiver<Option<Connectivity>>,
}

impl Shared {
    fn trigger(&self, reason: Trigger) -> TriggerOutcome {
        let scheduled = self.state.send_if_modified(|s| {
            if s.pending.is_some() {
                return false;
            }
            s.pending = Some(reason);
            true
        });

        if scheduled {
            tracing::debug!(trigger = %reason, "reconciliation scheduled");
            self.wake.notify_one();
            TriggerOutcome::Scheduled
        } else {
            tracing::debug!(trigger = %reason, "reconciliation already pending, trigger dropped");
            TriggerOutcome::Coalesced
        }
    }

    fn is_online(&self) -> bool {
        self.connectivity.borrow().is_some_and(Connectivity::is_online)
    }
}

/// Owns the reconciliation worker and the triggers feeding it.
///
/// Background tasks stop when the coordinator is dropped.
pub struct TriggerCoordinator {
    shared: Arc<Shared>,
    reports: broadcast::Sender<CompletedRun>,
    worker: JoinHandle<()>,
    listener: Option<JoinHandle<()>>,
}

impl TriggerCoordinator {
    /// Start the worker. `connectivity` is the level used to decide whether a
    /// newly created color should trigger a run.
    pub fn spawn(
        reconciler: Reconciler,
        connectivity: watch::Receiver<Option<Connectivity>>,
    ) -> Self {
        let (state, _) = watch::channel(RunState::default());
        let (reports, _) = broadcast::channel(REPORT_CHANNEL_CAPACITY);

        let shared = Arc::new(Shared {
            state,
            wake: Notify::new(),
            connectivity,
        });

        let worker = tokio::spawn(run_worker(reconciler, shared.clone(), reports.clone()));

        Self {
            shared,
            reports,
            worker,
            listener: None,
        }
    }

    /// Trigger a run on every transition into `Online` delivered on `events`.
    pub fn listen(&mut self, mut events: mpsc::UnboundedReceiver<ConnectivityEvent>) {
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if event.came_online() {
                    tracing::info!("came online, triggering sync");
                    shared.trigger(Trigger::CameOnline);
                }
            }
        });

        if let Some(old) = self.listener.replace(handle) {
            old.abort();
        }
    }

    pub fn trigger(&self, reason: Trigger) -> TriggerOutcome {
        self.shared.trigger(reason)
    }

    /// Call after a color was stored. Triggers a run only when online.
    pub fn notify_created(&self) -> Option<TriggerOutcome> {
        if self.shared.is_online() {
            tracing::info!("online, triggering immediate sync");
            Some(self.shared.trigger(Trigger::Created))
        } else {
            tracing::info!("offline, color left unsynced");
            None
        }
    }

    pub fn is_online(&self) -> bool {
        self.shared.is_online()
    }

    pub fn connectivity(&self) -> Option<Connectivity> {
        *self.shared.connectivity.borrow()
    }

    pub fn state(&self) -> RunState {
        self.shared.state.borrow().clone()
    }

    pub fn runs_completed(&self) -> u64 {
        self.shared.state.borrow().completed
    }

    /// Receive every run that finishes after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CompletedRun> {
        self.reports.subscribe()
    }

    /// Wait until no run is in progress or pending.
    pub async fn wait_idle(&self) {
        let mut rx = self.shared.state.subscribe();
        // Only fails if the sender is gone, which cannot happen while `self` lives.
        let _ = rx.wait_for(RunState::is_idle).await;
    }
}

impl Drop for TriggerCoordinator {
    fn drop(&mut self) {
        self.worker.abort();
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

async fn run_worker(
    reconciler: Reconciler,
    shared: Arc<Shared>,
    reports: broadcast::Sender<CompletedRun>,
) {
    loop {
        shared.wake.notified().await;

        let mut next = None;
        shared.state.send_if_modified(|s| {
            next = s.pending.take();
            if next.is_some() {
                s.running = true;
            }
            next.is_some()
        });
        let Some(trigger) = next else {
            continue;
        };

        tracing::info!(%trigger, "starting reconciliation");
        let report = reconciler.reconcile().await;

        // Only this task changes `completed`.
        let run = shared.state.borrow().completed + 1;

        // Publish before going idle so anyone who waited for idle can read it.
        // No subscribers is fine.
        let _ = reports.send(CompletedRun {
            run,
            trigger,
            report,
        });

        shared.state.send_modify(|s| {
            s.running = false;
            s.completed = run;
        });
    }
}
