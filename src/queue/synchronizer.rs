//! Queue synchronizer: keeps the provider queue in step with the triage service.
//!
//! A single worker task owns the case set. Two timers drive it:
//! - queue refresh (coarse): reload the listing, replace the set
//! - status poll (fine): query every pending case with correlation ids
//!
//! Fetches run in spawned tasks and report back over one channel, so every
//! mutation of the case set happens in the worker, one message at a time.
//! Consumers read the latest state from a `watch` snapshot.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::client::{StatusData, TriageApi};
use super::reconcile::{
    load_queue, merge_status, poll_case_status, pollable_cases, replace_cases, sorted_cases,
    QueueLoad, QueueSource,
};
use crate::config::SyncConfig;
use crate::models::{PatientCase, SortOrder, TriageRecord};
use crate::store::{read_latest_record, LocalStore};

/// Buffer for worker messages (results + commands).
const MESSAGE_BUFFER: usize = 64;

// ═══════════════════════════════════════════════════════════
// Snapshot
// ═══════════════════════════════════════════════════════════

/// Point-in-time view of the queue.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueueSnapshot {
    pub cases: Vec<PatientCase>,
    /// `None` until the first load lands.
    pub source: Option<QueueSource>,
    pub refreshed_at: Option<DateTime<Utc>>,
    /// Number of queue loads applied so far.
    pub generation: u64,
}

impl QueueSnapshot {
    pub fn sorted(&self, order: SortOrder) -> Vec<PatientCase> {
        sorted_cases(&self.cases, order)
    }

    pub fn pending_count(&self) -> usize {
        self.cases.iter().filter(|c| !c.is_completed()).count()
    }

    pub fn get(&self, id: &str) -> Option<&PatientCase> {
        self.cases.iter().find(|c| c.id == id)
    }
}

// ═══════════════════════════════════════════════════════════
// Messages
// ═══════════════════════════════════════════════════════════

enum SyncMessage {
    /// Reload the listing now instead of waiting for the next tick.
    Refresh,
    QueueLoaded(QueueLoad),
    StatusResolved {
        case_id: String,
        data: Option<StatusData>,
    },
}

// ═══════════════════════════════════════════════════════════
// SyncHandle
// ═══════════════════════════════════════════════════════════

/// Handle for a running synchronizer.
///
/// Dropping the handle tears the worker down, same as `shutdown()`.
pub struct SyncHandle {
    snapshot: watch::Receiver<QueueSnapshot>,
    commands: mpsc::Sender<SyncMessage>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncHandle {
    /// Latest published state.
    pub fn snapshot(&self) -> QueueSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified on every published change.
    pub fn subscribe(&self) -> watch::Receiver<QueueSnapshot> {
        self.snapshot.clone()
    }

    /// Ask for an immediate queue reload. False once the worker is gone.
    pub async fn refresh(&self) -> bool {
        self.commands.send(SyncMessage::Refresh).await.is_ok()
    }

    /// Stop both timers. Fetches already in flight finish but their results
    /// are discarded.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Queue synchronizer shutdown signal sent");
        }
    }

    /// Shut down and wait for the worker to exit.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ═══════════════════════════════════════════════════════════
// QueueSynchronizer
// ═══════════════════════════════════════════════════════════

/// Builder for the synchronizer worker.
pub struct QueueSynchronizer {
    api: Arc<dyn TriageApi>,
    store: Arc<dyn LocalStore>,
    poll_interval: Duration,
    queue_poll_interval: Duration,
}

impl QueueSynchronizer {
    pub fn new(api: Arc<dyn TriageApi>, store: Arc<dyn LocalStore>, config: &SyncConfig) -> Self {
        Self {
            api,
            store,
            poll_interval: config.poll_interval,
            queue_poll_interval: config.queue_poll_interval,
        }
    }

    pub fn with_intervals(mut self, poll_interval: Duration, queue_poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.queue_poll_interval = queue_poll_interval;
        self
    }

    /// Read the local store once and spawn the worker. Both timers fire
    /// immediately, then at their cadence. Must be called inside a tokio
    /// runtime.
    pub fn start(self) -> SyncHandle {
        let local = read_latest_record(self.store.as_ref());
        let (snapshot_tx, snapshot_rx) = watch::channel(QueueSnapshot::default());
        let (tx, rx) = mpsc::channel(MESSAGE_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let worker = SyncWorker {
            api: self.api,
            local,
            cases: Vec::new(),
            source: None,
            refreshed_at: None,
            generation: 0,
            queue_in_flight: false,
            status_in_flight: HashSet::new(),
            tx: tx.clone(),
            snapshot_tx,
        };

        let poll_interval = self.poll_interval;
        let queue_poll_interval = self.queue_poll_interval;
        let task = tokio::spawn(async move {
            tracing::info!(
                poll_ms = poll_interval.as_millis() as u64,
                queue_poll_ms = queue_poll_interval.as_millis() as u64,
                "Queue synchronizer started"
            );
            worker.run(rx, shutdown_rx, poll_interval, queue_poll_interval).await;
        });

        SyncHandle {
            snapshot: snapshot_rx,
            commands: tx,
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Worker
// ═══════════════════════════════════════════════════════════

struct SyncWorker {
    api: Arc<dyn TriageApi>,
    /// Local capture read at startup; reused by every fallback.
    local: Option<TriageRecord>,
    cases: Vec<PatientCase>,
    source: Option<QueueSource>,
    refreshed_at: Option<DateTime<Utc>>,
    generation: u64,
    queue_in_flight: bool,
    status_in_flight: HashSet<String>,
    tx: mpsc::Sender<SyncMessage>,
    snapshot_tx: watch::Sender<QueueSnapshot>,
}

impl SyncWorker {
    async fn run(
        mut self,
        mut rx: mpsc::Receiver<SyncMessage>,
        mut shutdown_rx: oneshot::Receiver<()>,
        poll_interval: Duration,
        queue_poll_interval: Duration,
    ) {
        let mut queue_tick = tokio::time::interval(queue_poll_interval);
        queue_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_tick = tokio::time::interval(poll_interval);
        status_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                // Fires on explicit shutdown and when the handle is dropped.
                _ = &mut shutdown_rx => break,
                msg = rx.recv() => match msg {
                    Some(msg) => self.handle(msg),
                    None => break,
                },
                _ = queue_tick.tick() => self.spawn_queue_refresh(),
                _ = status_tick.tick() => self.spawn_status_polls(),
            }
        }

        tracing::info!("Queue synchronizer stopped");
    }

    fn handle(&mut self, msg: SyncMessage) {
        match msg {
            SyncMessage::Refresh => self.spawn_queue_refresh(),
            SyncMessage::QueueLoaded(load) => self.apply_queue(load),
            SyncMessage::StatusResolved { case_id, data } => {
                self.status_in_flight.remove(&case_id);
                if let Some(data) = data {
                    self.apply_status(&case_id, &data);
                }
            }
        }
    }

    fn spawn_queue_refresh(&mut self) {
        if self.queue_in_flight {
            tracing::debug!("Queue refresh still in flight, skipping tick");
            return;
        }
        self.queue_in_flight = true;

        let api = Arc::clone(&self.api);
        let local = self.local.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let load = load_queue(api.as_ref(), local.as_ref(), Utc::now()).await;
            // Closed channel means the synchronizer was torn down.
            let _ = tx.send(SyncMessage::QueueLoaded(load)).await;
        });
    }

    fn spawn_status_polls(&mut self) {
        let targets: Vec<PatientCase> = pollable_cases(&self.cases)
            .filter(|c| !self.status_in_flight.contains(&c.id))
            .cloned()
            .collect();

        if targets.is_empty() {
            return;
        }
        tracing::debug!(count = targets.len(), "Polling pending patient(s)");

        for case in targets {
            self.status_in_flight.insert(case.id.clone());
            let api = Arc::clone(&self.api);
            let tx = self.tx.clone();
            tokio::spawn(async move {
                let data = poll_case_status(api.as_ref(), &case).await;
                let _ = tx
                    .send(SyncMessage::StatusResolved {
                        case_id: case.id,
                        data,
                    })
                    .await;
            });
        }
    }

    fn apply_queue(&mut self, load: QueueLoad) {
        self.queue_in_flight = false;
        self.cases = replace_cases(&self.cases, load.cases);
        // Ids that left the queue no longer need their in-flight marker.
        let ids: HashSet<&str> = self.cases.iter().map(|c| c.id.as_str()).collect();
        self.status_in_flight.retain(|id| ids.contains(id.as_str()));

        self.source = Some(load.source);
        self.refreshed_at = Some(Utc::now());
        self.generation += 1;
        tracing::debug!(
            count = self.cases.len(),
            pending = self.cases.iter().filter(|c| !c.is_completed()).count(),
            "Patient queue replaced"
        );
        self.publish();
    }

    fn apply_status(&mut self, case_id: &str, data: &StatusData) {
        if merge_status(&mut self.cases, case_id, data) {
            tracing::info!(case_id = %case_id, "Patient case completed");
            self.publish();
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(QueueSnapshot {
            cases: self.cases.clone(),
            source: self.source.clone(),
            refreshed_at: self.refreshed_at,
            generation: self.generation,
        });
    }
}
