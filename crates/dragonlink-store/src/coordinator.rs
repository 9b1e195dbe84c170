//! Store Coordinator
//!
//! Every store mutation runs on one worker task reading a bounded FIFO queue.
//! Producers on any task submit updates; the worker applies them in the order
//! they were queued, so two reports from the same socket always land in the
//! order they arrived.

use crate::metrics::StoreMetrics;
use crate::store::{Identified, StatusStore, Store, TelemetryStore, Upserted};
use dragonlink_core::config::IngestConfig;
use dragonlink_cot::{Record, StatusRecord, TelemetryRecord};
use flume::{Receiver, Sender};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// A mutation for one of the stores
#[derive(Debug, Clone)]
pub enum StoreUpdate {
    Telemetry(TelemetryRecord),
    Status(StatusRecord),
    ClearTelemetry,
    ClearStatus,
}

impl From<Record> for StoreUpdate {
    fn from(record: Record) -> Self {
        match record {
            Record::Telemetry(t) => StoreUpdate::Telemetry(t),
            Record::Status(s) => StoreUpdate::Status(s),
        }
    }
}

/// What an applied update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Upserted(Upserted),
    Cleared(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The coordinator was stopped; the update was not applied
    #[error("Store coordinator is stopped")]
    Stopped,
}

enum Job {
    Update {
        update: StoreUpdate,
        ack: Option<oneshot::Sender<Applied>>,
    },
    Barrier(oneshot::Sender<()>),
}

/// Owns both stores and serializes every write to them
pub struct StoreCoordinator {
    tx: parking_lot::Mutex<Option<Sender<Job>>>,
    rx: Receiver<Job>,
    telemetry: Arc<TelemetryStore>,
    status: Arc<StatusStore>,
    metrics: Arc<StoreMetrics>,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl StoreCoordinator {
    pub fn new(config: &IngestConfig) -> Self {
        let (tx, rx) = flume::bounded(config.channel_capacity.max(1));

        Self {
            tx: parking_lot::Mutex::new(Some(tx)),
            rx,
            telemetry: Arc::new(Store::new("telemetry", config.event_capacity)),
            status: Arc::new(Store::new("status", config.event_capacity)),
            metrics: Arc::new(StoreMetrics::new()),
            worker: parking_lot::Mutex::new(None),
        }
    }

    /// Spawn the worker task. Calling it again while running does nothing.
    pub fn start(&self) {
        let mut worker = self.worker.lock();
        if worker.is_some() {
            return;
        }

        let rx = self.rx.clone();
        let telemetry = Arc::clone(&self.telemetry);
        let status = Arc::clone(&self.status);
        let metrics = Arc::clone(&self.metrics);

        *worker = Some(tokio::spawn(async move {
            debug!("Store coordinator worker started");
            while let Ok(job) = rx.recv_async().await {
                match job {
                    Job::Update { update, ack } => {
                        let applied = apply_update(&telemetry, &status, &metrics, update);
                        if let Some(ack) = ack {
                            let _ = ack.send(applied);
                        }
                    }
                    Job::Barrier(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("Store coordinator worker stopped");
        }));

        info!("Store coordinator started");
    }

    /// Queue an update and wait until it has been applied.
    ///
    /// A read of either store after this returns observes the update.
    pub async fn apply(&self, update: StoreUpdate) -> Result<Applied, CoordinatorError> {
        let (ack, done) = oneshot::channel();
        self.enqueue(Job::Update {
            update,
            ack: Some(ack),
        })
        .await?;
        done.await.map_err(|_| CoordinatorError::Stopped)
    }

    /// Queue an update without waiting for it to be applied.
    ///
    /// Waits only while the queue is full.
    pub async fn submit(&self, update: StoreUpdate) -> Result<(), CoordinatorError> {
        self.enqueue(Job::Update { update, ack: None }).await
    }

    /// Wait until every update queued before this call has been applied.
    pub async fn flush(&self) -> Result<(), CoordinatorError> {
        let (done, flushed) = oneshot::channel();
        self.enqueue(Job::Barrier(done)).await?;
        flushed.await.map_err(|_| CoordinatorError::Stopped)
    }

    async fn enqueue(&self, job: Job) -> Result<(), CoordinatorError> {
        let tx = self.tx.lock().clone().ok_or(CoordinatorError::Stopped)?;
        tx.send_async(job)
            .await
            .map_err(|_| CoordinatorError::Stopped)
    }

    /// Close the queue, apply what is already in it and stop the worker.
    pub async fn stop(&self) {
        info!("Stopping store coordinator");
        self.tx.lock().take();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            let _ = worker.await;
        }

        info!(
            telemetry = self.telemetry.len(),
            status = self.status.len(),
            "Store coordinator stopped"
        );
    }

    pub fn telemetry(&self) -> Arc<TelemetryStore> {
        Arc::clone(&self.telemetry)
    }

    pub fn status(&self) -> Arc<StatusStore> {
        Arc::clone(&self.status)
    }

    pub fn metrics(&self) -> Arc<StoreMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Updates queued but not yet applied.
    pub fn pending_count(&self) -> usize {
        self.rx.len()
    }
}

fn apply_update(
    telemetry: &TelemetryStore,
    status: &StatusStore,
    metrics: &StoreMetrics,
    update: StoreUpdate,
) -> Applied {
    match update {
        StoreUpdate::Telemetry(record) => Applied::Upserted(upsert(telemetry, metrics, record)),
        StoreUpdate::Status(record) => Applied::Upserted(upsert(status, metrics, record)),
        StoreUpdate::ClearTelemetry => Applied::Cleared(clear(telemetry, metrics)),
        StoreUpdate::ClearStatus => Applied::Cleared(clear(status, metrics)),
    }
}

fn upsert<R: Identified>(store: &Store<R>, metrics: &StoreMetrics, record: R) -> Upserted {
    let identity = record.identity().to_string();
    let outcome = store.upsert(record);
    match outcome {
        Upserted::Inserted(index) => {
            metrics.record_inserted(store.name());
            debug!(store = store.name(), identity = %identity, index, "New record");
        }
        Upserted::Updated(_) => metrics.record_updated(store.name()),
    }
    outcome
}

fn clear<R: Identified>(store: &Store<R>, metrics: &StoreMetrics) -> usize {
    let removed = store.clear();
    metrics.record_clear(store.name());
    info!(store = store.name(), removed, "Store cleared");
    removed
}
