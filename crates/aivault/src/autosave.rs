//! Debounced background saves.
//!
//! Each scheduled snapshot replaces the previous one and restarts the quiet
//! period, so the write that finally happens is always of the latest state.

use std::sync::Arc;
use std::time::Duration;

use aivault_engine::PersistenceGateway;
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Idle,
    Save(Value),
    Cancelled,
}

/// Cheap handle for scheduling saves from store listeners.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    tx: Arc<watch::Sender<Pending>>,
}

impl SaveScheduler {
    /// Schedules `state` to be written after the quiet period.
    pub fn schedule(&self, state: Value) {
        self.tx.send_replace(Pending::Save(state));
    }

    /// Drops any save that has not been written yet.
    pub fn cancel(&self) {
        self.tx.send_replace(Pending::Cancelled);
    }
}

/// Background task writing debounced saves through a [`PersistenceGateway`].
#[derive(Debug)]
pub struct AutoSaver {
    scheduler: SaveScheduler,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Spawns the save task on the current tokio runtime.
    #[instrument(skip(gateway))]
    pub fn spawn(gateway: Arc<PersistenceGateway>, debounce: Duration) -> Self {
        let (tx, rx) = watch::channel(Pending::Idle);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(run(gateway, debounce, rx, shutdown_rx));
        info!(debounce_ms = debounce.as_millis() as u64, "Autosave started");
        Self {
            scheduler: SaveScheduler { tx: Arc::new(tx) },
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// A handle for scheduling saves.
    pub fn scheduler(&self) -> SaveScheduler {
        self.scheduler.clone()
    }

    /// Schedules `state` to be written after the quiet period.
    pub fn schedule(&self, state: Value) {
        self.scheduler.schedule(state);
    }

    /// Drops any save that has not been written yet.
    pub fn cancel(&self) {
        self.scheduler.cancel();
    }

    /// Writes any pending save and stops the task.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            warn!(error = %e, "Autosave task ended abnormally");
        }
        debug!("Autosave stopped");
    }
}

async fn run(
    gateway: Arc<PersistenceGateway>,
    debounce: Duration,
    mut rx: watch::Receiver<Pending>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let quiet = tokio::time::sleep(debounce);
    tokio::pin!(quiet);
    let mut dirty = false;

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                dirty = matches!(*rx.borrow_and_update(), Pending::Save(_));
                if dirty {
                    quiet.as_mut().reset(Instant::now() + debounce);
                } else {
                    debug!("Pending save cancelled");
                }
            }
            () = &mut quiet, if dirty => {
                dirty = false;
                write_latest(&gateway, &rx);
            }
            _ = &mut shutdown => break,
        }
    }

    let unseen = rx.has_changed().unwrap_or(false) && matches!(*rx.borrow(), Pending::Save(_));
    if dirty || unseen {
        write_latest(&gateway, &rx);
    }
}

fn write_latest(gateway: &PersistenceGateway, rx: &watch::Receiver<Pending>) {
    let state = match &*rx.borrow() {
        Pending::Save(state) => state.clone(),
        Pending::Idle | Pending::Cancelled => return,
    };
    if gateway.save_or_warn(&state) {
        debug!("Autosave written");
    }
}
