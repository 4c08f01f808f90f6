//! Fixed-interval driver for ingestion cycles.
//!
//! Data flow:
//! Ticker -> IngestionController -> PriceStore
//!
//! The first tick fires immediately. Ticks that fall behind are skipped,
//! never bunched up. Shutdown is only observed between cycles, so an
//! in-flight cycle always finishes (bounded by its per-source timeouts).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info};

use crate::pipeline::controller::IngestionController;

pub async fn run_ingestion_schedule(
    controller: Arc<IngestionController>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(every_secs = every.as_secs(), "ingestion scheduler started");

    loop {
        tokio::select! {
            biased;

            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        // Outcome is logged by the controller; a failed cycle never stops the loop.
        let _ = controller.run_scheduled().await;
    }

    info!("ingestion scheduler stopped");
}

/// Running scheduler task plus the means to stop it.
pub struct ScheduleHandle {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScheduleHandle {
    /// Stops the ticker and waits for the in-flight cycle, if any.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "ingestion scheduler task failed");
        }
    }
}

pub fn spawn_schedule(controller: Arc<IngestionController>, every: Duration) -> ScheduleHandle {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run_ingestion_schedule(controller, every, shutdown_rx));

    ScheduleHandle { shutdown_tx, task }
}
