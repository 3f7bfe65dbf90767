//! Background scheduler: queue drainer and expiry sweeper

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::engine::ConflictEngine;

/// Handles to the two periodic tasks; both stop on the same signal
pub struct Scheduler {
    shutdown: watch::Sender<bool>,
    drainer: JoinHandle<()>,
    sweeper: JoinHandle<()>,
}

impl Scheduler {
    /// Spawn the drainer and sweeper using the engine's configured periods
    pub fn start(engine: &ConflictEngine) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let queue_tick = engine.config().queue_tick();
        let expiry_tick = engine.config().expiry_tick();

        let drainer = spawn_drainer(engine.clone(), queue_tick, rx.clone());
        let sweeper = spawn_sweeper(engine.clone(), expiry_tick, rx);

        info!(
            queue_tick_ms = engine.config().queue_tick_ms,
            expiry_tick_ms = engine.config().expiry_tick_ms,
            "Scheduler started"
        );
        Self {
            shutdown,
            drainer,
            sweeper,
        }
    }

    /// Signal both tasks and wait for them to finish
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.drainer.await;
        let _ = self.sweeper.await;
        info!("Scheduler stopped");
    }
}

fn spawn_drainer(
    engine: ConflictEngine,
    period: Duration,
    mut rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Some(outcome) = engine.drain_once().await {
                        debug!(success = outcome.success, "Queue drainer tick");
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}

fn spawn_sweeper(
    engine: ConflictEngine,
    period: Duration,
    mut rx: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let expired = engine.sweep_expired().await;
                    if !expired.is_empty() {
                        debug!(count = expired.len(), "Expiry sweep evicted conflicts");
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
