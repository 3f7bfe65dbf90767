//! Engine runtime: wires the engine, outbox worker and scheduler together

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::db::ConflictStore;
use crate::engine::ConflictEngine;
use crate::notify::NotificationSink;
use crate::outbox::{OutboxSender, OutboxWorker};
use crate::scheduler::Scheduler;

/// A running engine with its background tasks
pub struct EngineRuntime {
    engine: ConflictEngine,
    outbox: OutboxSender,
    worker: JoinHandle<()>,
    scheduler: Scheduler,
}

impl EngineRuntime {
    /// Spawn the outbox worker and the scheduler.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<S, N>(config: EngineConfig, store: S, sink: N, clock: Arc<dyn Clock>) -> Self
    where
        S: ConflictStore + 'static,
        N: NotificationSink + 'static,
    {
        let (outbox, rx) = OutboxSender::channel();
        let worker = tokio::spawn(OutboxWorker::new(store, sink).run(rx));
        let engine = ConflictEngine::new(config, outbox.clone(), clock);
        let scheduler = Scheduler::start(&engine);

        info!(
            automatic_resolution = engine.config().automatic_resolution_enabled,
            "Conflict engine started"
        );
        Self {
            engine,
            outbox,
            worker,
            scheduler,
        }
    }

    pub const fn engine(&self) -> &ConflictEngine {
        &self.engine
    }

    /// Stop the scheduler, deliver every pending side effect and stop the
    /// outbox worker.
    ///
    /// Returns once the worker has dropped its store, so the database file
    /// can be reopened right away.
    pub async fn shutdown(self) {
        self.scheduler.shutdown().await;
        self.outbox.flush().await;
        self.worker.abort();
        // The worker owns the store; wait until its connection is closed
        let _ = self.worker.await;
        info!("Conflict engine stopped");
    }
}
