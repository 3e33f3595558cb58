#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-pipeline** – Consumer wiring for the Riftline pipeline.
//!
//! This crate assembles the two queue-decoupled stages over injected queue
//! and store drivers:
//!
//! 1. the [`IngressConsumer`] buffers every raw event under a fresh
//!    identifier and forwards that identifier, and
//! 2. the [`StateUpdateConsumer`] resolves identifiers back to events and
//!    applies them through the per-type processors.
//!
//! Both consumers are independent long-lived tasks sharing no in-process
//! state except the player registry, which the match-start processor
//! writes and the others read. Control flow between the stages is purely
//! through the broker. Cancellation is cooperative: in-flight message
//! handling completes or its delivery is returned for redelivery.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use riftline_queue_core::MessageQueue;
use riftline_state::{KeySchema, PlayerRegistry, ProcessorSet};
use riftline_store_core::StateStore;

mod config;
mod ingress;
mod update;

pub use config::{PipelineConfig, EVENTS_QUEUE, STATE_UPDATES_QUEUE};
pub use ingress::IngressConsumer;
pub use update::StateUpdateConsumer;

/// A running pipeline: both consumers spawned as tasks plus the handle to
/// stop them.
pub struct Pipeline {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<Result<()>>>,
}

impl Pipeline {
    /// Spawn both consumers over the given drivers.
    ///
    /// The key schema and streak window come from `config`; the player
    /// registry is created here and shared between the processors.
    pub fn spawn(
        config: &PipelineConfig,
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn StateStore>,
    ) -> Self {
        let keys = KeySchema::new(
            config.events_namespace.clone(),
            config.state_namespace.clone(),
        );
        let registry = Arc::new(RwLock::new(PlayerRegistry::new()));
        let processors = ProcessorSet::new(
            store.clone(),
            registry,
            keys.clone(),
            config.kill_streak_window,
        );

        let ingress = IngressConsumer::new(queue.clone(), store.clone(), keys.clone());
        let update = StateUpdateConsumer::new(queue, store, keys, processors);

        let cancel = CancellationToken::new();
        let tasks = vec![
            tokio::spawn({
                let cancel = cancel.clone();
                async move { ingress.run(cancel).await }
            }),
            tokio::spawn({
                let cancel = cancel.clone();
                async move { update.run(cancel).await }
            }),
        ];

        info!("pipeline started");
        Self { cancel, tasks }
    }

    /// Stop both consumers and wait for them to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel.cancel();
        for task in self.tasks {
            task.await??;
        }
        info!("pipeline stopped");
        Ok(())
    }
}
