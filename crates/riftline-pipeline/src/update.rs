//! State-update consumer: second pipeline stage.
//!
//! Consumes buffered-event identifiers, loads and decodes the stored
//! event, and dispatches it to the processor for its type. Bad events of
//! every kind are dropped with a log line and acknowledged; only store or
//! broker I/O failures leave the delivery unacknowledged so the broker
//! redelivers it.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use riftline_queue_core::{Delivery, MessageQueue};
use riftline_state::{KeySchema, ProcessorSet, StateError};
use riftline_store_core::StateStore;
use riftline_types::{EventParseError, GameEvent};

use crate::config::STATE_UPDATES_QUEUE;

/// The second-stage consumer.
pub struct StateUpdateConsumer {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn StateStore>,
    keys: KeySchema,
    processors: ProcessorSet,
}

impl StateUpdateConsumer {
    /// Wire the consumer to its queue, store, and processor set.
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        store: Arc<dyn StateStore>,
        keys: KeySchema,
        processors: ProcessorSet,
    ) -> Self {
        Self { queue, store, keys, processors }
    }

    /// Consume until cancelled. One identifier is in flight at a time, so
    /// processors observe the exact order of the state-updates queue.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.queue.declare(STATE_UPDATES_QUEUE).await?;
        info!("state-update consumer started");

        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("state-update consumer stopping");
                    return Ok(());
                }
                delivery = self.queue.consume(STATE_UPDATES_QUEUE) => delivery?,
            };

            match self.handle(&delivery).await {
                Ok(()) => self.queue.ack(delivery).await?,
                Err(err) => {
                    error!(%err, "failed to apply event, returning it for redelivery");
                    self.queue.nack(delivery).await?;
                }
            }
        }
    }

    async fn handle(&self, delivery: &Delivery) -> Result<()> {
        let event_id = String::from_utf8_lossy(delivery.body()).into_owned();

        let fields = self.store.hgetall(&self.keys.event(&event_id)).await?;
        if fields.is_empty() {
            warn!(%event_id, "no stored event for identifier, dropping");
            return Ok(());
        }

        let event = match GameEvent::from_stored(&fields) {
            Ok(event) => event,
            Err(err @ (EventParseError::MissingPayload | EventParseError::PayloadJson(_))) => {
                warn!(%event_id, %err, "dropping undecodable event");
                return Ok(());
            }
            Err(err) => {
                error!(%event_id, %err, "dropping invalid event");
                return Ok(());
            }
        };

        self.apply(&event_id, &event).await
    }

    /// Dispatch to the processors, sorting their failures into "this event
    /// is bad, drop it" versus "the store is unwell, redeliver".
    async fn apply(&self, event_id: &str, event: &GameEvent) -> Result<()> {
        match self.processors.dispatch(event).await {
            Ok(()) => {
                info!(%event_id, event_type = %event.event_type, "processed event");
                Ok(())
            }
            Err(err) => match err.downcast_ref::<StateError>() {
                Some(state_err) => {
                    error!(%event_id, %state_err, "dropping unprocessable event");
                    Ok(())
                }
                None => Err(err),
            },
        }
    }
}
