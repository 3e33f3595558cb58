//! Ingress consumer: first pipeline stage.
//!
//! Consumes raw event envelopes off the events queue one at a time,
//! persists each under a freshly minted identifier, and hands that
//! identifier to the second stage via the state-updates queue. The message
//! is acknowledged only after both the store write and the publish
//! succeed, so a crash in between leads to broker redelivery. A fresh
//! identifier is minted per attempt, so redelivered messages produce
//! duplicate downstream work; counters double-count in that case and the
//! broker's delivery semantics are the contract boundary.

use std::sync::Arc;

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use riftline_queue_core::{Delivery, MessageQueue};
use riftline_state::KeySchema;
use riftline_store_core::StateStore;

use crate::config::{EVENTS_QUEUE, STATE_UPDATES_QUEUE};

/// The first-stage consumer.
pub struct IngressConsumer {
    queue: Arc<dyn MessageQueue>,
    store: Arc<dyn StateStore>,
    keys: KeySchema,
}

impl IngressConsumer {
    /// Wire the consumer to its queue and store.
    pub fn new(queue: Arc<dyn MessageQueue>, store: Arc<dyn StateStore>, keys: KeySchema) -> Self {
        Self { queue, store, keys }
    }

    /// Consume until cancelled. One message is in flight at a time.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        self.queue.declare(EVENTS_QUEUE).await?;
        self.queue.declare(STATE_UPDATES_QUEUE).await?;
        info!("ingress consumer started");

        loop {
            let delivery = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("ingress consumer stopping");
                    return Ok(());
                }
                delivery = self.queue.consume(EVENTS_QUEUE) => delivery?,
            };

            match self.handle(&delivery).await {
                Ok(()) => self.queue.ack(delivery).await?,
                Err(err) => {
                    error!(%err, "failed to buffer event, returning it for redelivery");
                    self.queue.nack(delivery).await?;
                }
            }
        }
    }

    /// Buffer one raw event. `Ok` means the delivery can be acknowledged,
    /// including the drop cases; `Err` means store or broker I/O failed
    /// and the delivery must be redelivered.
    async fn handle(&self, delivery: &Delivery) -> Result<()> {
        let data: serde_json::Value = match serde_json::from_slice(delivery.body()) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "dropping malformed event message");
                return Ok(());
            }
        };
        let Some(object) = data.as_object() else {
            warn!("dropping non-object event message");
            return Ok(());
        };

        let event_id = Uuid::new_v4().to_string();

        // The store keeps scalar field values only, so the polymorphic
        // payload is re-encoded as a JSON string while the remaining
        // top-level fields pass through as-is.
        let mut fields = Vec::with_capacity(object.len());
        for (name, value) in object {
            let encoded = if name == "payload" {
                serde_json::to_string(value)?
            } else {
                scalar_field(value)
            };
            fields.push((name.clone(), encoded));
        }

        self.store.hset(&self.keys.event(&event_id), &fields).await?;
        self.queue
            .publish(STATE_UPDATES_QUEUE, event_id.as_bytes())
            .await?;
        debug!(%event_id, "event buffered and dispatched");
        Ok(())
    }
}

fn scalar_field(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
