#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-queue-core** – Core broker abstraction for Riftline.
//!
//! This crate defines the queue contract both pipeline stages consume from:
//! a durable FIFO with explicit acknowledgement and at-least-once
//! redelivery. It also ships the in-memory reference implementation used by
//! tests and the single-process scenario runner. Durable drivers live in
//! separate crates that depend on this abstraction.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};

//─────────────────────────────
//  Delivery
//─────────────────────────────

/// One message handed to a consumer, pending acknowledgement.
///
/// A delivery must be returned to the queue through [`MessageQueue::ack`]
/// (processed) or [`MessageQueue::nack`] (requeue for redelivery). Dropping
/// it without either leaves the message in the driver's unacknowledged set.
#[derive(Debug)]
pub struct Delivery {
    queue: String,
    tag: u64,
    body: Vec<u8>,
}

impl Delivery {
    /// Build a delivery. Intended for queue drivers, not consumers.
    pub fn new(queue: impl Into<String>, tag: u64, body: Vec<u8>) -> Self {
        Self { queue: queue.into(), tag, body }
    }

    /// The queue this delivery was consumed from.
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Driver-assigned delivery tag.
    pub fn tag(&self) -> u64 {
        self.tag
    }

    /// The message body.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

//─────────────────────────────
//  Queue trait
//─────────────────────────────

/// A durable FIFO queue with explicit acknowledgement.
///
/// Semantics required of every implementation:
/// - messages are delivered in publish order to a single consumer;
/// - a consumed message stays un-acknowledged until `ack`;
/// - `nack` requeues at the front, so redelivery happens before newer
///   messages (the broker-redelivery hook);
/// - delivery is at-least-once: after a crash between consume and ack the
///   message is seen again.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Declare a queue, creating it if needed. Idempotent.
    async fn declare(&self, queue: &str) -> Result<()>;

    /// Append a message to the tail of `queue`.
    async fn publish(&self, queue: &str, body: &[u8]) -> Result<()>;

    /// Take the next message from the head of `queue`, waiting until one is
    /// available. The returned delivery is tracked as unacknowledged.
    async fn consume(&self, queue: &str) -> Result<Delivery>;

    /// Mark a delivery as processed, removing it permanently.
    async fn ack(&self, delivery: Delivery) -> Result<()>;

    /// Return a delivery to the front of its queue for redelivery.
    async fn nack(&self, delivery: Delivery) -> Result<()>;
}

//─────────────────────────────
//  In-memory queue implementation
//─────────────────────────────

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<(u64, Vec<u8>)>,
    unacked: HashMap<u64, Vec<u8>>,
    // notify_one stores a permit when no consumer is parked, so a publish
    // racing a consumer between its emptiness check and its await cannot
    // be lost.
    notify: Arc<Notify>,
}

/// Simple in-memory queue set built on Tokio primitives.
///
/// FIFO per queue, one process only, nothing survives a restart. This is
/// the reference implementation the pipeline tests run against; durable
/// deployments use a driver crate instead.
#[derive(Debug, Clone, Default)]
pub struct InMemoryQueue {
    queues: Arc<Mutex<HashMap<String, QueueState>>>,
    next_tag: Arc<AtomicU64>,
}

impl InMemoryQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages ready for consumption on `queue`.
    pub async fn ready_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.ready.len())
            .unwrap_or(0)
    }

    /// Number of consumed-but-unacknowledged messages on `queue`.
    pub async fn unacked_len(&self, queue: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue)
            .map(|q| q.unacked.len())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn declare(&self, queue: &str) -> Result<()> {
        self.queues.lock().await.entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn publish(&self, queue: &str, body: &[u8]) -> Result<()> {
        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed);
        let mut queues = self.queues.lock().await;
        let state = queues.entry(queue.to_string()).or_default();
        state.ready.push_back((tag, body.to_vec()));
        state.notify.notify_one();
        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Delivery> {
        loop {
            let notify = {
                let mut queues = self.queues.lock().await;
                let state = queues.entry(queue.to_string()).or_default();
                if let Some((tag, body)) = state.ready.pop_front() {
                    state.unacked.insert(tag, body.clone());
                    return Ok(Delivery::new(queue, tag, body));
                }
                state.notify.clone()
            };
            notify.notified().await;
        }
    }

    async fn ack(&self, delivery: Delivery) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(delivery.queue())
            .ok_or_else(|| QueueError::UnknownQueue(delivery.queue().to_string()))?;
        state
            .unacked
            .remove(&delivery.tag())
            .ok_or(QueueError::UnknownDelivery(delivery.tag()))?;
        Ok(())
    }

    async fn nack(&self, delivery: Delivery) -> Result<()> {
        let mut queues = self.queues.lock().await;
        let state = queues
            .get_mut(delivery.queue())
            .ok_or_else(|| QueueError::UnknownQueue(delivery.queue().to_string()))?;
        let body = state
            .unacked
            .remove(&delivery.tag())
            .ok_or(QueueError::UnknownDelivery(delivery.tag()))?;
        state.ready.push_front((delivery.tag(), body));
        state.notify.notify_one();
        Ok(())
    }
}

//─────────────────────────────
//  Error types
//─────────────────────────────

/// Errors that can occur during queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The referenced queue was never declared or published to.
    #[error("unknown queue: {0}")]
    UnknownQueue(String),
    /// The acknowledged delivery is not in the unacknowledged set.
    #[error("unknown delivery tag: {0}")]
    UnknownDelivery(u64),
    /// The driver could not reach its broker.
    #[error("broker connection failed: {0}")]
    Connection(String),
    /// A broker-side command failed.
    #[error("broker command failed: {0}")]
    Command(String),
}
