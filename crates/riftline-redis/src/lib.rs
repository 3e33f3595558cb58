#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-redis** – Redis drivers for Riftline.
//!
//! Two drivers over one client:
//!
//! - [`RedisStore`] maps the [`StateStore`](riftline_store_core::StateStore)
//!   contract directly onto HSET/HGET/HGETALL/HINCRBY/ZADD/ZRANGE.
//! - [`RedisQueue`] realizes the durable FIFO contract of
//!   [`MessageQueue`](riftline_queue_core::MessageQueue) with the
//!   reliable-list pattern: RPUSH on the producer side, BLMOVE into a
//!   per-queue processing list on consume, LREM on acknowledge.
//!
//! Each pipeline consumer should hold its own driver instance; the
//! underlying multiplexed connection is not shared across consumers.

mod queue;
mod store;

pub use queue::RedisQueue;
pub use store::RedisStore;
