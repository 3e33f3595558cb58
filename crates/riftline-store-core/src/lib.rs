#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-store-core** – Core key-value store abstraction for Riftline.
//!
//! This crate defines the contract the pipeline has with its state store:
//! string-valued hashes with an atomic per-field counter, plus sorted sets
//! scored by floating-point timestamps. Every aggregate write the
//! processors perform is a single-key operation from this set; the design
//! deliberately has no multi-key transactions. Drivers (in-memory, Redis)
//! implement the trait in separate crates.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

//─────────────────────────────
//  Store trait
//─────────────────────────────

/// Hash and sorted-set operations over a shared key-value store.
///
/// All values are strings; numeric hash fields are stored in their decimal
/// representation and mutated through [`StateStore::hincrby`]. Sorted-set
/// members are unique per key; re-adding a member updates its score.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Set the given fields on the hash at `key`, creating it if needed.
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<()>;

    /// Read a single field of the hash at `key`.
    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// Read all fields of the hash at `key`. Missing keys yield an empty map.
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// Atomically add `delta` to an integer hash field, treating a missing
    /// field as zero, and return the new value.
    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    /// Insert `member` into the sorted set at `key` with `score`, replacing
    /// the score of an existing member.
    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()>;

    /// All members of the sorted set at `key` in ascending score order
    /// (ties broken by member). Missing keys yield an empty list.
    async fn zrange_all(&self, key: &str) -> Result<Vec<String>>;
}

//─────────────────────────────
//  Error types
//─────────────────────────────

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The driver could not reach its backend.
    #[error("store connection failed: {0}")]
    Connection(String),
    /// A backend-side command failed.
    #[error("store command failed: {0}")]
    Command(String),
    /// A stored value does not have the type an operation requires, e.g.
    /// `hincrby` against a non-integer field.
    #[error("value at {key}.{field} is not an integer")]
    NotAnInteger {
        /// The hash key.
        key: String,
        /// The offending field.
        field: String,
    },
}
