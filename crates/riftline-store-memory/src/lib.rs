#![forbid(unsafe_code)]
#![deny(missing_docs)]

//! **riftline-store-memory** – In-memory store driver for Riftline.
//!
//! A fast, non-persistent [`StateStore`] suitable for tests, the scenario
//! runner, and development. All data is lost when the process terminates.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use riftline_store_core::{StateStore, StoreError};

//─────────────────────────────
//  In-memory store
//─────────────────────────────

/// An in-memory, non-persistent state store.
///
/// Hashes are nested maps; sorted sets are vectors kept ordered by
/// `(score, member)`. Interior mutability lets one instance be shared
/// across both pipeline consumers, mirroring a shared external store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    hashes: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
    zsets: Arc<RwLock<HashMap<String, Vec<(f64, String)>>>>,
}

impl MemoryStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of hash keys currently stored.
    pub async fn hash_count(&self) -> usize {
        self.hashes.read().await.len()
    }

    /// Remove all stored data. Useful between test scenarios.
    pub async fn clear(&self) {
        self.hashes.write().await.clear();
        self.zsets.write().await.clear();
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(key.to_string()).or_default();
        for (field, value) in fields {
            hash.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        Ok(self
            .hashes
            .read()
            .await
            .get(key)
            .and_then(|hash| hash.get(field).cloned()))
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        Ok(self.hashes.read().await.get(key).cloned().unwrap_or_default())
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut hashes = self.hashes.write().await;
        let hash = hashes.entry(key.to_string()).or_default();
        let current = match hash.get(field) {
            Some(value) => value.parse::<i64>().map_err(|_| StoreError::NotAnInteger {
                key: key.to_string(),
                field: field.to_string(),
            })?,
            None => 0,
        };
        let next = current + delta;
        hash.insert(field.to_string(), next.to_string());
        Ok(next)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut zsets = self.zsets.write().await;
        let set = zsets.entry(key.to_string()).or_default();
        set.retain(|(_, m)| m != member);
        set.push((score, member.to_string()));
        set.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Ok(())
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .zsets
            .read()
            .await
            .get(key)
            .map(|set| set.iter().map(|(_, m)| m.clone()).collect())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_roundtrip() {
        let store = MemoryStore::new();
        store
            .hset(
                "game:m1",
                &[
                    ("title".to_string(), "Grand Final".to_string()),
                    ("first_blood".to_string(), "-1".to_string()),
                ],
            )
            .await
            .unwrap();

        assert_eq!(
            store.hget("game:m1", "title").await.unwrap().as_deref(),
            Some("Grand Final")
        );
        assert_eq!(store.hget("game:m1", "missing").await.unwrap(), None);
        assert_eq!(store.hgetall("game:m1").await.unwrap().len(), 2);
        assert!(store.hgetall("game:absent").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn hincrby_starts_from_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.hincrby("k", "gold", 20).await.unwrap(), 20);
        assert_eq!(store.hincrby("k", "gold", 300).await.unwrap(), 320);
        assert_eq!(store.hget("k", "gold").await.unwrap().as_deref(), Some("320"));
    }

    #[tokio::test]
    async fn hincrby_rejects_non_integer_fields() {
        let store = MemoryStore::new();
        store
            .hset("k", &[("name".to_string(), "Ada".to_string())])
            .await
            .unwrap();
        let err = store.hincrby("k", "name", 1).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotAnInteger { .. })
        ));
    }

    #[tokio::test]
    async fn zrange_is_score_ordered_regardless_of_insertion() {
        let store = MemoryStore::new();
        store.zadd("history", "third", 30.0).await.unwrap();
        store.zadd("history", "first", 10.0).await.unwrap();
        store.zadd("history", "second", 20.0).await.unwrap();

        assert_eq!(
            store.zrange_all("history").await.unwrap(),
            vec!["first", "second", "third"]
        );
    }

    #[tokio::test]
    async fn zadd_updates_existing_member_score() {
        let store = MemoryStore::new();
        store.zadd("history", "a", 5.0).await.unwrap();
        store.zadd("history", "b", 1.0).await.unwrap();
        store.zadd("history", "a", 0.5).await.unwrap();

        assert_eq!(store.zrange_all("history").await.unwrap(), vec!["a", "b"]);
    }
}
