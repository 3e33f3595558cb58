//! Redis-backed state store.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;

use riftline_store_core::{StateStore, StoreError};

/// [`StateStore`] driver over a Redis server.
///
/// All six contract operations are single Redis commands, so the driver
/// inherits Redis's per-key atomicity; `hincrby` in particular is the
/// atomic counter the processors rely on.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
}

impl RedisStore {
    /// Connect to the Redis server at `url` (e.g. `redis://localhost:6379/0`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client =
            redis::Client::open(url).map_err(|err| StoreError::Connection(err.to_string()))?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|err| StoreError::Connection(err.to_string()))?;
        Ok(Self { conn })
    }
}

fn command_failed(err: redis::RedisError) -> StoreError {
    StoreError::Command(err.to_string())
}

#[async_trait]
impl StateStore for RedisStore {
    async fn hset(&self, key: &str, fields: &[(String, String)]) -> Result<()> {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("HSET");
        cmd.arg(key);
        for (field, value) in fields {
            cmd.arg(field).arg(value);
        }
        let _: i64 = cmd.query_async(&mut conn).await.map_err(command_failed)?;
        Ok(())
    }

    async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        let value: Option<String> = redis::cmd("HGET")
            .arg(key)
            .arg(field)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(value)
    }

    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = redis::cmd("HGETALL")
            .arg(key)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(fields)
    }

    async fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        let mut conn = self.conn.clone();
        let value: i64 = redis::cmd("HINCRBY")
            .arg(key)
            .arg(field)
            .arg(delta)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(value)
    }

    async fn zadd(&self, key: &str, member: &str, score: f64) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("ZADD")
            .arg(key)
            .arg(score)
            .arg(member)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(())
    }

    async fn zrange_all(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = redis::cmd("ZRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await
            .map_err(command_failed)?;
        Ok(members)
    }
}
