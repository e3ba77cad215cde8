// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Redis-backed store
//!
//! The connection is established lazily on first use and reused through a
//! `ConnectionManager`, which reconnects on its own after drops. A failed
//! initial connect is retried on the next operation, so the store can come up
//! while Redis is still down.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, ErrorKind, RedisError, Script};
use std::future::Future;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::kv::{KvStore, StoreError};

/// INCR and set the expiry only when the key has none
const INCR_EX_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if redis.call('TTL', KEYS[1]) < 0 then
    redis.call('EXPIRE', KEYS[1], ARGV[1])
end
return count
";

pub struct RedisStore {
    client: Client,
    connection: Mutex<Option<ConnectionManager>>,
    op_timeout: Duration,
    incr_script: Script,
}

impl RedisStore {
    /// Parse the URL; no network I/O happens until the first operation
    pub fn new(url: &str, op_timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::open(url)
            .map_err(|e| StoreError::Unavailable(format!("invalid redis url: {}", e)))?;
        info!("Redis store configured (timeout {:?})", op_timeout);
        Ok(Self {
            client,
            connection: Mutex::new(None),
            op_timeout,
            incr_script: Script::new(INCR_EX_SCRIPT),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut guard = self.connection.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        debug!("Opening redis connection");
        let conn = tokio::time::timeout(self.op_timeout, ConnectionManager::new(self.client.clone()))
            .await
            .map_err(|_| StoreError::Unavailable("redis connect timed out".to_string()))?
            .map_err(map_redis_error)?;
        *guard = Some(conn.clone());
        Ok(conn)
    }

    async fn bounded<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, RedisError>>,
    {
        tokio::time::timeout(self.op_timeout, op)
            .await
            .map_err(|_| StoreError::Unavailable("redis operation timed out".to_string()))?
            .map_err(map_redis_error)
    }
}

fn map_redis_error(err: RedisError) -> StoreError {
    if err.kind() == ErrorKind::TypeError {
        return StoreError::Serialization(err.to_string());
    }
    if err.kind() == ErrorKind::ExecAbortError {
        return StoreError::Conflict(err.to_string());
    }
    StoreError::Unavailable(err.to_string())
}

#[async_trait]
impl KvStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn),
        )
        .await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(ttl.as_secs().max(1))
                .query_async::<_, ()>(&mut conn),
        )
        .await
    }

    async fn incr_ex(&self, key: &str, ttl: Duration) -> Result<u64, StoreError> {
        let mut conn = self.connection().await?;
        self.bounded(
            self.incr_script
                .key(key)
                .arg(ttl.as_secs().max(1))
                .invoke_async::<_, u64>(&mut conn),
        )
        .await
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let reply: String = self
            .bounded(redis::cmd("PING").query_async::<_, String>(&mut conn))
            .await?;
        if reply == "PONG" {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!("unexpected PING reply '{}'", reply)))
        }
    }
}
