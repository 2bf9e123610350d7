//! Redis-backed state store.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::store::{StateStore, StoreError};

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// State store backed by a Redis connection manager.
///
/// The manager multiplexes one connection, reconnects on failure, and is
/// cheap to clone, so every operation works on a clone and stays `&self`.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis at the given URL.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.get(key).await?)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut con = self.manager.clone();
        con.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut con = self.manager.clone();
        con.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.incr(key, 1i64).await?)
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.decr(key, 1i64).await?)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut con = self.manager.clone();
        // Redis returns -1 for no expiry and -2 for a missing key.
        let secs: i64 = con.ttl(key).await?;
        if secs > 0 {
            Ok(Some(Duration::from_secs(secs as u64)))
        } else {
            Ok(None)
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut con = self.manager.clone();
        Ok(con.exists(key).await?)
    }
}
