//! Registry store access.
//!
//! The gateway treats the store as a durable keyed list: one key per logical
//! service name, holding an ordered, append-only sequence of instance
//! addresses. The gateway only ever appends and reads; it deletes a key only
//! to migrate a legacy scalar value.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{GatewayError, Result};

/// Keyed list store consumed by the service registry.
#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// Append a value to the list held under `key`.
    async fn append(&self, key: &str, value: &str) -> Result<()>;

    /// Return the full list held under `key` (empty if absent).
    async fn range(&self, key: &str) -> Result<Vec<String>>;

    /// Whether `key` exists at all.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Store-level type of `key`: "list", "string", or "none".
    async fn type_of(&self, key: &str) -> Result<String>;

    /// Remove `key` entirely.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Liveness probe; returns the store's liveness token.
    async fn ping(&self) -> Result<String>;
}

/// Redis-backed store.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    /// Open a client against the given URL. Connections are established
    /// lazily per operation via a multiplexed connection.
    pub fn new(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        let conn = self.client.get_multiplexed_async_connection().await?;
        Ok(conn)
    }
}

#[async_trait]
impl RegistryStore for RedisStore {
    async fn append(&self, key: &str, value: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("RPUSH")
            .arg(key)
            .arg(value)
            .query_async::<i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn range(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.connection().await?;
        let values: Vec<String> = redis::cmd("LRANGE")
            .arg(key)
            .arg(0)
            .arg(-1)
            .query_async(&mut conn)
            .await?;
        Ok(values)
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let mut conn = self.connection().await?;
        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;
        Ok(exists)
    }

    async fn type_of(&self, key: &str) -> Result<String> {
        let mut conn = self.connection().await?;
        let ty: String = redis::cmd("TYPE").arg(key).query_async(&mut conn).await?;
        Ok(ty)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("DEL").arg(key).query_async::<i64>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<String> {
        let mut conn = self.connection().await?;
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong)
    }
}

enum StoredValue {
    Scalar(String),
    List(Vec<String>),
}

/// In-memory store for tests and local runs without a Redis instance.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a store outage; every operation fails while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a legacy scalar value, as written by the old registry format.
    pub fn insert_scalar(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .insert(key.to_string(), StoredValue::Scalar(value.to_string()));
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(GatewayError::Store("store offline".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RegistryStore for MemoryStore {
    async fn append(&self, key: &str, value: &str) -> Result<()> {
        self.check_online()?;
        let mut entries = self.entries.lock().expect("memory store mutex poisoned");
        match entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::List(Vec::new()))
        {
            StoredValue::List(list) => {
                list.push(value.to_string());
                Ok(())
            }
            StoredValue::Scalar(_) => Err(GatewayError::Store(format!(
                "key '{}' holds a scalar value",
                key
            ))),
        }
    }

    async fn range(&self, key: &str) -> Result<Vec<String>> {
        self.check_online()?;
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        match entries.get(key) {
            Some(StoredValue::List(list)) => Ok(list.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        self.check_online()?;
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        Ok(entries.contains_key(key))
    }

    async fn type_of(&self, key: &str) -> Result<String> {
        self.check_online()?;
        let entries = self.entries.lock().expect("memory store mutex poisoned");
        let ty = match entries.get(key) {
            Some(StoredValue::Scalar(_)) => "string",
            Some(StoredValue::List(_)) => "list",
            None => "none",
        };
        Ok(ty.to_string())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.check_online()?;
        self.entries
            .lock()
            .expect("memory store mutex poisoned")
            .remove(key);
        Ok(())
    }

    async fn ping(&self) -> Result<String> {
        self.check_online()?;
        Ok("PONG".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_append_and_range() {
        let store = MemoryStore::new();
        store.append("profile", "http://profile-service:4000").await.unwrap();
        store.append("profile", "http://profile-service:4001").await.unwrap();

        let list = store.range("profile").await.unwrap();
        assert_eq!(
            list,
            vec![
                "http://profile-service:4000".to_string(),
                "http://profile-service:4001".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_memory_store_type_of() {
        let store = MemoryStore::new();
        assert_eq!(store.type_of("missing").await.unwrap(), "none");

        store.insert_scalar("legacy", "http://old:1000");
        assert_eq!(store.type_of("legacy").await.unwrap(), "string");

        store.delete("legacy").await.unwrap();
        store.append("legacy", "http://new:1000").await.unwrap();
        assert_eq!(store.type_of("legacy").await.unwrap(), "list");
    }

    #[tokio::test]
    async fn test_memory_store_offline() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(store.ping().await.is_err());
        assert!(store.range("profile").await.is_err());

        store.set_offline(false);
        assert_eq!(store.ping().await.unwrap(), "PONG");
    }
}
