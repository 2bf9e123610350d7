//! In-memory state store.
//!
//! Single-process stand-in for Redis, used by the test suite and usable for
//! store-less local runs. Expiry is lazy: entries are dropped when touched
//! after their deadline. Uses `tokio::time::Instant` so paused-clock tests
//! can advance expiry deterministically.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::store::{StateStore, StoreError};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn expired(&self) -> bool {
        matches!(self.expires_at, Some(deadline) if Instant::now() >= deadline)
    }
}

/// A `StateStore` held entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the map and drop the entry if its deadline passed.
    fn live_entry<'a>(
        guard: &'a mut HashMap<String, Entry>,
        key: &str,
    ) -> Option<&'a mut Entry> {
        if guard.get(key).is_some_and(|e| e.expired()) {
            guard.remove(key);
        }
        guard.get_mut(key)
    }

    fn adjust(&self, key: &str, delta: i64) -> i64 {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        match Self::live_entry(&mut guard, key) {
            Some(entry) => {
                // Counter semantics match Redis: non-numeric treated as 0,
                // expiry preserved across increments.
                let current = entry.value.parse::<i64>().unwrap_or(0);
                let next = current + delta;
                entry.value = next.to_string();
                next
            }
            None => {
                guard.insert(
                    key.to_string(),
                    Entry {
                        value: delta.to_string(),
                        expires_at: None,
                    },
                );
                delta
            }
        }
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        Ok(Self::live_entry(&mut guard, key).map(|e| e.value.clone()))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        guard.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        guard.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.adjust(key, 1))
    }

    async fn decr(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.adjust(key, -1))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        Ok(Self::live_entry(&mut guard, key)
            .and_then(|e| e.expires_at)
            .map(|deadline| deadline.saturating_duration_since(Instant::now())))
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut guard = self.entries.lock().expect("memory store mutex poisoned");
        Ok(Self::live_entry(&mut guard, key).is_some())
    }
}
