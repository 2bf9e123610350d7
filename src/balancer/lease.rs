//! Connection accounting lease.

use std::sync::Arc;

use crate::store::{keys, StateStore};

/// Scoped hold on an upstream's in-flight connection counter.
///
/// Acquiring increments `up_conn:{addr}`; dropping decrements it, on every
/// exit path of the dispatcher (success, timeout, transport error, unwind).
/// The decrement runs on a spawned task because `Drop` cannot await; the
/// counter is eventually consistent across the pair but never leaks.
pub struct ConnectionLease {
    store: Arc<dyn StateStore>,
    key: String,
}

impl ConnectionLease {
    /// Increment the counter for `upstream` and take the lease.
    pub async fn acquire(store: Arc<dyn StateStore>, upstream: &str) -> Self {
        let key = keys::conn(upstream);
        if let Err(e) = store.incr(&key).await {
            // Accounting degrades with the store; forwarding still proceeds.
            tracing::warn!(error = %e, upstream = %upstream, "failed to increment connection count");
        }
        Self { store, key }
    }
}

impl Drop for ConnectionLease {
    fn drop(&mut self) {
        let store = self.store.clone();
        let key = std::mem::take(&mut self.key);
        tokio::spawn(async move {
            match store.decr(&key).await {
                // Floor at zero: a decrement that raced a key expiry must not
                // leave a negative count behind.
                Ok(value) if value < 0 => {
                    let _ = store.set(&key, "0").await;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "failed to decrement connection count");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_and_drop_balance_the_counter() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let key = keys::conn("http://a:1");

        let lease = ConnectionLease::acquire(store.clone(), "http://a:1").await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("1"));

        drop(lease);
        // The decrement runs on a spawned task.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn concurrent_leases_interleave() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let key = keys::conn("http://a:1");

        let l1 = ConnectionLease::acquire(store.clone(), "http://a:1").await;
        let l2 = ConnectionLease::acquire(store.clone(), "http://a:1").await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("2"));

        drop(l1);
        drop(l2);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("0"));
    }

    #[tokio::test]
    async fn negative_counter_is_floored() {
        let store: Arc<dyn StateStore> = Arc::new(MemoryStore::new());
        let key = keys::conn("http://a:1");

        let lease = ConnectionLease::acquire(store.clone(), "http://a:1").await;
        // Simulate the key expiring mid-flight.
        store.set(&key, "0").await.unwrap();

        drop(lease);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(store.get(&key).await.unwrap().as_deref(), Some("0"));
    }
}
