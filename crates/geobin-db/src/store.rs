//! Backend-agnostic bin storage.
//!
//! Enum dispatch over the two backends; every operation is async.

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::broadcast;

use crate::error::DbError;
use crate::memory::MemoryStore;
use crate::redis::RedisStore;

/// A bin store: Redis in production, in-process memory otherwise.
#[derive(Clone)]
pub enum BinStore {
    /// Redis sorted sets plus pub/sub.
    Redis(RedisStore),
    /// In-process maps plus local broadcast.
    Memory(MemoryStore),
}

impl BinStore {
    /// Create bin `id` with an empty history, expiring after `ttl`.
    ///
    /// Returns the expiry instant.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the backend write fails or `ttl` is out of
    /// range.
    pub async fn create_bin(&self, id: &str, ttl: TimeDelta) -> Result<DateTime<Utc>, DbError> {
        match self {
            Self::Redis(store) => store.create_bin(id, ttl).await,
            Self::Memory(store) => store.create_bin(id, ttl).await,
        }
    }

    /// Whether bin `id` exists and has not expired.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the backend read fails.
    pub async fn bin_exists(&self, id: &str) -> Result<bool, DbError> {
        match self {
            Self::Redis(store) => store.bin_exists(id).await,
            Self::Memory(store) => Ok(store.bin_exists(id).await),
        }
    }

    /// Append `payload` to bin `id`, scored by `timestamp` (Unix seconds).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the backend write fails.
    #[allow(clippy::cast_precision_loss)]
    pub async fn append(&self, id: &str, timestamp: i64, payload: String) -> Result<(), DbError> {
        let score = timestamp as f64;
        match self {
            Self::Redis(store) => store.append(id, score, payload).await,
            Self::Memory(store) => {
                store.append(id, score, payload).await;
                Ok(())
            }
        }
    }

    /// Every entry of bin `id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the backend read fails.
    pub async fn history(&self, id: &str) -> Result<Vec<String>, DbError> {
        match self {
            Self::Redis(store) => store.history(id).await,
            Self::Memory(store) => Ok(store.history(id).await),
        }
    }

    /// Number of stored entries, or `None` for an unknown bin.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the backend read fails.
    pub async fn count(&self, id: &str) -> Result<Option<u64>, DbError> {
        match self {
            Self::Redis(store) => store.count(id).await,
            Self::Memory(store) => Ok(store.count(id).await),
        }
    }

    /// Deliver `payload` to everyone watching bin `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the backend publish fails.
    pub async fn publish(&self, id: &str, payload: String) -> Result<usize, DbError> {
        match self {
            Self::Redis(store) => store.publish(id, payload).await,
            Self::Memory(store) => Ok(store.publish(id, payload).await),
        }
    }

    /// Start watching bin `id`. Pair with [`Self::unsubscribe`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the upstream subscription fails.
    pub async fn subscribe(&self, id: &str) -> Result<broadcast::Receiver<String>, DbError> {
        match self {
            Self::Redis(store) => store.subscribe(id).await,
            Self::Memory(store) => Ok(store.subscribe(id).await),
        }
    }

    /// Stop watching bin `id`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the upstream unsubscribe fails.
    pub async fn unsubscribe(&self, id: &str) -> Result<(), DbError> {
        match self {
            Self::Redis(store) => store.unsubscribe(id).await,
            Self::Memory(store) => {
                store.unsubscribe(id).await;
                Ok(())
            }
        }
    }

    /// Close backend connections.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if closing fails.
    pub async fn close(&self) -> Result<(), DbError> {
        match self {
            Self::Redis(store) => store.quit().await,
            Self::Memory(_) => Ok(()),
        }
    }

    /// Human-readable backend name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Redis(_) => "redis",
            Self::Memory(_) => "memory",
        }
    }
}

impl From<RedisStore> for BinStore {
    fn from(store: RedisStore) -> Self {
        Self::Redis(store)
    }
}

impl From<MemoryStore> for BinStore {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test]
    async fn memory_backend_through_dispatch() {
        let store = BinStore::from(MemoryStore::new());
        assert_eq!(store.name(), "memory");

        store.create_bin("bin", TimeDelta::hours(48)).await.unwrap();
        store.append("bin", 1_000, String::from("a")).await.unwrap();
        store.append("bin", 2_000, String::from("b")).await.unwrap();

        assert!(store.bin_exists("bin").await.unwrap());
        assert_eq!(store.count("bin").await.unwrap(), Some(2));
        assert_eq!(store.count("none").await.unwrap(), None);
        assert_eq!(store.history("bin").await.unwrap(), vec!["b", "a"]);
    }

    #[tokio::test]
    async fn subscribe_then_publish() {
        let store = BinStore::from(MemoryStore::new());
        let mut rx = store.subscribe("bin").await.unwrap();
        assert_eq!(store.publish("bin", String::from("x")).await.unwrap(), 1);
        assert_eq!(rx.recv().await.unwrap(), "x");
        store.unsubscribe("bin").await.unwrap();
        store.close().await.unwrap();
    }
}
