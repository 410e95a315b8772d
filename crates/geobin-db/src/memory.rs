//! In-process bin storage with the same semantics as the Redis store.
//!
//! Used by tests and by deployments that run without Redis. Bins live in a
//! [`RwLock`]-guarded map and expire lazily: an expired bin behaves exactly
//! like a missing one and is dropped the next time a bin is created.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{RwLock, broadcast};

use crate::error::DbError;
use crate::hub::SubscriptionHub;
use crate::keys::{PLACEHOLDER, expiry};

struct MemoryBin {
    /// `None` for bins that were written to without being created.
    expires_at: Option<DateTime<Utc>>,
    /// `(score, member)` pairs, ascending by score.
    entries: Vec<(f64, String)>,
}

impl MemoryBin {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }

    /// Sorted-set insert: an existing equal member is moved to `score`.
    fn insert(&mut self, score: f64, member: String) {
        self.entries.retain(|(_, existing)| *existing != member);
        let at = self.entries.partition_point(|(s, _)| *s <= score);
        self.entries.insert(at, (score, member));
    }
}

#[derive(Default)]
struct Inner {
    bins: RwLock<HashMap<String, MemoryBin>>,
    hub: SubscriptionHub,
}

/// In-memory bin store.
///
/// Cheap to clone; clones share the same bins.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or reset) bin `id`, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `ttl` overflows the clock.
    pub async fn create_bin(&self, id: &str, ttl: TimeDelta) -> Result<DateTime<Utc>, DbError> {
        let expires_at = expiry(ttl)?;
        let now = Utc::now();
        let mut bins = self.inner.bins.write().await;
        bins.retain(|_, bin| bin.is_live(now));
        bins.insert(
            id.to_owned(),
            MemoryBin {
                expires_at: Some(expires_at),
                entries: vec![(0.0, PLACEHOLDER.to_owned())],
            },
        );
        Ok(expires_at)
    }

    /// Whether bin `id` exists and has not expired.
    pub async fn bin_exists(&self, id: &str) -> bool {
        let now = Utc::now();
        self.inner
            .bins
            .read()
            .await
            .get(id)
            .is_some_and(|bin| bin.is_live(now))
    }

    /// Append `payload` to bin `id` at `score`.
    pub async fn append(&self, id: &str, score: f64, payload: String) {
        let now = Utc::now();
        let mut bins = self.inner.bins.write().await;
        match bins.get_mut(id) {
            Some(bin) if bin.is_live(now) => bin.insert(score, payload),
            _ => {
                bins.insert(
                    id.to_owned(),
                    MemoryBin {
                        expires_at: None,
                        entries: vec![(score, payload)],
                    },
                );
            }
        }
    }

    /// Every entry of bin `id`, newest first, without the placeholder.
    pub async fn history(&self, id: &str) -> Vec<String> {
        let now = Utc::now();
        self.inner
            .bins
            .read()
            .await
            .get(id)
            .filter(|bin| bin.is_live(now))
            .map(|bin| {
                bin.entries
                    .iter()
                    .rev()
                    .filter(|(_, member)| member != PLACEHOLDER)
                    .map(|(_, member)| member.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Number of stored entries, or `None` for an unknown bin.
    pub async fn count(&self, id: &str) -> Option<u64> {
        let now = Utc::now();
        let bins = self.inner.bins.read().await;
        let bin = bins.get(id).filter(|bin| bin.is_live(now))?;
        let stored = bin
            .entries
            .iter()
            .filter(|(_, member)| member != PLACEHOLDER)
            .count();
        u64::try_from(stored).ok()
    }

    /// Deliver `payload` to live viewers of bin `id`.
    pub async fn publish(&self, id: &str, payload: String) -> usize {
        self.inner.hub.dispatch(id, payload).await
    }

    /// Start watching bin `id`.
    pub async fn subscribe(&self, id: &str) -> broadcast::Receiver<String> {
        self.inner.hub.subscribe(id).await.0
    }

    /// Stop watching bin `id`.
    pub async fn unsubscribe(&self, id: &str) {
        self.inner.hub.release(id).await;
    }
}
