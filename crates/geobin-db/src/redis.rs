//! Redis-backed bin storage.
//!
//! Entries are appended to a per-bin sorted set and published on a pub/sub
//! channel of the same name (see [`crate::keys`]). A dedicated
//! [`SubscriberClient`] listens upstream and feeds the local
//! [`SubscriptionHub`], so any number of viewers on this process share one
//! Redis subscription per bin.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use fred::clients::SubscriberClient;
use fred::prelude::*;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::error::DbError;
use crate::hub::SubscriptionHub;
use crate::keys::{PLACEHOLDER, bin_id, bin_key, expiry};

/// Connection handle to a Redis instance.
///
/// Wraps a command [`Client`] plus a [`SubscriberClient`] for live
/// updates. Cheap to clone.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    subscriber: SubscriberClient,
    hub: Arc<SubscriptionHub>,
}

impl RedisStore {
    /// Connect to Redis at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://[:password@]host:port[/db]`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Redis`] if either connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config =
            Config::from_url(url).map_err(|e| DbError::Config(format!("Invalid Redis URL: {e}")))?;

        let client = Builder::from_config(config.clone()).build()?;
        client.init().await?;

        let subscriber = Builder::from_config(config).build_subscriber_client()?;
        subscriber.init().await?;
        // Re-issue SUBSCRIBE for every tracked channel after a reconnect.
        let _resubscribe = subscriber.manage_subscriptions();

        let hub = Arc::new(SubscriptionHub::new());
        spawn_bridge(&subscriber, Arc::clone(&hub));

        info!("Connected to Redis");
        Ok(Self {
            client,
            subscriber,
            hub,
        })
    }

    /// Create bin `id` with an empty history, expiring after `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if `ttl` overflows the clock.
    /// Returns [`DbError::Redis`] if either write fails.
    pub async fn create_bin(&self, id: &str, ttl: TimeDelta) -> Result<DateTime<Utc>, DbError> {
        let expires_at = expiry(ttl)?;
        let key = bin_key(id);
        let _: i64 = self
            .client
            .zadd(&key, None, None, false, false, (0.0, PLACEHOLDER))
            .await?;
        let _: i64 = self.client.expire(&key, ttl.num_seconds(), None).await?;
        Ok(expires_at)
    }

    /// Whether bin `id` exists (and has not expired).
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn bin_exists(&self, id: &str) -> Result<bool, DbError> {
        let found: i64 = self.client.exists(bin_key(id)).await?;
        Ok(found > 0)
    }

    /// Append `payload` to bin `id` at `score`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the write fails.
    pub async fn append(&self, id: &str, score: f64, payload: String) -> Result<(), DbError> {
        let _: i64 = self
            .client
            .zadd(bin_key(id), None, None, false, false, (score, payload))
            .await?;
        Ok(())
    }

    /// Every entry of bin `id`, newest first, without the placeholder.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn history(&self, id: &str) -> Result<Vec<String>, DbError> {
        let members: Vec<String> = self.client.zrevrange(bin_key(id), 0, -1, false).await?;
        Ok(members
            .into_iter()
            .filter(|member| member != PLACEHOLDER)
            .collect())
    }

    /// Number of stored entries, or `None` for an unknown bin.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the read fails.
    pub async fn count(&self, id: &str) -> Result<Option<u64>, DbError> {
        let cardinality: u64 = self.client.zcard(bin_key(id)).await?;
        Ok(cardinality.checked_sub(1))
    }

    /// Publish `payload` on bin `id`'s channel.
    ///
    /// Returns the number of Redis subscribers that received it.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the publish fails.
    pub async fn publish(&self, id: &str, payload: String) -> Result<usize, DbError> {
        let receivers: i64 = self.client.publish(bin_key(id), payload).await?;
        Ok(usize::try_from(receivers).unwrap_or(0))
    }

    /// Start watching bin `id`.
    ///
    /// The first local viewer of a bin subscribes upstream.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the upstream subscription fails.
    pub async fn subscribe(&self, id: &str) -> Result<broadcast::Receiver<String>, DbError> {
        let (rx, first) = self.hub.subscribe(id).await;
        if first {
            if let Err(e) = self.subscriber.subscribe(bin_key(id)).await {
                self.hub.release(id).await;
                return Err(e.into());
            }
            debug!(bin = id, "subscribed upstream");
        }
        Ok(rx)
    }

    /// Stop watching bin `id`.
    ///
    /// The last local viewer of a bin unsubscribes upstream.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if the upstream unsubscribe fails.
    pub async fn unsubscribe(&self, id: &str) -> Result<(), DbError> {
        if self.hub.release(id).await {
            self.subscriber.unsubscribe(bin_key(id)).await?;
            debug!(bin = id, "unsubscribed upstream");
        }
        Ok(())
    }

    /// Close both connections.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Redis`] if either `QUIT` fails.
    pub async fn quit(&self) -> Result<(), DbError> {
        self.subscriber.quit().await?;
        self.client.quit().await?;
        Ok(())
    }
}

/// Forward every upstream message into the local hub.
fn spawn_bridge(subscriber: &SubscriberClient, hub: Arc<SubscriptionHub>) {
    let mut messages = subscriber.message_rx();
    tokio::spawn(async move {
        loop {
            match messages.recv().await {
                Ok(message) => {
                    let Some(id) = bin_id(&message.channel) else {
                        continue;
                    };
                    match message.value.convert::<String>() {
                        Ok(payload) => {
                            hub.dispatch(id, payload).await;
                        }
                        Err(e) => warn!(bin = id, error = %e, "non-text pub/sub message"),
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "pub/sub bridge lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("pub/sub bridge closed");
                    break;
                }
            }
        }
    });
}
