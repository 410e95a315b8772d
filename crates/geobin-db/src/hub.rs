//! Fan-out of published bin entries to live subscribers.
//!
//! Each bin with at least one live viewer has a [`broadcast`] channel.
//! Subscribers are reference counted per bin so the owning store knows when
//! to start and stop listening upstream (for Redis: `SUBSCRIBE` on the first
//! viewer, `UNSUBSCRIBE` after the last one leaves).

use std::collections::HashMap;

use tokio::sync::{Mutex, broadcast};
use tracing::debug;

/// Capacity of each per-bin broadcast channel.
///
/// A viewer that falls behind by more than this many entries receives
/// [`broadcast::error::RecvError::Lagged`] and skips to the newest entry.
pub const BROADCAST_CAPACITY: usize = 256;

struct Channel {
    tx: broadcast::Sender<String>,
    subscribers: usize,
}

/// Per-bin broadcast channels for live viewers.
#[derive(Default)]
pub struct SubscriptionHub {
    channels: Mutex<HashMap<String, Channel>>,
}

impl SubscriptionHub {
    /// Create an empty hub.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer of `bin`.
    ///
    /// Returns the receiver and whether this is the bin's first viewer.
    pub async fn subscribe(&self, bin: &str) -> (broadcast::Receiver<String>, bool) {
        let mut channels = self.channels.lock().await;
        if let Some(channel) = channels.get_mut(bin) {
            channel.subscribers = channel.subscribers.saturating_add(1);
            return (channel.tx.subscribe(), false);
        }
        let (tx, rx) = broadcast::channel(BROADCAST_CAPACITY);
        channels.insert(
            bin.to_owned(),
            Channel {
                tx,
                subscribers: 1,
            },
        );
        debug!(bin, "first viewer subscribed");
        (rx, true)
    }

    /// Unregister a viewer of `bin`.
    ///
    /// Returns `true` when that was the bin's last viewer.
    pub async fn release(&self, bin: &str) -> bool {
        let mut channels = self.channels.lock().await;
        let Some(channel) = channels.get_mut(bin) else {
            return false;
        };
        channel.subscribers = channel.subscribers.saturating_sub(1);
        if channel.subscribers == 0 {
            channels.remove(bin);
            debug!(bin, "last viewer left");
            true
        } else {
            false
        }
    }

    /// Deliver `payload` to every viewer of `bin`.
    ///
    /// Returns the number of viewers reached; 0 when nobody is watching.
    pub async fn dispatch(&self, bin: &str, payload: String) -> usize {
        let channels = self.channels.lock().await;
        channels
            .get(bin)
            .map_or(0, |channel| channel.tx.send(payload).unwrap_or(0))
    }

    /// Number of bins with at least one viewer.
    #[cfg(test)]
    pub async fn active_bins(&self) -> usize {
        self.channels.lock().await.len()
    }
}
