//! Key layout shared by every store.
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `geobin:{id}` | Sorted set | Bin entries scored by arrival time (Unix seconds) |
//! | `geobin:{id}` | Pub/sub channel | Live stream of new entries |
//!
//! Every bin's sorted set holds one [`PLACEHOLDER`] member at score 0 so an
//! empty bin still exists (and can carry a TTL). It is never returned as
//! history and never counted.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::DbError;

/// Prefix of every bin key and channel.
pub const KEY_PREFIX: &str = "geobin:";

/// Member that keeps an empty bin's sorted set alive.
pub const PLACEHOLDER: &str = "";

/// Sorted-set key (and pub/sub channel) of bin `id`.
pub fn bin_key(id: &str) -> String {
    format!("{KEY_PREFIX}{id}")
}

/// Bin id encoded in a key or channel name, if it is one of ours.
pub fn bin_id(key: &str) -> Option<&str> {
    key.strip_prefix(KEY_PREFIX)
}

/// The instant a bin created now with `ttl` expires.
///
/// # Errors
///
/// Returns [`DbError::Config`] if the instant is not representable.
pub fn expiry(ttl: TimeDelta) -> Result<DateTime<Utc>, DbError> {
    Utc::now()
        .checked_add_signed(ttl)
        .ok_or_else(|| DbError::Config(format!("bin ttl out of range: {ttl}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_to_ids() {
        assert_eq!(bin_key("abc"), "geobin:abc");
        assert_eq!(bin_id("geobin:abc"), Some("abc"));
        assert_eq!(bin_id("other:abc"), None);
    }

    #[test]
    fn expiry_is_in_the_future() {
        let before = Utc::now();
        let expires = expiry(TimeDelta::hours(48)).ok();
        assert!(expires.is_some_and(|at| at > before));
        assert!(expiry(TimeDelta::MAX).is_err());
    }
}
