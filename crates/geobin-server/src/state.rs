//! Shared application state for the Geobin API server.
//!
//! [`AppState`] bundles the bin store, the geo detector and the
//! per-route rate limiter. It is built once at startup, wrapped in an
//! [`Arc`] and injected via Axum's `State` extractor.

use std::sync::Arc;

use chrono::TimeDelta;
use geobin_db::BinStore;
use geobin_detect::Detector;

use crate::config::{ConfigError, GeobinConfig};
use crate::names::NameGenerator;
use crate::rate_limit::RateLimiter;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    /// Bin storage and live fan-out.
    pub store: BinStore,
    /// Geo detection for ingested payloads.
    pub detector: Detector,
    /// Source of new bin names.
    pub names: NameGenerator,
    /// How long a new bin lives.
    pub bin_ttl: TimeDelta,
    /// Largest accepted request body, in bytes.
    pub max_body_bytes: usize,
    /// Rate limiter shared by every limited route.
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    /// Build the state for `config` on top of an already connected store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the bin settings are unusable.
    pub fn new(config: &GeobinConfig, store: BinStore) -> Result<Self, ConfigError> {
        let bin_ttl = TimeDelta::try_hours(i64::from(config.bins.ttl_hours))
            .filter(|ttl| *ttl > TimeDelta::zero())
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "bins.ttl_hours must be positive, got {}",
                    config.bins.ttl_hours
                ))
            })?;
        Ok(Self {
            store,
            detector: Detector::new(config.detect.into()),
            names: NameGenerator::from_config(&config.bins)?,
            bin_ttl,
            max_body_bytes: config.limits.max_body_bytes,
            limiter: Arc::new(RateLimiter::new(config.limits.requests_per_second)),
        })
    }
}

#[cfg(test)]
mod tests {
    use geobin_db::MemoryStore;

    use super::*;

    #[test]
    fn default_config_builds_state() {
        let state = AppState::new(&GeobinConfig::default(), MemoryStore::new().into());
        let state = state.ok();
        assert!(state.is_some());
        assert_eq!(state.map(|s| s.bin_ttl), Some(TimeDelta::hours(48)));
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut config = GeobinConfig::default();
        config.bins.ttl_hours = 0;
        let state = AppState::new(&config, MemoryStore::new().into());
        assert!(matches!(state, Err(ConfigError::Invalid(_))));
    }
}
