//! Geo detection for arbitrary JSON payloads.
//!
//! Webhook bodies from geo-tracking services put coordinates anywhere, under
//! any key naming convention. [`Detector::detect`] walks a decoded document
//! and returns every geographic point it finds, each tagged with the
//! [`GeoPath`](geobin_types::GeoPath) where it was found.
//!
//! # Modules
//!
//! - [`classify`] -- Predicates deciding whether an object is a point
//! - [`engine`] -- The concurrent fan-out/fan-in tree walker
//! - [`inspect`] -- Building a [`GeobinRequest`](geobin_types::GeobinRequest)
//!   from raw body bytes
//!
//! # Example
//!
//! ```rust
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let found = geobin_detect::detect(serde_json::json!({"x": 1, "y": -1})).await;
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].coordinates(), Some((1.0, -1.0)));
//! # }
//! ```

pub mod classify;
pub mod engine;
pub mod inspect;

// Re-export primary types for convenience.
pub use engine::{DetectOptions, Detector, detect};
