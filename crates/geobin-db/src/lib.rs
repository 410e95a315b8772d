//! Storage layer for Geobin bins.
//!
//! A bin is a short-lived, append-only list of captured requests plus a
//! live feed of new ones. Two backends implement the same semantics:
//!
//! ```text
//! BinStore
//!     |
//!     +-- Redis  --> sorted set geobin:{id} (TTL) + PUBLISH geobin:{id}
//!     |                 ^
//!     |                 +-- SubscriberClient --> SubscriptionHub --> viewers
//!     |
//!     +-- Memory --> RwLock<HashMap> (lazy expiry) --> SubscriptionHub --> viewers
//! ```
//!
//! # Modules
//!
//! - [`store`] -- [`BinStore`], the backend-agnostic entry point
//! - [`redis`] -- Redis sorted sets and pub/sub
//! - [`memory`] -- in-process backend for tests and single-node use
//! - [`hub`] -- per-bin broadcast fan-out to live viewers
//! - [`keys`] -- key layout shared by both backends
//! - [`error`] -- shared error types

pub mod error;
pub mod hub;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod store;

pub use error::DbError;
pub use hub::SubscriptionHub;
pub use memory::MemoryStore;
pub use redis::RedisStore;
pub use store::BinStore;
