//! Geobin API server.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Bin management** (`/api/1/create`, `/api/1/counts`) to create
//!   short-lived bins and query how many requests they hold
//! - **Capture** (`POST /{bin_id}`): any payload sent to a bin is stored
//!   together with its headers and every geographic point found in it
//! - **History** (`/api/1/history/{bin_id}`), newest first
//! - **Live feed** (`/api/1/ws/{bin_id}`): a `WebSocket` pushing each new
//!   capture as it arrives
//!
//! # Architecture
//!
//! ```text
//! POST /{bin_id}
//!     |
//!     +-- Detector::inspect --> GeobinRequest (headers, body, geo)
//!     +-- BinStore::append  --> history
//!     +-- BinStore::publish --> SubscriptionHub --> WebSocket viewers
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod names;
pub mod rate_limit;
pub mod router;
pub mod server;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use config::{ConfigError, GeobinConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerError, start_server};
pub use state::AppState;
