//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `POST` | `/api/1/create` | Create a bin |
//! | `POST` | `/api/1/counts` | Entry counts for a list of bins |
//! | `GET`/`POST` | `/api/1/history/{bin_id}` | Every entry of a bin, newest first |
//! | `POST` | `/{bin_id}` | Capture a request into a bin |

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use chrono::Utc;
use geobin_types::BinCreated;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::AppState;

/// Attempts at drawing a bin name that is not already taken.
const MAX_NAME_ATTEMPTS: usize = 16;

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page showing server status and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let backend = state.store.name();
    let ttl_hours = state.bin_ttl.num_hours();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Geobin</title>
    <style>
        body {{ font-family: monospace; padding: 2rem; max-width: 760px; margin: 0 auto; }}
        code {{ background: #f3f3f3; padding: 0 0.25rem; }}
        li {{ padding: 0.2rem 0; }}
    </style>
</head>
<body>
    <h1>Geobin</h1>
    <p>Capture webhooks and find the geographic points inside them.</p>
    <p>Storage: <strong>{backend}</strong>. Bins expire after {ttl_hours} hours.</p>

    <h2>API</h2>
    <ul>
        <li><code>POST /api/1/create</code> -- create a bin</li>
        <li><code>POST /{{bin_id}}</code> -- send a payload to a bin</li>
        <li><code>GET /api/1/history/{{bin_id}}</code> -- captured requests, newest first</li>
        <li><code>POST /api/1/counts</code> -- <code>["id", ...]</code> to request counts</li>
        <li><code>ws://host/api/1/ws/{{bin_id}}</code> -- live feed of new requests</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// POST /api/1/create -- new bin
// ---------------------------------------------------------------------------

/// Create a bin with a fresh random name.
///
/// Responds with `{"id": name, "expires": unix_seconds}`.
pub async fn create_bin(State(state): State<Arc<AppState>>) -> Result<Json<BinCreated>, ApiError> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let id = state.names.generate();
        if state.store.bin_exists(&id).await? {
            debug!(bin = %id, "name collision, drawing again");
            continue;
        }
        let expires = state.store.create_bin(&id, state.bin_ttl).await?;
        info!(bin = %id, %expires, "bin created");
        return Ok(Json(BinCreated {
            id,
            expires: expires.timestamp(),
        }));
    }
    Err(ApiError::Internal(String::from(
        "could not allocate a unique bin name",
    )))
}

// ---------------------------------------------------------------------------
// POST /api/1/counts -- entry counts
// ---------------------------------------------------------------------------

/// Map each requested bin id to its entry count, or `null` if unknown.
pub async fn counts(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<BTreeMap<String, Option<u64>>>, ApiError> {
    let ids: Vec<String> = serde_json::from_slice(&body?)
        .map_err(|e| ApiError::BadRequest(format!("expected a JSON array of bin ids: {e}")))?;

    let mut counts = BTreeMap::new();
    for id in ids {
        let count = state.store.count(&id).await?;
        counts.insert(id, count);
    }
    Ok(Json(counts))
}

// ---------------------------------------------------------------------------
// GET|POST /api/1/history/{bin_id} -- bin history
// ---------------------------------------------------------------------------

/// Every stored request of a bin, newest first.
pub async fn history(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    ensure_bin(&state, &bin_id).await?;

    let entries = state.store.history(&bin_id).await?;
    let history = entries
        .iter()
        .filter_map(|entry| match serde_json::from_str(entry) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(bin = %bin_id, error = %e, "skipping unreadable history entry");
                None
            }
        })
        .collect();
    Ok(Json(history))
}

// ---------------------------------------------------------------------------
// POST /{bin_id} -- capture a request
// ---------------------------------------------------------------------------

/// Capture a request: detect geo data, store it, and notify live viewers.
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Path(bin_id): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<StatusCode, ApiError> {
    ensure_bin(&state, &bin_id).await?;
    let body = body?;

    let timestamp = Utc::now().timestamp();
    let request = state
        .detector
        .inspect(timestamp, flatten_headers(&headers), &body)
        .await;
    debug!(bin = %bin_id, points = request.points().len(), bytes = body.len(), "request captured");

    let encoded = serde_json::to_string(&request)?;
    state.store.append(&bin_id, timestamp, encoded.clone()).await?;
    if let Err(e) = state.store.publish(&bin_id, encoded).await {
        warn!(bin = %bin_id, error = %e, "failed to publish captured request");
    }
    Ok(StatusCode::OK)
}

/// Header name to all of its values joined with `", "`.
///
/// Names are lowercase, as delivered by the HTTP layer. Values that are
/// not valid UTF-8 are decoded lossily.
pub fn flatten_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .keys()
        .map(|name| {
            let values: Vec<String> = headers
                .get_all(name)
                .iter()
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
                .collect();
            (name.as_str().to_owned(), values.join(", "))
        })
        .collect()
}

/// Fail with 404 unless `bin_id` exists.
pub(crate) async fn ensure_bin(state: &AppState, bin_id: &str) -> Result<(), ApiError> {
    if state.store.bin_exists(bin_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound(format!("bin {bin_id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept", HeaderValue::from_static("text/html"));
        headers.append("accept", HeaderValue::from_static("application/json"));
        headers.insert("x-trace", HeaderValue::from_static("abc"));

        let flat = flatten_headers(&headers);
        assert_eq!(flat.len(), 2);
        assert_eq!(
            flat.get("accept").map(String::as_str),
            Some("text/html, application/json")
        );
        assert_eq!(flat.get("x-trace").map(String::as_str), Some("abc"));
    }

    #[test]
    fn opaque_header_bytes_are_decoded_lossily() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-blob",
            HeaderValue::from_bytes(b"caf\xe9").unwrap_or(HeaderValue::from_static("")),
        );
        let flat = flatten_headers(&headers);
        assert_eq!(flat.get("x-blob").map(String::as_str), Some("caf\u{fffd}"));
    }
}
