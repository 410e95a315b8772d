//! `WebSocket` handler for the live feed of a bin.
//!
//! Clients connect to `GET /api/1/ws/{bin_id}` and receive every request
//! captured into that bin afterwards, as the same JSON text stored in its
//! history. The subscription is taken before the upgrade completes, so
//! nothing captured after the `101` response is missed.
//!
//! If a client falls behind, lagged messages are skipped and the client
//! resumes from the most recent entry.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::ensure_bin;
use crate::state::AppState;

/// Upgrade an HTTP request to a `WebSocket` streaming bin `bin_id`.
///
/// # Route
///
/// `GET /api/1/ws/{bin_id}`
pub async fn ws_bin(
    ws: WebSocketUpgrade,
    Path(bin_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, ApiError> {
    ensure_bin(&state, &bin_id).await?;
    let rx = state.store.subscribe(&bin_id).await?;
    let session = Uuid::new_v4();

    let failed = (Arc::clone(&state), bin_id.clone());
    Ok(ws
        .on_failed_upgrade(move |e| {
            warn!(%session, error = %e, "WebSocket upgrade failed");
            let (state, bin_id) = failed;
            tokio::spawn(async move { release(&state, &bin_id).await });
        })
        .on_upgrade(move |socket| async move {
            debug!(%session, bin = %bin_id, "WebSocket client connected");
            stream_bin(socket, rx, session).await;
            release(&state, &bin_id).await;
            debug!(%session, bin = %bin_id, "WebSocket session closed");
        }))
}

async fn release(state: &AppState, bin_id: &str) {
    if let Err(e) = state.store.unsubscribe(bin_id).await {
        warn!(bin = bin_id, error = %e, "failed to release bin subscription");
    }
}

/// Forward each captured request as a text frame until either side closes.
async fn stream_bin(mut socket: WebSocket, mut rx: broadcast::Receiver<String>, session: Uuid) {
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(entry) => {
                        if socket.send(Message::Text(entry.into())).await.is_err() {
                            debug!(%session, "WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        debug!(%session, skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!(%session, "bin feed closed");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!(%session, "WebSocket error: {e}");
                        return;
                    }
                    // Clients have nothing to say.
                    _ => {}
                }
            }
        }
    }
}
