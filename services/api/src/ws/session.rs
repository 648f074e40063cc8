//! Manages the media-stream WebSocket opened by the telephony provider.

use super::socket::AxumMediaSocket;
use crate::state::AppState;
use axum::{
    extract::{State, ws::WebSocket, ws::WebSocketUpgrade},
    http::{HeaderMap, header},
    response::Response,
};
use relay_core::{BridgeOutcome, socket::MediaSocket};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Axum handler to upgrade the provider's HTTP request to a media-stream WebSocket.
pub async fn media_stream_handler(
    ws: WebSocketUpgrade,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    ws.on_upgrade(move |socket| handle_socket(socket, state, user_agent))
}

/// Runs one call bridge for the lifetime of the socket.
///
/// Each socket gets its own task from axum, so a failing call never touches
/// another; the bridge reports its outcome instead of propagating errors.
#[instrument(
    name = "media_stream",
    skip_all,
    fields(call_id = %Uuid::new_v4(), stream_sid = tracing::field::Empty)
)]
async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_agent: String) {
    info!(%user_agent, "Media stream connection attempt");
    let socket: Arc<dyn MediaSocket> = Arc::new(AxumMediaSocket::new(socket));

    let outcome = state.bridge.run(socket).await;
    let phase = outcome.furthest_phase();
    match outcome {
        BridgeOutcome::Completed => info!(%phase, "Call finished."),
        BridgeOutcome::Rejected(e) => warn!(%phase, error = %e, "Call refused."),
        BridgeOutcome::Failed { error, .. } | BridgeOutcome::Dropped(error) => {
            warn!(%phase, error = %error, "Call dropped.")
        }
    }
}
