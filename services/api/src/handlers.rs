//! Axum Handlers for the HTTP endpoints
//!
//! The liveness check and the inbound-call webhook. Neither has side effects
//! beyond its response.

use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{IntoResponse, Json},
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::{
    state::AppState,
    twiml::{TwimlDocument, is_local_host, media_stream_url, public_host},
};

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Health {
    pub ok: bool,
}

/// Liveness check.
pub async fn health() -> Json<Health> {
    Json(Health { ok: true })
}

/// Answers an inbound call with TwiML that streams the call audio back to us.
pub async fn incoming_call(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    let host = public_host(&headers);
    if is_local_host(&host) {
        warn!(%host, "Derived host is not publicly reachable; the provider will fail to open the media stream");
    }
    let stream_url = media_stream_url(&host);
    info!(%stream_url, "Answering inbound call");

    let document = TwimlDocument::connect_stream(&state.config.greeting, &stream_url);
    ([(header::CONTENT_TYPE, "text/xml")], document.into_string())
}
