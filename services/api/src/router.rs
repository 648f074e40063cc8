//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application: the
//! liveness check, the inbound-call webhook and the media-stream WebSocket.

use crate::{handlers, state::AppState, twiml::MEDIA_STREAM_PATH, ws::media_stream_handler};

use axum::{
    Router,
    routing::{any, get},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::health))
        // The provider may be configured to call the webhook with GET or POST.
        .route("/incoming-call", any(handlers::incoming_call))
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
}
