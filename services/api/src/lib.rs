//! Call Relay API Library Crate
//!
//! This library contains the web-facing half of the call relay: configuration,
//! application state, the HTTP handlers, TwiML rendering, the media-stream
//! WebSocket and the OpenAI Realtime session. The `api` binary is a thin
//! wrapper around this library.

pub mod config;
pub mod handlers;
pub mod router;
pub mod state;
pub mod twiml;
pub mod ws;
