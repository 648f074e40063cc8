//! Media Stream WebSocket
//!
//! Everything behind `/media-stream`, split into:
//!
//! - `session`: the axum upgrade handler that runs one call bridge per socket.
//! - `socket`: the axum implementation of the core `MediaSocket` seam.
//! - `protocol`: client events for the OpenAI Realtime API built locally.
//! - `provider`: the realtime model sessions a call can be bridged to.

pub mod protocol;
pub mod provider;
pub mod session;
pub mod socket;

pub use session::media_stream_handler;
