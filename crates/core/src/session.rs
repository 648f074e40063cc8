//! The conversational session seam.
//!
//! A `ConversationalSession` owns a bound [`AudioTransport`] and, once started,
//! relays audio between the caller and a realtime model on its own. The call
//! bridge only starts it, waits for it to end, and stops it.

use crate::{
    agent::{RealtimeAgent, SessionConfig},
    credential::ApiKey,
    transport::{AudioTransport, TransportError},
};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session has already been started")]
    AlreadyStarted,
    #[error("session has not been started")]
    NotStarted,
    #[error("failed to build session: {0}")]
    Build(String),
    #[error("failed to connect to the realtime backend: {0}")]
    Connect(String),
    #[error("realtime backend error: {0}")]
    Backend(String),
    #[error("telephony leg failed: {0}")]
    Telephony(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[async_trait]
pub trait ConversationalSession: Send {
    /// Connects to the realtime backend and applies the agent and session configuration.
    async fn start(&mut self, api_key: &ApiKey) -> Result<(), SessionError>;

    /// Relays audio until either the caller or the backend goes away.
    async fn run(&mut self) -> Result<(), SessionError>;

    /// Releases the backend connection. Safe to call more than once.
    async fn stop(&mut self);
}

/// Builds a session bound to a call's transport.
#[cfg_attr(test, mockall::automock)]
pub trait SessionFactory: Send + Sync {
    fn create(
        &self,
        agent: &RealtimeAgent,
        config: &SessionConfig,
        transport: Box<dyn AudioTransport>,
    ) -> Result<Box<dyn ConversationalSession>, SessionError>;
}
