//! Call Bridge
//!
//! Drives one telephony media-stream socket through the lifecycle
//!
//! `Connecting → CredentialChecked → TransportBound → AgentSessionStarted → Active → Closed`
//!
//! Every failure is contained here: it is logged, the socket is closed once,
//! and the outcome is returned to the caller instead of being propagated.

use crate::{
    agent::{RealtimeAgent, SessionConfig},
    credential::{ApiKey, CredentialError},
    session::{ConversationalSession, SessionError, SessionFactory},
    socket::MediaSocket,
    transport::TwilioTransport,
};
use secrecy::SecretString;
use std::{fmt, sync::Arc};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgePhase {
    Connecting,
    CredentialChecked,
    TransportBound,
    AgentSessionStarted,
    Active,
    Closed,
}

impl fmt::Display for BridgePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BridgePhase::Connecting => "connecting",
            BridgePhase::CredentialChecked => "credential_checked",
            BridgePhase::TransportBound => "transport_bound",
            BridgePhase::AgentSessionStarted => "agent_session_started",
            BridgePhase::Active => "active",
            BridgePhase::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// How a bridged call ended.
#[derive(Debug)]
pub enum BridgeOutcome {
    /// The credential check failed; nothing was built.
    Rejected(CredentialError),
    /// Building or starting the session failed in `phase`.
    Failed {
        phase: BridgePhase,
        error: SessionError,
    },
    /// The session ran and ended normally.
    Completed,
    /// The session ran and ended with an error.
    Dropped(SessionError),
}

impl BridgeOutcome {
    /// The furthest phase the call reached before closing.
    pub fn furthest_phase(&self) -> BridgePhase {
        match self {
            BridgeOutcome::Rejected(_) => BridgePhase::Connecting,
            BridgeOutcome::Failed { phase, .. } => *phase,
            BridgeOutcome::Completed | BridgeOutcome::Dropped(_) => BridgePhase::Active,
        }
    }
}

/// Everything needed to bridge a call, shared by all calls.
pub struct CallBridge {
    api_key: Option<SecretString>,
    agent: RealtimeAgent,
    session_config: SessionConfig,
    sessions: Arc<dyn SessionFactory>,
}

impl CallBridge {
    pub fn new(
        api_key: Option<SecretString>,
        agent: RealtimeAgent,
        session_config: SessionConfig,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            api_key,
            agent,
            session_config,
            sessions,
        }
    }

    /// Bridges one call. Returns once the socket has been closed.
    pub async fn run(&self, socket: Arc<dyn MediaSocket>) -> BridgeOutcome {
        let mut phase = BridgePhase::Connecting;

        let api_key = match ApiKey::from_secret(self.api_key.as_ref()) {
            Ok(key) => key,
            Err(e) => {
                error!(error = %e, "Refusing media stream: unusable OpenAI credential");
                close_socket(socket.as_ref()).await;
                return BridgeOutcome::Rejected(e);
            }
        };
        advance(&mut phase, BridgePhase::CredentialChecked);

        let transport = Box::new(TwilioTransport::new(socket.clone()));
        advance(&mut phase, BridgePhase::TransportBound);

        let mut session = match self
            .sessions
            .create(&self.agent, &self.session_config, transport)
        {
            Ok(session) => session,
            Err(e) => return self.fail(socket.as_ref(), phase, e).await,
        };
        advance(&mut phase, BridgePhase::AgentSessionStarted);

        if let Err(e) = session.start(&api_key).await {
            session.stop().await;
            return self.fail(socket.as_ref(), phase, e).await;
        }
        info!(
            agent = %self.agent.name,
            model = %self.session_config.model,
            voice = %self.session_config.voice,
            "Realtime session connected"
        );
        advance(&mut phase, BridgePhase::Active);

        let outcome = run_to_end(session.as_mut()).await;
        session.stop().await;
        close_socket(socket.as_ref()).await;
        advance(&mut phase, BridgePhase::Closed);
        outcome
    }

    async fn fail(
        &self,
        socket: &dyn MediaSocket,
        phase: BridgePhase,
        error: SessionError,
    ) -> BridgeOutcome {
        error!(%phase, error = %error, "Failed to bridge media stream");
        close_socket(socket).await;
        BridgeOutcome::Failed { phase, error }
    }
}

async fn run_to_end(session: &mut dyn ConversationalSession) -> BridgeOutcome {
    match session.run().await {
        Ok(()) => {
            info!("Realtime session ended");
            BridgeOutcome::Completed
        }
        Err(e) => {
            warn!(error = %e, "Realtime session ended with an error");
            BridgeOutcome::Dropped(e)
        }
    }
}

fn advance(phase: &mut BridgePhase, next: BridgePhase) {
    debug!(from = %phase, to = %next, "Bridge phase change");
    *phase = next;
}

async fn close_socket(socket: &dyn MediaSocket) {
    if let Err(e) = socket.close().await {
        debug!(error = %e, "Media stream socket was already closed");
    }
}
