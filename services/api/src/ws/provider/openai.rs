//! Bridges a telephony transport to the OpenAI Realtime API.

use crate::ws::protocol::ClientEvent;
use async_openai::types::realtime::{
    self as oai_realtime, ClientEvent as OAIClientEvent, ServerEvent as OAIServerEvent,
};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use relay_core::{
    agent::{RealtimeAgent, SessionConfig},
    audio::{PlaybackTracker, ulaw_len},
    credential::ApiKey,
    session::{ConversationalSession, SessionError, SessionFactory},
    transport::{AudioTransport, TransportError, TransportEvent},
};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{client::IntoClientRequest, protocol::Message as WsMessage},
};
use tracing::{debug, error, info, warn};

type ModelSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Builds an [`OpenAiRealtimeSession`] per call.
pub struct OpenAiSessionFactory {
    realtime_url: String,
}

impl OpenAiSessionFactory {
    pub fn new(realtime_url: impl Into<String>) -> Self {
        Self {
            realtime_url: realtime_url.into(),
        }
    }
}

impl SessionFactory for OpenAiSessionFactory {
    fn create(
        &self,
        agent: &RealtimeAgent,
        config: &SessionConfig,
        transport: Box<dyn AudioTransport>,
    ) -> Result<Box<dyn ConversationalSession>, SessionError> {
        let endpoint = realtime_endpoint(&self.realtime_url, &config.model)?;
        Ok(Box::new(OpenAiRealtimeSession::new(
            endpoint,
            agent.clone(),
            config.clone(),
            transport,
        )))
    }
}

/// `<base>?model=<model>`, rejecting model names that cannot go in a query string.
pub fn realtime_endpoint(base: &str, model: &str) -> Result<String, SessionError> {
    let model = model.trim();
    if model.is_empty() {
        return Err(SessionError::Build("realtime model name is empty".into()));
    }
    if !model
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    {
        return Err(SessionError::Build(format!(
            "invalid realtime model name '{}'",
            model
        )));
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    Ok(format!("{}{}model={}", base, separator, model))
}

/// What the relay loop should do after handling an event.
enum Flow {
    Continue,
    Stop(Result<(), SessionError>),
}

/// A realtime conversation with OpenAI, bound to one call's transport.
pub struct OpenAiRealtimeSession {
    endpoint: String,
    agent: RealtimeAgent,
    config: SessionConfig,
    transport: Box<dyn AudioTransport>,
    model: Option<ModelSocket>,
    started: bool,
    playback: PlaybackTracker,
}

impl OpenAiRealtimeSession {
    pub fn new(
        endpoint: String,
        agent: RealtimeAgent,
        config: SessionConfig,
        transport: Box<dyn AudioTransport>,
    ) -> Self {
        Self {
            endpoint,
            agent,
            config,
            transport,
            model: None,
            started: false,
            playback: PlaybackTracker::new(),
        }
    }
}

#[async_trait]
impl ConversationalSession for OpenAiRealtimeSession {
    async fn start(&mut self, api_key: &ApiKey) -> Result<(), SessionError> {
        if self.started {
            return Err(SessionError::AlreadyStarted);
        }
        self.started = true;

        let mut request = self
            .endpoint
            .as_str()
            .into_client_request()
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        request.headers_mut().insert(
            "Authorization",
            format!("Bearer {}", api_key.expose())
                .parse()
                .map_err(|_| SessionError::Connect("API key is not a valid header value".into()))?,
        );
        request
            .headers_mut()
            .insert("OpenAI-Beta", "realtime=v1".parse().map_err(|_| {
                SessionError::Connect("invalid OpenAI-Beta header".into())
            })?);

        let (mut model, _) = connect_async(request)
            .await
            .map_err(|e| SessionError::Connect(e.to_string()))?;
        info!(endpoint = %self.endpoint, "Connected to OpenAI Realtime API.");

        send_json(
            &mut model,
            &ClientEvent::session_update(&self.agent, &self.config),
        )
        .await?;
        if self.config.speak_first {
            let response_event = oai_realtime::ResponseCreateEvent {
                response: None,
                event_id: None,
            };
            send_json(&mut model, &OAIClientEvent::ResponseCreate(response_event)).await?;
        }

        self.model = Some(model);
        Ok(())
    }

    async fn run(&mut self) -> Result<(), SessionError> {
        let Self {
            transport,
            model,
            playback,
            ..
        } = self;
        let model = model.as_mut().ok_or(SessionError::NotStarted)?;

        loop {
            let flow = tokio::select! {
                event = transport.next_event() => match event {
                    Some(event) => on_telephony_event(event, model, playback).await,
                    None => {
                        info!("Telephony leg ended.");
                        Flow::Stop(Ok(()))
                    }
                },
                message = model.next() => match message {
                    Some(Ok(message)) => on_model_message(message, transport.as_mut(), model, playback).await,
                    Some(Err(e)) => Flow::Stop(Err(SessionError::Backend(e.to_string()))),
                    None => {
                        warn!("OpenAI Realtime connection ended.");
                        Flow::Stop(Ok(()))
                    }
                },
            };
            if let Flow::Stop(result) = flow {
                return result;
            }
        }
    }

    async fn stop(&mut self) {
        if let Some(mut model) = self.model.take() {
            if let Err(e) = model.close(None).await {
                debug!(error = %e, "Error while closing OpenAI Realtime connection");
            }
            info!("OpenAI Realtime connection closed.");
        }
    }
}

async fn on_telephony_event(
    event: TransportEvent,
    model: &mut ModelSocket,
    playback: &mut PlaybackTracker,
) -> Flow {
    match event {
        TransportEvent::Audio { payload } => {
            let append_event = oai_realtime::InputAudioBufferAppendEvent {
                audio: payload,
                event_id: None,
            };
            if let Err(e) =
                send_json(model, &OAIClientEvent::InputAudioBufferAppend(append_event)).await
            {
                return Flow::Stop(Err(e));
            }
        }
        TransportEvent::Mark(name) => playback.acknowledge(&name),
        TransportEvent::Started { stream_sid } => {
            debug!(%stream_sid, "Telephony stream ready for audio");
        }
        TransportEvent::Connected | TransportEvent::Dtmf(_) => {}
        TransportEvent::Stopped | TransportEvent::Closed { .. } => return Flow::Stop(Ok(())),
        TransportEvent::Error(err) => return Flow::Stop(Err(SessionError::Telephony(err))),
    }
    Flow::Continue
}

async fn on_model_message(
    message: WsMessage,
    transport: &mut dyn AudioTransport,
    model: &mut ModelSocket,
    playback: &mut PlaybackTracker,
) -> Flow {
    let text = match message {
        WsMessage::Text(text) => text,
        WsMessage::Close(frame) => {
            info!(?frame, "OpenAI Realtime API closed the connection.");
            return Flow::Stop(Ok(()));
        }
        _ => return Flow::Continue,
    };
    let server_event = match serde_json::from_str::<OAIServerEvent>(text.as_str()) {
        Ok(event) => event,
        Err(_) => {
            debug!("Ignoring unhandled OpenAI Realtime event");
            return Flow::Continue;
        }
    };

    let result = match server_event {
        OAIServerEvent::SessionCreated(_) => {
            info!("OpenAI Realtime session created.");
            Ok(())
        }
        OAIServerEvent::SessionUpdated(_) => {
            debug!("OpenAI Realtime session configured.");
            Ok(())
        }
        OAIServerEvent::ResponseCreated(_) => {
            playback.start_response();
            Ok(())
        }
        OAIServerEvent::ResponseAudioDelta(e) => {
            forward_audio(transport, playback, &e.item_id, &e.delta).await
        }
        OAIServerEvent::InputAudioBufferSpeechStarted(_) => {
            interrupt_playback(transport, model, playback).await
        }
        OAIServerEvent::ResponseDone(_) => {
            playback.finish();
            Ok(())
        }
        OAIServerEvent::Error(e) => {
            error!(message = %e.error.message, "OpenAI Realtime API reported an error");
            Ok(())
        }
        _ => Ok(()),
    };

    match result {
        Ok(()) => Flow::Continue,
        Err(e) => Flow::Stop(Err(e)),
    }
}

/// Plays model audio to the caller, followed by a mark to learn when it was heard.
async fn forward_audio(
    transport: &mut dyn AudioTransport,
    playback: &mut PlaybackTracker,
    item_id: &str,
    delta: &str,
) -> Result<(), SessionError> {
    if !playback.accepts(item_id) {
        debug!(%item_id, "Dropping audio of an interrupted response");
        return Ok(());
    }
    let samples = ulaw_len(delta).unwrap_or_else(|e| {
        warn!(error = %e, "Model audio is not valid base64");
        0
    });
    match transport.send_audio(delta).await {
        Err(TransportError::NotStarted) => {
            warn!("Dropping model audio: telephony stream has not started");
            return Ok(());
        }
        other => other?,
    }
    let mark = playback.record_sent(item_id, samples);
    transport.send_mark(&mark).await?;
    Ok(())
}

/// The caller started talking over the agent: stop playback and tell the
/// model how much of its answer was actually heard.
async fn interrupt_playback(
    transport: &mut dyn AudioTransport,
    model: &mut ModelSocket,
    playback: &mut PlaybackTracker,
) -> Result<(), SessionError> {
    let Some(cut) = playback.interrupt() else {
        return Ok(());
    };
    info!(item_id = %cut.item_id, audio_end_ms = cut.audio_end_ms, "Caller interrupted the agent");
    transport.clear().await?;
    let truncate_event = oai_realtime::ConversationItemTruncateEvent {
        event_id: None,
        item_id: cut.item_id,
        content_index: 0,
        audio_end_ms: u32::try_from(cut.audio_end_ms).unwrap_or(u32::MAX),
    };
    send_json(model, &OAIClientEvent::ConversationItemTruncate(truncate_event)).await
}

async fn send_json<T: Serialize>(model: &mut ModelSocket, event: &T) -> Result<(), SessionError> {
    let serialized =
        serde_json::to_string(event).map_err(|e| SessionError::Backend(e.to_string()))?;
    model
        .send(WsMessage::Text(serialized.into()))
        .await
        .map_err(|e| SessionError::Backend(e.to_string()))
}
