//! Telephony audio transport.
//!
//! `AudioTransport` is the seam between a realtime session and the phone leg:
//! the session pulls caller audio and control events from it and pushes model
//! audio into it. `TwilioTransport` implements it over a Twilio Media Streams
//! socket.

use crate::{
    socket::{MediaSocket, SocketError, SocketEvent},
    twilio::{InboundFrame, MarkLabel, OutboundFrame, OutboundMedia},
};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Number of characters of the first inbound frame written to the log.
const PREVIEW_CHARS: usize = 200;

/// An event observed on the telephony leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    /// The provider announced the stream; outbound frames can be sent from now on.
    Started { stream_sid: String },
    /// Caller audio, base64 encoded mu-law.
    Audio { payload: String },
    /// A mark previously sent with [`AudioTransport::send_mark`] finished playing.
    Mark(String),
    Dtmf(String),
    /// The provider ended the stream.
    Stopped,
    Closed {
        code: Option<u16>,
        reason: String,
    },
    Error(String),
}

impl TransportEvent {
    /// Whether no further events can follow this one.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransportEvent::Stopped | TransportEvent::Closed { .. } | TransportEvent::Error(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("media stream has not started yet")]
    NotStarted,
    #[error(transparent)]
    Socket(#[from] SocketError),
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait AudioTransport: Send {
    /// Waits for the next telephony event. `None` means the leg is gone.
    async fn next_event(&mut self) -> Option<TransportEvent>;

    /// Queues base64 encoded audio for playback to the caller.
    async fn send_audio(&mut self, payload: &str) -> Result<(), TransportError>;

    /// Queues a named marker behind the audio sent so far.
    async fn send_mark(&mut self, name: &str) -> Result<(), TransportError>;

    /// Discards audio queued for playback but not yet heard.
    async fn clear(&mut self) -> Result<(), TransportError>;
}

/// Adapts a Twilio Media Streams socket to [`AudioTransport`].
///
/// The transport never closes the socket; that belongs to whoever owns the call.
pub struct TwilioTransport {
    socket: Arc<dyn MediaSocket>,
    stream_sid: Option<String>,
    first_frame_logged: bool,
}

impl TwilioTransport {
    pub fn new(socket: Arc<dyn MediaSocket>) -> Self {
        Self {
            socket,
            stream_sid: None,
            first_frame_logged: false,
        }
    }

    fn log_first_frame(&mut self, text: &str) {
        if self.first_frame_logged {
            return;
        }
        self.first_frame_logged = true;
        let preview: String = text.chars().take(PREVIEW_CHARS).collect();
        info!(%preview, "First media stream frame received (expected 'start')");
    }

    fn translate(&mut self, frame: InboundFrame) -> TransportEvent {
        match frame {
            InboundFrame::Connected { protocol, version } => {
                debug!(?protocol, ?version, "Media stream connected");
                TransportEvent::Connected
            }
            InboundFrame::Start { start } => {
                info!(
                    stream_sid = %start.stream_sid,
                    call_sid = ?start.call_sid,
                    media_format = ?start.media_format,
                    "Media stream started"
                );
                tracing::Span::current().record("stream_sid", start.stream_sid.as_str());
                self.stream_sid = Some(start.stream_sid.clone());
                TransportEvent::Started {
                    stream_sid: start.stream_sid,
                }
            }
            InboundFrame::Media { media } => TransportEvent::Audio {
                payload: media.payload,
            },
            InboundFrame::Mark { mark } => TransportEvent::Mark(mark.name),
            InboundFrame::Dtmf { dtmf } => {
                info!(digit = %dtmf.digit, "DTMF digit received");
                TransportEvent::Dtmf(dtmf.digit)
            }
            InboundFrame::Stop { stop } => {
                info!(call_sid = ?stop.and_then(|s| s.call_sid), "Media stream stopped by provider");
                TransportEvent::Stopped
            }
        }
    }

    fn require_stream_sid(&self) -> Result<&str, TransportError> {
        self.stream_sid.as_deref().ok_or(TransportError::NotStarted)
    }

    async fn send_frame(&self, frame: &OutboundFrame<'_>) -> Result<(), TransportError> {
        let text = serde_json::to_string(frame)?;
        self.socket.send(text).await?;
        Ok(())
    }
}

#[async_trait]
impl AudioTransport for TwilioTransport {
    async fn next_event(&mut self) -> Option<TransportEvent> {
        loop {
            match self.socket.next_event().await? {
                SocketEvent::Text(text) => {
                    self.log_first_frame(&text);
                    match serde_json::from_str::<InboundFrame>(&text) {
                        Ok(frame) => return Some(self.translate(frame)),
                        Err(e) => warn!(error = %e, "Ignoring unrecognised media stream frame"),
                    }
                }
                SocketEvent::Binary(data) => {
                    debug!(len = data.len(), "Ignoring binary frame on media stream");
                }
                SocketEvent::Closed { code, reason } => {
                    warn!(?code, %reason, "Media stream socket closed");
                    return Some(TransportEvent::Closed { code, reason });
                }
                SocketEvent::Error(err) => {
                    error!(error = %err, "Media stream socket error");
                    return Some(TransportEvent::Error(err));
                }
            }
        }
    }

    async fn send_audio(&mut self, payload: &str) -> Result<(), TransportError> {
        let frame = OutboundFrame::Media {
            stream_sid: self.require_stream_sid()?,
            media: OutboundMedia { payload },
        };
        self.send_frame(&frame).await
    }

    async fn send_mark(&mut self, name: &str) -> Result<(), TransportError> {
        let frame = OutboundFrame::Mark {
            stream_sid: self.require_stream_sid()?,
            mark: MarkLabel {
                name: name.to_string(),
            },
        };
        self.send_frame(&frame).await
    }

    async fn clear(&mut self) -> Result<(), TransportError> {
        let frame = OutboundFrame::Clear {
            stream_sid: self.require_stream_sid()?,
        };
        self.send_frame(&frame).await
    }
}
