//! `MediaSocket` over an axum WebSocket.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use relay_core::socket::{MediaSocket, SocketError, SocketEvent};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// The upgraded telephony socket, split so sending never waits on a pending receive.
pub struct AxumMediaSocket {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    stream: Mutex<SplitStream<WebSocket>>,
    closed: AtomicBool,
}

impl AxumMediaSocket {
    pub fn new(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self {
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl MediaSocket for AxumMediaSocket {
    async fn send(&self, text: String) -> Result<(), SocketError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SocketError::Closed);
        }
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }

    async fn next_event(&self) -> Option<SocketEvent> {
        let mut stream = self.stream.lock().await;
        loop {
            let event = match stream.next().await? {
                Ok(Message::Text(text)) => SocketEvent::Text(text.as_str().to_owned()),
                Ok(Message::Binary(data)) => SocketEvent::Binary(data.to_vec()),
                Ok(Message::Close(frame)) => {
                    self.closed.store(true, Ordering::SeqCst);
                    let (code, reason) = match frame {
                        Some(frame) => (Some(frame.code), frame.reason.as_str().to_owned()),
                        None => (None, String::new()),
                    };
                    SocketEvent::Closed { code, reason }
                }
                // Pings are answered by the WebSocket layer itself.
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Err(e) => SocketEvent::Error(e.to_string()),
            };
            return Some(event);
        }
    }

    async fn close(&self) -> Result<(), SocketError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        if let Err(e) = self.sink.lock().await.close().await {
            debug!(error = %e, "Error while closing media stream socket");
        }
        Ok(())
    }
}
