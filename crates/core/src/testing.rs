//! In-memory fakes shared by the unit tests of this crate.

use crate::{
    agent::{RealtimeAgent, SessionConfig},
    credential::ApiKey,
    session::{ConversationalSession, SessionError},
    socket::{MediaSocket, SocketError, SocketEvent},
    transport::AudioTransport,
};
use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};
use tokio::sync::mpsc;

/// A socket fed from a channel, recording what is sent and how often it is closed.
pub struct FakeSocket {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<SocketEvent>>,
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakeSocket {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedSender<SocketEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let socket = Arc::new(Self {
            inbound: tokio::sync::Mutex::new(rx),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        });
        (socket, tx)
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaSocket for FakeSocket {
    async fn send(&self, text: String) -> Result<(), SocketError> {
        if self.is_closed() {
            return Err(SocketError::Closed);
        }
        self.sent.lock().unwrap().push(text);
        Ok(())
    }

    async fn next_event(&self) -> Option<SocketEvent> {
        if self.is_closed() {
            return None;
        }
        self.inbound.lock().await.recv().await
    }

    async fn close(&self) -> Result<(), SocketError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Counters shared between a test and the sessions it hands out.
#[derive(Default)]
pub struct SessionProbe {
    pub starts: AtomicUsize,
    pub stops: AtomicUsize,
}

impl SessionProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// A session that relays nothing and ends when the telephony leg ends.
pub struct FakeSession {
    pub transport: Box<dyn AudioTransport>,
    pub probe: Arc<SessionProbe>,
    pub fail_start: bool,
}

impl FakeSession {
    pub fn boxed(
        _agent: &RealtimeAgent,
        _config: &SessionConfig,
        transport: Box<dyn AudioTransport>,
        probe: Arc<SessionProbe>,
    ) -> Box<dyn ConversationalSession> {
        Box::new(Self {
            transport,
            probe,
            fail_start: false,
        })
    }
}

#[async_trait]
impl ConversationalSession for FakeSession {
    async fn start(&mut self, _api_key: &ApiKey) -> Result<(), SessionError> {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(SessionError::Connect("refused".into()));
        }
        Ok(())
    }

    async fn run(&mut self) -> Result<(), SessionError> {
        while let Some(event) = self.transport.next_event().await {
            match event {
                crate::transport::TransportEvent::Error(err) => {
                    return Err(SessionError::Telephony(err));
                }
                event if event.is_terminal() => return Ok(()),
                _ => {}
            }
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }
}
