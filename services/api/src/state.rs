//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds the configuration
//! and the call bridge every media stream runs through.

use crate::config::Config;
use relay_core::{CallBridge, session::SessionFactory};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub bridge: Arc<CallBridge>,
}

impl AppState {
    /// Wires the bridge from configuration, with `sessions` building each call's realtime session.
    pub fn new(config: Config, sessions: Arc<dyn SessionFactory>) -> Self {
        let api_key = config
            .openai_api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_owned()));
        let bridge = CallBridge::new(api_key, config.agent(), config.session_config(), sessions);
        Self {
            config: Arc::new(config),
            bridge: Arc::new(bridge),
        }
    }
}
