//! Agent and Session Descriptors
//!
//! This module defines the configuration handed to a realtime conversational
//! session when a call is bridged: who the agent is (`RealtimeAgent`) and how
//! audio is exchanged with the model (`SessionConfig`).

use serde::{Deserialize, Serialize};

pub const DEFAULT_AGENT_NAME: &str = "Angelina (Flame Stone)";
pub const DEFAULT_LANGUAGE: &str = "es";
pub const DEFAULT_VOICE: &str = "verse";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview";

pub const DEFAULT_INSTRUCTIONS: &str = "Eres Angelina, la asistente telefónica de Flame Stone. \
Habla con frases cortas y naturales, como en una llamada de teléfono. \
Al inicio de la llamada, saluda brevemente: \"Hola, soy Angelina de Flame Stone. ¿En qué puedo ayudarte?\"";

// --- Agent ---

/// The conversational persona that answers the call.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RealtimeAgent {
    /// Display name of the agent, used in logs and in the session metadata.
    pub name: String,
    /// Language the agent should prefer when replying (e.g. "es").
    pub language_preference: String,
    /// The behavioural instructions (system prompt) for the model.
    pub instructions: String,
}

impl RealtimeAgent {
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language_preference: DEFAULT_LANGUAGE.to_string(),
            instructions: instructions.into(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language_preference = language.into();
        self
    }

    /// Renders the instructions sent to the model, including the language preference.
    pub fn system_prompt(&self) -> String {
        if self.language_preference.trim().is_empty() {
            return self.instructions.clone();
        }
        format!(
            "{}\n\nPreferred language: {}",
            self.instructions.trim_end(),
            self.language_preference
        )
    }
}

impl Default for RealtimeAgent {
    fn default() -> Self {
        Self::new(DEFAULT_AGENT_NAME, DEFAULT_INSTRUCTIONS)
    }
}

// --- Session ---

/// Audio encodings exchanged with the realtime backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// 8 kHz mu-law, the format telephony media streams carry.
    #[serde(rename = "g711_ulaw")]
    G711Ulaw,
}

/// Settings for the realtime session wrapping a telephony transport.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub model: String,
    pub voice: String,
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    /// Ask the model for a response as soon as the session is configured,
    /// so the caller hears the agent before speaking.
    pub speak_first: bool,
}

impl SessionConfig {
    /// A session that exchanges mu-law audio in both directions, matching a phone leg.
    pub fn telephony(model: impl Into<String>, voice: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            voice: voice.into(),
            input_audio_format: AudioFormat::G711Ulaw,
            output_audio_format: AudioFormat::G711Ulaw,
            speak_first: false,
        }
    }

    pub fn with_speak_first(mut self, speak_first: bool) -> Self {
        self.speak_first = speak_first;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::telephony(DEFAULT_MODEL, DEFAULT_VOICE)
    }
}
