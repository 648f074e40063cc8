//! Client events sent to the OpenAI Realtime API that are encoded locally.
//!
//! `session.update` is built here so a configured voice name reaches the API
//! as is; the `async-openai` voice type only knows a fixed set. Every other
//! client event uses the `async-openai` types directly.

use relay_core::agent::{AudioFormat, RealtimeAgent, SessionConfig};
use serde::Serialize;

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";

#[derive(Serialize, Debug)]
#[serde(tag = "type")]
pub enum ClientEvent<'a> {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate<'a> },
}

#[derive(Serialize, Debug)]
pub struct SessionUpdate<'a> {
    pub instructions: String,
    pub voice: &'a str,
    pub modalities: [&'static str; 2],
    pub input_audio_format: AudioFormat,
    pub output_audio_format: AudioFormat,
    pub turn_detection: TurnDetection,
    pub input_audio_transcription: InputAudioTranscription,
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnDetection {
    ServerVad,
}

#[derive(Serialize, Debug)]
pub struct InputAudioTranscription {
    pub model: &'static str,
}

impl<'a> ClientEvent<'a> {
    pub fn session_update(agent: &RealtimeAgent, config: &'a SessionConfig) -> Self {
        ClientEvent::SessionUpdate {
            session: SessionUpdate {
                instructions: agent.system_prompt(),
                voice: &config.voice,
                modalities: ["text", "audio"],
                input_audio_format: config.input_audio_format,
                output_audio_format: config.output_audio_format,
                turn_detection: TurnDetection::ServerVad,
                input_audio_transcription: InputAudioTranscription {
                    model: TRANSCRIPTION_MODEL,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_update_payload() {
        let agent = RealtimeAgent::new("Bot", "Be brief.").with_language("es");
        let config = SessionConfig::telephony("gpt-4o-realtime-preview", "verse");

        let value = serde_json::to_value(ClientEvent::session_update(&agent, &config)).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "session.update",
                "session": {
                    "instructions": "Be brief.\n\nPreferred language: es",
                    "voice": "verse",
                    "modalities": ["text", "audio"],
                    "input_audio_format": "g711_ulaw",
                    "output_audio_format": "g711_ulaw",
                    "turn_detection": {"type": "server_vad"},
                    "input_audio_transcription": {"model": "whisper-1"}
                }
            })
        );
    }
}
