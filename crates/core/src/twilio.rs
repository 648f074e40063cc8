//! Twilio Media Streams wire format.
//!
//! Inbound frames are JSON objects tagged by `event`. Outbound frames use the
//! same envelope and must carry the `streamSid` announced in the `start` frame.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A frame sent by Twilio over the media stream.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum InboundFrame {
    Connected {
        #[serde(default)]
        protocol: Option<String>,
        #[serde(default)]
        version: Option<String>,
    },
    Start {
        start: StartMetadata,
    },
    Media {
        media: InboundMedia,
    },
    Mark {
        mark: MarkLabel,
    },
    Dtmf {
        dtmf: DtmfDigit,
    },
    Stop {
        #[serde(default)]
        stop: Option<StopMetadata>,
    },
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StartMetadata {
    pub stream_sid: String,
    #[serde(default)]
    pub call_sid: Option<String>,
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub tracks: Vec<String>,
    #[serde(default)]
    pub custom_parameters: HashMap<String, String>,
    #[serde(default)]
    pub media_format: Option<MediaFormat>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaFormat {
    pub encoding: String,
    pub sample_rate: u32,
    pub channels: u16,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct InboundMedia {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub chunk: Option<String>,
    /// Milliseconds since the stream started, sent as a decimal string.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Base64 encoded 8 kHz mu-law audio.
    pub payload: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MarkLabel {
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct DtmfDigit {
    #[serde(default)]
    pub track: Option<String>,
    pub digit: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StopMetadata {
    #[serde(default)]
    pub account_sid: Option<String>,
    #[serde(default)]
    pub call_sid: Option<String>,
}

/// A frame sent to Twilio over the media stream.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum OutboundFrame<'a> {
    /// Audio to play to the caller.
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
        media: OutboundMedia<'a>,
    },
    /// Asks Twilio to echo `name` back once all audio queued before it has played.
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
        mark: MarkLabel,
    },
    /// Drops any audio Twilio has buffered but not yet played.
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: &'a str,
    },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OutboundMedia<'a> {
    pub payload: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_connected() {
        let frame: InboundFrame = serde_json::from_str(
            r#"{"event":"connected","protocol":"Call","version":"1.0.0"}"#,
        )
        .unwrap();
        assert_eq!(
            frame,
            InboundFrame::Connected {
                protocol: Some("Call".into()),
                version: Some("1.0.0".into())
            }
        );
    }

    #[test]
    fn test_parse_start() {
        let raw = json!({
            "event": "start",
            "sequenceNumber": "1",
            "streamSid": "MZ123",
            "start": {
                "accountSid": "AC1",
                "streamSid": "MZ123",
                "callSid": "CA9",
                "tracks": ["inbound"],
                "customParameters": {"lang": "es"},
                "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
            }
        });
        let frame: InboundFrame = serde_json::from_value(raw).unwrap();
        let InboundFrame::Start { start } = frame else {
            panic!("Expected a start frame");
        };
        assert_eq!(start.stream_sid, "MZ123");
        assert_eq!(start.call_sid.as_deref(), Some("CA9"));
        assert_eq!(start.custom_parameters.get("lang").map(String::as_str), Some("es"));
        assert_eq!(start.media_format.unwrap().sample_rate, 8000);
    }

    #[test]
    fn test_parse_media() {
        let frame: InboundFrame = serde_json::from_str(
            r#"{"event":"media","streamSid":"MZ1","media":{"track":"inbound","chunk":"2","timestamp":"40","payload":"//8="}}"#,
        )
        .unwrap();
        let InboundFrame::Media { media } = frame else {
            panic!("Expected a media frame");
        };
        assert_eq!(media.payload, "//8=");
        assert_eq!(media.timestamp.as_deref(), Some("40"));
    }

    #[test]
    fn test_parse_stop_without_body() {
        let frame: InboundFrame = serde_json::from_str(r#"{"event":"stop"}"#).unwrap();
        assert_eq!(frame, InboundFrame::Stop { stop: None });
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<InboundFrame>(r#"{"event":"bogus"}"#).is_err());
    }

    #[test]
    fn test_outbound_frames() {
        let media = OutboundFrame::Media {
            stream_sid: "MZ1",
            media: OutboundMedia { payload: "AAAA" },
        };
        assert_eq!(
            serde_json::to_value(&media).unwrap(),
            json!({"event": "media", "streamSid": "MZ1", "media": {"payload": "AAAA"}})
        );

        let clear = OutboundFrame::Clear { stream_sid: "MZ1" };
        assert_eq!(
            serde_json::to_value(&clear).unwrap(),
            json!({"event": "clear", "streamSid": "MZ1"})
        );

        let mark = OutboundFrame::Mark {
            stream_sid: "MZ1",
            mark: MarkLabel { name: "item_1:20".into() },
        };
        assert_eq!(
            serde_json::to_value(&mark).unwrap(),
            json!({"event": "mark", "streamSid": "MZ1", "mark": {"name": "item_1:20"}})
        );
    }
}
