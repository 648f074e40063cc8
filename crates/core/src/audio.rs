//! Playback accounting for mu-law audio sent to the caller.
//!
//! Telephony audio is 8 kHz, 8-bit mu-law, so one byte is one sample and
//! eight bytes are one millisecond. Audio passes through base64 encoded and is
//! never transcoded; it is only decoded here to measure its length.

use base64::{Engine, engine::general_purpose::STANDARD};

pub const ULAW_SAMPLE_RATE_HZ: u64 = 8_000;

/// Number of mu-law samples (bytes) in a base64 encoded payload.
pub fn ulaw_len(payload: &str) -> Result<u64, base64::DecodeError> {
    Ok(STANDARD.decode(payload)?.len() as u64)
}

fn samples_to_ms(samples: u64) -> u64 {
    samples * 1_000 / ULAW_SAMPLE_RATE_HZ
}

/// Tracks how much of the current assistant response has been sent to, and
/// played by, the caller.
///
/// Each chunk sent is followed by a mark named `<item_id>:<sent_ms>`. When the
/// provider echoes a mark back, everything before it has been heard. Sent
/// audio is counted in samples so offsets do not drift with odd chunk sizes.
#[derive(Debug, Default)]
pub struct PlaybackTracker {
    item_id: Option<String>,
    sent_samples: u64,
    played_ms: u64,
    /// Item the caller talked over. Its late audio must not reach the caller.
    interrupted: Option<String>,
}

/// The point at which an assistant response was cut off by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interruption {
    pub item_id: String,
    pub audio_end_ms: u64,
}

impl PlaybackTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether audio of `item_id` may still be played to the caller.
    pub fn accepts(&self, item_id: &str) -> bool {
        self.interrupted.as_deref() != Some(item_id)
    }

    /// A new response began; anything interrupted before it is over.
    pub fn start_response(&mut self) {
        self.interrupted = None;
    }

    /// Records `samples` of `item_id` sent to the caller and returns the mark
    /// name to queue after them. Check [`accepts`](Self::accepts) first.
    pub fn record_sent(&mut self, item_id: &str, samples: u64) -> String {
        if self.item_id.as_deref() != Some(item_id) {
            self.item_id = Some(item_id.to_string());
            self.sent_samples = 0;
            self.played_ms = 0;
            self.interrupted = None;
        }
        self.sent_samples += samples;
        format!("{}:{}", item_id, self.sent_ms())
    }

    /// Applies a mark acknowledged by the provider. Marks for other items are ignored.
    pub fn acknowledge(&mut self, mark: &str) {
        let Some((item_id, offset)) = mark.rsplit_once(':') else {
            return;
        };
        if self.item_id.as_deref() != Some(item_id) {
            return;
        }
        if let Ok(offset) = offset.parse::<u64>() {
            self.played_ms = self.played_ms.max(offset.min(self.sent_ms()));
        }
    }

    /// Whether audio has been sent that the caller has not heard yet.
    pub fn is_playing(&self) -> bool {
        self.item_id.is_some() && self.played_ms < self.sent_ms()
    }

    /// Ends tracking of the current item, returning where playback was cut off
    /// if it was still playing. Later audio for the item is refused.
    pub fn interrupt(&mut self) -> Option<Interruption> {
        let playing = self.is_playing();
        let item_id = self.item_id.take()?;
        let audio_end_ms = self.played_ms;
        self.sent_samples = 0;
        self.played_ms = 0;
        self.interrupted = Some(item_id.clone());
        playing.then_some(Interruption {
            item_id,
            audio_end_ms,
        })
    }

    /// Forgets the current item once its response is complete and fully played.
    pub fn finish(&mut self) {
        if !self.is_playing() {
            *self = Self::default();
        }
    }

    fn sent_ms(&self) -> u64 {
        samples_to_ms(self.sent_samples)
    }
}
