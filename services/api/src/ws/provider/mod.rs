//! Realtime model providers a call can be bridged to.

pub mod openai;

pub use openai::{OpenAiRealtimeSession, OpenAiSessionFactory};
