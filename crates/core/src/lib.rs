//! Call relay core: the pieces of a phone-to-realtime-model bridge that do not
//! depend on an HTTP framework.

pub mod agent;
pub mod audio;
pub mod bridge;
pub mod credential;
pub mod session;
pub mod socket;
pub mod transport;
pub mod twilio;

#[cfg(test)]
pub(crate) mod testing;

pub use bridge::{BridgeOutcome, BridgePhase, CallBridge};
