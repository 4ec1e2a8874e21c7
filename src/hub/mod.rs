//! Event hub
//!
//! Process-wide register of connected client channels plus a bounded ring
//! buffer of recent log lines. Every log line is broadcast to the channels
//! registered when it is added; a new channel receives the buffered backlog
//! on registration.

mod channel;
mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use channel::{ChannelState, ClientChannel, ClientId};
pub use store::{ClientRegistration, EventHub, LOG_CAPACITY};
