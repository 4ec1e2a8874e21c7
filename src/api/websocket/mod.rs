//! WebSocket gateway
//!
//! Each connection gets a bounded outbound queue; the hub only ever calls
//! `try_send` on it, so a slow browser can't stall delivery to the others.

mod channel;
pub mod events;

pub use channel::WsClientChannel;

/// Maximum number of messages to buffer per WebSocket connection
pub const WS_BUFFER_SIZE: usize = 256;
