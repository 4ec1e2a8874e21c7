use std::fmt;
use uuid::Uuid;

use crate::error::ChannelError;

/// Identity of one connected client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a client connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    Closed,
}

/// A bidirectional per-client connection as seen by the hub.
///
/// Implementations must not block in `send`; the hub calls it while holding
/// its lock.
pub trait ClientChannel: Send + Sync {
    fn id(&self) -> ClientId;

    fn state(&self) -> ChannelState;

    fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Queue a serialized message for delivery
    fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Ask the underlying connection to close
    fn close(&self);
}
