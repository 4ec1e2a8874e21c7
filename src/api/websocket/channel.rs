use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::{mpsc, Notify};

use crate::error::ChannelError;
use crate::hub::{ChannelState, ClientChannel, ClientId};

const CONNECTING: u8 = 0;
const OPEN: u8 = 1;
const CLOSED: u8 = 2;

/// Hub-facing side of one WebSocket connection
pub struct WsClientChannel {
    id: ClientId,
    state: AtomicU8,
    tx: mpsc::Sender<String>,
    close_signal: Notify,
}

impl WsClientChannel {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self {
            id: ClientId::new(),
            state: AtomicU8::new(CONNECTING),
            tx,
            close_signal: Notify::new(),
        }
    }

    /// Mark the handshake as complete; only a connecting channel can open
    pub fn mark_open(&self) -> bool {
        self.state
            .compare_exchange(CONNECTING, OPEN, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    pub fn mark_closed(&self) {
        self.state.store(CLOSED, Ordering::SeqCst);
    }

    /// Resolves once `close` has been called
    pub async fn closed(&self) {
        self.close_signal.notified().await;
    }
}

impl ClientChannel for WsClientChannel {
    fn id(&self) -> ClientId {
        self.id
    }

    fn state(&self) -> ChannelState {
        match self.state.load(Ordering::SeqCst) {
            CONNECTING => ChannelState::Connecting,
            OPEN => ChannelState::Open,
            _ => ChannelState::Closed,
        }
    }

    fn send(&self, text: &str) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::Closed);
        }

        match self.tx.try_send(text.to_string()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                // A client this far behind is dropped and told to reconnect
                self.close();
                Err(ChannelError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                Err(ChannelError::Closed)
            }
        }
    }

    fn close(&self) {
        self.mark_closed();
        self.close_signal.notify_one();
    }
}
