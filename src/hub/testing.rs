//! Channel double shared by unit tests across the crate

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{ChannelState, ClientChannel, ClientId};
use crate::error::ChannelError;
use crate::models::BroadcastMessage;

pub(crate) struct RecordingChannel {
    id: ClientId,
    state: Mutex<ChannelState>,
    fail_sends: AtomicBool,
    sent: Mutex<Vec<String>>,
}

impl RecordingChannel {
    pub(crate) fn open() -> Arc<Self> {
        Arc::new(Self {
            id: ClientId::new(),
            state: Mutex::new(ChannelState::Open),
            fail_sends: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
        })
    }

    /// An open channel whose every send errors
    pub(crate) fn failing() -> Arc<Self> {
        let channel = Self::open();
        channel.fail_sends.store(true, Ordering::SeqCst);
        channel
    }

    pub(crate) fn set_state(&self, state: ChannelState) {
        *self.state.lock() = state;
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_sends.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn messages(&self) -> Vec<BroadcastMessage> {
        self.sent
            .lock()
            .iter()
            .map(|raw| serde_json::from_str(raw).expect("hub sent invalid JSON"))
            .collect()
    }

    pub(crate) fn log_lines(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                BroadcastMessage::Log { msg } => Some(msg),
                BroadcastMessage::Refresh => None,
            })
            .collect()
    }

    pub(crate) fn refresh_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|m| matches!(m, BroadcastMessage::Refresh))
            .count()
    }
}

impl ClientChannel for RecordingChannel {
    fn id(&self) -> ClientId {
        self.id
    }

    fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    fn send(&self, text: &str) -> Result<(), ChannelError> {
        if self.state() != ChannelState::Open {
            return Err(ChannelError::Closed);
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    fn close(&self) {
        self.set_state(ChannelState::Closed);
    }
}
