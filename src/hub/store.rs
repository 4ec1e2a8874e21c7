use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::channel::{ClientChannel, ClientId};
use crate::models::{BroadcastMessage, LogEntry};

/// Number of log lines kept for replay to new clients
pub const LOG_CAPACITY: usize = 50;

struct HubState {
    logs: VecDeque<LogEntry>,
    clients: HashMap<ClientId, Arc<dyn ClientChannel>>,
    shut_down: bool,
}

/// Owner of the client registry and the log ring buffer.
///
/// Both live behind a single mutex so every operation is atomic with respect
/// to the others. Channel sends are non-blocking, so delivery happens while
/// the lock is held and log order matches `add_log` call order.
pub struct EventHub {
    capacity: usize,
    state: Mutex<HubState>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::with_capacity(LOG_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            state: Mutex::new(HubState {
                logs: VecDeque::with_capacity(capacity + 1),
                clients: HashMap::new(),
                shut_down: false,
            }),
        }
    }

    /// Record a log line and push it to every registered client.
    ///
    /// Never fails: clients that cannot take the message are dropped.
    pub fn add_log(&self, message: impl Into<String>) -> LogEntry {
        let entry = LogEntry::now(message);
        info!("{}", entry.message);

        let outgoing = BroadcastMessage::log(entry.formatted());
        let mut state = self.state.lock();
        state.logs.push_back(entry.clone());
        while state.logs.len() > self.capacity {
            state.logs.pop_front();
        }
        deliver(&mut state.clients, &outgoing);

        entry
    }

    /// Send a message to every open client, returning how many accepted it.
    ///
    /// Clients that are not open, or whose send fails, leave the registry.
    pub fn broadcast(&self, message: &BroadcastMessage) -> usize {
        let mut state = self.state.lock();
        deliver(&mut state.clients, message)
    }

    /// Add a client and replay the buffered log lines to it, oldest first.
    ///
    /// The returned registration removes the client when dropped. Registering
    /// an id that is already present changes nothing and returns an inactive
    /// registration.
    pub fn register_client(
        self: &Arc<Self>,
        channel: Arc<dyn ClientChannel>,
    ) -> ClientRegistration {
        let id = channel.id();
        let mut state = self.state.lock();

        if state.shut_down {
            drop(state);
            debug!(client = %id, "Hub is shut down, closing new client");
            channel.close();
            return ClientRegistration::inactive(id);
        }

        if state.clients.contains_key(&id) {
            debug!(client = %id, "Client already registered");
            return ClientRegistration::inactive(id);
        }

        if !channel.is_open() {
            debug!(client = %id, "Refusing to register a channel that is not open");
            return ClientRegistration::inactive(id);
        }

        for entry in &state.logs {
            let payload = match BroadcastMessage::log(entry.formatted()).to_json() {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize log replay: {}", e);
                    continue;
                }
            };
            if let Err(e) = channel.send(&payload) {
                debug!(client = %id, error = %e, "Client failed during log replay");
                return ClientRegistration::inactive(id);
            }
        }

        state.clients.insert(id, channel);
        debug!(client = %id, clients = state.clients.len(), "Client registered");

        ClientRegistration {
            hub: Arc::downgrade(self),
            id,
            active: true,
        }
    }

    /// Remove a client from the registry without closing it
    pub fn remove_client(&self, id: ClientId) -> bool {
        self.state.lock().clients.remove(&id).is_some()
    }

    pub fn client_count(&self) -> usize {
        self.state.lock().clients.len()
    }

    /// Snapshot of the buffered log lines, oldest first
    pub fn recent_logs(&self) -> Vec<LogEntry> {
        self.state.lock().logs.iter().cloned().collect()
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().shut_down
    }

    /// Close every registered client and refuse further registrations
    pub fn shutdown(&self) {
        let clients: Vec<_> = {
            let mut state = self.state.lock();
            state.shut_down = true;
            state.clients.drain().map(|(_, channel)| channel).collect()
        };

        info!("Event hub shutting down, closing {} clients", clients.len());
        for channel in clients {
            channel.close();
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

fn deliver(
    clients: &mut HashMap<ClientId, Arc<dyn ClientChannel>>,
    message: &BroadcastMessage,
) -> usize {
    let payload = match message.to_json() {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize broadcast message: {}", e);
            return 0;
        }
    };

    let mut sent = 0;
    clients.retain(|id, channel| {
        if !channel.is_open() {
            debug!(client = %id, "Dropping client that is no longer open");
            return false;
        }
        match channel.send(&payload) {
            Ok(()) => {
                sent += 1;
                true
            }
            Err(e) => {
                debug!(client = %id, error = %e, "Dropping client after failed send");
                false
            }
        }
    });
    sent
}

/// Keeps a client registered for as long as it is alive
#[must_use = "dropping the registration removes the client"]
pub struct ClientRegistration {
    hub: Weak<EventHub>,
    id: ClientId,
    active: bool,
}

impl ClientRegistration {
    fn inactive(id: ClientId) -> Self {
        Self {
            hub: Weak::new(),
            id,
            active: false,
        }
    }

    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Whether this registration added the client to the hub
    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl Drop for ClientRegistration {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(hub) = self.hub.upgrade() {
            hub.remove_client(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::testing::RecordingChannel;
    use crate::hub::ChannelState;

    fn messages_of(hub: &EventHub) -> Vec<String> {
        hub.recent_logs().into_iter().map(|e| e.message).collect()
    }

    #[test]
    fn test_buffer_never_exceeds_capacity() {
        let hub = EventHub::new();
        for i in 0..120 {
            hub.add_log(format!("line {}", i));
            assert!(hub.recent_logs().len() <= LOG_CAPACITY);
        }

        let logs = messages_of(&hub);
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs.first().unwrap(), "line 70");
        assert_eq!(logs.last().unwrap(), "line 119");
    }

    #[test]
    fn test_full_buffer_evicts_oldest() {
        let hub = EventHub::new();
        for i in 0..LOG_CAPACITY {
            hub.add_log(format!("entry {}", i));
        }
        let before = messages_of(&hub);

        hub.add_log("x");

        let after = messages_of(&hub);
        assert_eq!(after.len(), LOG_CAPACITY);
        assert_eq!(after.first(), before.get(1));
        assert_eq!(after.last().unwrap(), "x");
    }

    #[test]
    fn test_add_log_broadcasts_formatted_entry() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        let _reg = hub.register_client(channel.clone());

        let entry = hub.add_log("hello");

        assert_eq!(
            channel.messages(),
            vec![BroadcastMessage::log(entry.formatted())]
        );
    }

    #[test]
    fn test_late_client_receives_backlog_in_order() {
        let hub = Arc::new(EventHub::new());
        for i in 0..7 {
            hub.add_log(format!("before {}", i));
        }

        let channel = RecordingChannel::open();
        let _reg = hub.register_client(channel.clone());

        let expected: Vec<String> = hub.recent_logs().iter().map(|e| e.formatted()).collect();
        assert_eq!(channel.log_lines(), expected);
        assert_eq!(channel.log_lines().len(), 7);

        hub.add_log("after");
        let lines = channel.log_lines();
        assert_eq!(lines.len(), 8);
        assert!(lines[7].ends_with("] after"));
    }

    #[test]
    fn test_late_client_after_eviction_gets_last_entries() {
        let hub = Arc::new(EventHub::new());
        for i in 0..60 {
            hub.add_log(format!("n{}", i));
        }

        let channel = RecordingChannel::open();
        let _reg = hub.register_client(channel.clone());

        let lines = channel.log_lines();
        assert_eq!(lines.len(), LOG_CAPACITY);
        assert!(lines[0].ends_with("] n10"));
        assert!(lines[LOG_CAPACITY - 1].ends_with("] n59"));
    }

    #[test]
    fn test_reregistration_is_idempotent() {
        let hub = Arc::new(EventHub::new());
        hub.add_log("one");

        let channel = RecordingChannel::open();
        let first = hub.register_client(channel.clone());
        let second = hub.register_client(channel.clone());

        assert!(first.is_active());
        assert!(!second.is_active());
        assert_eq!(hub.client_count(), 1);
        assert_eq!(channel.log_lines().len(), 1);

        drop(second);
        assert_eq!(hub.client_count(), 1);
        drop(first);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_broadcast_counts_successful_sends_and_drops_failures() {
        let hub = Arc::new(EventHub::new());
        let good_a = RecordingChannel::open();
        let good_b = RecordingChannel::open();
        let bad = RecordingChannel::failing();

        let _a = hub.register_client(good_a.clone());
        let _b = hub.register_client(good_b.clone());
        let _c = hub.register_client(bad.clone());
        assert_eq!(hub.client_count(), 3);

        let sent = hub.broadcast(&BroadcastMessage::Refresh);

        assert_eq!(sent, 2);
        assert_eq!(hub.client_count(), 2);
        assert_eq!(good_a.refresh_count(), 1);
        assert_eq!(good_b.refresh_count(), 1);
    }

    #[test]
    fn test_failed_send_does_not_abort_add_log() {
        let hub = Arc::new(EventHub::new());
        let bad = RecordingChannel::open();
        let good = RecordingChannel::open();
        let _bad = hub.register_client(bad.clone());
        let _good = hub.register_client(good.clone());

        bad.set_failing(true);
        hub.add_log("still delivered");

        assert_eq!(good.log_lines().len(), 1);
        assert_eq!(hub.client_count(), 1);
    }

    #[test]
    fn test_closed_client_is_excluded_from_broadcast() {
        let hub = Arc::new(EventHub::new());
        let open = RecordingChannel::open();
        let closing = RecordingChannel::open();
        let _open = hub.register_client(open.clone());
        let reg = hub.register_client(closing.clone());

        // close notification arrives before any broadcast
        closing.set_state(ChannelState::Closed);
        drop(reg);

        assert_eq!(hub.broadcast(&BroadcastMessage::Refresh), 1);
        assert_eq!(hub.client_count(), 1);
        assert_eq!(closing.refresh_count(), 0);
    }

    #[test]
    fn test_channel_closed_without_notification_is_pruned() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        let _reg = hub.register_client(channel.clone());

        channel.set_state(ChannelState::Closed);

        assert_eq!(hub.broadcast(&BroadcastMessage::Refresh), 0);
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_connecting_channel_is_not_registered() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        channel.set_state(ChannelState::Connecting);

        let reg = hub.register_client(channel.clone());

        assert!(!reg.is_active());
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_replay_failure_drops_client() {
        let hub = Arc::new(EventHub::new());
        hub.add_log("backlog");

        let reg = hub.register_client(RecordingChannel::failing());

        assert!(!reg.is_active());
        assert_eq!(hub.client_count(), 0);
    }

    #[test]
    fn test_remove_client_does_not_close_channel() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        let reg = hub.register_client(channel.clone());

        assert!(hub.remove_client(reg.id()));
        assert!(!hub.remove_client(reg.id()));
        assert_eq!(channel.state(), ChannelState::Open);
    }

    #[test]
    fn test_shutdown_closes_clients_and_rejects_new_ones() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        let _reg = hub.register_client(channel.clone());

        hub.shutdown();

        assert!(hub.is_shut_down());
        assert_eq!(hub.client_count(), 0);
        assert_eq!(channel.state(), ChannelState::Closed);

        let late = RecordingChannel::open();
        let reg = hub.register_client(late.clone());
        assert!(!reg.is_active());
        assert_eq!(late.state(), ChannelState::Closed);
    }

    #[test]
    fn test_dropping_registration_unregisters() {
        let hub = Arc::new(EventHub::new());
        let channel = RecordingChannel::open();
        let reg = hub.register_client(channel.clone());
        assert_eq!(hub.client_count(), 1);

        drop(reg);

        assert_eq!(hub.client_count(), 0);
        assert_eq!(hub.broadcast(&BroadcastMessage::Refresh), 0);
        assert_eq!(channel.refresh_count(), 0);
    }

    #[test]
    fn test_registration_outliving_hub_is_harmless() {
        let hub = Arc::new(EventHub::new());
        let reg = hub.register_client(RecordingChannel::open());
        drop(hub);
        drop(reg);
    }
}
