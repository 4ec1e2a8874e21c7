use serde::{Deserialize, Serialize};

/// Message pushed from the server to every connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BroadcastMessage {
    /// A formatted log line
    Log { msg: String },
    /// Clients should reload their image listing
    Refresh,
}

impl BroadcastMessage {
    pub fn log(msg: impl Into<String>) -> Self {
        BroadcastMessage::Log { msg: msg.into() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Frames a client may send to the server.
///
/// Only `{"type":"log","msg":"..."}` carries meaning; anything else is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundMessage {
    Log { msg: String },
}

/// Outcome of parsing an inbound text frame
#[derive(Debug, PartialEq, Eq)]
pub enum Inbound {
    /// A client-submitted log line
    Log(String),
    /// Well-formed JSON with an unrecognized shape
    Ignored,
    /// Not JSON at all
    Malformed(String),
}

impl Inbound {
    pub fn parse(text: &str) -> Self {
        let value: serde_json::Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => return Inbound::Malformed(e.to_string()),
        };

        match serde_json::from_value::<InboundMessage>(value) {
            Ok(InboundMessage::Log { msg }) => Inbound::Log(msg),
            Err(_) => Inbound::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_wire_format() {
        assert_eq!(
            BroadcastMessage::log("[t] hi").to_json().unwrap(),
            r#"{"type":"log","msg":"[t] hi"}"#
        );
        assert_eq!(
            BroadcastMessage::Refresh.to_json().unwrap(),
            r#"{"type":"refresh"}"#
        );
    }

    #[test]
    fn test_inbound_log_is_recognized() {
        assert_eq!(
            Inbound::parse(r#"{"type":"log","msg":"from browser"}"#),
            Inbound::Log("from browser".to_string())
        );
    }

    #[test]
    fn test_inbound_other_shapes_are_ignored() {
        assert_eq!(Inbound::parse(r#"{"type":"refresh"}"#), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"{"type":"log","msg":42}"#), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"{"type":"log"}"#), Inbound::Ignored);
        assert_eq!(Inbound::parse(r#"[1,2,3]"#), Inbound::Ignored);
    }

    #[test]
    fn test_inbound_garbage_is_malformed() {
        assert!(matches!(Inbound::parse("not json"), Inbound::Malformed(_)));
    }
}
