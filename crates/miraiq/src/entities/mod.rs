//! Data model of the gateway's JSON schema
//!
//! Every received push carries a `type` field that selects the concrete
//! entity. Wire field names are lowerCamelCase; the Rust structs use
//! snake_case with serde renames (the historical field `from_` maps to
//! wire `from`).

pub mod common;
pub mod element;
pub mod event;
pub mod message;
pub mod sync_message;

pub use common::*;
pub use element::*;
pub use event::*;
pub use message::*;
pub use sync_message::*;

use crate::error::Result;
use serde_json::Value;

/// One received push: an incoming message, an event, a message another
/// client of the same account sent, or something this crate does not know.
#[derive(Debug, Clone, PartialEq)]
pub enum RecvData {
    Message(Message),
    Event(Event),
    SyncMessage(SyncMessage),
    Unsupported(Value),
}

impl RecvData {
    /// Decodes a push `data` payload by its `type` tag. Unknown tags (and
    /// payloads without one) land in [`RecvData::Unsupported`] untouched.
    pub fn from_value(data: Value) -> Result<RecvData> {
        let Some(tag) = data.get("type").and_then(Value::as_str) else {
            return Ok(RecvData::Unsupported(data));
        };
        if message::TYPE_NAMES.contains(&tag) {
            Ok(RecvData::Message(serde_json::from_value(data)?))
        } else if event::TYPE_NAMES.contains(&tag) {
            Ok(RecvData::Event(serde_json::from_value(data)?))
        } else if sync_message::TYPE_NAMES.contains(&tag) {
            Ok(RecvData::SyncMessage(serde_json::from_value(data)?))
        } else {
            Ok(RecvData::Unsupported(data))
        }
    }

    /// The message chain of a message or sync message, if this datum has one.
    pub fn message_chain(&self) -> Option<&MessageChain> {
        match self {
            RecvData::Message(m) => Some(m.message_chain()),
            RecvData::SyncMessage(m) => Some(m.message_chain()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_message_by_type_tag() {
        let data = json!({
            "type": "FriendMessage",
            "sender": {"id": 123, "nickname": "alice", "remark": ""},
            "messageChain": [
                {"type": "Source", "id": 1, "time": 1700000000},
                {"type": "Plain", "text": "hi"}
            ]
        });
        match RecvData::from_value(data).unwrap() {
            RecvData::Message(Message::FriendMessage(m)) => {
                assert_eq!(m.sender.id, 123);
                assert_eq!(m.message_chain.to_string(), "hi");
            }
            other => panic!("expected friend message, got {other:?}"),
        }
    }

    #[test]
    fn decodes_event_by_type_tag() {
        let data = json!({"type": "BotOnlineEvent", "qq": 456});
        match RecvData::from_value(data).unwrap() {
            RecvData::Event(Event::BotOnlineEvent(e)) => assert_eq!(e.qq, 456),
            other => panic!("expected event, got {other:?}"),
        }
    }

    #[test]
    fn unknown_type_is_unsupported() {
        let data = json!({"type": "SomethingNew", "x": 1});
        match RecvData::from_value(data.clone()).unwrap() {
            RecvData::Unsupported(raw) => assert_eq!(raw, data),
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn missing_type_is_unsupported() {
        let data = json!({"x": 1});
        assert!(matches!(
            RecvData::from_value(data).unwrap(),
            RecvData::Unsupported(_)
        ));
    }
}
