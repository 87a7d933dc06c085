// Sync messages: messages sent from another client of the bot account,
// mirrored to this connection. The sender is always the bot itself, so
// only the subject (where the message went) is carried.

use serde::{Deserialize, Serialize};

use super::common::{Friend, Group, Member};
use super::element::MessageChain;

pub(crate) const TYPE_NAMES: &[&str] = &[
    "FriendSyncMessage",
    "GroupSyncMessage",
    "TempSyncMessage",
    "StrangerSyncMessage",
];

/// Mirror of a message sent to a friend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendSyncMessage {
    pub subject: Friend,
    pub message_chain: MessageChain,
}

/// Mirror of a message sent to a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSyncMessage {
    pub subject: Group,
    pub message_chain: MessageChain,
}

/// Mirror of a temporary session message sent to a group member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempSyncMessage {
    pub subject: Member,
    pub message_chain: MessageChain,
}

/// Mirror of a message sent to a stranger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrangerSyncMessage {
    pub subject: Friend,
    pub message_chain: MessageChain,
}

/// A message another client of the bot account sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SyncMessage {
    FriendSyncMessage(FriendSyncMessage),
    GroupSyncMessage(GroupSyncMessage),
    TempSyncMessage(TempSyncMessage),
    StrangerSyncMessage(StrangerSyncMessage),
}

impl SyncMessage {
    pub fn message_chain(&self) -> &MessageChain {
        match self {
            SyncMessage::FriendSyncMessage(m) => &m.message_chain,
            SyncMessage::GroupSyncMessage(m) => &m.message_chain,
            SyncMessage::TempSyncMessage(m) => &m.message_chain,
            SyncMessage::StrangerSyncMessage(m) => &m.message_chain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn group_sync_message_decodes() {
        let message: SyncMessage = serde_json::from_value(json!({
            "type": "GroupSyncMessage",
            "subject": {"id": 3, "name": "g", "permission": "MEMBER"},
            "messageChain": [{"type": "Plain", "text": "mirrored"}]
        }))
        .unwrap();
        assert_eq!(message.message_chain().to_string(), "mirrored");
    }
}
