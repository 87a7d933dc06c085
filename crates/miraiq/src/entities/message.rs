// Incoming messages. The wire `type` tag doubles as the enum discriminant.

use serde::{Deserialize, Serialize};

use super::common::{Client, Friend, Group, Member};
use super::element::MessageChain;

/// Wire `type` tags of every message variant.
pub(crate) const TYPE_NAMES: &[&str] = &[
    "FriendMessage",
    "GroupMessage",
    "TempMessage",
    "StrangerMessage",
    "OtherClientMessage",
];

/// Message from a friend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendMessage {
    pub sender: Friend,
    pub message_chain: MessageChain,
}

/// Message in a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMessage {
    pub sender: Member,
    pub message_chain: MessageChain,
}

/// Temporary session message from a group member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempMessage {
    pub sender: Member,
    pub message_chain: MessageChain,
}

/// Message from a stranger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrangerMessage {
    pub sender: Friend,
    pub message_chain: MessageChain,
}

/// Message from another client of the bot account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OtherClientMessage {
    pub sender: Client,
    pub message_chain: MessageChain,
}

/// An incoming message of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    FriendMessage(FriendMessage),
    GroupMessage(GroupMessage),
    TempMessage(TempMessage),
    StrangerMessage(StrangerMessage),
    OtherClientMessage(OtherClientMessage),
}

/// Routing kind of a message. `Any` matches every message and is the most
/// general ancestor of all the concrete kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    Friend,
    Group,
    Temp,
    Stranger,
    OtherClient,
    Any,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::FriendMessage(_) => MessageKind::Friend,
            Message::GroupMessage(_) => MessageKind::Group,
            Message::TempMessage(_) => MessageKind::Temp,
            Message::StrangerMessage(_) => MessageKind::Stranger,
            Message::OtherClientMessage(_) => MessageKind::OtherClient,
        }
    }

    pub fn message_chain(&self) -> &MessageChain {
        match self {
            Message::FriendMessage(m) => &m.message_chain,
            Message::GroupMessage(m) => &m.message_chain,
            Message::TempMessage(m) => &m.message_chain,
            Message::StrangerMessage(m) => &m.message_chain,
            Message::OtherClientMessage(m) => &m.message_chain,
        }
    }

    /// Account id of the sender.
    pub fn sender_id(&self) -> i64 {
        match self {
            Message::FriendMessage(m) => m.sender.id,
            Message::GroupMessage(m) => m.sender.id,
            Message::TempMessage(m) => m.sender.id,
            Message::StrangerMessage(m) => m.sender.id,
            Message::OtherClientMessage(m) => m.sender.id,
        }
    }

    /// The sender's group, for messages sent by a group member.
    pub fn sender_group(&self) -> Option<&Group> {
        match self {
            Message::GroupMessage(m) => Some(&m.sender.group),
            Message::TempMessage(m) => Some(&m.sender.group),
            _ => None,
        }
    }
}
