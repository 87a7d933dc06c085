// The event catalogue pushed by the gateway.
//
// Variant names equal the wire `type` tags. The field accessors at the
// bottom (`group`, `operator`, `member`, `friend`) drive reply routing and
// the built-in resolvers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{Client, Friend, Group, Member};

/// Wire `type` tags of every event variant.
pub(crate) const TYPE_NAMES: &[&str] = &[
    "BotOnlineEvent",
    "BotOfflineEventActive",
    "BotOfflineEventForce",
    "BotOfflineEventDropped",
    "BotReloginEvent",
    "FriendInputStatusChangedEvent",
    "FriendNickChangedEvent",
    "BotGroupPermissionChangeEvent",
    "BotMuteEvent",
    "BotUnmuteEvent",
    "BotJoinGroupEvent",
    "BotLeaveEventActive",
    "BotLeaveEventKick",
    "BotLeaveEventDisband",
    "GroupRecallEvent",
    "FriendRecallEvent",
    "NudgeEvent",
    "GroupNameChangeEvent",
    "GroupEntranceAnnouncementChangeEvent",
    "GroupMuteAllEvent",
    "GroupAllowAnonymousChatEvent",
    "GroupAllowConfessTalkEvent",
    "GroupAllowMemberInviteEvent",
    "MemberJoinEvent",
    "MemberLeaveEventKick",
    "MemberLeaveEventQuit",
    "MemberCardChangeEvent",
    "MemberSpecialTitleChangeEvent",
    "MemberPermissionChangeEvent",
    "MemberMuteEvent",
    "MemberUnmuteEvent",
    "MemberHonorChangeEvent",
    "NewFriendRequestEvent",
    "MemberJoinRequestEvent",
    "BotInvitedJoinGroupRequestEvent",
    "OtherClientOnlineEvent",
    "OtherClientOfflineEvent",
    "CommandExecutedEvent",
];

// region bot account events

/// Bot logged in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotOnlineEvent {
    pub qq: i64,
}

/// Bot logged out actively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotOfflineEventActive {
    pub qq: i64,
}

/// Bot was kicked offline by another login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotOfflineEventForce {
    pub qq: i64,
}

/// Bot was dropped by the server or lost the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotOfflineEventDropped {
    pub qq: i64,
}

/// Bot actively re-logged in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotReloginEvent {
    pub qq: i64,
}

// endregion

// region friend events

/// A friend's typing status changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendInputStatusChangedEvent {
    pub friend: Friend,
    pub inputting: bool,
}

/// A friend changed their nickname
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendNickChangedEvent {
    pub friend: Friend,
    #[serde(rename = "from")]
    pub from_: String,
    pub to: String,
}

// endregion

// region group events

/// The bot's permission in a group changed; the operator is the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotGroupPermissionChangeEvent {
    pub origin: String,
    pub current: String,
    pub group: Group,
}

/// The bot was muted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotMuteEvent {
    pub duration_seconds: i64,
    pub operator: Member,
}

/// The bot was unmuted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotUnmuteEvent {
    pub operator: Member,
}

/// The bot joined a new group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotJoinGroupEvent {
    pub group: Group,
    pub invitor: Option<Member>,
}

/// The bot left a group actively
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotLeaveEventActive {
    pub group: Group,
}

/// The bot was kicked from a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotLeaveEventKick {
    pub group: Group,
    pub operator: Option<Member>,
}

/// The bot left a group because the owner disbanded it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotLeaveEventDisband {
    pub group: Group,
    pub operator: Option<Member>,
}

/// A group message was recalled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupRecallEvent {
    pub author_id: i64,
    pub message_id: i64,
    pub time: i64,
    pub group: Group,
    /// The operator; `None` when the bot recalled the message itself
    pub operator: Option<Member>,
}

/// A friend message was recalled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRecallEvent {
    pub author_id: i64,
    pub message_id: i64,
    pub time: i64,
    /// Account id of the friend (or the bot) who recalled the message
    pub operator: i64,
}

/// The subject a nudge happened in: a friend chat or a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NudgeSubject {
    pub id: i64,
    /// "Friend" or "Group"
    pub kind: String,
}

/// Someone nudged someone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NudgeEvent {
    pub from_id: i64,
    pub subject: NudgeSubject,
    pub action: String,
    pub suffix: String,
    pub target: i64,
}

/// A group was renamed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupNameChangeEvent {
    pub origin: String,
    pub current: String,
    pub group: Group,
    pub operator: Option<Member>,
}

/// A group's entrance announcement changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntranceAnnouncementChangeEvent {
    pub origin: String,
    pub current: String,
    pub group: Group,
    pub operator: Option<Member>,
}

/// Mute-all was toggled in a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupMuteAllEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    pub operator: Option<Member>,
}

/// Anonymous chat was toggled in a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAllowAnonymousChatEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    pub operator: Option<Member>,
}

/// Confess talk was toggled in a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAllowConfessTalkEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    pub is_by_bot: bool,
}

/// Member invitations were toggled in a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAllowMemberInviteEvent {
    pub origin: bool,
    pub current: bool,
    pub group: Group,
    pub operator: Option<Member>,
}

// endregion

// region member events

/// A new member joined a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberJoinEvent {
    pub member: Member,
    pub invitor: Option<Member>,
}

/// A member (not the bot) was kicked from a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberLeaveEventKick {
    pub member: Member,
    pub operator: Option<Member>,
}

/// A member (not the bot) left a group on their own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberLeaveEventQuit {
    pub member: Member,
}

/// A member's group card changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberCardChangeEvent {
    pub origin: String,
    pub current: String,
    pub member: Member,
}

/// A member's special title changed; the operator is the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSpecialTitleChangeEvent {
    pub origin: String,
    pub current: String,
    pub member: Member,
}

/// A member's permission changed; the operator is the owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberPermissionChangeEvent {
    pub origin: String,
    pub current: String,
    pub member: Member,
}

/// A member was muted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberMuteEvent {
    pub duration_seconds: i64,
    pub member: Member,
    pub operator: Option<Member>,
}

/// A member was unmuted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberUnmuteEvent {
    pub member: Member,
    pub operator: Option<Member>,
}

/// A member earned or lost a group honor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberHonorChangeEvent {
    pub member: Member,
    /// "achieve" or "lose"
    pub action: String,
    pub honor: String,
}

// endregion

// region request events

/// Someone asked to become a friend of the bot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFriendRequestEvent {
    pub event_id: i64,
    pub from_id: i64,
    /// Group the request came through, 0 when none
    pub group_id: i64,
    pub nick: String,
    pub message: String,
}

/// Someone asked to join a group the bot administers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberJoinRequestEvent {
    pub event_id: i64,
    pub from_id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub nick: String,
    pub message: String,
}

/// The bot was invited into a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotInvitedJoinGroupRequestEvent {
    pub event_id: i64,
    pub from_id: i64,
    pub group_id: i64,
    pub group_name: String,
    pub nick: String,
    pub message: String,
}

// endregion

// region other client events

/// Another client of the bot account came online
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherClientOnlineEvent {
    pub client: Client,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<i64>,
}

/// Another client of the bot account went offline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherClientOfflineEvent {
    pub client: Client,
}

/// A console command was executed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandExecutedEvent {
    pub name: String,
    pub friend: Option<Friend>,
    pub member: Option<Member>,
    #[serde(default)]
    pub args: Vec<Value>,
}

// endregion

/// Any event the gateway pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    BotOnlineEvent(BotOnlineEvent),
    BotOfflineEventActive(BotOfflineEventActive),
    BotOfflineEventForce(BotOfflineEventForce),
    BotOfflineEventDropped(BotOfflineEventDropped),
    BotReloginEvent(BotReloginEvent),
    FriendInputStatusChangedEvent(FriendInputStatusChangedEvent),
    FriendNickChangedEvent(FriendNickChangedEvent),
    BotGroupPermissionChangeEvent(BotGroupPermissionChangeEvent),
    BotMuteEvent(BotMuteEvent),
    BotUnmuteEvent(BotUnmuteEvent),
    BotJoinGroupEvent(BotJoinGroupEvent),
    BotLeaveEventActive(BotLeaveEventActive),
    BotLeaveEventKick(BotLeaveEventKick),
    BotLeaveEventDisband(BotLeaveEventDisband),
    GroupRecallEvent(GroupRecallEvent),
    FriendRecallEvent(FriendRecallEvent),
    NudgeEvent(NudgeEvent),
    GroupNameChangeEvent(GroupNameChangeEvent),
    GroupEntranceAnnouncementChangeEvent(GroupEntranceAnnouncementChangeEvent),
    GroupMuteAllEvent(GroupMuteAllEvent),
    GroupAllowAnonymousChatEvent(GroupAllowAnonymousChatEvent),
    GroupAllowConfessTalkEvent(GroupAllowConfessTalkEvent),
    GroupAllowMemberInviteEvent(GroupAllowMemberInviteEvent),
    MemberJoinEvent(MemberJoinEvent),
    MemberLeaveEventKick(MemberLeaveEventKick),
    MemberLeaveEventQuit(MemberLeaveEventQuit),
    MemberCardChangeEvent(MemberCardChangeEvent),
    MemberSpecialTitleChangeEvent(MemberSpecialTitleChangeEvent),
    MemberPermissionChangeEvent(MemberPermissionChangeEvent),
    MemberMuteEvent(MemberMuteEvent),
    MemberUnmuteEvent(MemberUnmuteEvent),
    MemberHonorChangeEvent(MemberHonorChangeEvent),
    NewFriendRequestEvent(NewFriendRequestEvent),
    MemberJoinRequestEvent(MemberJoinRequestEvent),
    BotInvitedJoinGroupRequestEvent(BotInvitedJoinGroupRequestEvent),
    OtherClientOnlineEvent(OtherClientOnlineEvent),
    OtherClientOfflineEvent(OtherClientOfflineEvent),
    CommandExecutedEvent(CommandExecutedEvent),
}

/// Routing kind of an event, mirroring [`Event`]'s variants, plus `Any`
/// which matches every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    BotOnline,
    BotOfflineActive,
    BotOfflineForce,
    BotOfflineDropped,
    BotRelogin,
    FriendInputStatusChanged,
    FriendNickChanged,
    BotGroupPermissionChange,
    BotMute,
    BotUnmute,
    BotJoinGroup,
    BotLeaveActive,
    BotLeaveKick,
    BotLeaveDisband,
    GroupRecall,
    FriendRecall,
    Nudge,
    GroupNameChange,
    GroupEntranceAnnouncementChange,
    GroupMuteAll,
    GroupAllowAnonymousChat,
    GroupAllowConfessTalk,
    GroupAllowMemberInvite,
    MemberJoin,
    MemberLeaveKick,
    MemberLeaveQuit,
    MemberCardChange,
    MemberSpecialTitleChange,
    MemberPermissionChange,
    MemberMute,
    MemberUnmute,
    MemberHonorChange,
    NewFriendRequest,
    MemberJoinRequest,
    BotInvitedJoinGroupRequest,
    OtherClientOnline,
    OtherClientOffline,
    CommandExecuted,
    Any,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::BotOnlineEvent(_) => EventKind::BotOnline,
            Event::BotOfflineEventActive(_) => EventKind::BotOfflineActive,
            Event::BotOfflineEventForce(_) => EventKind::BotOfflineForce,
            Event::BotOfflineEventDropped(_) => EventKind::BotOfflineDropped,
            Event::BotReloginEvent(_) => EventKind::BotRelogin,
            Event::FriendInputStatusChangedEvent(_) => EventKind::FriendInputStatusChanged,
            Event::FriendNickChangedEvent(_) => EventKind::FriendNickChanged,
            Event::BotGroupPermissionChangeEvent(_) => EventKind::BotGroupPermissionChange,
            Event::BotMuteEvent(_) => EventKind::BotMute,
            Event::BotUnmuteEvent(_) => EventKind::BotUnmute,
            Event::BotJoinGroupEvent(_) => EventKind::BotJoinGroup,
            Event::BotLeaveEventActive(_) => EventKind::BotLeaveActive,
            Event::BotLeaveEventKick(_) => EventKind::BotLeaveKick,
            Event::BotLeaveEventDisband(_) => EventKind::BotLeaveDisband,
            Event::GroupRecallEvent(_) => EventKind::GroupRecall,
            Event::FriendRecallEvent(_) => EventKind::FriendRecall,
            Event::NudgeEvent(_) => EventKind::Nudge,
            Event::GroupNameChangeEvent(_) => EventKind::GroupNameChange,
            Event::GroupEntranceAnnouncementChangeEvent(_) => {
                EventKind::GroupEntranceAnnouncementChange
            }
            Event::GroupMuteAllEvent(_) => EventKind::GroupMuteAll,
            Event::GroupAllowAnonymousChatEvent(_) => EventKind::GroupAllowAnonymousChat,
            Event::GroupAllowConfessTalkEvent(_) => EventKind::GroupAllowConfessTalk,
            Event::GroupAllowMemberInviteEvent(_) => EventKind::GroupAllowMemberInvite,
            Event::MemberJoinEvent(_) => EventKind::MemberJoin,
            Event::MemberLeaveEventKick(_) => EventKind::MemberLeaveKick,
            Event::MemberLeaveEventQuit(_) => EventKind::MemberLeaveQuit,
            Event::MemberCardChangeEvent(_) => EventKind::MemberCardChange,
            Event::MemberSpecialTitleChangeEvent(_) => EventKind::MemberSpecialTitleChange,
            Event::MemberPermissionChangeEvent(_) => EventKind::MemberPermissionChange,
            Event::MemberMuteEvent(_) => EventKind::MemberMute,
            Event::MemberUnmuteEvent(_) => EventKind::MemberUnmute,
            Event::MemberHonorChangeEvent(_) => EventKind::MemberHonorChange,
            Event::NewFriendRequestEvent(_) => EventKind::NewFriendRequest,
            Event::MemberJoinRequestEvent(_) => EventKind::MemberJoinRequest,
            Event::BotInvitedJoinGroupRequestEvent(_) => EventKind::BotInvitedJoinGroupRequest,
            Event::OtherClientOnlineEvent(_) => EventKind::OtherClientOnline,
            Event::OtherClientOfflineEvent(_) => EventKind::OtherClientOffline,
            Event::CommandExecutedEvent(_) => EventKind::CommandExecuted,
        }
    }

    /// The group this event happened in, for events carrying one directly.
    pub fn group(&self) -> Option<&Group> {
        match self {
            Event::BotGroupPermissionChangeEvent(e) => Some(&e.group),
            Event::BotJoinGroupEvent(e) => Some(&e.group),
            Event::BotLeaveEventActive(e) => Some(&e.group),
            Event::BotLeaveEventKick(e) => Some(&e.group),
            Event::BotLeaveEventDisband(e) => Some(&e.group),
            Event::GroupRecallEvent(e) => Some(&e.group),
            Event::GroupNameChangeEvent(e) => Some(&e.group),
            Event::GroupEntranceAnnouncementChangeEvent(e) => Some(&e.group),
            Event::GroupMuteAllEvent(e) => Some(&e.group),
            Event::GroupAllowAnonymousChatEvent(e) => Some(&e.group),
            Event::GroupAllowConfessTalkEvent(e) => Some(&e.group),
            Event::GroupAllowMemberInviteEvent(e) => Some(&e.group),
            _ => None,
        }
    }

    /// The member who performed the operation, when the event names one.
    pub fn operator(&self) -> Option<&Member> {
        match self {
            Event::BotMuteEvent(e) => Some(&e.operator),
            Event::BotUnmuteEvent(e) => Some(&e.operator),
            Event::BotLeaveEventKick(e) => e.operator.as_ref(),
            Event::BotLeaveEventDisband(e) => e.operator.as_ref(),
            Event::GroupRecallEvent(e) => e.operator.as_ref(),
            Event::GroupNameChangeEvent(e) => e.operator.as_ref(),
            Event::GroupEntranceAnnouncementChangeEvent(e) => e.operator.as_ref(),
            Event::GroupMuteAllEvent(e) => e.operator.as_ref(),
            Event::GroupAllowAnonymousChatEvent(e) => e.operator.as_ref(),
            Event::GroupAllowMemberInviteEvent(e) => e.operator.as_ref(),
            Event::MemberLeaveEventKick(e) => e.operator.as_ref(),
            Event::MemberMuteEvent(e) => e.operator.as_ref(),
            Event::MemberUnmuteEvent(e) => e.operator.as_ref(),
            _ => None,
        }
    }

    /// The member the event is about.
    pub fn member(&self) -> Option<&Member> {
        match self {
            Event::MemberJoinEvent(e) => Some(&e.member),
            Event::MemberLeaveEventKick(e) => Some(&e.member),
            Event::MemberLeaveEventQuit(e) => Some(&e.member),
            Event::MemberCardChangeEvent(e) => Some(&e.member),
            Event::MemberSpecialTitleChangeEvent(e) => Some(&e.member),
            Event::MemberPermissionChangeEvent(e) => Some(&e.member),
            Event::MemberMuteEvent(e) => Some(&e.member),
            Event::MemberUnmuteEvent(e) => Some(&e.member),
            Event::MemberHonorChangeEvent(e) => Some(&e.member),
            Event::CommandExecutedEvent(e) => e.member.as_ref(),
            _ => None,
        }
    }

    /// The friend the event is about.
    pub fn friend(&self) -> Option<&Friend> {
        match self {
            Event::FriendInputStatusChangedEvent(e) => Some(&e.friend),
            Event::FriendNickChangedEvent(e) => Some(&e.friend),
            Event::CommandExecutedEvent(e) => e.friend.as_ref(),
            _ => None,
        }
    }

    /// The `fromId` field of events that carry one.
    pub fn from_id(&self) -> Option<i64> {
        match self {
            Event::NudgeEvent(e) => Some(e.from_id),
            Event::NewFriendRequestEvent(e) => Some(e.from_id),
            Event::MemberJoinRequestEvent(e) => Some(e.from_id),
            Event::BotInvitedJoinGroupRequestEvent(e) => Some(e.from_id),
            _ => None,
        }
    }

    /// The `groupId` field of request events.
    pub fn group_id(&self) -> Option<i64> {
        match self {
            Event::NewFriendRequestEvent(e) => Some(e.group_id),
            Event::MemberJoinRequestEvent(e) => Some(e.group_id),
            Event::BotInvitedJoinGroupRequestEvent(e) => Some(e.group_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(id: i64, group_id: i64) -> Value {
        json!({
            "id": id,
            "memberName": "m",
            "permission": "ADMINISTRATOR",
            "specialTitle": "",
            "joinTimestamp": 0,
            "lastSpeakTimestamp": 0,
            "muteTimeRemaining": 0,
            "group": {"id": group_id, "name": "g", "permission": "MEMBER"}
        })
    }

    #[test]
    fn mute_event_exposes_operator() {
        let event: Event = serde_json::from_value(json!({
            "type": "BotMuteEvent",
            "durationSeconds": 600,
            "operator": member(11, 22)
        }))
        .unwrap();
        assert_eq!(event.kind(), EventKind::BotMute);
        assert!(event.group().is_none());
        assert_eq!(event.operator().unwrap().group.id, 22);
    }

    #[test]
    fn nick_change_maps_wire_from() {
        let event: Event = serde_json::from_value(json!({
            "type": "FriendNickChangedEvent",
            "friend": {"id": 1, "nickname": "n", "remark": ""},
            "from": "old",
            "to": "new"
        }))
        .unwrap();
        match &event {
            Event::FriendNickChangedEvent(e) => {
                assert_eq!(e.from_, "old");
                assert_eq!(e.to, "new");
            }
            other => panic!("unexpected {other:?}"),
        }
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["from"], "old");
        assert!(value.get("from_").is_none());
    }

    #[test]
    fn nudge_event_subject() {
        let event: Event = serde_json::from_value(json!({
            "type": "NudgeEvent",
            "fromId": 5,
            "subject": {"id": 99, "kind": "Group"},
            "action": "poke",
            "suffix": "",
            "target": 6
        }))
        .unwrap();
        assert_eq!(event.from_id(), Some(5));
        match event {
            Event::NudgeEvent(e) => assert_eq!(e.subject.kind, "Group"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn recall_event_has_group_and_optional_operator() {
        let event: Event = serde_json::from_value(json!({
            "type": "GroupRecallEvent",
            "authorId": 1,
            "messageId": 2,
            "time": 3,
            "group": {"id": 9, "name": "g", "permission": "MEMBER"},
            "operator": null
        }))
        .unwrap();
        assert_eq!(event.group().unwrap().id, 9);
        assert!(event.operator().is_none());
    }
}
