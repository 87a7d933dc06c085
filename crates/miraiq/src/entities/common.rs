// Shared wire objects: accounts, groups, members and their metadata.

use serde::{Deserialize, Serialize};

/// A friend of the bot account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Friend {
    pub id: i64,
    pub nickname: String,
    pub remark: String,
}

/// A group the bot is a member of
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// The bot's permission in the group: OWNER, ADMINISTRATOR or MEMBER
    pub permission: String,
}

/// A member of a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: i64,
    /// Display name inside the group
    pub member_name: String,
    /// OWNER, ADMINISTRATOR or MEMBER
    pub permission: String,
    #[serde(default)]
    pub special_title: String,
    #[serde(default)]
    pub join_timestamp: i64,
    #[serde(default)]
    pub last_speak_timestamp: i64,
    #[serde(default)]
    pub mute_time_remaining: i64,
    pub group: Group,
}

/// Another client logged into the bot account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: i64,
    pub platform: String,
}

/// A user profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub nickname: String,
    pub email: String,
    pub age: i64,
    pub level: i64,
    pub sign: String,
    /// UNKNOWN, MALE or FEMALE
    pub sex: String,
}

/// Group settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfig {
    pub name: String,
    pub announcement: String,
    pub confess_talk: bool,
    pub allow_member_invite: bool,
    pub auto_approve: bool,
    pub anonymous_chat: bool,
}

/// A group announcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub group: Group,
    pub content: String,
    pub sender_id: i64,
    /// Unique id of the announcement
    pub fid: String,
    pub all_confirmed: bool,
    pub confirmed_members_count: i64,
    pub publication_time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_round_trips_camel_case() {
        let value = json!({
            "id": 42,
            "memberName": "bob",
            "permission": "ADMINISTRATOR",
            "specialTitle": "",
            "joinTimestamp": 1,
            "lastSpeakTimestamp": 2,
            "muteTimeRemaining": 0,
            "group": {"id": 7, "name": "g", "permission": "MEMBER"}
        });
        let member: Member = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(member.member_name, "bob");
        assert_eq!(member.group.id, 7);
        assert_eq!(serde_json::to_value(&member).unwrap(), value);
    }

    #[test]
    fn member_tolerates_missing_optional_counters() {
        let member: Member = serde_json::from_value(json!({
            "id": 1,
            "memberName": "x",
            "permission": "MEMBER",
            "group": {"id": 2, "name": "g", "permission": "MEMBER"}
        }))
        .unwrap();
        assert_eq!(member.mute_time_remaining, 0);
    }
}
