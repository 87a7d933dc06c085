// Typed command catalogue: a thin request/response layer over
// `MiraiApi::send_command`. Payload field names follow the wire schema
// (lowerCamelCase).

use serde::Serialize;
use serde_json::{Value, json};

use super::client::MiraiApi;
use crate::entities::{
    Announcement, Friend, Group, GroupConfig, Member, Message, MessageChain, Profile,
};
use crate::error::{ApiErrorKind, Error, Result};

/// Partial update of group settings; unset fields are left untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub announcement: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confess_talk: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_member_invite: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_approve: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anonymous_chat: Option<bool>,
}

/// Partial update of a member's card and title.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfoUpdate {
    /// Group card
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Special title; owner only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_title: Option<String>,
}

fn field_i64(data: &Value, name: &str) -> Result<i64> {
    data.get(name)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::Protocol(format!("response missing '{name}'")))
}

fn field_value(data: Value, name: &str) -> Result<Value> {
    match data {
        Value::Object(mut object) => object
            .remove(name)
            .ok_or_else(|| Error::Protocol(format!("response missing '{name}'"))),
        _ => Err(Error::Protocol(format!("response missing '{name}'"))),
    }
}

impl MiraiApi {
    /// Looks a message up by id. Returns `None` when the gateway no longer
    /// caches it.
    pub async fn message_from_id(
        &self,
        message_id: i64,
        friend_or_group_id: i64,
    ) -> Result<Option<Message>> {
        let result = self
            .send_command(
                "messageFromId",
                Some(json!({"messageId": message_id, "target": friend_or_group_id})),
                None,
            )
            .await;
        match result {
            Ok(data) => Ok(Some(serde_json::from_value(field_value(data, "data")?)?)),
            Err(Error::Api(e)) if e.kind == ApiErrorKind::TargetNotExist => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Account ids logged in on the gateway.
    pub async fn bot_list(&self) -> Result<Vec<i64>> {
        let data = self.send_command("botList", None, None).await?;
        Ok(serde_json::from_value(field_value(data, "data")?)?)
    }

    // region account information

    pub async fn friend_list(&self) -> Result<Vec<Friend>> {
        let data = self.send_command("friendList", None, None).await?;
        Ok(serde_json::from_value(field_value(data, "data")?)?)
    }

    pub async fn group_list(&self) -> Result<Vec<Group>> {
        let data = self.send_command("groupList", None, None).await?;
        Ok(serde_json::from_value(field_value(data, "data")?)?)
    }

    pub async fn member_list(&self, group_id: i64) -> Result<Vec<Member>> {
        let data = self
            .send_command("memberList", Some(json!({"target": group_id})), None)
            .await?;
        Ok(serde_json::from_value(field_value(data, "data")?)?)
    }

    pub async fn bot_profile(&self) -> Result<Profile> {
        let data = self.send_command("botProfile", None, None).await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn friend_profile(&self, friend_id: i64) -> Result<Profile> {
        let data = self
            .send_command("friendProfile", Some(json!({"target": friend_id})), None)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn member_profile(&self, group_id: i64, member_id: i64) -> Result<Profile> {
        let data = self
            .send_command(
                "memberProfile",
                Some(json!({"target": group_id, "memberId": member_id})),
                None,
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn user_profile(&self, user_id: i64) -> Result<Profile> {
        let data = self
            .send_command("userProfile", Some(json!({"target": user_id})), None)
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    // endregion

    // region sending and recalling messages

    /// Sends a friend message; returns the new message id.
    pub async fn send_friend_message(
        &self,
        friend_id: i64,
        message: impl Into<MessageChain>,
    ) -> Result<i64> {
        let chain: MessageChain = message.into();
        let data = self
            .send_command(
                "sendFriendMessage",
                Some(json!({"target": friend_id, "messageChain": chain})),
                None,
            )
            .await?;
        field_i64(&data, "messageId")
    }

    /// Sends a group message; returns the new message id.
    pub async fn send_group_message(
        &self,
        group_id: i64,
        message: impl Into<MessageChain>,
    ) -> Result<i64> {
        let chain: MessageChain = message.into();
        let data = self
            .send_command(
                "sendGroupMessage",
                Some(json!({"target": group_id, "messageChain": chain})),
                None,
            )
            .await?;
        field_i64(&data, "messageId")
    }

    /// Sends a temporary session message; returns the new message id.
    pub async fn send_temp_message(
        &self,
        group_id: i64,
        member_id: i64,
        message: impl Into<MessageChain>,
    ) -> Result<i64> {
        let chain: MessageChain = message.into();
        let data = self
            .send_command(
                "sendTempMessage",
                Some(json!({"qq": member_id, "group": group_id, "messageChain": chain})),
                None,
            )
            .await?;
        field_i64(&data, "messageId")
    }

    /// Nudges `user_id` inside `subject` (a friend chat or group).
    /// `kind` is Friend, Group or Stranger.
    pub async fn send_nudge(&self, user_id: i64, subject: i64, kind: &str) -> Result<()> {
        self.send_command(
            "sendNudge",
            Some(json!({"target": user_id, "subject": subject, "kind": kind})),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn recall(&self, message_id: i64, friend_or_group_id: i64) -> Result<()> {
        self.send_command(
            "recall",
            Some(json!({"messageId": message_id, "target": friend_or_group_id})),
            None,
        )
        .await?;
        Ok(())
    }

    // endregion

    pub async fn delete_friend(&self, friend_id: i64) -> Result<()> {
        self.send_command("deleteFriend", Some(json!({"target": friend_id})), None)
            .await?;
        Ok(())
    }

    // region group management

    /// Mutes a member for `seconds` (at most 30 days).
    pub async fn mute(&self, group_id: i64, member_id: i64, seconds: i64) -> Result<()> {
        self.send_command(
            "mute",
            Some(json!({"target": group_id, "memberId": member_id, "time": seconds})),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn unmute(&self, group_id: i64, member_id: i64) -> Result<()> {
        self.send_command(
            "unmute",
            Some(json!({"target": group_id, "memberId": member_id})),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn kick(&self, group_id: i64, member_id: i64, message: Option<&str>) -> Result<()> {
        self.send_command(
            "kick",
            Some(json!({"target": group_id, "memberId": member_id, "message": message})),
            None,
        )
        .await?;
        Ok(())
    }

    /// Leaves the group.
    pub async fn quit(&self, group_id: i64) -> Result<()> {
        self.send_command("quit", Some(json!({"target": group_id})), None)
            .await?;
        Ok(())
    }

    pub async fn mute_all(&self, group_id: i64) -> Result<()> {
        self.send_command("muteAll", Some(json!({"target": group_id})), None)
            .await?;
        Ok(())
    }

    pub async fn unmute_all(&self, group_id: i64) -> Result<()> {
        self.send_command("unmuteAll", Some(json!({"target": group_id})), None)
            .await?;
        Ok(())
    }

    /// Marks a message as group essence.
    pub async fn set_essence(&self, message_id: i64, group_id: i64) -> Result<()> {
        self.send_command(
            "setEssence",
            Some(json!({"messageId": message_id, "target": group_id})),
            None,
        )
        .await?;
        Ok(())
    }

    pub async fn get_group_config(&self, group_id: i64) -> Result<GroupConfig> {
        let data = self
            .send_command("groupConfig", Some(json!({"target": group_id})), Some("get"))
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn update_group_config(
        &self,
        group_id: i64,
        config: GroupConfigUpdate,
    ) -> Result<()> {
        self.send_command(
            "groupConfig",
            Some(json!({"target": group_id, "config": config})),
            Some("update"),
        )
        .await?;
        Ok(())
    }

    pub async fn get_member_info(&self, group_id: i64, member_id: i64) -> Result<Member> {
        let data = self
            .send_command(
                "memberInfo",
                Some(json!({"target": group_id, "memberId": member_id})),
                Some("get"),
            )
            .await?;
        Ok(serde_json::from_value(data)?)
    }

    pub async fn update_member_info(
        &self,
        group_id: i64,
        member_id: i64,
        info: MemberInfoUpdate,
    ) -> Result<()> {
        self.send_command(
            "memberInfo",
            Some(json!({"target": group_id, "memberId": member_id, "info": info})),
            Some("update"),
        )
        .await?;
        Ok(())
    }

    pub async fn announcement_list(
        &self,
        group_id: i64,
        offset: i64,
        size: i64,
    ) -> Result<Vec<Announcement>> {
        let data = self
            .send_command(
                "anno_list",
                Some(json!({"id": group_id, "offset": offset, "size": size})),
                None,
            )
            .await?;
        Ok(serde_json::from_value(field_value(data, "data")?)?)
    }

    // endregion
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_config_update_skips_unset_fields() {
        let update = GroupConfigUpdate {
            name: Some("new name".into()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"name": "new name"})
        );
    }

    #[test]
    fn member_info_update_uses_wire_names() {
        let update = MemberInfoUpdate {
            name: Some("card".into()),
            special_title: Some("title".into()),
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"name": "card", "specialTitle": "title"})
        );
    }
}
