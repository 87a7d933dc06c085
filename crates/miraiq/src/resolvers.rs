//! Built-in resolvers: pull common values out of a context.
//!
//! Every function works on either context kind through [`ContextView`]
//! (an exception context delegates to its causal receive context). The
//! `get_*` variants return `None` when the datum has no such field; the
//! bare variants turn that into a resolve error, ready to plug into
//! `HandlerBuilder::resolver`.

use crate::entities::{Event, Message, RecvData};
use crate::error::{Error, Result};
use crate::framework::ContextView;

fn data_of(context: &impl ContextView) -> &RecvData {
    context.recv_data()
}

/// The group id of the datum: the sender's group for group and temp
/// messages, or the first group-ish field of an event (`group`,
/// `operator.group`, `member.group`, `groupId`, a group nudge subject).
pub fn get_group_id(context: &impl ContextView) -> Option<i64> {
    match data_of(context) {
        RecvData::Message(message) => message.sender_group().map(|g| g.id),
        RecvData::Event(event) => {
            if let Some(group) = event.group() {
                Some(group.id)
            } else if let Some(operator) = event.operator() {
                Some(operator.group.id)
            } else if let Some(member) = event.member() {
                Some(member.group.id)
            } else if let Some(group_id) = event.group_id() {
                Some(group_id)
            } else if let Event::NudgeEvent(e) = event {
                (e.subject.kind == "Group").then_some(e.subject.id)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn group_id(context: &impl ContextView) -> Result<i64> {
    get_group_id(context)
        .ok_or_else(|| Error::Resolve("cannot resolve a group id from the received data".into()))
}

/// The account id of whoever the datum is about: the message sender, or
/// an event's operator / friend / `fromId` / recall author / nudge origin.
pub fn get_sender_id(context: &impl ContextView) -> Option<i64> {
    match data_of(context) {
        RecvData::Message(message) => Some(message.sender_id()),
        RecvData::Event(event) => {
            if let Some(operator) = event.operator() {
                Some(operator.id)
            } else if let Some(friend) = event.friend() {
                Some(friend.id)
            } else if let Some(from_id) = event.from_id() {
                Some(from_id)
            } else if let Event::FriendRecallEvent(e) = event {
                Some(e.author_id)
            } else {
                None
            }
        }
        _ => None,
    }
}

pub fn sender_id(context: &impl ContextView) -> Result<i64> {
    get_sender_id(context)
        .ok_or_else(|| Error::Resolve("cannot resolve a sender id from the received data".into()))
}

/// The operator of an event, when it names one.
pub fn get_operator_id(context: &impl ContextView) -> Option<i64> {
    match data_of(context) {
        RecvData::Event(event) => event.operator().map(|m| m.id),
        _ => None,
    }
}

pub fn operator_id(context: &impl ContextView) -> Result<i64> {
    get_operator_id(context).ok_or_else(|| {
        Error::Resolve("cannot resolve an operator id from the received data".into())
    })
}

/// Texts of every plain element of the message chain, in order.
pub fn texts(context: &impl ContextView) -> Result<Vec<String>> {
    Ok(context
        .message_chain()?
        .texts()
        .into_iter()
        .map(str::to_string)
        .collect())
}

/// Text of the first plain element, if any.
pub fn get_text(context: &impl ContextView) -> Option<String> {
    context
        .message_chain()
        .ok()?
        .first_text()
        .map(str::to_string)
}

/// Text of the first plain element; an error when there is none.
pub fn text(context: &impl ContextView) -> Result<String> {
    context
        .message_chain()?
        .first_text()
        .map(str::to_string)
        .ok_or_else(|| Error::Resolve("no plain element in the message chain".into()))
}

/// Targets of every mention in the message chain, in order.
pub fn at_targets(context: &impl ContextView) -> Result<Vec<i64>> {
    Ok(context.message_chain()?.at_targets())
}

/// Whether the datum is a message (rather than an event or sync message).
pub fn message(context: &impl ContextView) -> Result<Message> {
    match data_of(context) {
        RecvData::Message(m) => Ok(m.clone()),
        _ => Err(Error::Resolve("received data is not a message".into())),
    }
}
