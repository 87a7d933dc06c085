//! Built-in filter predicates, ready to pass to `HandlerBuilder::filter`.

use std::collections::HashSet;

use crate::entities::{MessageElement, RecvData};
use crate::framework::ContextView;
use crate::resolvers;

/// Passes for data coming from any of the given groups.
pub fn from_group<C: ContextView>(
    group_ids: impl IntoIterator<Item = i64>,
) -> impl Fn(&C) -> bool + Send + Sync + 'static {
    let groups: HashSet<i64> = group_ids.into_iter().collect();
    move |context| {
        resolvers::get_group_id(context)
            .map(|id| groups.contains(&id))
            .unwrap_or(false)
    }
}

/// Passes for data sent by any of the given users.
pub fn from_user<C: ContextView>(
    user_ids: impl IntoIterator<Item = i64>,
) -> impl Fn(&C) -> bool + Send + Sync + 'static {
    let users: HashSet<i64> = user_ids.into_iter().collect();
    move |context| {
        resolvers::get_sender_id(context)
            .map(|id| users.contains(&id))
            .unwrap_or(false)
    }
}

/// Passes when the message chain contains an equal element.
pub fn chain_contains<C: ContextView>(
    element: MessageElement,
) -> impl Fn(&C) -> bool + Send + Sync + 'static {
    move |context| {
        context
            .message_chain()
            .map(|chain| chain.iter().any(|e| *e == element))
            .unwrap_or(false)
    }
}

/// Passes when the message mentions the given user.
pub fn is_at_user<C: ContextView>(user_id: i64) -> impl Fn(&C) -> bool + Send + Sync + 'static {
    move |context| {
        context
            .message_chain()
            .map(|chain| chain.at_targets().contains(&user_id))
            .unwrap_or(false)
    }
}

/// Passes when the message mentions the bot itself.
pub fn is_at_bot<C: ContextView>() -> impl Fn(&C) -> bool + Send + Sync + 'static {
    |context| {
        let bot_id = context.bot().bot_id();
        context
            .message_chain()
            .map(|chain| chain.at_targets().contains(&bot_id))
            .unwrap_or(false)
    }
}

/// Passes for plain incoming messages (not events or sync messages).
pub fn is_message<C: ContextView>() -> impl Fn(&C) -> bool + Send + Sync + 'static {
    |context| matches!(context.recv_data(), RecvData::Message(_))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{At, Friend, FriendMessage, Message, MessageChain, Plain};
    use crate::framework::{Bot, RecvContext};
    use crate::gateway::ApiConfig;
    use std::sync::Arc;

    fn friend_context(bot_id: i64, chain: MessageChain) -> Arc<RecvContext> {
        Arc::new(RecvContext::new(
            Bot::new(ApiConfig::new(bot_id, "key")),
            RecvData::Message(Message::FriendMessage(FriendMessage {
                sender: Friend {
                    id: 5,
                    nickname: "n".into(),
                    remark: String::new(),
                },
                message_chain: chain,
            })),
        ))
    }

    #[test]
    fn user_filter_matches_sender() {
        let context = friend_context(1, MessageChain::plain("x"));
        assert!(from_user([5])(&*context));
        assert!(!from_user([6])(&*context));
    }

    #[test]
    fn group_filter_rejects_friend_messages() {
        let context = friend_context(1, MessageChain::plain("x"));
        assert!(!from_group([1, 2, 3])(&*context));
    }

    #[test]
    fn at_filters_inspect_mentions() {
        let chain = MessageChain(vec![
            MessageElement::At(At {
                target: 1,
                display: String::new(),
            }),
            MessageElement::Plain(Plain::new("hello")),
        ]);
        let context = friend_context(1, chain);
        assert!(is_at_bot()(&*context));
        assert!(is_at_user(1)(&*context));
        assert!(!is_at_user(2)(&*context));
    }

    #[test]
    fn chain_contains_compares_elements() {
        let chain = MessageChain(vec![MessageElement::Plain(Plain::new("hello"))]);
        let context = friend_context(1, chain);
        assert!(chain_contains(MessageElement::Plain(Plain::new("hello")))(
            &*context
        ));
        assert!(!chain_contains(MessageElement::Plain(Plain::new("bye")))(
            &*context
        ));
    }
}
