// End-to-end dispatch scenarios over a mock gateway: command handling with
// regex captures, auto-replies, exception swallowing, controller priority
// chains and cyclic-ordering refusal.

mod common;

use std::sync::Arc;
use std::sync::OnceLock;

use common::{MockGateway, ok_responder};
use miraiq::entities::MessageKind;
use miraiq::framework::{
    Bot, BoundHandlers, Controller, ControllerEntry, HandlerMethod, MessageHandler,
    MessageHandlerMethod, RecvContext,
};
use miraiq::gateway::ApiConfig;
use miraiq::{ApiError, Args, Error, regex_fullmatch, resolvers};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn group_message(text: &str) -> Value {
    json!({
        "type": "GroupMessage",
        "sender": {
            "id": 7777,
            "memberName": "member",
            "permission": "MEMBER",
            "specialTitle": "",
            "joinTimestamp": 0,
            "lastSpeakTimestamp": 0,
            "muteTimeRemaining": 0,
            "group": {"id": 4444, "name": "group", "permission": "MEMBER"}
        },
        "messageChain": [
            {"type": "Source", "id": 1, "time": 1700000000},
            {"type": "Plain", "text": text}
        ]
    })
}

fn friend_message(text: &str) -> Value {
    json!({
        "type": "FriendMessage",
        "sender": {"id": 9999, "nickname": "friend", "remark": ""},
        "messageChain": [
            {"type": "Source", "id": 2, "time": 1700000000},
            {"type": "Plain", "text": text}
        ]
    })
}

struct Running {
    gateway: MockGateway,
    bot: Bot,
    run: JoinHandle<miraiq::Result<()>>,
}

async fn start_bot(configure: impl FnOnce(&Bot)) -> Running {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let gateway = MockGateway::start(ok_responder()).await;
    let bot = Bot::new(ApiConfig::new(123, "test-key").base_url(gateway.url()));
    configure(&bot);
    let run = {
        let bot = bot.clone();
        tokio::spawn(async move { bot.run().await })
    };
    // Wait for the connection before injecting pushes.
    while gateway.connections() == 0 {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    Running { gateway, bot, run }
}

impl Running {
    async fn shutdown(self) {
        self.gateway.close_connection();
        self.run.await.unwrap().unwrap();
        let _ = self.bot;
    }
}

// S1: a /mute command parsed by a fullmatch gate issues one mute request
// and sends no reply.
#[tokio::test]
async fn mute_command_issues_one_mute_request_and_no_reply() {
    let running = start_bot(|bot| {
        let handler = MessageHandler::builder("mute_command", |mut args: Args| async move {
            let bot: Bot = args.take("bot")?;
            let group_id: i64 = args.take("group_id")?;
            let member_id: String = args.take("member_id")?;
            let duration: String = args.take("duration")?;
            bot.api()
                .mute(
                    group_id,
                    member_id.parse().expect("member id"),
                    duration.parse().expect("duration"),
                )
                .await?;
            Ok(())
        })
        .kind(MessageKind::Group)
        .regex(regex_fullmatch(r"/mute\s+(?P<member_id>\d+)\s+(?P<duration>\d+)").unwrap())
        .param::<Bot>("bot")
        .resolver("group_id", |ctx: &RecvContext| resolvers::group_id(ctx))
        .build();
        bot.add(handler);
    })
    .await;

    running.gateway.push(group_message("/mute 12345 60"));

    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "mute");
    assert_eq!(
        frame["content"],
        json!({"target": 4444, "memberId": 12345, "time": 60})
    );

    // The handler returned nothing, so the only further traffic is the
    // next test message's own request.
    running.gateway.push(group_message("/mute 1 2"));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "mute");

    running.shutdown().await;
}

// S4: a string reply is wrapped in a one-element chain and sent to the
// originating subject (friend, or the sender's group).
#[tokio::test]
async fn replies_are_routed_to_the_originating_subject() {
    let running = start_bot(|bot| {
        bot.add(
            MessageHandler::builder("greet_friend", |_args| async { Ok("Hello") })
                .kind(MessageKind::Friend)
                .build(),
        );
        bot.add(
            MessageHandler::builder("greet_group", |_args| async {
                Ok(miraiq::entities::MessageChain::plain("Hi group"))
            })
            .kind(MessageKind::Group)
            .build(),
        );
    })
    .await;

    running.gateway.push(friend_message("hello there"));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "sendFriendMessage");
    assert_eq!(frame["content"]["target"], 9999);
    assert_eq!(
        frame["content"]["messageChain"],
        json!([{"type": "Plain", "text": "Hello"}])
    );

    running.gateway.push(group_message("hello group"));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "sendGroupMessage");
    assert_eq!(frame["content"]["target"], 4444);
    assert_eq!(
        frame["content"]["messageChain"],
        json!([{"type": "Plain", "text": "Hi group"}])
    );

    running.shutdown().await;
}

// S3: a handler raising a typed gateway error is swallowed by the default
// exception handler; the dispatch loop keeps going.
#[tokio::test]
async fn gateway_errors_from_handlers_are_swallowed() {
    let running = start_bot(|bot| {
        bot.add(
            MessageHandler::builder("always_fails", |_args| async {
                Err::<(), Error>(Error::Api(ApiError::from_response(
                    json!({"code": 5, "msg": "no such target"}),
                )))
            })
            .kind(MessageKind::Group)
            .build(),
        );
        bot.add(
            MessageHandler::builder("still_alive", |_args| async { Ok("alive") })
                .kind(MessageKind::Friend)
                .build(),
        );
    })
    .await;

    // The failing dispatch produces no outgoing frame at all.
    running.gateway.push(group_message("boom"));
    // A later message is still dispatched, proving the task completed
    // without tearing anything down.
    running.gateway.push(friend_message("ping"));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "sendFriendMessage");
    assert_eq!(frame["content"]["messageChain"][0]["text"], "alive");

    running.shutdown().await;
}

// S2: a controller with two command handlers and a lowest-priority
// fallback declared after both.
struct Assistant {
    calls: mpsc::UnboundedSender<String>,
    bound: BoundHandlers,
}

impl Assistant {
    fn weather_command() -> MessageHandlerMethod<Self> {
        static CELL: OnceLock<MessageHandlerMethod<Assistant>> = OnceLock::new();
        CELL.get_or_init(|| {
            HandlerMethod::builder("weather_command", |this: Arc<Assistant>, _args| async move {
                let _ = this.calls.send("weather".into());
                Ok(())
            })
            .kind(MessageKind::Group)
            .regex(regex_fullmatch(r"/weather").unwrap())
            .build()
        })
        .clone()
    }

    fn mute_all_command() -> MessageHandlerMethod<Self> {
        static CELL: OnceLock<MessageHandlerMethod<Assistant>> = OnceLock::new();
        CELL.get_or_init(|| {
            HandlerMethod::builder("mute_all_command", |this: Arc<Assistant>, _args| async move {
                let _ = this.calls.send("mute_all".into());
                Ok(())
            })
            .kind(MessageKind::Group)
            .regex(regex_fullmatch(r"/mute_all").unwrap())
            .build()
        })
        .clone()
    }

    fn chat_fallback() -> MessageHandlerMethod<Self> {
        static CELL: OnceLock<MessageHandlerMethod<Assistant>> = OnceLock::new();
        CELL.get_or_init(|| {
            HandlerMethod::builder("chat_fallback", |this: Arc<Assistant>, _args| async move {
                let _ = this.calls.send("fallback".into());
                Ok(())
            })
            .kind(MessageKind::Group)
            .after_method(&Self::weather_command())
            .after_method(&Self::mute_all_command())
            .build()
        })
        .clone()
    }
}

impl Controller for Assistant {
    fn bound_handlers(&self) -> &BoundHandlers {
        &self.bound
    }

    fn entries() -> Vec<ControllerEntry<Self>> {
        vec![
            Self::chat_fallback().into(),
            Self::weather_command().into(),
            Self::mute_all_command().into(),
        ]
    }
}

#[tokio::test]
async fn controller_fallback_runs_only_when_no_command_matches() {
    let (calls_tx, mut calls_rx) = mpsc::unbounded_channel();
    let assistant = Arc::new(Assistant {
        calls: calls_tx,
        bound: BoundHandlers::new(),
    });
    let running = start_bot(|bot| {
        bot.add_controller(&assistant).unwrap();
    })
    .await;

    running.gateway.push(group_message("/weather"));
    assert_eq!(calls_rx.recv().await.unwrap(), "weather");

    running.gateway.push(group_message("武汉"));
    assert_eq!(calls_rx.recv().await.unwrap(), "fallback");

    running.gateway.push(group_message("/mute_all"));
    assert_eq!(calls_rx.recv().await.unwrap(), "mute_all");

    running.shutdown().await;
}

// S6: cyclic ordering is refused before anything connects.
#[tokio::test]
async fn cyclic_ordering_refuses_to_start() {
    let bot = Bot::new(ApiConfig::new(123, "test-key").base_url("ws://127.0.0.1:1"));
    let noop = |name: &str| {
        MessageHandler::builder(name, |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .build()
    };
    let a = noop("a");
    let b = noop("b");
    let c = noop("c");
    bot.add(a.clone());
    bot.add(b.clone());
    bot.add(c.clone());
    bot.add_order(&[a.clone(), b.clone()]);
    bot.add_order(&[b, c.clone()]);
    bot.add_order(&[c, a]);

    match bot.run().await {
        Err(Error::Contract(message)) => assert!(message.contains("cycle")),
        other => panic!("expected a contract error, got {other:?}"),
    }
}

// Events reply to the group their operator belongs to.
#[tokio::test]
async fn event_reply_targets_the_operator_group() {
    let running = start_bot(|bot| {
        bot.add(
            miraiq::framework::EventHandler::builder("on_bot_mute", |_args| async {
                Ok("why mute me?")
            })
            .kind(miraiq::entities::EventKind::BotMute)
            .build(),
        );
    })
    .await;

    running.gateway.push(json!({
        "type": "BotMuteEvent",
        "durationSeconds": 600,
        "operator": {
            "id": 1,
            "memberName": "admin",
            "permission": "ADMINISTRATOR",
            "specialTitle": "",
            "joinTimestamp": 0,
            "lastSpeakTimestamp": 0,
            "muteTimeRemaining": 0,
            "group": {"id": 6161, "name": "g", "permission": "MEMBER"}
        }
    }));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "sendGroupMessage");
    assert_eq!(frame["content"]["target"], 6161);

    running.shutdown().await;
}

// Data nobody handles is dropped without any outgoing traffic.
#[tokio::test]
async fn unhandled_pushes_produce_no_traffic() {
    let running = start_bot(|bot| {
        bot.add(
            MessageHandler::builder("friend_only", |_args| async { Ok("hi") })
                .kind(MessageKind::Friend)
                .build(),
        );
    })
    .await;

    // Unknown entity, then a group message with no matching handler.
    running.gateway.push(json!({"type": "BrandNew", "x": 1}));
    running.gateway.push(group_message("nobody listens"));
    // Finally a friend message; the first frame seen must be its reply.
    running.gateway.push(friend_message("hello"));
    let frame = running.gateway.next_client_frame().await;
    assert_eq!(frame["command"], "sendFriendMessage");

    running.shutdown().await;
}

// Unused for routing, but keeps the sync-message path honest: pushes that
// are sync messages are decoded and simply not dispatched.
#[tokio::test]
async fn sync_messages_are_decoded_but_not_dispatched() {
    let running = start_bot(|bot| {
        bot.add(
            MessageHandler::builder("any_message", |_args| async { Ok("seen") })
                .kind(MessageKind::Any)
                .build(),
        );
    })
    .await;

    running.gateway.push(json!({
        "type": "FriendSyncMessage",
        "subject": {"id": 3, "nickname": "n", "remark": ""},
        "messageChain": [{"type": "Plain", "text": "mirrored"}]
    }));
    running.gateway.push(friend_message("real"));
    let frame = running.gateway.next_client_frame().await;
    // Only the real friend message got a reply.
    assert_eq!(frame["command"], "sendFriendMessage");
    assert_eq!(frame["content"]["target"], 9999);

    running.shutdown().await;
}
