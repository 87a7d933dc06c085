// The bot: owns the gateway client, the handler and router lists, and the
// per-push dispatch tasks.
//
// `run` connects, then pulls pushes and spawns one tracked task per push so
// a slow handler cannot head-of-line-block later pushes. Failures inside
// routing or a handler are routed to the exception handlers; typed gateway
// errors raised by an exception handler (or while sending its reply) are
// swallowed and logged.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveTime;
use parking_lot::Mutex;
use tokio::task::JoinHandle;

use crate::entities::{Event, Message, MessageChain, RecvData};
use crate::error::{Error, Result};
use crate::framework::context::{ExceptionContext, RecvContext};
use crate::framework::controller::AnyHandler;
use crate::framework::handler::{
    Args, Domain, EventDomain, EventHandler, ExceptionDomain, ExceptionHandler, ExceptionKind,
    Handler, MessageDomain, MessageHandler, RecvHandler,
};
use crate::framework::router::{
    EventRouter, ExceptionRouter, MessageRouter, Router, TypeRouter, router_identity,
};
use crate::framework::sort::{SortInput, sort_order};
use crate::gateway::{ApiConfig, MiraiApi};

struct TaskSetInner {
    tasks: Mutex<HashMap<u64, tokio::task::AbortHandle>>,
    next: AtomicU64,
}

/// Keeps spawned tasks reachable until they finish; tasks remove
/// themselves on completion.
#[derive(Clone)]
struct TaskSet {
    inner: Arc<TaskSetInner>,
}

impl TaskSet {
    fn new() -> Self {
        Self {
            inner: Arc::new(TaskSetInner {
                tasks: Mutex::new(HashMap::new()),
                next: AtomicU64::new(0),
            }),
        }
    }

    fn next_id(&self) -> u64 {
        self.inner.next.fetch_add(1, Ordering::Relaxed)
    }

    fn insert(&self, id: u64, handle: tokio::task::AbortHandle) {
        self.inner.tasks.lock().insert(id, handle);
    }

    fn remove(&self, id: u64) {
        self.inner.tasks.lock().remove(&id);
    }

    fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }
}

struct BotState {
    message_handlers: Vec<MessageHandler>,
    event_handlers: Vec<EventHandler>,
    exception_handlers: Vec<ExceptionHandler>,
    message_routers: Vec<MessageRouter>,
    event_routers: Vec<EventRouter>,
    exception_routers: Vec<ExceptionRouter>,
    message_handler_orders: Vec<(MessageHandler, MessageHandler)>,
    event_handler_orders: Vec<(EventHandler, EventHandler)>,
    exception_handler_orders: Vec<(ExceptionHandler, ExceptionHandler)>,
    message_router_orders: Vec<(MessageRouter, MessageRouter)>,
    event_router_orders: Vec<(EventRouter, EventRouter)>,
    exception_router_orders: Vec<(ExceptionRouter, ExceptionRouter)>,
}

struct BotInner {
    api: MiraiApi,
    state: Mutex<BotState>,
    default_message_router: MessageRouter,
    default_event_router: EventRouter,
    default_exception_router: ExceptionRouter,
    default_exception_handler: ExceptionHandler,
    tasks: TaskSet,
}

/// A bot instance: cheap to clone, every clone shares the same gateway,
/// handlers, routers and background tasks.
#[derive(Clone)]
pub struct Bot {
    inner: Arc<BotInner>,
}

/// Anything [`Bot::add`] accepts: a handler or a router of any category.
pub enum BotItem {
    MessageHandler(MessageHandler),
    EventHandler(EventHandler),
    ExceptionHandler(ExceptionHandler),
    MessageRouter(MessageRouter),
    EventRouter(EventRouter),
    ExceptionRouter(ExceptionRouter),
}

impl From<MessageHandler> for BotItem {
    fn from(handler: MessageHandler) -> Self {
        BotItem::MessageHandler(handler)
    }
}

impl From<EventHandler> for BotItem {
    fn from(handler: EventHandler) -> Self {
        BotItem::EventHandler(handler)
    }
}

impl From<ExceptionHandler> for BotItem {
    fn from(handler: ExceptionHandler) -> Self {
        BotItem::ExceptionHandler(handler)
    }
}

impl From<MessageRouter> for BotItem {
    fn from(router: MessageRouter) -> Self {
        BotItem::MessageRouter(router)
    }
}

impl From<EventRouter> for BotItem {
    fn from(router: EventRouter) -> Self {
        BotItem::EventRouter(router)
    }
}

impl From<ExceptionRouter> for BotItem {
    fn from(router: ExceptionRouter) -> Self {
        BotItem::ExceptionRouter(router)
    }
}

impl From<AnyHandler> for BotItem {
    fn from(handler: AnyHandler) -> Self {
        match handler {
            AnyHandler::Message(h) => BotItem::MessageHandler(h),
            AnyHandler::Event(h) => BotItem::EventHandler(h),
            AnyHandler::Exception(h) => BotItem::ExceptionHandler(h),
        }
    }
}

/// Items `add_order` can chain: handlers or routers of one category.
pub trait Orderable: Clone {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>);
}

impl Orderable for MessageHandler {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner.state.lock().message_handler_orders.extend(pairs);
    }
}

impl Orderable for EventHandler {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner.state.lock().event_handler_orders.extend(pairs);
    }
}

impl Orderable for ExceptionHandler {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner
            .state
            .lock()
            .exception_handler_orders
            .extend(pairs);
    }
}

impl Orderable for MessageRouter {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner.state.lock().message_router_orders.extend(pairs);
    }
}

impl Orderable for EventRouter {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner.state.lock().event_router_orders.extend(pairs);
    }
}

impl Orderable for ExceptionRouter {
    fn extend_orders(bot: &Bot, pairs: Vec<(Self, Self)>) {
        bot.inner
            .state
            .lock()
            .exception_router_orders
            .extend(pairs);
    }
}

fn make_default_exception_handler() -> ExceptionHandler {
    ExceptionHandler::builder_sync("default_exception_handler", |mut args: Args| {
        let context: Arc<ExceptionContext> = args.take("context")?;
        match &context.handler {
            Some(handler) => tracing::error!(
                exception = %context.error,
                handler = handler.name(),
                "swallowing an exception from a handler"
            ),
            None => tracing::error!(
                exception = %context.error,
                "swallowing an exception raised while routing received data"
            ),
        }
        Ok(())
    })
    .kind(ExceptionKind::AnyApi)
    .param::<Arc<ExceptionContext>>("context")
    .build()
}

impl Bot {
    pub fn new(config: ApiConfig) -> Self {
        let api = MiraiApi::new(config);
        let default_message_router: MessageRouter = Arc::new(TypeRouter::<MessageDomain>::new());
        let default_event_router: EventRouter = Arc::new(TypeRouter::<EventDomain>::new());
        let default_exception_router: ExceptionRouter =
            Arc::new(TypeRouter::<ExceptionDomain>::new());
        let default_exception_handler = make_default_exception_handler();
        let state = BotState {
            message_handlers: Vec::new(),
            event_handlers: Vec::new(),
            exception_handlers: vec![default_exception_handler.clone()],
            message_routers: vec![default_message_router.clone()],
            event_routers: vec![default_event_router.clone()],
            exception_routers: vec![default_exception_router.clone()],
            message_handler_orders: Vec::new(),
            event_handler_orders: Vec::new(),
            exception_handler_orders: Vec::new(),
            message_router_orders: Vec::new(),
            event_router_orders: Vec::new(),
            exception_router_orders: Vec::new(),
        };
        Self {
            inner: Arc::new(BotInner {
                api,
                state: Mutex::new(state),
                default_message_router,
                default_event_router,
                default_exception_router,
                default_exception_handler,
                tasks: TaskSet::new(),
            }),
        }
    }

    pub fn api(&self) -> &MiraiApi {
        &self.inner.api
    }

    pub fn bot_id(&self) -> i64 {
        self.inner.api.bot_id()
    }

    pub fn verify_key(&self) -> &str {
        self.inner.api.verify_key()
    }

    pub fn base_url(&self) -> &str {
        self.inner.api.base_url()
    }

    pub fn reserved_sync_id(&self) -> &str {
        self.inner.api.reserved_sync_id()
    }

    pub fn default_exception_handler(&self) -> &ExceptionHandler {
        &self.inner.default_exception_handler
    }

    pub fn default_message_router(&self) -> &MessageRouter {
        &self.inner.default_message_router
    }

    pub fn default_event_router(&self) -> &EventRouter {
        &self.inner.default_event_router
    }

    pub fn default_exception_router(&self) -> &ExceptionRouter {
        &self.inner.default_exception_router
    }

    /// Registers a handler or router.
    pub fn add(&self, item: impl Into<BotItem>) {
        let mut state = self.inner.state.lock();
        match item.into() {
            BotItem::MessageHandler(h) => state.message_handlers.push(h),
            BotItem::EventHandler(h) => state.event_handlers.push(h),
            BotItem::ExceptionHandler(h) => state.exception_handlers.push(h),
            BotItem::MessageRouter(r) => state.message_routers.push(r),
            BotItem::EventRouter(r) => state.event_routers.push(r),
            BotItem::ExceptionRouter(r) => state.exception_routers.push(r),
        }
    }

    pub fn add_all(&self, items: impl IntoIterator<Item = impl Into<BotItem>>) {
        for item in items {
            self.add(item);
        }
    }

    /// Registers every handler of a controller instance.
    pub fn add_controller<C: crate::framework::controller::Controller>(
        &self,
        controller: &Arc<C>,
    ) -> Result<()> {
        self.add_all(controller.handlers()?);
        Ok(())
    }

    /// Chains pairwise ordering constraints: each item runs before the
    /// next one.
    pub fn add_order<T: Orderable>(&self, items: &[T]) {
        let pairs = items
            .windows(2)
            .map(|pair| (pair[0].clone(), pair[1].clone()))
            .collect();
        T::extend_orders(self, pairs);
    }

    /// Sorts handlers and routers and rebuilds every router. Reports a
    /// contract error when the ordering constraints contain a cycle.
    pub fn build(&self) -> Result<()> {
        let mut state = self.inner.state.lock();
        self.clear_routers(&state);

        state.message_handlers =
            sort_handlers(&state.message_handlers, &state.message_handler_orders, None)?;
        state.event_handlers =
            sort_handlers(&state.event_handlers, &state.event_handler_orders, None)?;
        state.exception_handlers = sort_handlers(
            &state.exception_handlers,
            &state.exception_handler_orders,
            Some(&self.inner.default_exception_handler),
        )?;

        state.message_routers = sort_routers(
            &state.message_routers,
            &state.message_router_orders,
            Some(&self.inner.default_message_router),
        )?;
        state.event_routers = sort_routers(
            &state.event_routers,
            &state.event_router_orders,
            Some(&self.inner.default_event_router),
        )?;
        state.exception_routers = sort_routers(
            &state.exception_routers,
            &state.exception_router_orders,
            Some(&self.inner.default_exception_router),
        )?;

        for router in &state.message_routers {
            router.build(&state.message_handlers);
        }
        for router in &state.event_routers {
            router.build(&state.event_handlers);
        }
        for router in &state.exception_routers {
            router.build(&state.exception_handlers);
        }
        Ok(())
    }

    fn clear_routers(&self, state: &BotState) {
        for router in &state.message_routers {
            router.clear();
        }
        for router in &state.event_routers {
            router.clear();
        }
        for router in &state.exception_routers {
            router.clear();
        }
    }

    /// Drops all router state. `build` does this implicitly.
    pub fn clear(&self) {
        let state = self.inner.state.lock();
        self.clear_routers(&state);
    }

    /// Connects, then dispatches pushes until the gateway closes the
    /// connection cleanly.
    pub async fn run(&self) -> Result<()> {
        self.build()?;
        self.inner.api.connect().await?;
        let result = loop {
            match self.inner.api.recv().await {
                Ok(data) => {
                    let context = Arc::new(RecvContext::new(self.clone(), data));
                    let bot = self.clone();
                    let _ = self.create_task(async move { bot.dispatch(context).await });
                }
                Err(Error::ConnectionClosed { normal: true, .. }) => break Ok(()),
                Err(e) => break Err(e),
            }
        };
        let _ = self.close().await;
        result
    }

    /// Shuts the gateway down; pending waiters fail, the reader
    /// terminates. Background dispatch tasks are not cancelled.
    pub async fn close(&self) -> Result<()> {
        self.inner.api.close().await
    }

    /// Spawns a background task whose lifetime is tied to the bot. The
    /// task is tracked until it finishes.
    pub fn create_task<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let set = self.inner.tasks.clone();
        let on_done = set.clone();
        let id = set.next_id();
        let handle = tokio::spawn(async move {
            let output = future.await;
            on_done.remove(id);
            output
        });
        set.insert(id, handle.abort_handle());
        if handle.is_finished() {
            set.remove(id);
        }
        handle
    }

    /// Runs `action` every day at the given local wall-clock time,
    /// starting today if the time is still ahead.
    pub fn create_everyday_task<F, Fut>(&self, time: NaiveTime, action: F) -> JoinHandle<()>
    where
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.create_task(async move {
            let mut next = {
                let now = chrono::Local::now().naive_local();
                let today = now.date().and_time(time);
                if today <= now {
                    today + chrono::Duration::days(1)
                } else {
                    today
                }
            };
            loop {
                let now = chrono::Local::now().naive_local();
                if let Ok(wait) = (next - now).to_std() {
                    tokio::time::sleep(wait).await;
                }
                action().await;
                next += chrono::Duration::days(1);
            }
        })
    }

    #[doc(hidden)]
    pub fn tracked_tasks(&self) -> usize {
        self.inner.tasks.len()
    }

    async fn dispatch(self, context: Arc<RecvContext>) {
        let handler = match self.route_recv(&context).await {
            Ok(Some(handler)) => handler,
            Ok(None) => return,
            Err(error) => {
                // Routing failed before any handler was picked.
                let exception = Arc::new(ExceptionContext::new(error, context, None));
                self.dispatch_exception(exception).await;
                return;
            }
        };
        let outcome = async {
            if let Some(reply) = handler.handle(&context).await? {
                self.send_to_sender(&context.data, reply).await?;
            }
            Ok::<(), Error>(())
        }
        .await;
        if let Err(error) = outcome {
            let exception = Arc::new(ExceptionContext::new(error, context, Some(handler)));
            self.dispatch_exception(exception).await;
        }
    }

    async fn dispatch_exception(&self, exception: Arc<ExceptionContext>) {
        match self.handle_exception(&exception).await {
            Ok(true) => {}
            Ok(false) => tracing::error!(
                exception = %exception.error,
                "no exception handler matched; dispatch task ends with the failure"
            ),
            Err(secondary) => tracing::error!(
                exception = %secondary,
                original = %exception.error,
                "exception dispatch itself failed"
            ),
        }
    }

    /// Runs the exception handlers for one failure. `Ok(true)` means a
    /// handler took it; typed gateway errors raised by the handler (or
    /// while sending its reply) are swallowed and logged.
    async fn handle_exception(&self, exception: &Arc<ExceptionContext>) -> Result<bool> {
        let Some(handler) = self.route_exception(exception).await? else {
            return Ok(false);
        };
        let reply = match handler.handle(exception).await {
            Ok(reply) => reply,
            Err(Error::Api(e)) => {
                tracing::error!(
                    exception = %e,
                    handler = handler.name(),
                    "swallowing an exception raised from an exception handler"
                );
                return Ok(true);
            }
            Err(other) => return Err(other),
        };
        if let Some(chain) = reply {
            match self.send_to_sender(&exception.context.data, chain).await {
                Ok(()) => {}
                Err(Error::Api(e)) => tracing::error!(
                    exception = %e,
                    handler = handler.name(),
                    "swallowing an exception while sending an exception handler's reply"
                ),
                Err(other) => return Err(other),
            }
        }
        Ok(true)
    }

    async fn route_recv(&self, context: &Arc<RecvContext>) -> Result<Option<RecvHandler>> {
        match &context.data {
            RecvData::Message(_) => {
                let routers = self.inner.state.lock().message_routers.clone();
                for router in routers {
                    if let Some(handler) = router.route(context).await? {
                        return Ok(Some(RecvHandler::Message(handler)));
                    }
                }
                Ok(None)
            }
            RecvData::Event(_) => {
                let routers = self.inner.state.lock().event_routers.clone();
                for router in routers {
                    if let Some(handler) = router.route(context).await? {
                        return Ok(Some(RecvHandler::Event(handler)));
                    }
                }
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    async fn route_exception(
        &self,
        context: &Arc<ExceptionContext>,
    ) -> Result<Option<ExceptionHandler>> {
        let routers = self.inner.state.lock().exception_routers.clone();
        for router in routers {
            if let Some(handler) = router.route(context).await? {
                return Ok(Some(handler));
            }
        }
        Ok(None)
    }

    /// Sends a reply to the originating subject of `data`: the group or
    /// friend the datum came from. Data without a reply target is dropped.
    async fn send_to_sender(&self, data: &RecvData, message: MessageChain) -> Result<()> {
        let api = &self.inner.api;
        match data {
            RecvData::Event(event) => {
                if let Some(group) = event.group() {
                    api.send_group_message(group.id, message).await?;
                } else if let Some(operator) = event.operator() {
                    api.send_group_message(operator.group.id, message).await?;
                } else if let Some(member) = event.member() {
                    api.send_group_message(member.group.id, message).await?;
                } else if let Some(friend) = event.friend() {
                    api.send_friend_message(friend.id, message).await?;
                } else if let Event::FriendRecallEvent(e) = event {
                    api.send_friend_message(e.author_id, message).await?;
                } else if let Event::NudgeEvent(e) = event {
                    match e.subject.kind.as_str() {
                        "Group" => {
                            api.send_group_message(e.subject.id, message).await?;
                        }
                        "Friend" => {
                            api.send_friend_message(e.subject.id, message).await?;
                        }
                        _ => {}
                    }
                }
            }
            RecvData::Message(Message::GroupMessage(m)) => {
                api.send_group_message(m.sender.group.id, message).await?;
            }
            RecvData::Message(Message::FriendMessage(m)) => {
                api.send_friend_message(m.sender.id, message).await?;
            }
            RecvData::Message(Message::TempMessage(m)) => {
                api.send_temp_message(m.sender.group.id, m.sender.id, message)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn sort_handlers<D: Domain>(
    items: &[Handler<D>],
    extra: &[(Handler<D>, Handler<D>)],
    default: Option<&Handler<D>>,
) -> Result<Vec<Handler<D>>> {
    let input = SortInput {
        ids: items.iter().map(|h| h.identity()).collect(),
        before: items
            .iter()
            .map(|h| h.before().iter().map(|x| x.identity()).collect())
            .collect(),
        after: items
            .iter()
            .map(|h| h.after().iter().map(|x| x.identity()).collect())
            .collect(),
        extra: extra
            .iter()
            .map(|(u, v)| (u.identity(), v.identity()))
            .collect(),
        default: default.map(|h| h.identity()),
    };
    let order = sort_order(&input)?;
    Ok(order.into_iter().map(|i| items[i].clone()).collect())
}

fn sort_routers<D: Domain>(
    items: &[Arc<dyn Router<D>>],
    extra: &[(Arc<dyn Router<D>>, Arc<dyn Router<D>>)],
    default: Option<&Arc<dyn Router<D>>>,
) -> Result<Vec<Arc<dyn Router<D>>>> {
    let input = SortInput {
        ids: items.iter().map(router_identity).collect(),
        before: items
            .iter()
            .map(|r| r.before().iter().map(router_identity).collect())
            .collect(),
        after: items
            .iter()
            .map(|r| r.after().iter().map(router_identity).collect())
            .collect(),
        extra: extra
            .iter()
            .map(|(u, v)| (router_identity(u), router_identity(v)))
            .collect(),
        default: default.map(router_identity),
    };
    let order = sort_order(&input)?;
    Ok(order.into_iter().map(|i| items[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MessageKind;

    fn noop_message_handler(name: &str) -> MessageHandler {
        MessageHandler::builder(name, |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .build()
    }

    fn noop_exception_handler(name: &str) -> ExceptionHandler {
        ExceptionHandler::builder(name, |_args| async { Ok(()) })
            .kind(ExceptionKind::Any)
            .build()
    }

    fn message_handler_names(bot: &Bot) -> Vec<String> {
        bot.inner
            .state
            .lock()
            .message_handlers
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    fn exception_handler_names(bot: &Bot) -> Vec<String> {
        bot.inner
            .state
            .lock()
            .exception_handlers
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    }

    #[test]
    fn build_sorts_handlers_by_neighbour_lists() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let low = noop_message_handler("low");
        let mid = MessageHandler::builder("mid", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .before(&low)
            .build();
        let high = MessageHandler::builder("high", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .before(&mid)
            .build();
        bot.add(low);
        bot.add(mid);
        bot.add(high);
        bot.build().unwrap();
        assert_eq!(message_handler_names(&bot), vec!["high", "mid", "low"]);
    }

    #[test]
    fn add_order_chains_pairwise_constraints() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let a = noop_message_handler("a");
        let b = noop_message_handler("b");
        let c = noop_message_handler("c");
        bot.add(c.clone());
        bot.add(b.clone());
        bot.add(a.clone());
        bot.add_order(&[a, b, c]);
        bot.build().unwrap();
        assert_eq!(message_handler_names(&bot), vec!["a", "b", "c"]);
    }

    #[test]
    fn cyclic_ordering_refuses_to_build() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let a = noop_message_handler("a");
        let b = noop_message_handler("b");
        let c = noop_message_handler("c");
        bot.add(a.clone());
        bot.add(b.clone());
        bot.add(c.clone());
        bot.add_order(&[a.clone(), b.clone()]);
        bot.add_order(&[b, c.clone()]);
        bot.add_order(&[c, a]);
        assert!(matches!(bot.build(), Err(Error::Contract(_))));
    }

    #[test]
    fn default_exception_handler_goes_last() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        bot.add(noop_exception_handler("user_a"));
        bot.add(noop_exception_handler("user_b"));
        bot.build().unwrap();
        let names = exception_handler_names(&bot);
        assert_eq!(names.len(), 3);
        assert_eq!(names.last().unwrap(), "default_exception_handler");
        assert!(names.contains(&"user_a".to_string()));
        assert!(names.contains(&"user_b".to_string()));
    }

    #[test]
    fn peer_placed_after_the_default_stays_after_it() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let late = noop_exception_handler("late");
        let early = noop_exception_handler("early");
        bot.add(late.clone());
        bot.add(early);
        bot.add_order(&[bot.default_exception_handler().clone(), late]);
        bot.build().unwrap();
        assert_eq!(
            exception_handler_names(&bot),
            vec!["early", "default_exception_handler", "late"]
        );
    }

    #[test]
    fn build_is_repeatable() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        bot.add(noop_message_handler("h"));
        bot.build().unwrap();
        bot.build().unwrap();
        assert_eq!(message_handler_names(&bot), vec!["h"]);
    }

    #[tokio::test]
    async fn tracked_tasks_remove_themselves() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = bot.create_task(async move {
            let _ = rx.await;
        });
        assert_eq!(bot.tracked_tasks(), 1);
        tx.send(()).unwrap();
        handle.await.unwrap();
        assert_eq!(bot.tracked_tasks(), 0);
    }
}
