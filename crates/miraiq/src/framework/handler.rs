// Handler records: the bundle (callback, kinds, resolvers, filters,
// ordering neighbours) the router selects and the dispatcher invokes.
//
// Rust has no runtime reflection, so the parameter-resolution contract is
// a builder API: each parameter name is paired with its resolver
// explicitly, either as a closure or through the `FromRecvContext` /
// `FromExceptionContext` extraction traits.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use crate::entities::{
    Event, EventKind, Message, MessageChain, MessageKind, RecvData, SyncMessage,
};
use crate::error::{ApiError, ApiErrorKind, Error, Result};
use crate::framework::bot::Bot;
use crate::framework::context::{ContextView, ExceptionContext, RecvContext};
use crate::framework::regex::RegexGate;

pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// A resolved handler argument.
pub type ArgValue = Box<dyn Any + Send>;

pub type Callback = Arc<dyn Fn(Args) -> BoxFuture<Result<Reply>> + Send + Sync>;
pub type Filter<C> = Arc<dyn Fn(Arc<C>) -> BoxFuture<Result<bool>> + Send + Sync>;
pub type Resolver<C> = Arc<dyn Fn(Arc<C>) -> BoxFuture<Result<ArgValue>> + Send + Sync>;

/// Routing kind of a dispatch failure. A typed gateway error matches its
/// own code, `AnyApi` and `Any`; everything else only matches `Any`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Api(ApiErrorKind),
    /// Any typed gateway error
    AnyApi,
    /// Any failure at all
    Any,
}

/// A routing category: the datum kind lattice plus the context type the
/// category's handlers receive.
pub trait Domain: Send + Sync + Sized + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Context: ContextView + Send + Sync + 'static;

    /// Kinds the context's datum matches, most specific first. Empty when
    /// the datum is not routable in this domain.
    fn ancestry(context: &Self::Context) -> Vec<Self::Kind>;
}

pub struct MessageDomain;

impl Domain for MessageDomain {
    type Kind = MessageKind;
    type Context = RecvContext;

    fn ancestry(context: &RecvContext) -> Vec<MessageKind> {
        match &context.data {
            RecvData::Message(m) => vec![m.kind(), MessageKind::Any],
            _ => vec![],
        }
    }
}

pub struct EventDomain;

impl Domain for EventDomain {
    type Kind = EventKind;
    type Context = RecvContext;

    fn ancestry(context: &RecvContext) -> Vec<EventKind> {
        match &context.data {
            RecvData::Event(e) => vec![e.kind(), EventKind::Any],
            _ => vec![],
        }
    }
}

pub struct ExceptionDomain;

impl Domain for ExceptionDomain {
    type Kind = ExceptionKind;
    type Context = ExceptionContext;

    fn ancestry(context: &ExceptionContext) -> Vec<ExceptionKind> {
        match &context.error {
            Error::Api(e) => vec![
                ExceptionKind::Api(e.kind),
                ExceptionKind::AnyApi,
                ExceptionKind::Any,
            ],
            _ => vec![ExceptionKind::Any],
        }
    }
}

pub type MessageHandler = Handler<MessageDomain>;
pub type EventHandler = Handler<EventDomain>;
pub type ExceptionHandler = Handler<ExceptionDomain>;

/// The keyword-argument bag a callback receives: one entry per resolver.
#[derive(Default)]
pub struct Args {
    values: HashMap<String, ArgValue>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ArgValue) {
        self.values.insert(name.into(), value);
    }

    pub fn insert_value<T: Send + 'static>(&mut self, name: impl Into<String>, value: T) {
        self.insert(name, Box::new(value));
    }

    /// Removes and downcasts the named argument.
    pub fn take<T: 'static>(&mut self, name: &str) -> Result<T> {
        let value = self
            .values
            .remove(name)
            .ok_or_else(|| Error::Resolve(format!("missing argument '{name}'")))?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| Error::Resolve(format!("argument '{name}' has an unexpected type")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// What a callback hands back: nothing, bare text, or a full chain.
pub enum Reply {
    Nothing,
    Text(String),
    Chain(MessageChain),
}

impl Reply {
    /// Normalises the reply: text becomes a chain of one plain element.
    pub fn into_chain(self) -> Option<MessageChain> {
        match self {
            Reply::Nothing => None,
            Reply::Text(text) => Some(MessageChain::plain(text)),
            Reply::Chain(chain) => Some(chain),
        }
    }
}

impl From<()> for Reply {
    fn from((): ()) -> Self {
        Reply::Nothing
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Text(text.to_string())
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Text(text)
    }
}

impl From<MessageChain> for Reply {
    fn from(chain: MessageChain) -> Self {
        Reply::Chain(chain)
    }
}

impl From<Option<String>> for Reply {
    fn from(text: Option<String>) -> Self {
        match text {
            Some(text) => Reply::Text(text),
            None => Reply::Nothing,
        }
    }
}

impl From<Option<MessageChain>> for Reply {
    fn from(chain: Option<MessageChain>) -> Self {
        match chain {
            Some(chain) => Reply::Chain(chain),
            None => Reply::Nothing,
        }
    }
}

struct Neighbours<D: Domain> {
    before: Vec<Handler<D>>,
    after: Vec<Handler<D>>,
}

struct HandlerInner<D: Domain> {
    name: String,
    kinds: Vec<D::Kind>,
    callback: Callback,
    resolvers: Vec<(String, Resolver<D::Context>)>,
    filters: Vec<Filter<D::Context>>,
    // Set once at build (or bind) time; a cell so that mutually-referencing
    // bound copies can be cached before their neighbour lists are resolved.
    neighbours: OnceLock<Neighbours<D>>,
}

/// A shared handle to one handler record. Clones share identity; the
/// router, ordering engine and dispatcher all hold the same record.
pub struct Handler<D: Domain> {
    inner: Arc<HandlerInner<D>>,
}

impl<D: Domain> Clone for Handler<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<D: Domain> fmt::Debug for Handler<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.inner.name)
            .field("kinds", &self.inner.kinds)
            .finish()
    }
}

impl<D: Domain> Handler<D> {
    /// Starts a builder around an async callback.
    pub fn builder<F, Fut, R>(name: impl Into<String>, callback: F) -> HandlerBuilder<D>
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        let callback: Callback = Arc::new(move |args| {
            let fut = callback(args);
            Box::pin(async move { fut.await.map(Into::into) })
        });
        HandlerBuilder::from_callback(name.into(), callback)
    }

    /// Starts a builder around a synchronous callback; it is lifted to
    /// async internally.
    pub fn builder_sync<F, R>(name: impl Into<String>, callback: F) -> HandlerBuilder<D>
    where
        F: Fn(Args) -> Result<R> + Send + Sync + 'static,
        R: Into<Reply> + 'static,
    {
        let callback: Callback = Arc::new(move |args| {
            let out = callback(args).map(Into::into);
            Box::pin(async move { out })
        });
        HandlerBuilder::from_callback(name.into(), callback)
    }

    pub(crate) fn from_parts(
        name: String,
        callback: Callback,
        kinds: Vec<D::Kind>,
        resolvers: Vec<(String, Resolver<D::Context>)>,
        filters: Vec<Filter<D::Context>>,
    ) -> Self {
        Self {
            inner: Arc::new(HandlerInner {
                name,
                kinds,
                callback,
                resolvers,
                filters,
                neighbours: OnceLock::new(),
            }),
        }
    }

    pub(crate) fn set_neighbours(&self, before: Vec<Handler<D>>, after: Vec<Handler<D>>) {
        let _ = self.inner.neighbours.set(Neighbours { before, after });
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn kinds(&self) -> &[D::Kind] {
        &self.inner.kinds
    }

    /// Handlers this one must run before.
    pub fn before(&self) -> Vec<Handler<D>> {
        self.inner
            .neighbours
            .get()
            .map(|n| n.before.clone())
            .unwrap_or_default()
    }

    /// Handlers this one must run after.
    pub fn after(&self) -> Vec<Handler<D>> {
        self.inner
            .neighbours
            .get()
            .map(|n| n.after.clone())
            .unwrap_or_default()
    }

    /// Whether two handles refer to the same record.
    pub fn same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }

    /// Evaluates the filters in declaration order; the first one that
    /// fails stops evaluation.
    pub async fn can_handle(&self, context: &Arc<D::Context>) -> Result<bool> {
        for filter in &self.inner.filters {
            if !filter(Arc::clone(context)).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolves every declared argument, invokes the callback, and
    /// normalises the reply.
    pub async fn handle(&self, context: &Arc<D::Context>) -> Result<Option<MessageChain>> {
        let mut args = Args::new();
        for (name, resolver) in &self.inner.resolvers {
            args.insert(name.clone(), resolver(Arc::clone(context)).await?);
        }
        Ok((self.inner.callback)(args).await?.into_chain())
    }
}

/// Builder for [`Handler`]. Kinds, filters, resolvers and ordering
/// neighbours are collected in declaration order.
pub struct HandlerBuilder<D: Domain> {
    name: String,
    callback: Callback,
    kinds: Vec<D::Kind>,
    resolvers: Vec<(String, Resolver<D::Context>)>,
    filters: Vec<Filter<D::Context>>,
    before: Vec<Handler<D>>,
    after: Vec<Handler<D>>,
}

impl<D: Domain> HandlerBuilder<D> {
    pub(crate) fn from_callback(name: String, callback: Callback) -> Self {
        Self {
            name,
            callback,
            kinds: Vec::new(),
            resolvers: Vec::new(),
            filters: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// Adds a dispatched kind. A handler needs at least one.
    pub fn kind(mut self, kind: D::Kind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = D::Kind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Appends a synchronous filter predicate.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&D::Context) -> bool + Send + Sync + 'static,
    {
        let filter: Filter<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let pass = filter(&context);
            Box::pin(async move { Ok(pass) })
        });
        self.filters.push(filter);
        self
    }

    /// Appends an async filter predicate.
    pub fn filter_async<F, Fut>(mut self, filter: F) -> Self
    where
        F: Fn(Arc<D::Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool>> + Send + 'static,
    {
        self.filters
            .push(Arc::new(move |context| Box::pin(filter(context))));
        self
    }

    /// Pairs a parameter name with a synchronous resolver.
    pub fn resolver<F, T>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&D::Context) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let resolver: Resolver<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let out = resolver(&context).map(|value| Box::new(value) as ArgValue);
            Box::pin(async move { out })
        });
        self.resolvers.push((name.into(), resolver));
        self
    }

    /// Pairs a parameter name with an async resolver.
    pub fn resolver_async<F, Fut, T>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(Arc<D::Context>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let resolver: Resolver<D::Context> = Arc::new(move |context| {
            let fut = resolver(context);
            Box::pin(async move { fut.await.map(|value| Box::new(value) as ArgValue) })
        });
        self.resolvers.push((name.into(), resolver));
        self
    }

    /// Binds a parameter to a type's context-extraction method.
    pub fn param<T: FromContextOf<D>>(mut self, name: impl Into<String>) -> Self {
        let resolver: Resolver<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let out = T::extract(&context).map(|value| Box::new(value) as ArgValue);
            Box::pin(async move { out })
        });
        self.resolvers.push((name.into(), resolver));
        self
    }

    /// Declares that this handler runs before `other`.
    pub fn before(mut self, other: &Handler<D>) -> Self {
        self.before.push(other.clone());
        self
    }

    /// Declares that this handler runs after `other`.
    pub fn after(mut self, other: &Handler<D>) -> Self {
        self.after.push(other.clone());
        self
    }

    /// Attaches a regex gate: one pattern filter plus a resolver per named
    /// capture group (and optionally the whole match).
    pub fn regex(mut self, gate: RegexGate) -> Self {
        gate.attach(&mut self.filters, &mut self.resolvers);
        self
    }

    pub fn build(self) -> Handler<D> {
        let handler =
            Handler::from_parts(self.name, self.callback, self.kinds, self.resolvers, self.filters);
        handler.set_neighbours(self.before, self.after);
        handler
    }
}

/// A message or event handler, as tracked by the exception context.
#[derive(Clone)]
pub enum RecvHandler {
    Message(MessageHandler),
    Event(EventHandler),
}

impl RecvHandler {
    pub fn name(&self) -> &str {
        match self {
            RecvHandler::Message(h) => h.name(),
            RecvHandler::Event(h) => h.name(),
        }
    }

    pub async fn handle(&self, context: &Arc<RecvContext>) -> Result<Option<MessageChain>> {
        match self {
            RecvHandler::Message(h) => h.handle(context).await,
            RecvHandler::Event(h) => h.handle(context).await,
        }
    }
}

impl fmt::Debug for RecvHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecvHandler({})", self.name())
    }
}

/// Types that can be pulled out of a receive context. The builder's
/// [`param`](HandlerBuilder::param) binds a parameter to this extraction.
pub trait FromRecvContext: Sized + Send + 'static {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self>;
}

/// Types that can be pulled out of an exception context.
pub trait FromExceptionContext: Sized + Send + 'static {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self>;
}

/// Domain-generic extraction, so `param` works in every category.
pub trait FromContextOf<D: Domain>: Sized + Send + 'static {
    fn extract(context: &Arc<D::Context>) -> Result<Self>;
}

impl<T: FromRecvContext> FromContextOf<MessageDomain> for T {
    fn extract(context: &Arc<RecvContext>) -> Result<Self> {
        T::from_recv_context(context)
    }
}

impl<T: FromRecvContext> FromContextOf<EventDomain> for T {
    fn extract(context: &Arc<RecvContext>) -> Result<Self> {
        T::from_recv_context(context)
    }
}

impl<T: FromExceptionContext> FromContextOf<ExceptionDomain> for T {
    fn extract(context: &Arc<ExceptionContext>) -> Result<Self> {
        T::from_exception_context(context)
    }
}

impl FromRecvContext for Bot {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        Ok(context.bot.clone())
    }
}

impl FromRecvContext for Arc<RecvContext> {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        Ok(Arc::clone(context))
    }
}

impl FromRecvContext for RecvData {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        Ok(context.data.clone())
    }
}

impl FromRecvContext for MessageChain {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        context.message_chain()
    }
}

impl FromRecvContext for Message {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        match &context.data {
            RecvData::Message(m) => Ok(m.clone()),
            _ => Err(Error::Resolve("received data is not a message".into())),
        }
    }
}

impl FromRecvContext for Event {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        match &context.data {
            RecvData::Event(e) => Ok(e.clone()),
            _ => Err(Error::Resolve("received data is not an event".into())),
        }
    }
}

impl FromRecvContext for SyncMessage {
    fn from_recv_context(context: &Arc<RecvContext>) -> Result<Self> {
        match &context.data {
            RecvData::SyncMessage(m) => Ok(m.clone()),
            _ => Err(Error::Resolve("received data is not a sync message".into())),
        }
    }
}

impl FromExceptionContext for Bot {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        Ok(context.bot.clone())
    }
}

impl FromExceptionContext for Arc<ExceptionContext> {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        Ok(Arc::clone(context))
    }
}

impl FromExceptionContext for Arc<RecvContext> {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        Ok(Arc::clone(&context.context))
    }
}

impl FromExceptionContext for RecvData {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        Ok(context.context.data.clone())
    }
}

impl FromExceptionContext for MessageChain {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        context.message_chain()
    }
}

impl FromExceptionContext for Error {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        Ok(context.error.clone())
    }
}

impl FromExceptionContext for ApiError {
    fn from_exception_context(context: &Arc<ExceptionContext>) -> Result<Self> {
        match &context.error {
            Error::Api(e) => Ok(e.clone()),
            other => Err(Error::Resolve(format!(
                "the exception is not a gateway error: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::ApiConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn test_context(text: &str) -> Arc<RecvContext> {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let data = RecvData::Message(Message::FriendMessage(crate::entities::FriendMessage {
            sender: crate::entities::Friend {
                id: 9,
                nickname: "n".into(),
                remark: String::new(),
            },
            message_chain: MessageChain::plain(text),
        }));
        Arc::new(RecvContext::new(bot, data))
    }

    #[tokio::test]
    async fn string_reply_becomes_single_plain_chain() {
        let handler = MessageHandler::builder("greet", |_args| async { Ok("hello") })
            .kind(MessageKind::Any)
            .build();
        let chain = handler.handle(&test_context("hi")).await.unwrap().unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.to_string(), "hello");
    }

    #[tokio::test]
    async fn unit_reply_is_absent() {
        let handler = MessageHandler::builder("quiet", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .build();
        assert!(handler.handle(&test_context("hi")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn filters_short_circuit_in_declaration_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let first = Arc::clone(&calls);
        let second = Arc::clone(&calls);
        let handler = MessageHandler::builder("guarded", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .filter(move |_ctx| {
                first.fetch_add(1, Ordering::SeqCst);
                false
            })
            .filter(move |_ctx| {
                second.fetch_add(100, Ordering::SeqCst);
                true
            })
            .build();
        assert!(!handler.can_handle(&test_context("hi")).await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn resolvers_feed_the_callback() {
        let handler = MessageHandler::builder("echo", |mut args: Args| async move {
            let chain: MessageChain = args.take("chain")?;
            let who: i64 = args.take("who")?;
            Ok(format!("{who}: {chain}"))
        })
        .kind(MessageKind::Friend)
        .param::<MessageChain>("chain")
        .resolver("who", |ctx: &RecvContext| match &ctx.data {
            RecvData::Message(m) => Ok(m.sender_id()),
            _ => Err(Error::Resolve("not a message".into())),
        })
        .build();
        let chain = handler
            .handle(&test_context("ping"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(chain.to_string(), "9: ping");
    }

    #[test]
    fn clones_share_identity() {
        let handler = MessageHandler::builder("h", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .build();
        let clone = handler.clone();
        assert!(handler.same(&clone));
        let other = MessageHandler::builder("h", |_args| async { Ok(()) })
            .kind(MessageKind::Any)
            .build();
        assert!(!handler.same(&other));
    }

    #[test]
    fn exception_ancestry_distinguishes_api_errors() {
        let bot = Bot::new(ApiConfig::new(1, "key"));
        let recv = Arc::new(RecvContext::new(
            bot,
            RecvData::Unsupported(serde_json::json!({})),
        ));
        let api = ExceptionContext::new(
            Error::Api(ApiError::from_response(serde_json::json!({"code": 5}))),
            Arc::clone(&recv),
            None,
        );
        assert_eq!(
            ExceptionDomain::ancestry(&api),
            vec![
                ExceptionKind::Api(ApiErrorKind::TargetNotExist),
                ExceptionKind::AnyApi,
                ExceptionKind::Any,
            ]
        );
        let plain = ExceptionContext::new(Error::Transport("x".into()), recv, None);
        assert_eq!(ExceptionDomain::ancestry(&plain), vec![ExceptionKind::Any]);
    }
}
