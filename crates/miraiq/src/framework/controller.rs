// Controller binding: handlers declared as methods on a stateful aggregate.
//
// A handler method is a descriptor shared by every instance of its class.
// Dereferencing it through an instance materialises a per-instance bound
// copy: the receiver is bound into the callback, method filters/resolvers
// are bound, and neighbour descriptors of the same class are replaced by
// their instance-bound handlers. The bound copy is cached on the instance,
// so repeated accesses return the identical record.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::framework::handler::{
    ArgValue, Args, BoxFuture, Callback, Domain, EventDomain, EventHandler, ExceptionDomain,
    ExceptionHandler, Filter, FromContextOf, Handler, MessageDomain, MessageHandler, Reply,
    Resolver,
};
use crate::framework::regex::RegexGate;

/// A handler of any category.
#[derive(Clone)]
pub enum AnyHandler {
    Message(MessageHandler),
    Event(EventHandler),
    Exception(ExceptionHandler),
}

impl AnyHandler {
    pub fn name(&self) -> &str {
        match self {
            AnyHandler::Message(h) => h.name(),
            AnyHandler::Event(h) => h.name(),
            AnyHandler::Exception(h) => h.name(),
        }
    }
}

impl fmt::Debug for AnyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnyHandler({})", self.name())
    }
}

/// Category glue: wraps/unwraps a domain's handler in [`AnyHandler`].
pub trait HandlerCategory: Domain {
    fn wrap(handler: Handler<Self>) -> AnyHandler;
    fn unwrap(any: &AnyHandler) -> Option<Handler<Self>>;
}

impl HandlerCategory for MessageDomain {
    fn wrap(handler: MessageHandler) -> AnyHandler {
        AnyHandler::Message(handler)
    }

    fn unwrap(any: &AnyHandler) -> Option<MessageHandler> {
        match any {
            AnyHandler::Message(h) => Some(h.clone()),
            _ => None,
        }
    }
}

impl HandlerCategory for EventDomain {
    fn wrap(handler: EventHandler) -> AnyHandler {
        AnyHandler::Event(handler)
    }

    fn unwrap(any: &AnyHandler) -> Option<EventHandler> {
        match any {
            AnyHandler::Event(h) => Some(h.clone()),
            _ => None,
        }
    }
}

impl HandlerCategory for ExceptionDomain {
    fn wrap(handler: ExceptionHandler) -> AnyHandler {
        AnyHandler::Exception(handler)
    }

    fn unwrap(any: &AnyHandler) -> Option<ExceptionHandler> {
        match any {
            AnyHandler::Exception(h) => Some(h.clone()),
            _ => None,
        }
    }
}

/// Per-instance cache of bound handlers, keyed by descriptor identity.
/// Every controller owns one.
#[derive(Default)]
pub struct BoundHandlers {
    map: Mutex<HashMap<usize, AnyHandler>>,
}

impl BoundHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    fn get<D: HandlerCategory>(&self, key: usize) -> Option<Handler<D>> {
        self.map.lock().get(&key).and_then(D::unwrap)
    }

    fn insert<D: HandlerCategory>(&self, key: usize, handler: Handler<D>) {
        self.map.lock().insert(key, D::wrap(handler));
    }
}

/// A user-defined aggregate carrying handler declarations.
///
/// `entries` enumerates the class's declarations (the class-attribute
/// scan); `handlers` dereferences each through the instance to obtain
/// bound handlers, skipping names that start with `_`.
pub trait Controller: Send + Sync + 'static {
    /// The instance's bound-handler cache. Typically a field:
    /// `fn bound_handlers(&self) -> &BoundHandlers { &self.bound }`
    fn bound_handlers(&self) -> &BoundHandlers;

    /// The class's handler declarations, in declaration order.
    fn entries() -> Vec<ControllerEntry<Self>>
    where
        Self: Sized;

    /// Bound handlers of this instance. Identical records are returned on
    /// every call for the same instance.
    fn handlers(self: &Arc<Self>) -> Result<Vec<AnyHandler>>
    where
        Self: Sized,
    {
        let mut out = Vec::new();
        for entry in Self::entries() {
            if entry.name().starts_with('_') {
                continue;
            }
            out.push(entry.bind(self)?);
        }
        Ok(out)
    }
}

type MethodCallback<C> = Arc<dyn Fn(Arc<C>, Args) -> BoxFuture<Result<Reply>> + Send + Sync>;
type MethodFilterFn<C, Ctx> = Arc<dyn Fn(Arc<C>, Arc<Ctx>) -> BoxFuture<Result<bool>> + Send + Sync>;
type MethodResolverFn<C, Ctx> =
    Arc<dyn Fn(Arc<C>, Arc<Ctx>) -> BoxFuture<Result<ArgValue>> + Send + Sync>;

enum MethodFilter<C, D: Domain> {
    /// Takes the receiver; bound at bind time
    Method(MethodFilterFn<C, D::Context>),
    /// Kept as-is
    Free(Filter<D::Context>),
}

enum MethodResolver<C, D: Domain> {
    Method(MethodResolverFn<C, D::Context>),
    Free(Resolver<D::Context>),
}

/// A neighbour named in a descriptor's `before`/`after` list: either an
/// already-built handler (kept as-is) or another descriptor (replaced by
/// its instance-bound version at bind time).
enum Neighbour<D: Domain> {
    Method(Arc<dyn BindableMethod<D>>),
    Handler(Handler<D>),
}

/// Type-erased view of a handler method descriptor, so neighbour lists can
/// name descriptors of any class and the class check happens at bind time.
pub trait BindableMethod<D: Domain>: Send + Sync {
    fn method_name(&self) -> String;
    fn class_name(&self) -> &'static str;
    fn bind_dyn(&self, instance: Arc<dyn Any + Send + Sync>) -> Result<Handler<D>>;
}

struct MethodInner<C, D: Domain> {
    name: String,
    kinds: Vec<D::Kind>,
    callback: MethodCallback<C>,
    filters: Vec<MethodFilter<C, D>>,
    resolvers: Vec<(String, MethodResolver<C, D>)>,
    before: Vec<Neighbour<D>>,
    after: Vec<Neighbour<D>>,
}

/// A handler declared as a method of controller class `C`. Shared by every
/// instance of the class; [`bind`](Self::bind) yields the per-instance
/// handler.
pub struct HandlerMethod<C: Controller, D: HandlerCategory> {
    inner: Arc<MethodInner<C, D>>,
}

impl<C: Controller, D: HandlerCategory> Clone for HandlerMethod<C, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub type MessageHandlerMethod<C> = HandlerMethod<C, MessageDomain>;
pub type EventHandlerMethod<C> = HandlerMethod<C, EventDomain>;
pub type ExceptionHandlerMethod<C> = HandlerMethod<C, ExceptionDomain>;

fn short_type_name<C>() -> &'static str {
    let full = std::any::type_name::<C>();
    full.rsplit("::").next().unwrap_or(full)
}

impl<C: Controller, D: HandlerCategory> HandlerMethod<C, D> {
    /// Starts a builder around an async method callback. The first
    /// argument is the receiver.
    pub fn builder<F, Fut, R>(name: impl Into<String>, callback: F) -> HandlerMethodBuilder<C, D>
    where
        F: Fn(Arc<C>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R>> + Send + 'static,
        R: Into<Reply> + 'static,
    {
        let callback: MethodCallback<C> = Arc::new(move |instance, args| {
            let fut = callback(instance, args);
            Box::pin(async move { fut.await.map(Into::into) })
        });
        HandlerMethodBuilder {
            name: name.into(),
            callback,
            kinds: Vec::new(),
            filters: Vec::new(),
            resolvers: Vec::new(),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    fn descriptor_key(&self) -> usize {
        Arc::as_ptr(&self.inner) as *const () as usize
    }

    /// Materialises (or returns the cached) bound handler for `instance`.
    pub fn bind(&self, instance: &Arc<C>) -> Result<Handler<D>> {
        let key = self.descriptor_key();
        let cache = instance.bound_handlers();
        if let Some(handler) = cache.get::<D>(key) {
            return Ok(handler);
        }

        let callback: Callback = {
            let receiver = Arc::clone(instance);
            let callback = Arc::clone(&self.inner.callback);
            Arc::new(move |args| callback(Arc::clone(&receiver), args))
        };

        let filters: Vec<Filter<D::Context>> = self
            .inner
            .filters
            .iter()
            .map(|filter| match filter {
                MethodFilter::Free(f) => Arc::clone(f),
                MethodFilter::Method(f) => {
                    let receiver = Arc::clone(instance);
                    let f = Arc::clone(f);
                    let bound: Filter<D::Context> =
                        Arc::new(move |context| f(Arc::clone(&receiver), context));
                    bound
                }
            })
            .collect();

        let resolvers: Vec<(String, Resolver<D::Context>)> = self
            .inner
            .resolvers
            .iter()
            .map(|(name, resolver)| {
                let resolver = match resolver {
                    MethodResolver::Free(r) => Arc::clone(r),
                    MethodResolver::Method(r) => {
                        let receiver = Arc::clone(instance);
                        let r = Arc::clone(r);
                        let bound: Resolver<D::Context> =
                            Arc::new(move |context| r(Arc::clone(&receiver), context));
                        bound
                    }
                };
                (name.clone(), resolver)
            })
            .collect();

        let handler = Handler::from_parts(
            format!("{}::{}", short_type_name::<C>(), self.inner.name),
            callback,
            self.inner.kinds.clone(),
            resolvers,
            filters,
        );
        // Cache before resolving neighbours so mutually-referencing
        // descriptors terminate.
        cache.insert::<D>(key, handler.clone());

        let before = bind_neighbours(&self.inner.before, instance)?;
        let after = bind_neighbours(&self.inner.after, instance)?;
        handler.set_neighbours(before, after);
        Ok(handler)
    }
}

fn bind_neighbours<C: Controller, D: Domain>(
    neighbours: &[Neighbour<D>],
    instance: &Arc<C>,
) -> Result<Vec<Handler<D>>> {
    neighbours
        .iter()
        .map(|neighbour| match neighbour {
            Neighbour::Handler(h) => Ok(h.clone()),
            Neighbour::Method(m) => {
                let any: Arc<dyn Any + Send + Sync> = Arc::clone(instance) as Arc<dyn Any + Send + Sync>;
                m.bind_dyn(any)
            }
        })
        .collect()
}

impl<C: Controller, D: HandlerCategory> BindableMethod<D> for HandlerMethod<C, D> {
    fn method_name(&self) -> String {
        self.inner.name.clone()
    }

    fn class_name(&self) -> &'static str {
        std::any::type_name::<C>()
    }

    fn bind_dyn(&self, instance: Arc<dyn Any + Send + Sync>) -> Result<Handler<D>> {
        let instance = instance.downcast::<C>().map_err(|_| {
            Error::Contract(format!(
                "handler method '{}' is declared on {}, not on the class being bound",
                self.inner.name,
                self.class_name(),
            ))
        })?;
        self.bind(&instance)
    }
}

/// Builder for [`HandlerMethod`].
pub struct HandlerMethodBuilder<C: Controller, D: HandlerCategory> {
    name: String,
    callback: MethodCallback<C>,
    kinds: Vec<D::Kind>,
    filters: Vec<MethodFilter<C, D>>,
    resolvers: Vec<(String, MethodResolver<C, D>)>,
    before: Vec<Neighbour<D>>,
    after: Vec<Neighbour<D>>,
}

impl<C: Controller, D: HandlerCategory> HandlerMethodBuilder<C, D> {
    pub fn kind(mut self, kind: D::Kind) -> Self {
        self.kinds.push(kind);
        self
    }

    pub fn kinds(mut self, kinds: impl IntoIterator<Item = D::Kind>) -> Self {
        self.kinds.extend(kinds);
        self
    }

    /// Appends a free filter; kept as-is at bind time.
    pub fn filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&D::Context) -> bool + Send + Sync + 'static,
    {
        let filter: Filter<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let pass = filter(&context);
            Box::pin(async move { Ok(pass) })
        });
        self.filters.push(MethodFilter::Free(filter));
        self
    }

    /// Appends a filter that is a method of the class; the receiver is
    /// bound per instance.
    pub fn method_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&C, &D::Context) -> bool + Send + Sync + 'static,
    {
        let filter: MethodFilterFn<C, D::Context> =
            Arc::new(move |instance: Arc<C>, context: Arc<D::Context>| {
                let pass = filter(&instance, &context);
                Box::pin(async move { Ok(pass) })
            });
        self.filters.push(MethodFilter::Method(filter));
        self
    }

    /// Pairs a parameter with a free resolver.
    pub fn resolver<F, T>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&D::Context) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let resolver: Resolver<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let out = resolver(&context).map(|value| Box::new(value) as ArgValue);
            Box::pin(async move { out })
        });
        self.resolvers.push((name.into(), MethodResolver::Free(resolver)));
        self
    }

    /// Pairs a parameter with a resolver that is a method of the class.
    pub fn method_resolver<F, T>(mut self, name: impl Into<String>, resolver: F) -> Self
    where
        F: Fn(&C, &D::Context) -> Result<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let resolver: MethodResolverFn<C, D::Context> =
            Arc::new(move |instance: Arc<C>, context: Arc<D::Context>| {
                let out = resolver(&instance, &context).map(|value| Box::new(value) as ArgValue);
                Box::pin(async move { out })
            });
        self.resolvers
            .push((name.into(), MethodResolver::Method(resolver)));
        self
    }

    /// Binds a parameter to a type's context-extraction method.
    pub fn param<T: FromContextOf<D>>(mut self, name: impl Into<String>) -> Self {
        let resolver: Resolver<D::Context> = Arc::new(move |context: Arc<D::Context>| {
            let out = T::extract(&context).map(|value| Box::new(value) as ArgValue);
            Box::pin(async move { out })
        });
        self.resolvers.push((name.into(), MethodResolver::Free(resolver)));
        self
    }

    /// Runs before an already-built handler.
    pub fn before(mut self, other: &Handler<D>) -> Self {
        self.before.push(Neighbour::Handler(other.clone()));
        self
    }

    /// Runs after an already-built handler.
    pub fn after(mut self, other: &Handler<D>) -> Self {
        self.after.push(Neighbour::Handler(other.clone()));
        self
    }

    /// Runs before another handler method. The neighbour must belong to
    /// the same class as this one; binding against a foreign class is a
    /// contract error.
    pub fn before_method<C2: Controller>(mut self, other: &HandlerMethod<C2, D>) -> Self {
        self.before.push(Neighbour::Method(Arc::new(other.clone())));
        self
    }

    /// Runs after another handler method.
    pub fn after_method<C2: Controller>(mut self, other: &HandlerMethod<C2, D>) -> Self {
        self.after.push(Neighbour::Method(Arc::new(other.clone())));
        self
    }

    /// Attaches a regex gate (free filter + capture-group resolvers).
    pub fn regex(mut self, gate: RegexGate) -> Self {
        let mut filters = Vec::new();
        let mut resolvers = Vec::new();
        gate.attach(&mut filters, &mut resolvers);
        self.filters.extend(filters.into_iter().map(MethodFilter::Free));
        self.resolvers.extend(
            resolvers
                .into_iter()
                .map(|(name, resolver)| (name, MethodResolver::Free(resolver))),
        );
        self
    }

    pub fn build(self) -> HandlerMethod<C, D> {
        HandlerMethod {
            inner: Arc::new(MethodInner {
                name: self.name,
                kinds: self.kinds,
                callback: self.callback,
                filters: self.filters,
                resolvers: self.resolvers,
                before: self.before,
                after: self.after,
            }),
        }
    }
}

struct PropertyInner<C, D: Domain> {
    name: String,
    factory: Box<dyn Fn(&Arc<C>) -> Handler<D> + Send + Sync>,
}

/// A handler declared through a factory method: the factory runs once per
/// instance and its result is cached, so subsequent accesses return the
/// same record.
pub struct HandlerProperty<C: Controller, D: HandlerCategory> {
    inner: Arc<PropertyInner<C, D>>,
}

impl<C: Controller, D: HandlerCategory> Clone for HandlerProperty<C, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Controller, D: HandlerCategory> HandlerProperty<C, D> {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Arc<C>) -> Handler<D> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(PropertyInner {
                name: name.into(),
                factory: Box::new(factory),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The instance's handler, built on first access.
    pub fn get(&self, instance: &Arc<C>) -> Handler<D> {
        let key = Arc::as_ptr(&self.inner) as *const () as usize;
        let cache = instance.bound_handlers();
        if let Some(handler) = cache.get::<D>(key) {
            return handler;
        }
        let handler = (self.inner.factory)(instance);
        cache.insert::<D>(key, handler.clone());
        handler
    }
}

/// One handler declaration of a controller class.
pub enum ControllerEntry<C: Controller> {
    MessageMethod(HandlerMethod<C, MessageDomain>),
    EventMethod(HandlerMethod<C, EventDomain>),
    ExceptionMethod(HandlerMethod<C, ExceptionDomain>),
    MessageProperty(HandlerProperty<C, MessageDomain>),
    EventProperty(HandlerProperty<C, EventDomain>),
    ExceptionProperty(HandlerProperty<C, ExceptionDomain>),
}

impl<C: Controller> ControllerEntry<C> {
    pub fn name(&self) -> &str {
        match self {
            ControllerEntry::MessageMethod(m) => m.name(),
            ControllerEntry::EventMethod(m) => m.name(),
            ControllerEntry::ExceptionMethod(m) => m.name(),
            ControllerEntry::MessageProperty(p) => p.name(),
            ControllerEntry::EventProperty(p) => p.name(),
            ControllerEntry::ExceptionProperty(p) => p.name(),
        }
    }

    /// Dereferences the declaration through the instance.
    pub fn bind(&self, instance: &Arc<C>) -> Result<AnyHandler> {
        match self {
            ControllerEntry::MessageMethod(m) => m.bind(instance).map(AnyHandler::Message),
            ControllerEntry::EventMethod(m) => m.bind(instance).map(AnyHandler::Event),
            ControllerEntry::ExceptionMethod(m) => m.bind(instance).map(AnyHandler::Exception),
            ControllerEntry::MessageProperty(p) => Ok(AnyHandler::Message(p.get(instance))),
            ControllerEntry::EventProperty(p) => Ok(AnyHandler::Event(p.get(instance))),
            ControllerEntry::ExceptionProperty(p) => Ok(AnyHandler::Exception(p.get(instance))),
        }
    }
}

impl<C: Controller> From<HandlerMethod<C, MessageDomain>> for ControllerEntry<C> {
    fn from(method: HandlerMethod<C, MessageDomain>) -> Self {
        ControllerEntry::MessageMethod(method)
    }
}

impl<C: Controller> From<HandlerMethod<C, EventDomain>> for ControllerEntry<C> {
    fn from(method: HandlerMethod<C, EventDomain>) -> Self {
        ControllerEntry::EventMethod(method)
    }
}

impl<C: Controller> From<HandlerMethod<C, ExceptionDomain>> for ControllerEntry<C> {
    fn from(method: HandlerMethod<C, ExceptionDomain>) -> Self {
        ControllerEntry::ExceptionMethod(method)
    }
}

impl<C: Controller> From<HandlerProperty<C, MessageDomain>> for ControllerEntry<C> {
    fn from(property: HandlerProperty<C, MessageDomain>) -> Self {
        ControllerEntry::MessageProperty(property)
    }
}

impl<C: Controller> From<HandlerProperty<C, EventDomain>> for ControllerEntry<C> {
    fn from(property: HandlerProperty<C, EventDomain>) -> Self {
        ControllerEntry::EventProperty(property)
    }
}

impl<C: Controller> From<HandlerProperty<C, ExceptionDomain>> for ControllerEntry<C> {
    fn from(property: HandlerProperty<C, ExceptionDomain>) -> Self {
        ControllerEntry::ExceptionProperty(property)
    }
}
