// Routers select at most one handler for a datum.
//
// The type router walks the datum's kind ancestry from most-specific to
// most-general and picks the first handler (in sorted order) whose filters
// all pass. The bot consults its routers in order and stops at the first
// that yields a handler.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::Result;
use crate::framework::handler::{Domain, EventDomain, ExceptionDomain, Handler, MessageDomain};

/// A router for one category. `build` is called with the sorted handler
/// sequence every time the bot builds; `route` must not mutate state.
#[async_trait]
pub trait Router<D: Domain>: Send + Sync {
    /// Rebuilds the routing state from the given ordered handler sequence.
    fn build(&self, handlers: &[Handler<D>]);

    /// Drops all routing state.
    fn clear(&self);

    /// Picks a handler for the context, or `None`.
    async fn route(&self, context: &Arc<D::Context>) -> Result<Option<Handler<D>>>;

    /// Routers this one must be consulted before.
    fn before(&self) -> Vec<RouterRef<D>> {
        Vec::new()
    }

    /// Routers this one must be consulted after.
    fn after(&self) -> Vec<RouterRef<D>> {
        Vec::new()
    }
}

pub type RouterRef<D> = Arc<dyn Router<D>>;
pub type MessageRouter = RouterRef<MessageDomain>;
pub type EventRouter = RouterRef<EventDomain>;
pub type ExceptionRouter = RouterRef<ExceptionDomain>;

pub(crate) fn router_identity<D: Domain>(router: &RouterRef<D>) -> usize {
    Arc::as_ptr(router) as *const () as usize
}

/// The built-in router: maps each dispatched kind to the handlers
/// registered for it, in sorted order.
pub struct TypeRouter<D: Domain> {
    table: Mutex<HashMap<D::Kind, Vec<Handler<D>>>>,
    before: Vec<RouterRef<D>>,
    after: Vec<RouterRef<D>>,
}

impl<D: Domain> TypeRouter<D> {
    pub fn new() -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    /// A type router with ordering constraints against other routers.
    pub fn with_order(before: Vec<RouterRef<D>>, after: Vec<RouterRef<D>>) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            before,
            after,
        }
    }
}

impl<D: Domain> Default for TypeRouter<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<D: Domain> Router<D> for TypeRouter<D> {
    fn build(&self, handlers: &[Handler<D>]) {
        let mut table: HashMap<D::Kind, Vec<Handler<D>>> = HashMap::new();
        for handler in handlers {
            for kind in handler.kinds() {
                table.entry(*kind).or_default().push(handler.clone());
            }
        }
        *self.table.lock() = table;
    }

    fn clear(&self) {
        self.table.lock().clear();
    }

    async fn route(&self, context: &Arc<D::Context>) -> Result<Option<Handler<D>>> {
        for kind in D::ancestry(context) {
            let candidates = self.table.lock().get(&kind).cloned().unwrap_or_default();
            for handler in candidates {
                if handler.can_handle(context).await? {
                    return Ok(Some(handler));
                }
            }
        }
        Ok(None)
    }

    fn before(&self) -> Vec<RouterRef<D>> {
        self.before.clone()
    }

    fn after(&self) -> Vec<RouterRef<D>> {
        self.after.clone()
    }
}
