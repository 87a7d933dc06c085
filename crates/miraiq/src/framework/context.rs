// Per-dispatch envelopes handed to filters, resolvers and handlers.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::entities::{MessageChain, RecvData};
use crate::error::{Error, Result};
use crate::framework::bot::Bot;
use crate::framework::handler::RecvHandler;

/// An identity-unique key into a context's scratch map. Unequal to any
/// other key ever allocated (and, by construction, to any string).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoKey(u64);

impl MemoKey {
    pub fn unique() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Context-scoped scratch storage used by derived filters (e.g. the regex
/// gate) to memoise work across the can-handle → handle call pair.
#[derive(Default)]
pub struct Memo {
    slots: Mutex<HashMap<MemoKey, Arc<dyn Any + Send + Sync>>>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Send + Sync + 'static>(&self, key: MemoKey, value: T) {
        self.slots.lock().insert(key, Arc::new(value));
    }

    pub fn get<T: Send + Sync + 'static>(&self, key: MemoKey) -> Option<Arc<T>> {
        let slot = self.slots.lock().get(&key).cloned()?;
        slot.downcast().ok()
    }
}

/// One received push, on its way through the dispatch pipeline.
pub struct RecvContext {
    pub bot: Bot,
    pub data: RecvData,
    scratch: Memo,
}

impl RecvContext {
    pub fn new(bot: Bot, data: RecvData) -> Self {
        Self {
            bot,
            data,
            scratch: Memo::new(),
        }
    }
}

/// A failure inside routing or a handler, on its way to the exception
/// handlers. `handler` is absent when the failure came from routing.
pub struct ExceptionContext {
    pub bot: Bot,
    pub error: Error,
    pub context: Arc<RecvContext>,
    pub handler: Option<RecvHandler>,
    scratch: Memo,
}

impl ExceptionContext {
    pub fn new(
        error: Error,
        context: Arc<RecvContext>,
        handler: Option<RecvHandler>,
    ) -> Self {
        Self {
            bot: context.bot.clone(),
            error,
            context,
            handler,
            scratch: Memo::new(),
        }
    }
}

/// Uniform read access to the pieces of a context that built-in filters and
/// resolvers need. For an exception context the datum is the one of the
/// causal receive context.
pub trait ContextView: Send + Sync {
    fn bot(&self) -> &Bot;
    fn recv_data(&self) -> &RecvData;
    fn scratch(&self) -> &Memo;

    /// The message chain of the underlying datum; an error for data without
    /// one (events, unsupported entities).
    fn message_chain(&self) -> Result<MessageChain> {
        self.recv_data()
            .message_chain()
            .cloned()
            .ok_or_else(|| Error::Resolve("no message chain in received data".into()))
    }
}

impl ContextView for RecvContext {
    fn bot(&self) -> &Bot {
        &self.bot
    }

    fn recv_data(&self) -> &RecvData {
        &self.data
    }

    fn scratch(&self) -> &Memo {
        &self.scratch
    }
}

impl ContextView for ExceptionContext {
    fn bot(&self) -> &Bot {
        &self.bot
    }

    fn recv_data(&self) -> &RecvData {
        &self.context.data
    }

    fn scratch(&self) -> &Memo {
        &self.scratch
    }
}
