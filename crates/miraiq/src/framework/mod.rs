//! The reactive core: contexts, handler records, routers, the ordering
//! engine, controller binding and the bot itself.

pub mod bot;
pub mod context;
pub mod controller;
pub mod handler;
pub mod regex;
pub mod router;
mod sort;

pub use bot::{Bot, BotItem, Orderable};
pub use context::{ContextView, ExceptionContext, Memo, MemoKey, RecvContext};
pub use controller::{
    AnyHandler, BoundHandlers, Controller, ControllerEntry, EventHandlerMethod,
    ExceptionHandlerMethod, HandlerMethod, HandlerMethodBuilder, HandlerProperty,
    MessageHandlerMethod,
};
pub use handler::{
    Args, Domain, EventDomain, EventHandler, ExceptionDomain, ExceptionHandler, ExceptionKind,
    FromExceptionContext, FromRecvContext, Handler, HandlerBuilder, MessageDomain, MessageHandler,
    RecvHandler, Reply,
};
pub use regex::{RegexGate, RegexMatch, regex_fullmatch, regex_match, regex_search};
pub use router::{EventRouter, ExceptionRouter, MessageRouter, Router, TypeRouter};
