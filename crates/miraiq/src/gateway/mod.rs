//! Gateway client: the duplex websocket channel to mirai-api-http
//!
//! One long-lived connection carries both request/response traffic and
//! unsolicited pushes. [`MiraiApi`] demultiplexes them: `send_command`
//! correlates responses by id, `recv` hands out pushes in FIFO order, and
//! a connection failure is propagated to every outstanding caller.

pub mod api;
mod client;
mod tables;

pub use api::{GroupConfigUpdate, MemberInfoUpdate};
pub use client::{ApiConfig, MiraiApi};
