// miraiq: a lightweight bot framework over the mirai-api-http websocket
// adapter.
//
// Two tightly coupled subsystems do the heavy lifting:
//
// - The gateway client (`gateway`): one duplex connection over which
//   command/response RPCs and unsolicited pushes are interleaved,
//   demultiplexed by a per-frame correlation id.
// - The dispatch engine (`framework`): for each received datum, routers
//   pick at most one handler by kind plus per-handler filters, the
//   ordering engine topologically sorts handlers (default last), and the
//   dispatcher invokes the handler with dependency-resolved arguments,
//   auto-replying to the originating subject.
//
// # Example
//
// ```no_run
// use miraiq::entities::MessageKind;
// use miraiq::framework::{Bot, MessageHandler};
// use miraiq::gateway::ApiConfig;
//
// #[tokio::main]
// async fn main() -> miraiq::Result<()> {
//     let bot = Bot::new(ApiConfig::new(123456789, "verify-key"));
//     bot.add(
//         MessageHandler::builder("hello", |_args| async { Ok("Hello!") })
//             .kind(MessageKind::Friend)
//             .build(),
//     );
//     bot.run().await
// }
// ```

pub mod entities;
pub mod error;
pub mod filters;
pub mod framework;
pub mod gateway;
pub mod resolvers;

pub use error::{ApiError, ApiErrorKind, Error, Result};
pub use framework::{
    AnyHandler, Args, Bot, Controller, ControllerEntry, EventHandler, ExceptionContext,
    ExceptionHandler, ExceptionKind, Handler, HandlerMethod, HandlerProperty, MessageHandler,
    RecvContext, RegexGate, RegexMatch, Reply, TypeRouter, regex_fullmatch, regex_match,
    regex_search,
};
pub use gateway::{ApiConfig, MiraiApi};
