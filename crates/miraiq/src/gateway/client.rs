// Websocket client for the mirai-api-http adapter.
//
// A single duplex connection carries both command/response traffic and
// unsolicited pushes. One background reader demultiplexes frames by
// `syncId`; writes are serialised through the connection lock.
//
// Frame classification:
//   ""         session-establishment greeting, carries the session key
//   sentinel   push (incoming message, event or sync message)
//   other      response to the request whose correlation id it names

use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::tables::{DataQueue, ResponseSlots};
use crate::entities::RecvData;
use crate::error::{ApiError, Error, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, WsMessage>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Correlation ids wrap at this bound; uniqueness is only needed among
/// outstanding requests.
const SYNC_ID_MAX: i64 = 100_000_000;

/// Connection settings for [`MiraiApi`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bot_id: i64,
    pub verify_key: String,
    pub base_url: String,
    /// `syncId` value the gateway uses to mark pushes
    pub reserved_sync_id: String,
}

impl ApiConfig {
    pub fn new(bot_id: i64, verify_key: impl Into<String>) -> Self {
        Self {
            bot_id,
            verify_key: verify_key.into(),
            base_url: "ws://localhost:8080".into(),
            reserved_sync_id: "-1".into(),
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn reserved_sync_id(mut self, reserved_sync_id: impl Into<String>) -> Self {
        self.reserved_sync_id = reserved_sync_id.into();
        self
    }
}

struct AutoIncrement {
    current: Mutex<i64>,
}

impl AutoIncrement {
    fn new() -> Self {
        Self {
            current: Mutex::new(0),
        }
    }

    fn next(&self) -> i64 {
        let mut current = self.current.lock();
        let id = *current;
        *current += 1;
        if *current > SYNC_ID_MAX {
            *current = 0;
        }
        id
    }

    fn reset(&self) {
        *self.current.lock() = 0;
    }
}

struct Connection {
    sink: WsSink,
    reader: JoinHandle<()>,
}

struct ApiShared {
    config: ApiConfig,
    conn: TokioMutex<Option<Connection>>,
    session_key: Mutex<Option<String>>,
    queue: DataQueue,
    responses: ResponseSlots,
    sync_id: AutoIncrement,
}

/// Shared client for the gateway's websocket API.
///
/// Cloning is cheap and every clone talks over the same connection.
/// `connect` and `close` are idempotent; `send_command` and `recv` may be
/// called from any number of concurrent tasks.
#[derive(Clone)]
pub struct MiraiApi {
    inner: Arc<ApiShared>,
}

impl MiraiApi {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            inner: Arc::new(ApiShared {
                config,
                conn: TokioMutex::new(None),
                session_key: Mutex::new(None),
                queue: DataQueue::new(),
                responses: ResponseSlots::new(),
                sync_id: AutoIncrement::new(),
            }),
        }
    }

    pub fn bot_id(&self) -> i64 {
        self.inner.config.bot_id
    }

    pub fn verify_key(&self) -> &str {
        &self.inner.config.verify_key
    }

    pub fn base_url(&self) -> &str {
        &self.inner.config.base_url
    }

    pub fn reserved_sync_id(&self) -> &str {
        &self.inner.config.reserved_sync_id
    }

    /// The session key received in the greeting frame, once connected.
    pub fn session_key(&self) -> Option<String> {
        self.inner.session_key.lock().clone()
    }

    fn connect_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.inner.config.base_url)
            .map_err(|e| Error::Transport(format!("invalid base url: {e}")))?;
        url.set_path("/all");
        url.query_pairs_mut()
            .clear()
            .append_pair("verifyKey", &self.inner.config.verify_key)
            .append_pair("qq", &self.inner.config.bot_id.to_string());
        Ok(url)
    }

    /// Opens the connection and spawns the reader. Calling this with an
    /// open connection is a no-op.
    pub async fn connect(&self) -> Result<()> {
        let mut guard = self.inner.conn.lock().await;
        if guard.is_some() {
            return Ok(());
        }
        let url = self.connect_url()?;
        tracing::debug!(url = %url, "connecting to gateway");
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| Error::Transport(format!("websocket connection failed: {e}")))?;
        let (sink, source) = stream.split();
        let shared = Arc::clone(&self.inner);
        let reader = tokio::spawn(reader_loop(shared, source));
        *guard = Some(Connection { sink, reader });
        Ok(())
    }

    /// Closes the connection and waits for the reader to finish. Calling
    /// this with no open connection is a no-op.
    pub async fn close(&self) -> Result<()> {
        let reader = {
            let mut guard = self.inner.conn.lock().await;
            match guard.take() {
                None => return Ok(()),
                Some(mut conn) => {
                    let _ = conn.sink.close().await;
                    conn.reader
                }
            }
        };
        let _ = reader.await;
        Ok(())
    }

    /// Sends one command frame and awaits the matching response.
    ///
    /// The correlation id is injected automatically. A response whose
    /// `data` carries a non-zero `code` becomes the typed [`ApiError`];
    /// responses without a `code` field are returned as-is.
    pub async fn send_command(
        &self,
        command: &str,
        content: Option<Value>,
        sub_command: Option<&str>,
    ) -> Result<Value> {
        self.connect().await?;
        let sync_id = self.inner.sync_id.next();
        let frame = json!({
            "syncId": sync_id,
            "command": command,
            "subCommand": sub_command,
            "content": content.unwrap_or_else(|| json!({})),
        });
        tracing::debug!(%frame, "websocket send");
        let key = sync_id.to_string();
        // Register before writing so the response can never race the waiter.
        let waiter = self.inner.responses.register(key.clone())?;
        let write_result = {
            let mut guard = self.inner.conn.lock().await;
            match guard.as_mut() {
                None => Err(Error::ConnectionClosed {
                    normal: false,
                    reason: "connection lost before the request was written".into(),
                }),
                Some(conn) => conn
                    .sink
                    .send(WsMessage::Text(frame.to_string().into()))
                    .await
                    .map_err(|e| Error::Transport(format!("failed to send frame: {e}"))),
            }
        };
        if let Err(e) = write_result {
            self.inner.responses.unregister(&key);
            return Err(e);
        }
        let frame = waiter.wait().await?;
        let data = frame
            .get("data")
            .cloned()
            .ok_or_else(|| Error::Protocol("response frame missing 'data'".into()))?;
        match data.get("code").and_then(Value::as_i64) {
            None | Some(0) => Ok(data),
            Some(_) => Err(ApiError::from_response(data).into()),
        }
    }

    /// Returns the next push, blocking until one arrives. Pushes are
    /// delivered in the order the reader saw them.
    pub async fn recv(&self) -> Result<RecvData> {
        self.connect().await?;
        let frame = self.inner.queue.pop().await?;
        let data = frame
            .get("data")
            .cloned()
            .ok_or_else(|| Error::Protocol("push frame missing 'data'".into()))?;
        RecvData::from_value(data)
    }

    /// Like [`recv`](Self::recv), but maps a clean connection close to
    /// `None`, so callers can loop until the gateway says goodbye.
    pub async fn next_push(&self) -> Result<Option<RecvData>> {
        match self.recv().await {
            Ok(data) => Ok(Some(data)),
            Err(Error::ConnectionClosed { normal: true, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[doc(hidden)]
    pub fn pending_requests(&self) -> usize {
        self.inner.responses.outstanding()
    }

    #[doc(hidden)]
    pub fn queued_pushes(&self) -> usize {
        self.inner.queue.queued()
    }
}

fn map_read_error(error: tokio_tungstenite::tungstenite::Error) -> Error {
    use tokio_tungstenite::tungstenite::Error as WsError;
    match error {
        WsError::ConnectionClosed | WsError::AlreadyClosed => Error::ConnectionClosed {
            normal: true,
            reason: "connection closed".into(),
        },
        WsError::Protocol(e) => Error::ConnectionClosed {
            normal: false,
            reason: format!("websocket protocol error: {e}"),
        },
        WsError::Io(e) => Error::ConnectionClosed {
            normal: false,
            reason: format!("io error: {e}"),
        },
        other => Error::Transport(other.to_string()),
    }
}

async fn reader_loop(shared: Arc<ApiShared>, mut source: WsSource) {
    let cause = loop {
        let message = match source.next().await {
            None => {
                break Error::ConnectionClosed {
                    normal: true,
                    reason: "connection closed".into(),
                };
            }
            Some(Err(e)) => break map_read_error(e),
            Some(Ok(message)) => message,
        };
        match message {
            WsMessage::Text(text) => {
                let frame: Value = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => break Error::Protocol(format!("failed to parse frame: {e}")),
                };
                tracing::debug!(%frame, "websocket recv");
                let sync_id = frame
                    .get("syncId")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if sync_id.is_empty() {
                    // Greeting: the first frame after connecting.
                    let session = frame
                        .get("data")
                        .and_then(|d| d.get("session"))
                        .and_then(Value::as_str)
                        .map(str::to_string);
                    *shared.session_key.lock() = session;
                } else if sync_id == shared.config.reserved_sync_id {
                    shared.queue.push(frame);
                } else {
                    shared.responses.complete(&sync_id, frame);
                }
            }
            WsMessage::Close(close_frame) => {
                let normal = close_frame
                    .as_ref()
                    .map(|f| matches!(f.code, CloseCode::Normal | CloseCode::Away))
                    .unwrap_or(true);
                let reason = close_frame
                    .map(|f| format!("connection closed: {}", f.reason))
                    .unwrap_or_else(|| "connection closed".into());
                break Error::ConnectionClosed { normal, reason };
            }
            // Ping/pong are handled by the protocol layer; binary frames
            // are not part of this API.
            _ => {}
        }
    };
    tracing::debug!(%cause, "reader loop ended");
    shared.queue.fail(&cause);
    shared.responses.fail(&cause);
    shared.queue.clear();
    shared.responses.clear();
    *shared.session_key.lock() = None;
    shared.sync_id.reset();
    if let Some(mut conn) = shared.conn.lock().await.take() {
        let _ = conn.sink.close().await;
    }
}
