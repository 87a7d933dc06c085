#![allow(dead_code)]
// A minimal in-process stand-in for the mirai-api-http websocket adapter:
// greets with a session key, answers request frames through a pluggable
// responder, and lets tests inject push frames or tear the connection
// down (cleanly or abruptly).

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::any;
use serde_json::{Value, json};
use tokio::sync::{Mutex as TokioMutex, mpsc};

/// Maps one request frame to the frames to send back (possibly none, or
/// several to exercise out-of-order delivery).
pub type Responder = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

enum Directive {
    Push(Value),
    /// Close handshake, then end the connection
    Close,
    /// Drop the connection without a close handshake
    Kill,
}

struct Inner {
    responder: Responder,
    control: StdMutex<Option<mpsc::UnboundedSender<Directive>>>,
    frames_tx: mpsc::UnboundedSender<Value>,
    connections: AtomicUsize,
}

pub struct MockGateway {
    addr: SocketAddr,
    inner: Arc<Inner>,
    frames_rx: TokioMutex<mpsc::UnboundedReceiver<Value>>,
}

impl MockGateway {
    pub async fn start(responder: Responder) -> Self {
        let (frames_tx, frames_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            responder,
            control: StdMutex::new(None),
            frames_tx,
            connections: AtomicUsize::new(0),
        });
        let app = Router::new()
            .route("/all", any(ws_handler))
            .with_state(Arc::clone(&inner));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock gateway");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            inner,
            frames_rx: TokioMutex::new(frames_rx),
        }
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// How many websocket connections have been accepted so far.
    pub fn connections(&self) -> usize {
        self.inner.connections.load(Ordering::SeqCst)
    }

    fn send(&self, directive: Directive) {
        let control = self.inner.control.lock().unwrap();
        if let Some(tx) = control.as_ref() {
            let _ = tx.send(directive);
        }
    }

    /// Injects a push frame carrying `data` under the reserved sync id.
    pub fn push(&self, data: Value) {
        self.send(Directive::Push(json!({"syncId": "-1", "data": data})));
    }

    /// Injects a raw frame verbatim.
    pub fn push_frame(&self, frame: Value) {
        self.send(Directive::Push(frame));
    }

    /// Ends the current connection with a close handshake.
    pub fn close_connection(&self) {
        self.send(Directive::Close);
    }

    /// Drops the current connection without a close handshake.
    pub fn kill_connection(&self) {
        self.send(Directive::Kill);
    }

    /// The next frame the client wrote, as JSON.
    pub async fn next_client_frame(&self) -> Value {
        self.frames_rx
            .lock()
            .await
            .recv()
            .await
            .expect("mock gateway dropped")
    }
}

async fn ws_handler(State(inner): State<Arc<Inner>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| serve_connection(socket, inner))
}

async fn serve_connection(mut socket: WebSocket, inner: Arc<Inner>) {
    inner.connections.fetch_add(1, Ordering::SeqCst);
    let (control_tx, mut control_rx) = mpsc::unbounded_channel();
    *inner.control.lock().unwrap() = Some(control_tx);

    let greeting = json!({"syncId": "", "data": {"code": 0, "session": "TEST-SESSION"}});
    if socket
        .send(WsMessage::Text(greeting.to_string().into()))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            directive = control_rx.recv() => match directive {
                Some(Directive::Push(frame)) => {
                    if socket.send(WsMessage::Text(frame.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Some(Directive::Close) => {
                    let _ = socket.send(WsMessage::Close(None)).await;
                    break;
                }
                Some(Directive::Kill) | None => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    let frame: Value = match serde_json::from_str(&text) {
                        Ok(frame) => frame,
                        Err(_) => continue,
                    };
                    let _ = inner.frames_tx.send(frame.clone());
                    for reply in (inner.responder)(&frame) {
                        if socket.send(WsMessage::Text(reply.to_string().into())).await.is_err() {
                            return;
                        }
                    }
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(_)) => break,
            },
        }
    }
}

/// Answers every request with `code: 0` plus a `messageId`, echoing the
/// command under `echo`.
pub fn ok_responder() -> Responder {
    Arc::new(|frame: &Value| {
        let Some(id) = frame.get("syncId").and_then(Value::as_i64) else {
            return Vec::new();
        };
        vec![json!({
            "syncId": id.to_string(),
            "data": {
                "code": 0,
                "msg": "success",
                "messageId": 1,
                "echo": frame.get("command").cloned().unwrap_or(Value::Null),
            }
        })]
    })
}

/// Never answers anything.
pub fn silent_responder() -> Responder {
    Arc::new(|_frame: &Value| Vec::new())
}

/// Holds the first request's response back and delivers it after (and
/// behind) the second one, so responses arrive out of request order.
pub fn swapping_responder() -> Responder {
    let held: StdMutex<Option<Value>> = StdMutex::new(None);
    Arc::new(move |frame: &Value| {
        let Some(id) = frame.get("syncId").and_then(Value::as_i64) else {
            return Vec::new();
        };
        let response = json!({
            "syncId": id.to_string(),
            "data": {
                "code": 0,
                "echo": frame.get("command").cloned().unwrap_or(Value::Null),
            }
        });
        let mut slot = held.lock().unwrap();
        match slot.take() {
            None => {
                *slot = Some(response);
                Vec::new()
            }
            Some(first) => vec![response, first],
        }
    })
}
