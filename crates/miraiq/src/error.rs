// Error types for miraiq
//
// Two layers: `ApiError` covers the status codes the gateway returns in
// response frames, `Error` covers everything else (transport, protocol,
// dispatch, contract misuse). Both are `Clone` so one connection failure
// can be fanned out to every outstanding waiter.

use serde_json::Value;
use thiserror::Error;

/// Result type alias for miraiq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Status codes the gateway attaches to failed responses.
///
/// Each code is a distinct kind so callers can match on the exact failure;
/// codes this crate does not know about map to [`ApiErrorKind::Unsupported`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// Wrong verify key (code 1)
    WrongVerifyKey,
    /// The requested bot account does not exist (code 2)
    BotNotExist,
    /// Session is invalid or does not exist (code 3)
    InvalidSession,
    /// Session has not been activated (code 4)
    InactiveSession,
    /// The target of the operation does not exist (code 5)
    TargetNotExist,
    /// The referenced file does not exist (code 6)
    FileNotExist,
    /// The bot lacks permission for the operation (code 10)
    NoPermission,
    /// The bot is muted in the target group (code 20)
    BotInSilence,
    /// The message is too long (code 30)
    MessageTooLong,
    /// Malformed access, e.g. bad parameters (code 400)
    IncorrectAccess,
    /// A status code this crate does not know about
    Unsupported,
}

impl ApiErrorKind {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::WrongVerifyKey,
            2 => Self::BotNotExist,
            3 => Self::InvalidSession,
            4 => Self::InactiveSession,
            5 => Self::TargetNotExist,
            6 => Self::FileNotExist,
            10 => Self::NoPermission,
            20 => Self::BotInSilence,
            30 => Self::MessageTooLong,
            400 => Self::IncorrectAccess,
            _ => Self::Unsupported,
        }
    }
}

/// A non-zero status code returned by the gateway for a request.
#[derive(Debug, Clone, Error)]
#[error("gateway error {kind:?} (code {code}): {message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub code: i64,
    pub message: String,
    /// The raw response object the error was built from
    pub response: Value,
}

impl ApiError {
    /// Builds the typed error from a response `data` object carrying a
    /// non-zero `code` and an optional `msg`.
    pub fn from_response(response: Value) -> Self {
        let code = response.get("code").and_then(Value::as_i64).unwrap_or(-1);
        let message = response
            .get("msg")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        Self {
            kind: ApiErrorKind::from_code(code),
            code,
            message,
            response,
        }
    }
}

/// Errors that can occur when using miraiq
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The gateway answered a request with a non-zero status code
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The websocket connection ended. `normal` distinguishes a clean close
    /// handshake from an abrupt teardown.
    #[error("connection closed (normal = {normal}): {reason}")]
    ConnectionClosed { normal: bool, reason: String },

    /// Transport-level failure (dial, read or write on the socket)
    #[error("transport error: {0}")]
    Transport(String),

    /// The peer sent a frame this crate cannot make sense of
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON serialization/deserialization failure
    #[error("JSON error: {0}")]
    Json(String),

    /// A handler argument could not be resolved from the context
    #[error("cannot resolve {0}")]
    Resolve(String),

    /// API misuse detected at build or bind time (cyclic ordering,
    /// foreign-class handler method, double waiter registration, …)
    #[error("contract violation: {0}")]
    Contract(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}

impl Error {
    /// Whether this is a typed gateway error (any [`ApiError`] kind).
    pub fn is_api(&self) -> bool {
        matches!(self, Error::Api(_))
    }

    pub fn as_api(&self) -> Option<&ApiError> {
        match self {
            Error::Api(e) => Some(e),
            _ => None,
        }
    }
}
