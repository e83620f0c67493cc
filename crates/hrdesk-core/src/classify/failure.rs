//! Unclassified failure reported by the transport layer.

use serde::{Deserialize, Serialize};
use std::io;

/// What the transport knows about a failed call, before classification.
///
/// `Default` (and an empty JSON object) describes a call that was delivered but
/// left nothing structured behind; it classifies as `UNKNOWN`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawFailure {
    /// False when no response reached us at all.
    pub transport_present: bool,
    /// HTTP status of the response, if there was one.
    pub http_status: Option<u16>,
    /// Message from the server's error body.
    pub server_message: Option<String>,
    /// Machine-readable code from the server's error body.
    pub server_code: Option<String>,
    /// The call was cut off by a timeout.
    pub is_timeout: bool,
}

impl Default for RawFailure {
    fn default() -> Self {
        Self {
            transport_present: true,
            http_status: None,
            server_message: None,
            server_code: None,
            is_timeout: false,
        }
    }
}

impl RawFailure {
    /// Nothing came back (connection refused, DNS failure, reset).
    pub fn network() -> Self {
        Self {
            transport_present: false,
            ..Self::default()
        }
    }

    /// The call timed out before a response was complete.
    pub fn timeout() -> Self {
        Self {
            is_timeout: true,
            ..Self::default()
        }
    }

    /// A response arrived with a non-success status.
    pub fn http(status: u16) -> Self {
        Self {
            http_status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.server_message = Some(message.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.server_code = Some(code.into());
        self
    }

    /// Build a failure from a non-success response, pulling `message` / `code`
    /// out of a JSON error body when there is one.
    ///
    /// Recognized message fields, in order: `message`, `error`, `detail`.
    /// A body that is not a JSON object contributes nothing.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let mut failure = Self::http(status);
        let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) else {
            return failure;
        };
        failure.server_message = ["message", "error", "detail"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| v.as_str().filter(|s| !s.trim().is_empty()))
            .map(str::to_string);
        failure.server_code = match map.get("code") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(serde_json::Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        failure
    }
}

impl From<curl::Error> for RawFailure {
    fn from(e: curl::Error) -> Self {
        if e.is_operation_timedout() {
            return Self::timeout();
        }
        if e.is_couldnt_connect()
            || e.is_couldnt_resolve_host()
            || e.is_couldnt_resolve_proxy()
            || e.is_read_error()
            || e.is_recv_error()
            || e.is_send_error()
            || e.is_got_nothing()
        {
            return Self::network();
        }
        Self::default().with_message(e.to_string())
    }
}

impl From<io::Error> for RawFailure {
    fn from(e: io::Error) -> Self {
        match e.kind() {
            io::ErrorKind::TimedOut => Self::timeout(),
            io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof => Self::network(),
            _ => Self::default().with_message(e.to_string()),
        }
    }
}
