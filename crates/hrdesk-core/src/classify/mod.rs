//! Error classification.
//!
//! Turns whatever the transport reported about a failed call into a
//! [`ClassifiedError`]: a kind from a closed set, a retryability flag derived
//! from that kind, and a message that is always fit to show a user. The
//! classifier is pure and safe to call from any number of runners at once.

mod failure;
mod kind;
mod status;

pub use failure::RawFailure;
pub use kind::ErrorKind;
pub use status::{kind_for_status, status_label, STATUS_TABLE};

use serde::Serialize;

/// Normalized description of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub http_status: Option<u16>,
    pub server_code: Option<String>,
    pub message: String,
    pub is_retryable: bool,
}

impl ClassifiedError {
    fn new(kind: ErrorKind, raw: &RawFailure, message: String) -> Self {
        Self {
            kind,
            http_status: raw.http_status,
            server_code: raw.server_code.clone(),
            message,
            is_retryable: kind.is_retryable(),
        }
    }

    /// Reason phrase for the preserved status, if any.
    pub fn status_label(&self) -> Option<&'static str> {
        self.http_status.and_then(status_label)
    }

    /// Emit this failure through `tracing`, at a level chosen by kind.
    pub fn log(&self, context: &str) {
        let status = self.http_status.map(u32::from);
        match self.kind {
            ErrorKind::Server | ErrorKind::Unknown => tracing::error!(
                context,
                kind = %self.kind,
                status,
                code = self.server_code.as_deref(),
                "{}",
                self.message
            ),
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit => tracing::warn!(
                context,
                kind = %self.kind,
                status,
                code = self.server_code.as_deref(),
                "{}",
                self.message
            ),
            _ => tracing::info!(
                context,
                kind = %self.kind,
                status,
                code = self.server_code.as_deref(),
                "{}",
                self.message
            ),
        }
    }
}

/// Classify a raw failure. Total: every input yields exactly one kind.
pub fn classify(raw: &RawFailure) -> ClassifiedError {
    if !raw.transport_present {
        let kind = ErrorKind::Network;
        return ClassifiedError::new(kind, raw, kind.default_message().to_string());
    }
    let kind = if raw.is_timeout {
        ErrorKind::Timeout
    } else {
        raw.http_status.map_or(ErrorKind::Unknown, kind_for_status)
    };
    let message = raw
        .server_message
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| kind.default_message())
        .to_string();
    ClassifiedError::new(kind, raw, message)
}
