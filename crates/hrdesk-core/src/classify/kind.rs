use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level classification of a failed operation.
///
/// The set is closed: every failure the classifier sees maps to exactly one
/// of these kinds, and retryability follows from the kind alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// No response reached us at all (DNS, refused, reset).
    Network,
    /// Request or gateway timed out (client timeout, 408, 504).
    Timeout,
    /// Credentials missing or expired (401).
    Authentication,
    /// Authenticated but not allowed (403).
    Authorization,
    /// Resource does not exist (404).
    NotFound,
    /// Request payload rejected (400).
    Validation,
    /// Server asked us to slow down (429).
    RateLimit,
    /// Server-side failure (5xx).
    Server,
    /// Any other 4xx.
    Client,
    /// Nothing structured to go on.
    Unknown,
}

impl ErrorKind {
    /// All kinds, in declaration order.
    pub const ALL: [ErrorKind; 10] = [
        ErrorKind::Network,
        ErrorKind::Timeout,
        ErrorKind::Authentication,
        ErrorKind::Authorization,
        ErrorKind::NotFound,
        ErrorKind::Validation,
        ErrorKind::RateLimit,
        ErrorKind::Server,
        ErrorKind::Client,
        ErrorKind::Unknown,
    ];

    /// Whether re-running the same operation has a reasonable chance to succeed.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::Network | ErrorKind::Timeout | ErrorKind::RateLimit | ErrorKind::Server
        )
    }

    /// Default human-readable description, used when the server sent nothing better.
    pub fn default_message(self) -> &'static str {
        match self {
            ErrorKind::Network => {
                "Unable to reach the server. Please check your connection and try again."
            }
            ErrorKind::Timeout => "The request timed out. Please try again.",
            ErrorKind::Authentication => "Your session has expired. Please sign in again.",
            ErrorKind::Authorization => "You do not have permission to perform this action.",
            ErrorKind::NotFound => "The requested resource was not found.",
            ErrorKind::Validation => {
                "The submitted data is invalid. Please review your input and try again."
            }
            ErrorKind::RateLimit => "Too many requests. Please wait a moment and try again.",
            ErrorKind::Server => "The server encountered an error. Please try again later.",
            ErrorKind::Client => "The request could not be processed.",
            ErrorKind::Unknown => "An unexpected error occurred.",
        }
    }

    /// Stable upper-case tag (`NOT_FOUND`, `RATE_LIMIT`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Network => "NETWORK",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Authentication => "AUTHENTICATION",
            ErrorKind::Authorization => "AUTHORIZATION",
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::RateLimit => "RATE_LIMIT",
            ErrorKind::Server => "SERVER",
            ErrorKind::Client => "CLIENT",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
