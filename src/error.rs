use std::fmt;

use rmcp::model::ErrorData;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum BrowseError {
    #[error("{0}")]
    Redis(#[from] redis::RedisError),

    #[error("{0}")]
    Validation(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Key enrichment task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("{0}")]
    Other(String),
}

/// User-facing failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ConnectionRefused,
    Timeout,
    AuthFailed,
    HostNotFound,
    UnknownError,
    /// Raised by request validation only; never produced from a store failure.
    ValidationError,
}

impl ErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::ConnectionRefused => "CONNECTION_REFUSED",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::AuthFailed => "AUTH_FAILED",
            ErrorKind::HostNotFound => "HOST_NOT_FOUND",
            ErrorKind::UnknownError => "UNKNOWN_ERROR",
            ErrorKind::ValidationError => "VALIDATION_ERROR",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classified {
    pub code: ErrorKind,
    pub message: String,
}

// Checked in order; the first group with a matching substring wins.
const REFUSED: &[&str] = &["econnrefused", "connection refused"];
const TIMEOUT: &[&str] = &["etimedout", "timeout", "timed out"];
const AUTH: &[&str] = &[
    "authentication failed",
    "noauth",
    "wrongpass",
    "invalid password",
    "invalid username-password pair",
];
const HOST_NOT_FOUND: &[&str] = &[
    "enotfound",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname provided",
    "no such host",
    "no address found for host",
];

/// Map a failure description onto an [`ErrorKind`] and a message suitable for
/// display. Unrecognised failures keep their original message verbatim.
pub fn classify_message(description: &str) -> Classified {
    classify_with_signals(description, &[])
}

/// Kinds a redis-rs error reports structurally, independent of its text.
fn redis_signals(err: &redis::RedisError) -> Vec<ErrorKind> {
    let mut signals = Vec::new();
    if err.is_connection_refusal() {
        signals.push(ErrorKind::ConnectionRefused);
    }
    if err.is_timeout() {
        signals.push(ErrorKind::Timeout);
    }
    if err.kind() == redis::ErrorKind::AuthenticationFailed {
        signals.push(ErrorKind::AuthFailed);
    }
    signals
}

// A kind matches if it was signalled or one of its substrings is present;
// the priority order applies across both.
fn classify_with_signals(description: &str, signals: &[ErrorKind]) -> Classified {
    let lowered = description.to_lowercase();
    let matches = |kind: ErrorKind, needles: &[&str]| {
        signals.contains(&kind) || needles.iter().any(|n| lowered.contains(n))
    };

    let (code, message) = if matches(ErrorKind::ConnectionRefused, REFUSED) {
        (
            ErrorKind::ConnectionRefused,
            "Could not connect to the Redis server. Check that host and port are correct.",
        )
    } else if matches(ErrorKind::Timeout, TIMEOUT) {
        (
            ErrorKind::Timeout,
            "The connection timed out. The Redis server did not respond in time.",
        )
    } else if matches(ErrorKind::AuthFailed, AUTH) {
        (
            ErrorKind::AuthFailed,
            "Authentication failed. Check the password.",
        )
    } else if matches(ErrorKind::HostNotFound, HOST_NOT_FOUND) {
        (
            ErrorKind::HostNotFound,
            "Could not resolve the host. Check the server name.",
        )
    } else {
        return Classified {
            code: ErrorKind::UnknownError,
            message: description.to_string(),
        };
    };

    Classified {
        code,
        message: message.to_string(),
    }
}

impl BrowseError {
    pub fn classify(&self) -> Classified {
        match self {
            BrowseError::Validation(msg) | BrowseError::InvalidEndpoint(msg) => Classified {
                code: ErrorKind::ValidationError,
                message: msg.clone(),
            },
            BrowseError::Redis(err) => classify_with_signals(&err.to_string(), &redis_signals(err)),
            _ => classify_message(&self.to_string()),
        }
    }

    pub fn to_mcp_error(&self) -> ErrorData {
        let classified = self.classify();
        let data = Some(serde_json::json!({ "code": classified.code }));
        match classified.code {
            ErrorKind::ValidationError => ErrorData::invalid_params(classified.message, data),
            _ => ErrorData::internal_error(classified.message, data),
        }
    }
}
