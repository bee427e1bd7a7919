//! Failure classification and retry eligibility.
//!
//! | Failure | Kind | Retried |
//! |---------|------|---------|
//! | status 400..=499 | [`ErrorKind::Client`] | no |
//! | status 501 | [`ErrorKind::PermanentServer`] | no |
//! | other status 500..=599 | [`ErrorKind::Server`] | yes |
//! | transport failure, timeout, abort (status 0) | [`ErrorKind::Network`] | yes |

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::UtcDateTime;
use crate::http_client::HttpError;

/// Status used for failures where no HTTP response was received.
pub const NETWORK_STATUS: u16 = 0;

const NOT_IMPLEMENTED: u16 = 501;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The request itself was rejected; retrying cannot help.
    Client,
    /// Transient backend failure.
    Server,
    /// The backend does not implement the operation (501).
    PermanentServer,
    /// No response: connection failure, DNS error, timeout or abort.
    Network,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Client => "client",
            Self::Server => "server",
            Self::PermanentServer => "permanent_server",
            Self::Network => "network",
        }
    }

    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Server | Self::Network)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request failure, classified once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    message: String,
    status: u16,
    endpoint: String,
    timestamp: UtcDateTime,
    kind: ErrorKind,
}

impl ClassifiedError {
    /// Classify a non-2xx HTTP response.
    pub fn from_status(status: u16, endpoint: impl Into<String>) -> Self {
        let kind = match status {
            NOT_IMPLEMENTED => ErrorKind::PermanentServer,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Client,
        };

        Self {
            message: format!("HTTP {status}: {}", status_text(status)),
            status,
            endpoint: endpoint.into(),
            timestamp: UtcDateTime::now(),
            kind,
        }
    }

    /// Classify a transport failure where no response arrived.
    pub fn from_transport(error: &HttpError, endpoint: impl Into<String>) -> Self {
        Self {
            message: error.message().to_owned(),
            status: NETWORK_STATUS,
            endpoint: endpoint.into(),
            timestamp: UtcDateTime::now(),
            kind: ErrorKind::Network,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn status(&self) -> u16 {
        self.status
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub const fn timestamp(&self) -> UtcDateTime {
        self.timestamp
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub const fn should_retry(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Display for ClassifiedError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({} error at {})", self.message, self.kind, self.endpoint)
    }
}

impl std::error::Error for ClassifiedError {}

/// Canonical reason phrase for a status code.
fn status_text(status: u16) -> &'static str {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Unknown Status")
}
