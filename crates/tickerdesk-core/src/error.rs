use thiserror::Error;

use crate::classify::ClassifiedError;

/// Input validation errors raised before any network activity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptySymbol,
    #[error("ticker length {len} exceeds max {max}")]
    SymbolTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter or '^': '{ch}'")]
    SymbolInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    SymbolInvalidChar { ch: char, index: usize },

    #[error("invalid chart period '{value}', expected one of 1d, 5d, 1mo, 3mo, 6mo, 1y, 2y, 5y, 10y, ytd, max")]
    InvalidPeriod { value: String },
    #[error("invalid chart interval '{value}', expected one of 1m, 5m, 15m, 30m, 1h, 1d, 1wk, 1mo")]
    InvalidInterval { value: String },

    #[error("search query cannot be empty")]
    EmptyQuery,
    #[error("chat question cannot be empty")]
    EmptyQuestion,
    #[error("field '{field}' must be greater than zero")]
    ZeroLimit { field: &'static str },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Configuration errors raised while assembling a client.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    InvalidEnv {
        name: &'static str,
        value: String,
        reason: String,
    },
    #[error("base url must start with http:// or https://: '{value}'")]
    InvalidBaseUrl { value: String },
    #[error("request timeout must be greater than zero milliseconds")]
    ZeroTimeout,
    #[error("retry backoff factor must be greater than 1.0, got {value}")]
    InvalidBackoffFactor { value: f64 },
    #[error("route table has no entry for cache category '{category}'")]
    UnroutedCategory { category: &'static str },
    #[error("route prefix '{prefix}' is registered more than once")]
    DuplicateRoute { prefix: String },
}

/// Top-level error returned by the data-access client.
#[derive(Debug, Error, Clone)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Request(#[from] ClassifiedError),

    #[error("no route registered for endpoint '{path}'")]
    Unrouted { path: String },

    #[error("request to {endpoint} was aborted before it settled")]
    Aborted { endpoint: String },

    #[error("failed to decode response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// The classified request failure, if this error came from the network.
    pub fn as_request(&self) -> Option<&ClassifiedError> {
        match self {
            Self::Request(error) => Some(error),
            _ => None,
        }
    }
}
