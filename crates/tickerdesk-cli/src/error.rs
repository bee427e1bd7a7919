use thiserror::Error;
use tickerdesk_core::{ClientError, ConfigError, ErrorKind, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error("assistant reported an error: {0}")]
    Stream(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<ValidationError> for CliError {
    fn from(error: ValidationError) -> Self {
        Self::Client(ClientError::Validation(error))
    }
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Client(ClientError::Validation(_)) | Self::Argument(_) => 2,
            Self::Client(ClientError::Request(error)) => match error.kind() {
                ErrorKind::Client => 3,
                ErrorKind::Server | ErrorKind::PermanentServer => 4,
                ErrorKind::Network => 5,
            },
            Self::Client(ClientError::Aborted { .. }) => 5,
            Self::Client(ClientError::Decode { .. }) | Self::Serialization(_) => 4,
            Self::Client(ClientError::Config(_) | ClientError::Unrouted { .. }) | Self::Config(_) => 2,
            Self::Stream(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
