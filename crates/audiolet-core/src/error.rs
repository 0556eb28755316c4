//! Error types for Audiolet.

use thiserror::Error;

/// Result type alias using Audiolet's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Audiolet.
///
/// Errors carry messages rather than their sources so a single failure can be
/// handed to every waiter on a player.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Construction errors
    #[error("No configuration supplied")]
    ConfigurationMissing,

    #[error("The format of the audio file is invalid: {0}")]
    InvalidFormat(String),

    #[error("Audio playback is not supported in this environment: {0}")]
    UnsupportedEnvironment(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    // Audio errors
    #[error("Decoding the audio buffer failed: {0}")]
    DecodeFailure(String),

    #[error("Audio output error: {0}")]
    AudioOutput(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    #[error("Network error: {0}")]
    Network(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// HTTP-specific errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    #[error("Request failed with status {status}: {message}")]
    StatusError { status: u16, message: String },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl Error {
    /// Returns true if this error is raised synchronously while constructing a player.
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::ConfigurationMissing
                | Self::InvalidFormat(_)
                | Self::UnsupportedEnvironment(_)
                | Self::Config(_)
        )
    }

    /// Returns true if this error came from fetching or reading the source bytes.
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Network(_) | Self::Io(_))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}
