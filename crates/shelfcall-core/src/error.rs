use thiserror::Error;

/// Top-level error type for shelfcall.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for ShelfcallError` so that `?` works across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShelfcallError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Alert store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for ShelfcallError {
    fn from(err: toml::de::Error) -> Self {
        ShelfcallError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for ShelfcallError {
    fn from(err: toml::ser::Error) -> Self {
        ShelfcallError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShelfcallError {
    fn from(err: serde_json::Error) -> Self {
        ShelfcallError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for shelfcall operations.
pub type Result<T> = std::result::Result<T, ShelfcallError>;
