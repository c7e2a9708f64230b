//! Error types for okulo-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Configuration file parse failure
    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The microphone frame stream ended
    #[error("audio frame stream closed")]
    FrameStreamClosed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
