//! Error types for okulo-vision

use thiserror::Error;

/// Vision error type
#[derive(Debug, Error)]
pub enum Error {
    /// Camera or frame source failure
    #[error("video source error: {0}")]
    Video(String),

    /// Actuator transport failure
    #[error("actuator transport error: {0}")]
    Transport(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
