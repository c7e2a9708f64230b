//! Error types for okulo-llm

use thiserror::Error;

/// LLM error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// API error
    #[error("api error: {0}")]
    Api(String),

    /// Invalid response
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// Stream ended before completion
    #[error("stream error: {0}")]
    Stream(String),

    /// Tool not found in the registry
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Tool execution failed
    #[error("tool '{0}' failed: {1}")]
    ToolFailed(String, String),

    /// Fragment receiver dropped mid-turn
    #[error("fragment channel closed")]
    ChannelClosed,
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
