//! Okulo LLM - streaming chat generation and tool calling
//!
//! This crate provides the language side of the Okulo companion:
//! - Message: conversation turns and the whole-turn-commit history
//! - Tools: executable tool registry and call types
//! - Provider: the generation capability trait and stream events
//! - OpenAiCompat: OpenAI-compatible chat provider with SSE streaming
//! - Streamer: sentence segmentation and tool-call interleave

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod message;
pub mod openai_compat;
pub mod provider;
pub mod streamer;
pub mod tools;

pub use error::{Error, Result};
pub use message::{Conversation, Message, MessageRole};
pub use openai_compat::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use provider::{GenerationClient, GenerationTurn, StreamEvent};
pub use streamer::{ResponseStreamer, SentenceBuffer, DEFAULT_MIN_FRAGMENT_CHARS};
pub use tools::{Tool, ToolCall, ToolDefinition, ToolRegistry};
