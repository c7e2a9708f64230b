//! Generation client capability trait and stream events
//!
//! A [`GenerationClient`] turns a message history plus tool catalog into
//! either a stream of incremental events or a whole completed turn. The
//! stream form feeds the response streamer; the whole-turn form is used for
//! the follow-up request after tool execution.

use crate::error::Result;
use crate::message::Message;
use crate::tools::{ToolCall, ToolDefinition};
use tokio::sync::mpsc;

/// An incremental event from a streaming generation
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of assistant text
    ContentDelta(String),
    /// A fragment of a tool call under construction
    ToolCallDelta {
        /// Position of the call within this turn
        index: usize,
        /// Call ID, present on the opening fragment
        id: Option<String>,
        /// Function name, present on the opening fragment
        name: Option<String>,
        /// Piece of the JSON arguments string
        arguments: String,
    },
    /// The turn finished
    Done,
}

/// A completed generation turn
#[derive(Debug, Clone, Default)]
pub struct GenerationTurn {
    /// Assistant text, possibly empty when only tools were called
    pub content: String,
    /// Tool calls requested by the model, in call-opening order
    pub tool_calls: Vec<ToolCall>,
}

/// Capability to generate assistant turns
#[async_trait::async_trait]
pub trait GenerationClient: Send + Sync {
    /// Provider name used in logs
    fn name(&self) -> &str;

    /// Start a streaming generation; events arrive on the returned channel.
    ///
    /// The channel yields `Err` when the stream breaks mid-turn and closes
    /// after [`StreamEvent::Done`].
    async fn stream_generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<mpsc::Receiver<Result<StreamEvent>>>;

    /// Generate a whole turn without streaming
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<GenerationTurn>;
}
