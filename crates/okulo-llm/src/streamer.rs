//! Response streaming: sentence segmentation and tool-call interleave
//!
//! [`ResponseStreamer`] drives one assistant turn end to end. Content deltas
//! accumulate in a sentence buffer that emits a speakable fragment whenever a
//! delta closes on a terminator and enough text has built up, so synthesis
//! can begin while the model is still generating. Tool-call deltas assemble
//! into whole calls; once the stream completes they are executed in order and
//! a non-streaming follow-up request produces the final text.
//!
//! The conversation is only updated when the whole turn succeeds. On any
//! error the caller's history is left exactly as it was.

use crate::error::{Error, Result};
use crate::message::{Conversation, Message};
use crate::provider::{GenerationClient, StreamEvent};
use crate::tools::{ToolCall, ToolRegistry};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Characters that end a speakable fragment
pub const FRAGMENT_TERMINATORS: &[char] = &['.', '!', '?', ';', ':'];

/// Minimum buffered characters before a terminator may cut a fragment
pub const DEFAULT_MIN_FRAGMENT_CHARS: usize = 15;

/// Accumulates content deltas and cuts speakable fragments.
///
/// A fragment is cut when the incoming delta's final character is a
/// terminator and the buffer holds more than the minimum number of
/// characters. Short interjections ride along until the next terminator or
/// the final flush, which keeps fragments long enough to synthesize well.
#[derive(Debug)]
pub struct SentenceBuffer {
    buf: String,
    min_chars: usize,
}

impl SentenceBuffer {
    /// Create a buffer with the given minimum fragment length
    #[must_use]
    pub fn new(min_chars: usize) -> Self {
        Self {
            buf: String::new(),
            min_chars,
        }
    }

    /// Append a delta; returns a fragment when one is ready
    pub fn push(&mut self, delta: &str) -> Option<String> {
        self.buf.push_str(delta);

        let terminated = delta
            .chars()
            .next_back()
            .is_some_and(|c| FRAGMENT_TERMINATORS.contains(&c));
        if terminated && self.buf.chars().count() > self.min_chars {
            return self.take();
        }
        None
    }

    /// Drain whatever remains, regardless of length
    pub fn flush(&mut self) -> Option<String> {
        self.take()
    }

    fn take(&mut self) -> Option<String> {
        let fragment = std::mem::take(&mut self.buf);
        let fragment = fragment.trim();
        if fragment.is_empty() {
            None
        } else {
            Some(fragment.to_string())
        }
    }
}

/// A tool call under construction from stream deltas
#[derive(Debug, Default)]
struct PendingCall {
    id: String,
    name: String,
    arguments: String,
}

/// Fold a tool-call delta into the pending set by call index
fn apply_tool_delta(
    pending: &mut Vec<PendingCall>,
    index: usize,
    id: Option<String>,
    name: Option<String>,
    arguments: String,
) {
    while pending.len() <= index {
        pending.push(PendingCall::default());
    }
    let call = &mut pending[index];
    if let Some(id) = id {
        call.id = id;
    }
    if let Some(name) = name {
        call.name = name;
    }
    call.arguments.push_str(&arguments);
}

/// Drives streamed assistant turns over a conversation
pub struct ResponseStreamer {
    client: Arc<dyn GenerationClient>,
    tools: Arc<ToolRegistry>,
    min_fragment_chars: usize,
}

impl ResponseStreamer {
    /// Create a streamer over the given client and tool registry
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            client,
            tools,
            min_fragment_chars: DEFAULT_MIN_FRAGMENT_CHARS,
        }
    }

    /// Override the minimum fragment length
    #[must_use]
    pub fn with_min_fragment_chars(mut self, min_chars: usize) -> Self {
        self.min_fragment_chars = min_chars;
        self
    }

    /// Run one assistant turn for `user_text`, sending speakable fragments
    /// in order on `fragments` as they become ready.
    ///
    /// Returns the full reply text. The conversation gains the user turn,
    /// any tool turns, and the assistant turn(s) only if the whole exchange
    /// succeeds.
    pub async fn respond(
        &self,
        conversation: &mut Conversation,
        user_text: &str,
        fragments: &mpsc::Sender<String>,
    ) -> Result<String> {
        let mut working = conversation.clone();
        working.push(Message::user(user_text));

        let definitions = self.tools.definitions();
        let mut events = self
            .client
            .stream_generate(working.messages(), &definitions)
            .await?;

        let mut segmenter = SentenceBuffer::new(self.min_fragment_chars);
        let mut full_text = String::new();
        let mut pending: Vec<PendingCall> = Vec::new();
        let mut completed = false;

        while let Some(event) = events.recv().await {
            match event? {
                StreamEvent::ContentDelta(delta) => {
                    full_text.push_str(&delta);
                    if let Some(fragment) = segmenter.push(&delta) {
                        debug!(chars = fragment.chars().count(), "emitting fragment");
                        fragments
                            .send(fragment)
                            .await
                            .map_err(|_| Error::ChannelClosed)?;
                    }
                }
                StreamEvent::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    apply_tool_delta(&mut pending, index, id, name, arguments);
                }
                StreamEvent::Done => {
                    completed = true;
                    break;
                }
            }
        }
        if !completed {
            return Err(Error::Stream("stream ended without completion".to_string()));
        }

        if pending.is_empty() {
            working.push(Message::assistant(full_text.clone()));
        } else {
            let calls: Vec<ToolCall> = pending
                .into_iter()
                .map(|c| ToolCall {
                    id: c.id,
                    name: c.name,
                    arguments: c.arguments,
                })
                .collect();
            info!(count = calls.len(), "executing tool calls");

            working.push(Message::assistant_tool_calls(full_text.clone(), calls.clone()));
            for call in &calls {
                // Failures become tool output so the model can recover.
                let output = match self.tools.execute(call).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "tool call failed");
                        format!("error: {e}")
                    }
                };
                working.push(Message::tool_response(&call.id, &call.name, output));
            }

            let follow_up = self.client.generate(working.messages(), &[]).await?;
            full_text.push_str(&follow_up.content);
            if let Some(fragment) = segmenter.push(&follow_up.content) {
                fragments
                    .send(fragment)
                    .await
                    .map_err(|_| Error::ChannelClosed)?;
            }
            working.push(Message::assistant(follow_up.content));
        }

        if let Some(rest) = segmenter.flush() {
            fragments
                .send(rest)
                .await
                .map_err(|_| Error::ChannelClosed)?;
        }

        *conversation = working;
        Ok(full_text)
    }
}
