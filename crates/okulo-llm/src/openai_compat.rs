//! OpenAI-compatible chat provider with streaming
//!
//! Talks to any `/chat/completions` endpoint that speaks the OpenAI wire
//! format (OpenAI itself, Groq, vLLM, llama.cpp server). Streaming uses
//! server-sent events: each `data:` line carries one chunk, `data: [DONE]`
//! terminates the stream.

use crate::error::{Error, Result};
use crate::message::Message;
use crate::provider::{GenerationClient, GenerationTurn, StreamEvent};
use crate::tools::{ToolCall, ToolDefinition};
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Default API base URL
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default chat model
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Capacity of the stream-event channel
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Provider configuration
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// API key
    pub api_key: String,
    /// Base URL
    pub base_url: String,
    /// Chat model
    pub model: String,
    /// Request timeout
    pub timeout: Duration,
}

// SECURITY: Custom Debug implementation to mask API key
impl fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("api_key", &mask_api_key(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Mask API key for safe display
fn mask_api_key(key: &str) -> String {
    if key.len() <= 8 {
        return "****".to_string();
    }
    format!("{}...{}", &key[..4], &key[key.len() - 4..])
}

/// Sanitize API error messages before they reach logs or speech
fn sanitize_api_error(error: &str) -> String {
    let lower = error.to_lowercase();

    if lower.contains("api key")
        || lower.contains("apikey")
        || lower.contains("invalid key")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
    {
        return "API authentication error. Please check your OPENAI_API_KEY.".to_string();
    }

    if lower.contains("rate limit") || lower.contains("quota") {
        return "Chat API rate limit exceeded. Please wait.".to_string();
    }

    if lower.contains("internal") || lower.contains("server error") {
        return "Chat API server error. Please try again later.".to_string();
    }

    if error.len() < 100 && !error.contains("sk-") && !error.contains("key") {
        return error.to_string();
    }

    "An API error occurred. Please try again.".to_string()
}

impl OpenAiCompatConfig {
    /// Create a new configuration with an API key
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| Error::NotConfigured("OPENAI_API_KEY not set".to_string()))?;

        let base_url =
            std::env::var("OKULO_CHAT_BASE_URL").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let model = std::env::var("OKULO_CHAT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self {
            api_key,
            base_url,
            model,
            timeout: Duration::from_secs(60),
        })
    }

    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// OpenAI-compatible chat provider
pub struct OpenAiCompatProvider {
    client: Client,
    config: OpenAiCompatConfig,
}

// Wire types for /chat/completions
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Serialize)]
struct ChatTool {
    r#type: String,
    function: ChatFunction,
}

#[derive(Serialize)]
struct ChatFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
struct ChatToolCall {
    id: String,
    r#type: String,
    function: ChatFunctionCall,
}

#[derive(Serialize)]
struct ChatFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ChatResponseToolCall>>,
}

#[derive(Deserialize)]
struct ChatResponseToolCall {
    id: String,
    function: ChatResponseFunction,
}

#[derive(Deserialize)]
struct ChatResponseFunction {
    name: String,
    arguments: String,
}

// Streaming chunk types
#[derive(Deserialize)]
struct ChatChunk {
    choices: Vec<ChunkChoice>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    id: Option<String>,
    function: Option<ChunkFunction>,
}

#[derive(Deserialize)]
struct ChunkFunction {
    name: Option<String>,
    arguments: Option<String>,
}

/// Parse one SSE line into stream events. `None` means the line carries no
/// chunk (empty line, comment, or the `[DONE]` sentinel).
fn parse_sse_line(line: &str) -> Result<Option<Vec<StreamEvent>>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| Error::InvalidResponse(e.to_string()))?;

    let mut events = Vec::new();
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                events.push(StreamEvent::ContentDelta(content));
            }
        }
        for tc in choice.delta.tool_calls.unwrap_or_default() {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            events.push(StreamEvent::ToolCallDelta {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            });
        }
    }
    Ok(Some(events))
}

impl OpenAiCompatProvider {
    /// Create a new provider
    pub fn new(config: OpenAiCompatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(OpenAiCompatConfig::from_env()?)
    }

    fn convert_message(msg: &Message) -> ChatMessage {
        ChatMessage {
            role: msg.role.as_str().to_string(),
            content: msg.content.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            name: msg.name.clone(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|c| ChatToolCall {
                        id: c.id.clone(),
                        r#type: "function".to_string(),
                        function: ChatFunctionCall {
                            name: c.name.clone(),
                            arguments: c.arguments.clone(),
                        },
                    })
                    .collect()
            }),
        }
    }

    fn convert_tool(tool: &ToolDefinition) -> ChatTool {
        ChatTool {
            r#type: "function".to_string(),
            function: ChatFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        stream: bool,
    ) -> ChatRequest {
        ChatRequest {
            model: self.config.model.clone(),
            messages: messages.iter().map(Self::convert_message).collect(),
            stream,
            tools: if tools.is_empty() {
                None
            } else {
                Some(tools.iter().map(Self::convert_tool).collect())
            },
        }
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Network(sanitize_api_error(&e.to_string())))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Api(sanitize_api_error(&error_text)));
        }

        Ok(response)
    }
}

#[async_trait::async_trait]
impl GenerationClient for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compat"
    }

    #[instrument(skip(self, messages, tools), fields(model = %self.config.model, turns = messages.len()))]
    async fn stream_generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<mpsc::Receiver<Result<StreamEvent>>> {
        let request = self.build_request(messages, tools, true);
        let response = self.post(&request).await?;

        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(async move {
            let mut body = response.bytes_stream();
            let mut buffer = String::new();
            let mut finished = false;

            'outer: while let Some(piece) = body.next().await {
                let piece = match piece {
                    Ok(p) => p,
                    Err(e) => {
                        let _ = tx.send(Err(Error::Stream(e.to_string()))).await;
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&piece));

                // Chunks may split lines anywhere; only complete lines parse.
                while let Some(pos) = buffer.find('\n') {
                    let line = buffer[..pos].trim_end_matches('\r').to_string();
                    buffer.drain(..=pos);

                    if line.trim() == "data: [DONE]" {
                        finished = true;
                        break 'outer;
                    }
                    match parse_sse_line(&line) {
                        Ok(Some(events)) => {
                            for event in events {
                                if tx.send(Ok(event)).await.is_err() {
                                    return;
                                }
                            }
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!(error = %e, "skipping malformed stream chunk");
                        }
                    }
                }
            }

            if finished {
                let _ = tx.send(Ok(StreamEvent::Done)).await;
            } else {
                let _ = tx
                    .send(Err(Error::Stream(
                        "stream closed before completion".to_string(),
                    )))
                    .await;
            }
        });

        Ok(rx)
    }

    #[instrument(skip(self, messages, tools), fields(model = %self.config.model, turns = messages.len()))]
    async fn generate(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<GenerationTurn> {
        let request = self.build_request(messages, tools, false);
        debug!("sending non-streaming chat request");
        let response = self.post(&request).await?;

        let chat_response: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;

        let choice = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::InvalidResponse("no choices in response".to_string()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| ToolCall {
                id: tc.id,
                name: tc.function.name,
                arguments: tc.function.arguments,
            })
            .collect();

        Ok(GenerationTurn {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = OpenAiCompatConfig::new("test-key")
            .with_base_url("http://localhost:8080/v1")
            .with_model("llama-3.1-8b-instant")
            .with_timeout(Duration::from_secs(30));

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "http://localhost:8080/v1");
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_api_key_masking() {
        let masked = mask_api_key("sk-1234567890abcdefghijklmnop");
        assert!(masked.starts_with("sk-1"));
        assert!(masked.ends_with("mnop"));
        assert!(masked.contains("..."));
    }

    #[test]
    fn test_config_debug_masks_key() {
        let config = OpenAiCompatConfig::new("sk-1234567890abcdefghijklmnop");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("1234567890abcdefghijkl"));
    }

    #[test]
    fn test_sanitize_api_error() {
        let sanitized = sanitize_api_error("Invalid API key: sk-1234567890");
        assert!(!sanitized.contains("sk-"));
        assert!(sanitized.contains("OPENAI_API_KEY"));
    }

    #[test]
    fn test_parse_sse_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Salom"}}]}"#;
        let events = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(events, vec![StreamEvent::ContentDelta("Salom".to_string())]);
    }

    #[test]
    fn test_parse_sse_tool_call_delta() {
        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"id":"call_1","function":{"name":"get_weather","arguments":""}}]}}]}"#;
        let events = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::ToolCallDelta {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some("get_weather".to_string()),
                arguments: String::new(),
            }]
        );

        let line = r#"data: {"choices":[{"delta":{"tool_calls":[{"index":0,"function":{"arguments":"{\"city\""}}]}}]}"#;
        let events = parse_sse_line(line).unwrap().unwrap();
        assert_eq!(
            events,
            vec![StreamEvent::ToolCallDelta {
                index: 0,
                id: None,
                name: None,
                arguments: "{\"city\"".to_string(),
            }]
        );
    }

    #[test]
    fn test_parse_sse_ignores_non_data_lines() {
        assert!(parse_sse_line("").unwrap().is_none());
        assert!(parse_sse_line(": keep-alive").unwrap().is_none());
        assert!(parse_sse_line("data: [DONE]").unwrap().is_none());
    }

    #[test]
    fn test_parse_sse_malformed_is_error() {
        assert!(parse_sse_line("data: {not json").is_err());
    }
}
