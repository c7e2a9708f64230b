//! Message and conversation types
//!
//! A [`Conversation`] is the single mutable piece of dialogue state. It is
//! seeded with a system persona and grows by whole turns only: callers stage
//! changes on a clone and commit the clone back once a turn fully succeeds.

use crate::tools::ToolCall;
use serde::{Deserialize, Serialize};

/// Role in a conversation message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System message (persona and instructions)
    System,
    /// User message
    User,
    /// Assistant message
    Assistant,
    /// Tool response
    Tool,
}

impl MessageRole {
    /// Returns the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// A message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: MessageRole,
    /// Message content
    pub content: String,
    /// Tool call ID (for tool responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Name (for tool responses)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls issued by this assistant turn
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

impl Message {
    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: None,
        }
    }

    /// Create an assistant message that requests tool calls
    #[must_use]
    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            tool_call_id: None,
            name: None,
            tool_calls: Some(calls),
        }
    }

    /// Create a tool response message
    #[must_use]
    pub fn tool_response(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            content: content.into(),
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            tool_calls: None,
        }
    }
}

/// Ordered dialogue history, seeded with a system persona
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Create a conversation seeded with the given system persona
    #[must_use]
    pub fn new(persona: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(persona)],
        }
    }

    /// Append a message
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// All messages in order
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages including the system turn
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when only the system turn is present
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.len() <= 1
    }

    /// The most recent message, if any beyond the persona
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_creation() {
        let system = Message::system("You are a friendly companion");
        assert_eq!(system.role, MessageRole::System);

        let user = Message::user("Salom!");
        assert_eq!(user.role, MessageRole::User);

        let tool = Message::tool_response("call_123", "get_weather", r#"{"temp": 21}"#);
        assert_eq!(tool.role, MessageRole::Tool);
        assert_eq!(tool.tool_call_id, Some("call_123".to_string()));
        assert_eq!(tool.name, Some("get_weather".to_string()));
    }

    #[test]
    fn test_message_role_as_str() {
        assert_eq!(MessageRole::System.as_str(), "system");
        assert_eq!(MessageRole::User.as_str(), "user");
        assert_eq!(MessageRole::Assistant.as_str(), "assistant");
        assert_eq!(MessageRole::Tool.as_str(), "tool");
    }

    #[test]
    fn test_conversation_seeded_with_persona() {
        let convo = Conversation::new("You are a desk robot");
        assert_eq!(convo.len(), 1);
        assert!(convo.is_empty());
        assert_eq!(convo.messages()[0].role, MessageRole::System);
    }

    #[test]
    fn test_conversation_push_order() {
        let mut convo = Conversation::new("persona");
        convo.push(Message::user("hi"));
        convo.push(Message::assistant("hello"));
        assert_eq!(convo.len(), 3);
        assert_eq!(convo.last().unwrap().role, MessageRole::Assistant);
    }
}
