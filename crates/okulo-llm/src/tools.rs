//! Tool calling types and the executor registry
//!
//! Tools are registered under their function name. The registry exports
//! definitions for the model's tool catalog and dispatches calls that come
//! back from a generation turn.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Tool definition for function calling
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// JSON schema for parameters
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}

/// A tool call requested by the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique ID for this tool call
    pub id: String,
    /// Tool name
    pub name: String,
    /// Arguments as JSON string
    pub arguments: String,
}

impl ToolCall {
    /// Parse arguments as a typed value
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.arguments).map_err(|e| Error::InvalidResponse(e.to_string()))
    }
}

/// An executable tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Definition exported in the model's tool catalog
    fn definition(&self) -> ToolDefinition;

    /// Execute with the raw JSON arguments string, returning the tool output
    async fn invoke(&self, arguments: &str) -> Result<String>;
}

/// Registry mapping tool names to executors
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        debug!(tool = %name, "registered tool");
        self.tools.insert(name, tool);
    }

    /// Definitions of every registered tool
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Number of registered tools
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// True when no tools are registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Execute a call, returning the tool output.
    ///
    /// Unknown names and execution failures are reported as `Err`; the
    /// caller decides whether to surface them to the model as a tool turn.
    pub async fn execute(&self, call: &ToolCall) -> Result<String> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        tool.invoke(&call.arguments).await.map_err(|e| {
            warn!(tool = %call.name, error = %e, "tool execution failed");
            Error::ToolFailed(call.name.clone(), e.to_string())
        })
    }
}
