use crate::llm::types::ToolCall;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
}

impl ToolResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: String::new(),
            error: Some(error.into()),
        }
    }

    /// Text handed back to the model as the function response.
    pub fn content(&self) -> String {
        if let Some(ref error) = self.error {
            format!("[ERROR] {error}")
        } else {
            self.output.clone()
        }
    }
}

/// Description of a tool for the LLM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A capability the model can invoke by name.
pub trait Tool: Send + Sync {
    /// Tool name (used in LLM function calling)
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the tool with given arguments
    fn execute<'a>(
        &'a self,
        args: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>>;

    /// Get the full spec for LLM registration
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Capability the iteration controller uses to satisfy pending tool calls.
///
/// Failures are reported inside the returned [`ToolResult`] so the model can
/// see them; an executor never aborts the loop.
pub trait ToolExecutor: Send + Sync {
    /// Declarations advertised to the model on every submission.
    fn specs(&self) -> Vec<ToolSpec>;

    fn execute<'a>(&'a self, call: &'a ToolCall)
    -> Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>>;
}
