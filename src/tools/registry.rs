use super::traits::{Tool, ToolExecutor, ToolResult, ToolSpec};
use crate::llm::types::ToolCall;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Name-indexed set of tools, usable as the loop's [`ToolExecutor`].
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let tool: Arc<dyn Tool> = Arc::from(tool);
        self.tools.insert(tool.name().to_string(), tool);
    }
}

impl ToolExecutor for ToolRegistry {
    fn specs(&self) -> Vec<ToolSpec> {
        let mut specs: Vec<ToolSpec> = self.tools.values().map(|tool| tool.spec()).collect();
        specs.sort_by(|a, b| a.name.cmp(&b.name));
        specs
    }

    fn execute<'a>(
        &'a self,
        call: &'a ToolCall,
    ) -> Pin<Box<dyn Future<Output = ToolResult> + Send + 'a>> {
        Box::pin(async move {
            let Some(tool) = self.tools.get(&call.name) else {
                return ToolResult::failed(format!("Tool not found: {}", call.name));
            };

            match tool.execute(call.args.clone()).await {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(tool = call.name.as_str(), "Tool execution failed: {e}");
                    ToolResult::failed(e.to_string())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    struct EchoTool;

    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the `text` argument"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        fn execute<'a>(
            &'a self,
            args: Value,
        ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
            Box::pin(async move {
                match args["text"].as_str() {
                    Some(text) => Ok(ToolResult::ok(text)),
                    None => anyhow::bail!("missing text"),
                }
            })
        }
    }

    fn call(name: &str, args: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            args,
        }
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(Box::new(EchoTool));
        registry
    }

    #[test]
    fn register_exposes_names_and_specs() {
        let registry = registry();
        let specs = registry.specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "echo");
        assert_eq!(specs[0].parameters["type"], "object");
    }

    #[tokio::test]
    async fn execute_runs_registered_tool() {
        let registry = registry();
        let result = registry.execute(&call("echo", json!({"text": "hi"}))).await;
        assert_eq!(result, ToolResult::ok("hi"));
    }

    #[tokio::test]
    async fn unknown_tool_is_reported_not_raised() {
        let registry = registry();
        let result = registry.execute(&call("rm_rf", json!({}))).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Tool not found: rm_rf"));
    }

    #[tokio::test]
    async fn tool_errors_become_failed_results() {
        let registry = registry();
        let result = registry.execute(&call("echo", json!({}))).await;
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("missing text"));
    }
}
