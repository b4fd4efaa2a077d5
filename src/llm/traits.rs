use super::types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse};
use crate::tools::ToolSpec;
use std::future::Future;
use std::pin::Pin;

/// Render a conversation as plain text, skipping tool blocks.
pub fn messages_to_text(messages: &[ProviderMessage]) -> String {
    messages
        .iter()
        .filter_map(|msg| {
            let role_label = match msg.role {
                MessageRole::User => "User:",
                MessageRole::Model => "Model:",
            };
            let text_parts: Vec<&str> = msg
                .content
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    ContentBlock::ToolUse { .. } | ContentBlock::ToolResult { .. } => None,
                })
                .collect();
            if text_parts.is_empty() {
                None
            } else {
                Some(format!("{} {}", role_label, text_parts.join(" ")))
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// A hosted model that accepts a conversation and returns text and/or
/// tool-call requests.
pub trait Provider: Send + Sync {
    /// Provider identifier (e.g. "gemini").
    fn name(&self) -> &str;

    /// Submit the whole conversation once.
    ///
    /// Errors should carry a [`crate::error::LlmError`] where the failure
    /// kind is known, so the caller can tell transient from permanent
    /// failures.
    fn chat_with_tools<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>>;
}
