//! Google Gemini `generateContent` provider.
//!
//! The API key is passed in explicitly by the caller (see
//! [`crate::config::Config`]); this module never reads the environment.

use crate::error::LlmError;
use crate::llm::{
    build_provider_client_with_timeout, sanitize_api_error, scrub_secret_patterns,
    traits::Provider,
    types::{ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason},
};
use crate::tools::ToolSpec;
use reqwest::Client;
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

mod types;
use types::{
    Candidate, Content, GeminiFunctionCall, GeminiFunctionDeclaration, GeminiFunctionResponse,
    GeminiTool, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
    ResponsePart,
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const PROVIDER_NAME: &str = "gemini";
const MAX_OUTPUT_TOKENS: u32 = 8192;

/// Gemini provider authenticated with an API key.
pub struct GeminiProvider {
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(api_key: Option<&str>, base_url: &str, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()).map(String::from),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_provider_client_with_timeout(timeout_secs),
        }
    }

    fn model_name(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{model}")
        }
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.api_key.as_deref().ok_or_else(|| LlmError::Auth {
            provider: PROVIDER_NAME.into(),
            message: "Gemini API key not found. Set GEMINI_API_KEY or `api_key` in \
                      ~/.code-assistant/config.toml (keys: https://aistudio.google.com/app/apikey)"
                .into(),
        })
    }

    fn build_gemini_tools(tools: &[ToolSpec]) -> Option<Vec<GeminiTool>> {
        if tools.is_empty() {
            return None;
        }
        let function_declarations = tools
            .iter()
            .map(|tool| GeminiFunctionDeclaration {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            })
            .collect();
        Some(vec![GeminiTool {
            function_declarations,
        }])
    }

    fn object_args(args: &Value) -> Value {
        if args.is_object() {
            args.clone()
        } else {
            let mut wrapped = Map::new();
            wrapped.insert("input".to_string(), args.clone());
            Value::Object(wrapped)
        }
    }

    fn map_provider_message(provider_message: &ProviderMessage) -> Content {
        let role = match provider_message.role {
            MessageRole::Model => "model",
            MessageRole::User => "user",
        }
        .to_string();

        let parts = provider_message
            .content
            .iter()
            .map(|block| match block {
                ContentBlock::Text { text } => Part::text(text.clone()),
                ContentBlock::ToolUse { id, name, input } => {
                    Part::function_call(GeminiFunctionCall {
                        name: name.clone(),
                        args: Self::object_args(input),
                        id: Some(id.clone()),
                    })
                }
                ContentBlock::ToolResult {
                    name,
                    content,
                    is_error,
                    ..
                } => {
                    let response = if *is_error {
                        serde_json::json!({ "error": content })
                    } else {
                        serde_json::json!({ "output": content })
                    };
                    Part::function_response(GeminiFunctionResponse {
                        name: name.clone(),
                        response,
                    })
                }
            })
            .collect();

        Content {
            role: Some(role),
            parts,
        }
    }

    fn build_tools_request(
        system_prompt: Option<&str>,
        messages: &[ProviderMessage],
        tools: &[ToolSpec],
        temperature: f64,
    ) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: messages.iter().map(Self::map_provider_message).collect(),
            system_instruction: system_prompt.map(|system| Content {
                role: None,
                parts: vec![Part::text(system.to_string())],
            }),
            tools: Self::build_gemini_tools(tools),
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }

    fn map_stop_reason(candidate: &Candidate) -> StopReason {
        if candidate
            .content
            .parts
            .iter()
            .any(|part| part.function_call.is_some())
        {
            return StopReason::ToolUse;
        }

        match candidate.finish_reason.as_deref() {
            Some("STOP") => StopReason::EndTurn,
            Some("MAX_TOKENS") => StopReason::MaxTokens,
            Some("SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT") => {
                StopReason::Safety
            }
            Some(_) | None => StopReason::Error,
        }
    }

    fn parse_content_blocks(parts: &[ResponsePart], tool_call_index: &mut usize) -> Vec<ContentBlock> {
        let mut blocks = Vec::new();

        for part in parts {
            if let Some(text) = &part.text
                && !text.is_empty()
            {
                blocks.push(ContentBlock::Text { text: text.clone() });
            }

            if let Some(function_call) = &part.function_call {
                let id = function_call
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("gemini_call_{tool_call_index}"));
                *tool_call_index += 1;
                blocks.push(ContentBlock::ToolUse {
                    id,
                    name: function_call.name.clone(),
                    input: Self::object_args(&function_call.args),
                });
            }
        }

        blocks
    }

    /// Fold a decoded API reply into a [`ProviderResponse`].
    ///
    /// Candidates without any content are dropped; a reply with no usable
    /// candidate at all is an [`LlmError::EmptyResponse`].
    fn into_provider_response(
        result: GenerateContentResponse,
    ) -> Result<ProviderResponse, LlmError> {
        let candidates = result.candidates.unwrap_or_default();
        let stop_reason = candidates.first().map(Self::map_stop_reason);

        let mut tool_call_index = 1usize;
        let messages: Vec<ProviderMessage> = candidates
            .iter()
            .map(|candidate| ProviderMessage {
                role: MessageRole::Model,
                content: Self::parse_content_blocks(&candidate.content.parts, &mut tool_call_index),
            })
            .filter(|message| !message.content.is_empty())
            .collect();

        if messages.is_empty() {
            return Err(LlmError::EmptyResponse {
                provider: PROVIDER_NAME.into(),
            });
        }

        let text = messages.first().map(ProviderMessage::text).unwrap_or_default();
        let mut response = ProviderResponse {
            text,
            input_tokens: None,
            output_tokens: None,
            model: None,
            candidates: messages,
            stop_reason,
        };
        if let Some(usage) = result.usage_metadata {
            response = response.with_usage(usage.prompt_token_count, usage.candidates_token_count);
        }
        if let Some(model_version) = result.model_version {
            response = response.with_model(model_version);
        }
        Ok(response)
    }

    fn status_error(status: u16, body: &str) -> LlmError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|value| {
                value["error"]["message"]
                    .as_str()
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| body.to_string());
        let message = sanitize_api_error(&message);
        let provider = PROVIDER_NAME.to_string();

        if is_quota_exhausted(&message) {
            return LlmError::QuotaExhausted { provider, message };
        }
        match status {
            401 | 403 => LlmError::Auth { provider, message },
            429 => LlmError::RateLimited { provider },
            _ => LlmError::Status {
                provider,
                status,
                message,
            },
        }
    }

    async fn call_api_with_request(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, LlmError> {
        let api_key = self.api_key()?;
        let url = format!(
            "{}/{}:generateContent",
            self.base_url,
            Self::model_name(model)
        );

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::status_error(status.as_u16(), &body));
        }

        let result: GenerateContentResponse =
            response.json().await.map_err(|e| transport_error(&e))?;

        if let Some(err) = result.error.as_ref() {
            let message = sanitize_api_error(&err.message);
            tracing::debug!(status = ?err.status, "Gemini returned an error body");
            return Err(match err.code {
                Some(code) => LlmError::Status {
                    provider: PROVIDER_NAME.into(),
                    status: code,
                    message,
                },
                None => LlmError::Request {
                    provider: PROVIDER_NAME.into(),
                    message,
                },
            });
        }

        Ok(result)
    }
}

fn transport_error(err: &reqwest::Error) -> LlmError {
    LlmError::Request {
        provider: PROVIDER_NAME.into(),
        message: scrub_secret_patterns(&err.to_string()).into_owned(),
    }
}

fn is_quota_exhausted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("exceeded your current quota") || lower.contains("billing")
}

impl Part {
    fn text(text: String) -> Self {
        Self {
            text: Some(text),
            function_call: None,
            function_response: None,
        }
    }

    fn function_call(function_call: GeminiFunctionCall) -> Self {
        Self {
            text: None,
            function_call: Some(function_call),
            function_response: None,
        }
    }

    fn function_response(function_response: GeminiFunctionResponse) -> Self {
        Self {
            text: None,
            function_call: None,
            function_response: Some(function_response),
        }
    }
}

impl Provider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn chat_with_tools<'a>(
        &'a self,
        system_prompt: Option<&'a str>,
        messages: &'a [ProviderMessage],
        tools: &'a [ToolSpec],
        model: &'a str,
        temperature: f64,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ProviderResponse>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::build_tools_request(system_prompt, messages, tools, temperature);
            let result = self.call_api_with_request(model, &request).await?;
            Ok(Self::into_provider_response(result)?)
        })
    }
}
