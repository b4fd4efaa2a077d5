use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use code_assistant::agent::{AbortReason, LoopState, ToolLoop};
use code_assistant::config::Config;
use code_assistant::error::{AssistError, LlmError};
use code_assistant::llm::{ContentBlock, GeminiProvider, MessageRole};
use code_assistant::tools::{Tool, ToolRegistry, ToolResult};
use serde_json::{Value, json};
use wiremock::{MockServer, ResponseTemplate};

use crate::gemini_mock::{
    MODEL, base_url, function_call_reply, mount_always, mount_sequence, request_bodies,
    server_error, text_reply,
};

struct ListFilesTool;

impl Tool for ListFilesTool {
    fn name(&self) -> &str {
        "get_files_info"
    }

    fn description(&self) -> &str {
        "List files in a directory"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"directory": {"type": "string"}},
        })
    }

    fn execute<'a>(
        &'a self,
        args: Value,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<ToolResult>> + Send + 'a>> {
        Box::pin(async move {
            let directory = args["directory"].as_str().unwrap_or(".");
            Ok(ToolResult::ok(format!("{directory}/main.py\n{directory}/tests.py")))
        })
    }
}

fn config(max_iterations: u32) -> Config {
    Config {
        api_key: Some("test-key".into()),
        model: MODEL.into(),
        max_iterations,
        ..Config::default()
    }
}

fn aborting_config(max_iterations: u32) -> Config {
    Config {
        abort_on_permanent_errors: true,
        ..config(max_iterations)
    }
}

fn provider(server: &MockServer, api_key: Option<&str>) -> Arc<GeminiProvider> {
    Arc::new(GeminiProvider::new(api_key, &base_url(server), 5))
}

#[tokio::test]
async fn immediate_answer_makes_one_call() {
    let server = MockServer::start().await;
    mount_sequence(&server, vec![text_reply("4")]).await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(3))
        .run("2+2?")
        .await;

    assert_eq!(result.final_text(), Some("4"));
    assert_eq!(result.submissions, 1);
    assert_eq!(result.tokens_used, Some(10));

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["contents"][0]["role"], "user");
    assert_eq!(bodies[0]["contents"][0]["parts"][0]["text"], "2+2?");
    assert!(bodies[0]["systemInstruction"]["parts"][0]["text"].is_string());
}

#[tokio::test]
async fn endless_function_calls_exhaust_budget() {
    let server = MockServer::start().await;
    mount_always(
        &server,
        function_call_reply("get_files_info", json!({"directory": "."})),
    )
    .await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(3))
        .run("list everything")
        .await;

    assert!(matches!(
        result.state,
        LoopState::Aborted(AbortReason::MaxIterations { max: 3 })
    ));
    assert_eq!(request_bodies(&server).await.len(), 3);
    assert_eq!(
        result.into_final_text().unwrap_err().to_string(),
        "Maximum iterations (3) reached."
    );
}

#[tokio::test]
async fn server_error_is_retried_with_same_contents() {
    let server = MockServer::start().await;
    mount_sequence(&server, vec![server_error(), text_reply("ok")]).await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(3))
        .run("hello")
        .await;

    assert_eq!(result.final_text(), Some("ok"));
    assert_eq!(result.submissions, 2);
    assert_eq!(result.backend_failures, 1);

    let bodies = request_bodies(&server).await;
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["contents"], bodies[1]["contents"]);
}

#[tokio::test]
async fn function_call_without_executor_grows_transcript() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            function_call_reply("get_files_info", json!({"directory": "pkg"})),
            text_reply("done"),
        ],
    )
    .await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(5))
        .run("what is in pkg?")
        .await;

    assert_eq!(result.final_text(), Some("done"));
    let bodies = request_bodies(&server).await;
    let second = bodies[1]["contents"].as_array().unwrap();
    assert_eq!(second.len(), 3);
    assert_eq!(second[1]["role"], "model");
    assert_eq!(second[1]["parts"][0]["functionCall"]["name"], "get_files_info");
    assert_eq!(second[2]["role"], "user");
    assert!(second[2]["parts"][0]["text"].is_string());
}

#[tokio::test]
async fn registry_results_are_sent_as_function_responses() {
    let server = MockServer::start().await;
    mount_sequence(
        &server,
        vec![
            function_call_reply("get_files_info", json!({"directory": "pkg"})),
            text_reply("pkg has two files"),
        ],
    )
    .await;

    let mut registry = ToolRegistry::default();
    registry.register(Box::new(ListFilesTool));

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(5))
        .with_executor(Arc::new(registry))
        .run("what is in pkg?")
        .await;

    assert_eq!(result.final_text(), Some("pkg has two files"));

    let bodies = request_bodies(&server).await;
    assert_eq!(
        bodies[0]["tools"][0]["functionDeclarations"][0]["name"],
        "get_files_info"
    );
    let followup = &bodies[1]["contents"][2];
    assert_eq!(followup["role"], "user");
    assert_eq!(
        followup["parts"][0]["functionResponse"]["response"]["output"],
        "pkg/main.py\npkg/tests.py"
    );

    let messages = result.conversation.messages();
    assert_eq!(messages[2].role, MessageRole::User);
    assert!(matches!(messages[2].content[0], ContentBlock::ToolResult { .. }));
}

#[tokio::test]
async fn missing_api_key_is_retried_until_budget() {
    let server = MockServer::start().await;
    mount_always(&server, text_reply("unreachable")).await;

    let result = ToolLoop::new(provider(&server, None), &config(3))
        .run("hi")
        .await;

    assert!(request_bodies(&server).await.is_empty());
    assert_eq!(result.submissions, 3);
    assert_eq!(result.backend_failures, 3);
    assert!(matches!(
        result.into_final_text(),
        Err(AssistError::BudgetExhausted { max: 3 })
    ));
}

#[tokio::test]
async fn missing_api_key_aborts_when_opted_in() {
    let server = MockServer::start().await;
    mount_always(&server, text_reply("unreachable")).await;

    let result = ToolLoop::new(provider(&server, None), &aborting_config(3))
        .run("hi")
        .await;

    assert_eq!(result.submissions, 1);
    assert!(matches!(
        result.into_final_text(),
        Err(AssistError::Llm(LlmError::Auth { .. }))
    ));
}

fn bad_request() -> ResponseTemplate {
    ResponseTemplate::new(400).set_body_string(
        r#"{"error":{"code":400,"message":"model not found","status":"INVALID_ARGUMENT"}}"#,
    )
}

#[tokio::test]
async fn rejected_request_is_retried_with_same_contents() {
    let server = MockServer::start().await;
    mount_sequence(&server, vec![bad_request(), text_reply("ok")]).await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &config(5))
        .run("hi")
        .await;

    assert_eq!(result.final_text(), Some("ok"));
    assert_eq!(result.submissions, 2);
    let bodies = request_bodies(&server).await;
    assert_eq!(bodies[0]["contents"], bodies[1]["contents"]);
}

#[tokio::test]
async fn rejected_request_aborts_when_opted_in() {
    let server = MockServer::start().await;
    mount_always(&server, bad_request()).await;

    let result = ToolLoop::new(provider(&server, Some("test-key")), &aborting_config(5))
        .run("hi")
        .await;

    assert_eq!(result.submissions, 1);
    assert!(matches!(
        result.into_final_text(),
        Err(AssistError::Llm(LlmError::Status { status: 400, .. }))
    ));
}
