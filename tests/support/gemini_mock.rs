#![allow(dead_code)]

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MODEL: &str = "gemini-2.0-flash-001";
pub const ENDPOINT: &str = "/v1beta/models/gemini-2.0-flash-001:generateContent";

/// Base URL to hand to `GeminiProvider` / `CODE_ASSISTANT_BASE_URL`.
pub fn base_url(server: &MockServer) -> String {
    format!("{}/v1beta", server.uri())
}

pub fn text_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 9, "candidatesTokenCount": 1},
        "modelVersion": MODEL
    }))
}

pub fn function_call_reply(name: &str, args: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [{"functionCall": {"name": name, "args": args}}]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 12, "candidatesTokenCount": 4}
    }))
}

pub fn server_error() -> ResponseTemplate {
    ResponseTemplate::new(503).set_body_string("backend unavailable")
}

/// Serve `replies` once each, in order.
pub async fn mount_sequence(server: &MockServer, replies: Vec<ResponseTemplate>) {
    for reply in replies {
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(reply)
            .up_to_n_times(1)
            .mount(server)
            .await;
    }
}

/// Serve `reply` for every request.
pub async fn mount_always(server: &MockServer, reply: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(reply)
        .mount(server)
        .await;
}

/// Parsed JSON bodies of every request the server received, in order.
pub async fn request_bodies(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}
