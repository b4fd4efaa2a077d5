use crate::error::FailureKind;
use crate::llm::types::ToolCall;

/// Side-channel notifications from the iteration controller.
///
/// Observers report; they never influence control flow. Every method has a
/// no-op default so implementors pick the events they care about.
pub trait LoopObserver: Send + Sync {
    /// Token counts of a successful reply. Only emitted in verbose mode.
    fn on_usage(&self, _iteration: u32, _prompt_tokens: u64, _completion_tokens: u64) {}

    /// A backend call failed; `kind` says whether the loop will retry.
    fn on_backend_error(&self, _iteration: u32, _error: &anyhow::Error, _kind: FailureKind) {}

    /// The model asked for tools; emitted before the follow-up is appended.
    fn on_tool_calls(&self, _iteration: u32, _calls: &[ToolCall]) {}
}

/// Observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl LoopObserver for NullObserver {}
