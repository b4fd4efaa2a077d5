use super::conversation::Conversation;
use super::observer::{LoopObserver, NullObserver};
use crate::config::Config;
use crate::error::{AssistError, FailureKind, LlmError, classify_backend_error};
use crate::llm::traits::{Provider, messages_to_text};
use crate::llm::types::{ContentBlock, ProviderMessage, ProviderResponse, StopReason, ToolCall};
use crate::tools::{ToolExecutor, ToolSpec};
use std::sync::Arc;

// ── Constants ────────────────────────────────────────────────────────────────

/// Follow-up text used when the model requested tools without saying
/// anything and no executor is configured.
const NO_TOOL_OUTPUT_NOTE: &str =
    "No tool output is available. Answer with the information you already have.";

// ── Public types ─────────────────────────────────────────────────────────────

/// Bounded counter of backend submissions for one run.
///
/// Incremented once per attempted submission, failed attempts included,
/// and checked before the submission is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IterationBudget {
    used: u32,
    max: u32,
}

impl IterationBudget {
    pub fn new(max: u32) -> Self {
        Self { used: 0, max }
    }

    /// Count one attempt. Returns `false` once the count exceeds the maximum.
    pub fn try_consume(&mut self) -> bool {
        self.used = self.used.saturating_add(1);
        self.used <= self.max
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn max(&self) -> u32 {
        self.max
    }
}

/// Why a run stopped without a final answer.
#[derive(Debug)]
pub enum AbortReason {
    /// The budget check failed before the next submission.
    MaxIterations { max: u32 },
    /// A backend failure classified as permanent.
    BackendFailure(anyhow::Error),
}

/// Controller state. `Completed` and `Aborted` are terminal.
#[derive(Debug)]
pub enum LoopState {
    Running,
    Completed(String),
    Aborted(AbortReason),
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Final output of a [`ToolLoop::run`] invocation.
#[derive(Debug)]
pub struct ToolLoopResult {
    /// Always terminal.
    pub state: LoopState,
    /// Backend submissions actually made.
    pub submissions: u32,
    /// Budget units consumed, including an attempt refused by the cap.
    pub budget_used: u32,
    pub backend_failures: u32,
    pub tokens_used: Option<u64>,
    /// Stop reason of the last successful reply.
    pub stop_reason: Option<StopReason>,
    /// Model version the backend reported, if any.
    pub model_version: Option<String>,
    pub conversation: Conversation,
}

impl ToolLoopResult {
    pub fn final_text(&self) -> Option<&str> {
        match &self.state {
            LoopState::Completed(text) => Some(text),
            LoopState::Running | LoopState::Aborted(_) => None,
        }
    }

    /// Collapse the run into the caller-facing answer or error.
    pub fn into_final_text(self) -> crate::error::Result<String> {
        match self.state {
            LoopState::Completed(text) => Ok(text),
            LoopState::Aborted(AbortReason::MaxIterations { max }) => {
                Err(AssistError::BudgetExhausted { max })
            }
            LoopState::Aborted(AbortReason::BackendFailure(err)) => {
                Err(match err.downcast::<LlmError>() {
                    Ok(llm) => AssistError::Llm(llm),
                    Err(other) => AssistError::Other(other),
                })
            }
            LoopState::Running => Err(AssistError::Other(anyhow::anyhow!(
                "tool loop returned before reaching a terminal state"
            ))),
        }
    }
}

/// Drives the submit → inspect → append cycle against one provider until
/// the model answers or the iteration budget runs out.
pub struct ToolLoop {
    provider: Arc<dyn Provider>,
    executor: Option<Arc<dyn ToolExecutor>>,
    observer: Arc<dyn LoopObserver>,
    model: String,
    system_prompt: String,
    temperature: f64,
    max_iterations: u32,
    verbose: bool,
    abort_on_permanent_errors: bool,
}

// ── Internal types ───────────────────────────────────────────────────────────

/// Mutable bookkeeping for one run.
struct RunState {
    conversation: Conversation,
    budget: IterationBudget,
    tools: Vec<ToolSpec>,
    submissions: u32,
    backend_failures: u32,
    total_tokens: u64,
    has_token_info: bool,
    stop_reason: Option<StopReason>,
    model_version: Option<String>,
}

impl RunState {
    fn record_reply(&mut self, response: &ProviderResponse) {
        if let Some(tokens) = response.total_tokens() {
            self.total_tokens += tokens;
            self.has_token_info = true;
        }
        self.stop_reason = response.stop_reason;
        if let Some(model) = &response.model {
            self.model_version = Some(model.clone());
        }
    }

    fn into_result(self, state: LoopState) -> ToolLoopResult {
        ToolLoopResult {
            state,
            submissions: self.submissions,
            budget_used: self.budget.used(),
            backend_failures: self.backend_failures,
            tokens_used: self.has_token_info.then_some(self.total_tokens),
            stop_reason: self.stop_reason,
            model_version: self.model_version,
            conversation: self.conversation,
        }
    }
}

// ── Implementation ───────────────────────────────────────────────────────────

impl ToolLoop {
    pub fn new(provider: Arc<dyn Provider>, config: &Config) -> Self {
        Self {
            provider,
            executor: None,
            observer: Arc::new(NullObserver),
            model: config.model.clone(),
            system_prompt: config.system_prompt.clone(),
            temperature: config.temperature,
            max_iterations: config.max_iterations,
            verbose: config.verbose,
            abort_on_permanent_errors: config.abort_on_permanent_errors,
        }
    }

    /// Satisfy pending tool calls with `executor` instead of echoing the
    /// model's text back as the follow-up turn.
    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoopObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run the loop to a terminal state.
    ///
    /// Never returns `LoopState::Running`. Backend failures are retried
    /// against the unchanged conversation until the budget runs out; a
    /// permanent one ends the run only when `abort_on_permanent_errors` is
    /// set.
    pub async fn run(&self, user_prompt: &str) -> ToolLoopResult {
        let mut run = RunState {
            conversation: Conversation::initialize(user_prompt),
            budget: IterationBudget::new(self.max_iterations),
            tools: self
                .executor
                .as_ref()
                .map(|executor| executor.specs())
                .unwrap_or_default(),
            submissions: 0,
            backend_failures: 0,
            total_tokens: 0,
            has_token_info: false,
            stop_reason: None,
            model_version: None,
        };

        let mut state = LoopState::Running;
        while !state.is_terminal() {
            state = self.step(&mut run).await;
        }

        match &state {
            LoopState::Completed(_) => tracing::info!(
                iterations = run.submissions,
                backend_failures = run.backend_failures,
                stop_reason = ?run.stop_reason,
                model_version = run.model_version.as_deref().unwrap_or(&self.model),
                "Model produced a final answer"
            ),
            LoopState::Aborted(reason) => tracing::info!(
                iterations = run.submissions,
                backend_failures = run.backend_failures,
                ?reason,
                "Tool loop aborted"
            ),
            LoopState::Running => {}
        }
        tracing::debug!(
            transcript = %messages_to_text(run.conversation.messages()),
            "Final conversation"
        );

        run.into_result(state)
    }

    /// One pass of the state machine.
    async fn step(&self, run: &mut RunState) -> LoopState {
        if !run.budget.try_consume() {
            return LoopState::Aborted(AbortReason::MaxIterations {
                max: run.budget.max(),
            });
        }
        let iteration = run.budget.used();
        tracing::debug!(
            iteration,
            max_iterations = run.budget.max(),
            messages = run.conversation.len(),
            "Submitting conversation"
        );

        run.submissions += 1;
        let result = self
            .provider
            .chat_with_tools(
                Some(&self.system_prompt),
                run.conversation.messages(),
                &run.tools,
                &self.model,
                self.temperature,
            )
            .await;
        let response = match result {
            Ok(response) => response,
            Err(err) => return self.handle_backend_error(run, iteration, err),
        };

        run.record_reply(&response);
        tracing::debug!(
            iteration,
            stop_reason = ?response.stop_reason,
            candidates = response.candidates.len(),
            "Backend replied"
        );
        if self.verbose {
            self.report_usage(iteration, &response);
        }

        run.conversation.append_model_turn(&response);

        let calls = response.pending_tool_calls();
        if calls.is_empty() {
            return LoopState::Completed(response.text);
        }

        tracing::debug!(iteration, tool_calls = calls.len(), "Model requested tools");
        self.observer.on_tool_calls(iteration, &calls);
        let followup = self.build_followup(&response, &calls).await;
        run.conversation.append_followup(followup);
        LoopState::Running
    }

    fn handle_backend_error(
        &self,
        run: &mut RunState,
        iteration: u32,
        err: anyhow::Error,
    ) -> LoopState {
        run.backend_failures += 1;
        let kind = classify_backend_error(&err);
        tracing::warn!(
            iteration,
            provider = self.provider.name(),
            ?kind,
            "Backend call failed: {err}"
        );
        self.observer.on_backend_error(iteration, &err, kind);

        if kind == FailureKind::Permanent && self.abort_on_permanent_errors {
            LoopState::Aborted(AbortReason::BackendFailure(err))
        } else {
            LoopState::Running
        }
    }

    fn report_usage(&self, iteration: u32, response: &ProviderResponse) {
        match (response.input_tokens, response.output_tokens) {
            (Some(prompt), Some(completion)) => {
                self.observer.on_usage(iteration, prompt, completion);
            }
            _ => tracing::debug!(iteration, "Reply carried no usage metadata"),
        }
    }

    /// The user-side turn that answers a tool-call round.
    async fn build_followup(
        &self,
        response: &ProviderResponse,
        calls: &[ToolCall],
    ) -> ProviderMessage {
        let Some(executor) = &self.executor else {
            let text = if response.text.is_empty() {
                NO_TOOL_OUTPUT_NOTE.to_string()
            } else {
                response.text.clone()
            };
            return ProviderMessage::user(text);
        };

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = executor.execute(call).await;
            tracing::debug!(
                tool = call.name.as_str(),
                success = result.success,
                "Tool executed"
            );
            results.push(ContentBlock::ToolResult {
                tool_use_id: call.id.clone(),
                name: call.name.clone(),
                content: result.content(),
                is_error: !result.success,
            });
        }
        ProviderMessage::tool_results(results)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
