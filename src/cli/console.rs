use crate::agent::LoopObserver;
use crate::error::FailureKind;
use crate::llm::scrub_secret_patterns;

/// Prints loop events for a person watching the terminal.
///
/// Token counts go to stdout next to the answer. Retried backend errors go
/// to stderr; a failure that ends the run is reported once by the caller.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleObserver {
    aborts_on_permanent: bool,
}

impl ConsoleObserver {
    pub fn new(aborts_on_permanent: bool) -> Self {
        Self { aborts_on_permanent }
    }
}

impl LoopObserver for ConsoleObserver {
    fn on_usage(&self, _iteration: u32, prompt_tokens: u64, completion_tokens: u64) {
        println!("Prompt tokens: {prompt_tokens}");
        println!("Response tokens: {completion_tokens}");
    }

    fn on_backend_error(&self, iteration: u32, error: &anyhow::Error, kind: FailureKind) {
        if kind == FailureKind::Permanent && self.aborts_on_permanent {
            return;
        }
        let message = format!("{error:#}");
        eprintln!(
            "Error calling the model (attempt {iteration}, retrying): {}",
            scrub_secret_patterns(&message)
        );
    }
}
