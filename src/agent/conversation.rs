use crate::llm::types::{ProviderMessage, ProviderResponse};

/// Append-only transcript submitted to the backend on every iteration.
///
/// Insertion order is the chronology the model sees. Messages are never
/// edited or removed once appended; the only mutators are the three
/// `initialize`/`append_*` operations.
#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<ProviderMessage>,
}

impl Conversation {
    /// Start a conversation holding exactly one user message with the
    /// prompt text, verbatim.
    pub fn initialize(user_prompt: &str) -> Self {
        Self {
            messages: vec![ProviderMessage::user(user_prompt)],
        }
    }

    /// Append one model message per candidate the backend returned,
    /// preserving each candidate's blocks as-is.
    pub fn append_model_turn(&mut self, response: &ProviderResponse) {
        self.messages.extend(response.candidates.iter().cloned());
    }

    /// Append the user-side turn that continues the exchange after a
    /// tool-call round.
    pub fn append_followup(&mut self, message: ProviderMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ProviderMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ProviderMessage> {
        self.messages.last()
    }
}
