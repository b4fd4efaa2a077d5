// ── Infrastructure ───────────────────────────────────────────────────────────
pub mod http_client;
pub mod scrub;
pub mod traits;
pub mod types;

// ── Provider implementations ────────────────────────────────────────────────
pub mod gemini;

// ── Infrastructure re-exports ───────────────────────────────────────────────
pub use http_client::build_provider_client_with_timeout;
pub use scrub::{sanitize_api_error, scrub_secret_patterns};
pub use traits::{Provider, messages_to_text};
pub use types::{
    ContentBlock, MessageRole, ProviderMessage, ProviderResponse, StopReason, ToolCall,
};

// ── Provider re-exports ─────────────────────────────────────────────────────
pub use gemini::GeminiProvider;
