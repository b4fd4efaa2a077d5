use thiserror::Error;

// ─── Top-level error hierarchy ───────────────────────────────────────────────

/// Structured error hierarchy for `code-assistant`.
///
/// The iteration controller and the CLI match on these to pick an exit
/// path; internal code continues to use `anyhow::Result` for ad-hoc
/// context chains.
#[derive(Debug, Error)]
pub enum AssistError {
    // ── Config ───────────────────────────────────────────────────────────
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    // ── LLM / Provider ──────────────────────────────────────────────────
    #[error("llm: {0}")]
    Llm(#[from] LlmError),

    // ── Invocation ──────────────────────────────────────────────────────
    #[error("usage: no prompt supplied")]
    Usage,

    // ── Iteration budget ────────────────────────────────────────────────
    #[error("Maximum iterations ({max}) reached.")]
    BudgetExhausted { max: u32 },

    // ── Generic fallthrough (wraps anyhow for interop) ──────────────────
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ─── Config errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load config: {0}")]
    Load(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

// ─── LLM / Provider errors ──────────────────────────────────────────────────

/// Whether a failed backend call is worth repeating against the same
/// conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network hiccups, timeouts, throttling, server-side faults.
    Transient,
    /// Bad credentials, malformed requests, unknown models, exhausted quota.
    Permanent,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("provider {provider} request failed: {message}")]
    Request { provider: String, message: String },

    #[error("provider {provider} returned HTTP {status}: {message}")]
    Status {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("provider {provider} rate-limited")]
    RateLimited { provider: String },

    #[error("provider {provider} authentication failed: {message}")]
    Auth { provider: String, message: String },

    #[error("provider {provider} returned no candidates")]
    EmptyResponse { provider: String },

    #[error("provider {provider} quota exhausted: {message}")]
    QuotaExhausted { provider: String, message: String },
}

impl LlmError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Request { .. } | Self::RateLimited { .. } | Self::EmptyResponse { .. } => {
                FailureKind::Transient
            }
            Self::Auth { .. } | Self::QuotaExhausted { .. } => FailureKind::Permanent,
            Self::Status { status, .. } => kind_for_status(*status),
        }
    }
}

/// 4xx client errors are permanent, except 408 Request Timeout and 429 Too
/// Many Requests.
pub fn kind_for_status(status: u16) -> FailureKind {
    if (400..500).contains(&status) && status != 408 && status != 429 {
        FailureKind::Permanent
    } else {
        FailureKind::Transient
    }
}

/// Classify an arbitrary backend failure.
///
/// Typed [`LlmError`]s anywhere in the chain decide; otherwise the failure
/// is treated as transient so the iteration budget, not the error text,
/// bounds the retries.
pub fn classify_backend_error(err: &anyhow::Error) -> FailureKind {
    for cause in err.chain() {
        if let Some(llm) = cause.downcast_ref::<LlmError>() {
            return llm.kind();
        }
        if let Some(status) = cause
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status)
        {
            return kind_for_status(status.as_u16());
        }
    }
    FailureKind::Transient
}

// ─── Convenience re-exports ─────────────────────────────────────────────────

/// Shorthand result type for the crate.
pub type Result<T> = std::result::Result<T, AssistError>;
