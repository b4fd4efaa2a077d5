use crate::error::ConfigError;
use crate::llm::gemini::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-001";
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Upper bound accepted for `max_iterations`, whatever the source.
pub const MAX_ITERATIONS_CAP: u32 = 100;

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a helpful AI coding assistant.

Answer the user's request directly and concisely. When functions are \
available, call them to gather facts about the codebase instead of guessing, \
and use their results to produce your final answer.
";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path the config was read from - computed, not serialized
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// End the run on the first failure classified as permanent (bad key,
    /// bad request) instead of retrying it within the iteration budget.
    #[serde(default)]
    pub abort_on_permanent_errors: bool,

    #[serde(default)]
    pub verbose: bool,

    /// `tracing` level filter (`error`, `warn`, `info`, `debug`, `trace`).
    #[serde(default)]
    pub log_level: Option<String>,
}

fn default_model() -> String {
    DEFAULT_MODEL.into()
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

fn default_temperature() -> f64 {
    0.7
}

fn default_system_prompt() -> String {
    DEFAULT_SYSTEM_PROMPT.into()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.into()
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_path: None,
            api_key: None,
            model: default_model(),
            max_iterations: default_max_iterations(),
            temperature: default_temperature(),
            system_prompt: default_system_prompt(),
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            abort_on_permanent_errors: false,
            verbose: false,
            log_level: None,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_ITERATIONS_CAP).contains(&self.max_iterations) {
            return Err(ConfigError::Validation(format!(
                "max_iterations must be between 1 and {MAX_ITERATIONS_CAP}, got {}",
                self.max_iterations
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::Validation(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::Validation("model must not be empty".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}
