use crate::config::Config;
use crate::error::AssistError;
use clap::Parser;

/// `code-assistant` - one-shot AI coding assistant backed by Gemini.
#[derive(Parser, Debug, Default)]
#[command(name = "code-assistant")]
#[command(version)]
#[command(about = "Ask the model a question and print its final answer.", long_about = None)]
pub struct Cli {
    /// Prompt text; every word is joined with a single space. Words that
    /// start with `--` are not part of the prompt.
    #[arg(value_name = "PROMPT", allow_hyphen_values = true, trailing_var_arg = true)]
    pub prompt: Vec<String>,

    /// Echo the prompt and token usage, and log at debug level
    #[arg(long)]
    pub verbose: bool,

    /// Model to use (overrides config and CODE_ASSISTANT_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Maximum backend submissions before giving up
    #[arg(long)]
    pub max_iterations: Option<u32>,
}

impl Cli {
    /// The joined prompt. Fails with [`AssistError::Usage`] when no words
    /// were given.
    pub fn prompt(&self) -> Result<String, AssistError> {
        let words: Vec<&str> = self
            .prompt
            .iter()
            .map(String::as_str)
            .filter(|word| !word.is_empty() && !is_flag_word(word))
            .collect();
        if words.is_empty() {
            return Err(AssistError::Usage);
        }
        Ok(words.join(" "))
    }

    /// `--verbose` counts wherever it appears, including after the prompt.
    pub fn is_verbose(&self) -> bool {
        self.verbose || self.prompt.iter().any(|word| word == "--verbose")
    }

    /// Flags win over the config file and the environment.
    pub fn apply_overrides(&self, config: &mut Config) {
        if self.is_verbose() {
            config.verbose = true;
        }
        if let Some(model) = &self.model {
            config.model.clone_from(model);
        }
        if let Some(max) = self.max_iterations {
            config.max_iterations = max;
        }
    }
}

fn is_flag_word(word: &str) -> bool {
    word.starts_with("--")
}

pub fn usage_banner() -> &'static str {
    "AI Code Assistant\n\
     \n\
     Usage: code-assistant \"your prompt here\" [--verbose]\n\
     Example: code-assistant \"How does the calculator render its results?\"\n"
}
