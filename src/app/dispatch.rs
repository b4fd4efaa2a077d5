use crate::agent::ToolLoop;
use crate::cli::{Cli, ConsoleObserver, usage_banner};
use crate::config::Config;
use crate::error::{AssistError, ConfigError};
use crate::llm::GeminiProvider;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

/// Entry point shared by the binary: parse → configure → run → report.
///
/// Every failure path maps to exit status 1; only a completed run exits 0.
pub async fn dispatch(cli: Cli) -> ExitCode {
    let Ok(prompt) = cli.prompt() else {
        print!("{}", usage_banner());
        return ExitCode::FAILURE;
    };

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);
    debug!(
        config_path = ?config.config_path,
        model = config.model.as_str(),
        max_iterations = config.max_iterations,
        "Configuration resolved"
    );

    match run_prompt(&config, &prompt).await {
        Ok(answer) => {
            if config.verbose {
                println!("Final response:");
            }
            println!("{answer}");
            ExitCode::SUCCESS
        }
        Err(err @ AssistError::BudgetExhausted { .. }) => {
            println!("{err}");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

/// File, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<Config, AssistError> {
    let mut config = Config::load().map_err(|e| ConfigError::Load(format!("{e:#}")))?;
    cli.apply_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Install the stderr subscriber. An explicit `log_level` wins; otherwise
/// verbose runs log at DEBUG and quiet ones at WARN.
pub fn init_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(if config.verbose {
            Level::DEBUG
        } else {
            Level::WARN
        });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: Failed to install log subscriber: {e}");
    }
}

/// Run one prompt against the configured Gemini backend.
pub async fn run_prompt(config: &Config, prompt: &str) -> Result<String, AssistError> {
    if config.verbose {
        println!("User prompt: {prompt}\n");
    }

    let provider = Arc::new(GeminiProvider::new(
        config.api_key.as_deref(),
        &config.base_url,
        config.request_timeout_secs,
    ));
    let observer = Arc::new(ConsoleObserver::new(config.abort_on_permanent_errors));
    let tool_loop = ToolLoop::new(provider, config).with_observer(observer);

    let result = tool_loop.run(prompt).await;
    info!(
        model = result.model_version.as_deref().unwrap_or(&config.model),
        iterations = result.submissions,
        tokens = ?result.tokens_used,
        "Run finished"
    );
    result.into_final_text()
}
