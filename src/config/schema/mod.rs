mod env_overrides;
mod loader;
#[cfg(test)]
mod test_env;
mod types;

pub use types::{
    Config, DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, MAX_ITERATIONS_CAP,
};
