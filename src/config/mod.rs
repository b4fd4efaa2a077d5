pub mod schema;

pub use schema::{
    Config, DEFAULT_MAX_ITERATIONS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, MAX_ITERATIONS_CAP,
};
