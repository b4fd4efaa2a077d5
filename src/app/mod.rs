pub mod dispatch;

pub use dispatch::{dispatch, init_logging, run_prompt};
