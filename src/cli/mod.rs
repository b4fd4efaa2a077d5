pub mod commands;
pub mod console;

pub use commands::{Cli, usage_banner};
pub use console::ConsoleObserver;
