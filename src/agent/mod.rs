pub mod conversation;
pub mod observer;
pub mod tool_loop;

pub use conversation::Conversation;
pub use observer::{LoopObserver, NullObserver};
pub use tool_loop::{AbortReason, IterationBudget, LoopState, ToolLoop, ToolLoopResult};
