//! Tool plumbing for the iteration controller.
//!
//! No concrete tools ship with the crate; embedders register their own
//! [`Tool`]s in a [`ToolRegistry`] and hand it to the loop as a
//! [`ToolExecutor`].

pub mod registry;
pub mod traits;

pub use registry::ToolRegistry;
pub use traits::{Tool, ToolExecutor, ToolResult, ToolSpec};
