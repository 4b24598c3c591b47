pub mod base;
pub mod file;
pub mod git;

pub use base::{Tool, ToolError, ToolResult, Toolbox};
