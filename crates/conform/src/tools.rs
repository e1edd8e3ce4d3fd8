//! External capabilities the backend may call mid-conversation.
//!
//! Backends request a tool with the textual grammar `toolCall: <name>(<JSON object>)`,
//! parsed by [`parse_tool_call`]. Calls are routed through a [`ToolRegistry`], which checks
//! the arguments against the tool's parameter schema before executing it.
mod error;
mod parser;
mod registry;
mod tool;

pub use error::{ToolCallParseError, ToolError};
pub use parser::parse_tool_call;
pub use registry::ToolRegistry;
pub use tool::{FunctionTool, Tool};
