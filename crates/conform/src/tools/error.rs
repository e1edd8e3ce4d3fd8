use std::time::Duration;

use thiserror::Error;

use crate::schema::ValidationError;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters for {tool}: {}", join(errors))]
    InvalidParameters {
        tool: String,
        errors: Vec<ValidationError>,
    },

    #[error("Tool {tool} failed: {message}")]
    Execution { tool: String, message: String },

    #[error("Tool {0} was cancelled")]
    Cancelled(String),

    #[error("Tool {tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },
}

pub type ToolResult<T> = Result<T, ToolError>;

/// The backend wrote the tool-call token but the rest of the call could not be read
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolCallParseError {
    #[error("tool call `{0}` is missing its JSON object arguments")]
    MissingArguments(String),

    #[error("tool call `{name}` has malformed arguments: {reason}")]
    MalformedArguments { name: String, reason: String },

    #[error("tool call `{0}` is not closed with `)`")]
    Unterminated(String),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
