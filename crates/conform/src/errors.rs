use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::schema::{SchemaError, ValidationError};

/// Failures of a single request/response exchange with a backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Invalid response from backend: {0}")]
    InvalidResponse(String),
}

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Transport error: {0}")]
    Transport(#[from] ProviderError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(#[from] SchemaError),

    #[error(
        "Failed to get a valid response after {attempts} attempts: {}",
        summarize(errors)
    )]
    MaxRetriesExceeded {
        attempts: usize,
        errors: Vec<ValidationError>,
    },

    #[error("Max reasoning iterations reached ({iterations}); last error: {last_error}")]
    MaxIterationsExceeded { iterations: usize, last_error: String },

    #[error("Invalid action: {0}")]
    InvalidAction(String),

    #[error("Tool call limit of {0} reached without a final answer")]
    ToolCallLimitExceeded(usize),

    #[error("Generation cancelled")]
    Cancelled,

    #[error("Call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to render prompt: {0}")]
    Prompt(String),
}

pub type AgentResult<T> = Result<T, AgentError>;

fn summarize(errors: &[ValidationError]) -> String {
    if errors.is_empty() {
        return "no validation errors recorded".to_string();
    }
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
