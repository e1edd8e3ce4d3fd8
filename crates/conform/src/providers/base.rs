use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;
use crate::models::message::Turn;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// The text a backend produced for one request, with token accounting when the vendor reports it
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    pub usage: Option<Usage>,
}

impl ProviderResponse {
    pub fn new<S: Into<String>>(content: S, usage: Option<Usage>) -> Self {
        Self {
            content: content.into(),
            usage,
        }
    }
}

/// Base trait for text-generation backends (OpenAI, Anthropic, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send the whole conversation and return the backend's next reply
    async fn complete(&self, turns: &[Turn]) -> Result<ProviderResponse, ProviderError>;
}
