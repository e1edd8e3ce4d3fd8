use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, ProviderResponse, Usage};
use super::configs::AnthropicProviderConfig;
use crate::errors::ProviderError;
use crate::models::message::Turn;
use crate::models::role::Role;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    client: Client,
    config: AnthropicProviderConfig,
}

impl AnthropicProvider {
    pub fn new(config: AnthropicProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(600)) // 10 minutes timeout
            .build()?;

        Ok(Self { client, config })
    }

    fn get_usage(data: &Value) -> Option<Usage> {
        let usage = data.get("usage")?;
        let input_tokens = usage
            .get("input_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let output_tokens = usage
            .get("output_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        let total_tokens = match (input_tokens, output_tokens) {
            (Some(input), Some(output)) => Some(input + output),
            _ => None,
        };
        Some(Usage::new(input_tokens, output_tokens, total_tokens))
    }

    /// Split out the system text and merge consecutive turns of the same role,
    /// the messages API requires strictly alternating user/assistant turns.
    fn turns_to_anthropic_messages(turns: &[Turn]) -> (String, Vec<Value>) {
        let mut system = Vec::new();
        let mut messages: Vec<(&str, String)> = Vec::new();

        for turn in turns {
            let role = match turn.role {
                Role::System => {
                    system.push(turn.content.as_str());
                    continue;
                }
                Role::Assistant => "assistant",
                Role::User | Role::Tool => "user",
            };
            match messages.last_mut() {
                Some((last_role, content)) if *last_role == role => {
                    content.push_str("\n\n");
                    content.push_str(&turn.content);
                }
                _ => messages.push((role, turn.content.clone())),
            }
        }

        let messages = messages
            .into_iter()
            .map(|(role, content)| json!({"role": role, "content": content}))
            .collect();
        (system.join("\n\n"), messages)
    }

    async fn post(&self, payload: Value) -> Result<Value, ProviderError> {
        let url = format!("{}/v1/messages", self.config.host.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json().await?),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(ProviderError::Status { status, body })
            }
        }
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn complete(&self, turns: &[Turn]) -> Result<ProviderResponse, ProviderError> {
        let (system, messages) = Self::turns_to_anthropic_messages(turns);

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages,
            "max_tokens": self.config.max_tokens.unwrap_or(1000)
        });

        if let Some(object) = payload.as_object_mut() {
            if !system.is_empty() {
                object.insert("system".to_string(), json!(system));
            }
            if let Some(temp) = self.config.temperature {
                object.insert("temperature".to_string(), json!(temp));
            }
        }

        let response = self.post(payload).await?;

        let content = response
            .get("content")
            .and_then(|c| c.as_array())
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("")
            })
            .ok_or_else(|| {
                ProviderError::InvalidResponse("Invalid response format from Anthropic API".into())
            })?;

        Ok(ProviderResponse::new(content, Self::get_usage(&response)))
    }
}
