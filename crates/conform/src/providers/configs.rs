use anyhow::{Context, Result};
use std::env;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_MODEL: &str = "gpt-4o";
pub const ANTHROPIC_HOST: &str = "https://api.anthropic.com";
pub const ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-latest";
pub const DEEPSEEK_HOST: &str = "https://api.deepseek.com";
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";

/// Unified enum to wrap the configuration of each supported backend
#[derive(Debug, Clone)]
pub enum ProviderConfig {
    OpenAi(OpenAiProviderConfig),
    Anthropic(AnthropicProviderConfig),
    /// DeepSeek speaks the OpenAI chat-completions protocol
    DeepSeek(OpenAiProviderConfig),
}

#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("OPENAI_HOST", OPENAI_HOST),
            api_key: required("OPENAI_API_KEY")?,
            model: env_or("OPENAI_MODEL", OPENAI_MODEL),
            temperature: None,
            max_tokens: None,
        })
    }

    pub fn deepseek_from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("DEEPSEEK_HOST", DEEPSEEK_HOST),
            api_key: required("DEEPSEEK_API_KEY")?,
            model: env_or("DEEPSEEK_MODEL", DEEPSEEK_MODEL),
            temperature: None,
            max_tokens: None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AnthropicProviderConfig {
    pub host: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl AnthropicProviderConfig {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env_or("ANTHROPIC_HOST", ANTHROPIC_HOST),
            api_key: required("ANTHROPIC_API_KEY")?,
            model: env_or("ANTHROPIC_MODEL", ANTHROPIC_MODEL),
            temperature: None,
            max_tokens: None,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}
