use async_trait::async_trait;
use strum_macros::{Display, EnumIter, EnumString};

use super::{
    anthropic::AnthropicProvider,
    base::{Provider, ProviderResponse},
    configs::ProviderConfig,
    openai::OpenAiProvider,
};
use crate::errors::ProviderError;
use crate::models::message::Turn;

#[derive(EnumIter, EnumString, Display, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum ProviderType {
    OpenAi,
    Anthropic,
    DeepSeek,
}

/// A configured backend, selected once at construction time
pub enum Backend {
    OpenAi(OpenAiProvider),
    Anthropic(AnthropicProvider),
}

#[async_trait]
impl Provider for Backend {
    async fn complete(&self, turns: &[Turn]) -> Result<ProviderResponse, ProviderError> {
        match self {
            Backend::OpenAi(provider) => provider.complete(turns).await,
            Backend::Anthropic(provider) => provider.complete(turns).await,
        }
    }
}

impl ProviderConfig {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderConfig::OpenAi(_) => ProviderType::OpenAi,
            ProviderConfig::Anthropic(_) => ProviderType::Anthropic,
            ProviderConfig::DeepSeek(_) => ProviderType::DeepSeek,
        }
    }
}

pub fn get_provider(config: ProviderConfig) -> Result<Backend, ProviderError> {
    match config {
        ProviderConfig::OpenAi(openai_config) | ProviderConfig::DeepSeek(openai_config) => {
            Ok(Backend::OpenAi(OpenAiProvider::new(openai_config)?))
        }
        ProviderConfig::Anthropic(anthropic_config) => {
            Ok(Backend::Anthropic(AnthropicProvider::new(anthropic_config)?))
        }
    }
}
