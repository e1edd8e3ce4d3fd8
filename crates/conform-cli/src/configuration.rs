use crate::error::{to_env_var, ConfigError};
use config::{Config, Environment, File};
use conform::providers::{
    configs::{
        AnthropicProviderConfig, OpenAiProviderConfig, ProviderConfig, ANTHROPIC_HOST,
        ANTHROPIC_MODEL, DEEPSEEK_HOST, DEEPSEEK_MODEL, OPENAI_HOST, OPENAI_MODEL,
    },
    factory::ProviderType,
};
use conform::GenerationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type")]
pub enum ProviderSettings {
    OpenAi {
        #[serde(default = "default_openai_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    Anthropic {
        #[serde(default = "default_anthropic_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
    DeepSeek {
        #[serde(default = "default_deepseek_host")]
        host: String,
        api_key: String,
        #[serde(default = "default_deepseek_model")]
        model: String,
        #[serde(default)]
        temperature: Option<f32>,
        #[serde(default)]
        max_tokens: Option<i32>,
    },
}

impl ProviderSettings {
    pub fn provider_type(&self) -> ProviderType {
        match self {
            ProviderSettings::OpenAi { .. } => ProviderType::OpenAi,
            ProviderSettings::Anthropic { .. } => ProviderType::Anthropic,
            ProviderSettings::DeepSeek { .. } => ProviderType::DeepSeek,
        }
    }

    // Convert to the library's ProviderConfig
    pub fn into_config(self) -> ProviderConfig {
        match self {
            ProviderSettings::OpenAi {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::OpenAi(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::Anthropic {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::Anthropic(AnthropicProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
            ProviderSettings::DeepSeek {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            } => ProviderConfig::DeepSeek(OpenAiProviderConfig {
                host,
                api_key,
                model,
                temperature,
                max_tokens,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl Settings {
    /// Load settings from the user config file, then `file` if given, then `CONFORM_*` variables
    pub fn new(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(default_file) = default_config_file() {
            builder = builder.add_source(File::from(default_file).required(false));
        }
        if let Some(file) = file {
            builder = builder.add_source(File::from(file).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("CONFORM")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        match config.try_deserialize::<Self>() {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                // "missing field `api_key`", possibly followed by the key it was read at
                let error_str = err.to_string();
                let missing = error_str
                    .strip_prefix("missing field `")
                    .and_then(|rest| rest.split('`').next());
                if let Some(field) = missing {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }
}

/// `~/.config/conform/config.toml` or the platform equivalent
fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("conform").join("config.toml"))
}

fn default_openai_host() -> String {
    OPENAI_HOST.to_string()
}

fn default_openai_model() -> String {
    OPENAI_MODEL.to_string()
}

fn default_anthropic_host() -> String {
    ANTHROPIC_HOST.to_string()
}

fn default_anthropic_model() -> String {
    ANTHROPIC_MODEL.to_string()
}

fn default_deepseek_host() -> String {
    DEEPSEEK_HOST.to_string()
}

fn default_deepseek_model() -> String {
    DEEPSEEK_MODEL.to_string()
}
