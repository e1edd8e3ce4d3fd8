pub mod anthropic;
pub mod base;
pub mod configs;
pub mod factory;
pub mod openai;

#[cfg(test)]
pub mod mock;

pub use base::{Provider, ProviderResponse, Usage};
pub use factory::{get_provider, Backend, ProviderType};
