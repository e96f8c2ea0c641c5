//! LLM provider implementations.

mod anthropic;
mod openai;

pub use {anthropic::AnthropicProvider, openai::OpenAiProvider};

use std::sync::Arc;

use voxbi_config::LlmConfig;

use crate::model::LlmProvider;

/// Build the configured provider.
pub fn from_config(config: &LlmConfig) -> anyhow::Result<Arc<dyn LlmProvider>> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("llm.api_key is not configured"))?;

    match config.provider.as_str() {
        "anthropic" => Ok(Arc::new(AnthropicProvider::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
        ))),
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            api_key,
            config.base_url.clone(),
            config.model.clone(),
        ))),
        other => anyhow::bail!("unknown llm provider: {other}"),
    }
}
