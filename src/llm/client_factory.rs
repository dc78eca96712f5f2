//! Client Factory
//!
//! Builds the configured LLM client behind the [`LlmClient`] trait.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use super::anthropic_client::AnthropicClient;
use super::backend::LlmBackend;
use super::llm_client::LlmClient;
use super::openai_client::OpenAiClient;
use crate::config::LlmConfig;

/// Create the client selected by `config.backend` using an already-resolved key
pub fn create_llm_client(
    config: &LlmConfig,
    api_key: String,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>> {
    let client: Arc<dyn LlmClient> = match config.backend {
        LlmBackend::OpenAi => Arc::new(OpenAiClient::from_config(api_key, config, timeout)?),
        LlmBackend::Anthropic => Arc::new(AnthropicClient::from_config(api_key, config, timeout)?),
    };
    tracing::info!(
        provider = client.provider_name(),
        model = client.model_name(),
        "LLM client ready"
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_honours_backend() {
        let mut config = LlmConfig::default();
        let client = create_llm_client(&config, "k".into(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.provider_name(), "OpenAI");
        assert_eq!(client.model_name(), "gpt-4");

        config.backend = LlmBackend::Anthropic;
        config.anthropic_model = "claude-3-haiku".into();
        let client = create_llm_client(&config, "k".into(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.provider_name(), "Anthropic");
        assert_eq!(client.model_name(), "claude-3-haiku");
    }
}
