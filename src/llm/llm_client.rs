//! LLM Client Trait
//!
//! Unified interface for LLM providers (OpenAI, Anthropic).

use anyhow::Result;
use async_trait::async_trait;

/// Sampling temperature used for intent classification
pub const CLASSIFICATION_TEMPERATURE: f32 = 0.3;

/// Unified LLM client interface for both OpenAI and Anthropic
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Call the LLM with system + user prompts, return raw text response
    ///
    /// Uses the configured conversational temperature.
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Call the LLM expecting JSON response
    /// - For OpenAI: uses response_format json_object mode where the model supports it
    /// - For Anthropic: adds JSON instruction to system prompt
    ///
    /// Runs at [`CLASSIFICATION_TEMPERATURE`].
    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;

    /// Get the model name for logging
    fn model_name(&self) -> &str;

    /// Get the provider name for logging
    fn provider_name(&self) -> &str;
}

/// Instruction appended when a provider has no native JSON mode
pub(crate) const JSON_ONLY_INSTRUCTION: &str =
    "IMPORTANT: Respond with valid JSON only. No markdown code blocks, no explanations.";
