//! LLM provider clients
//!
//! Unified interface over OpenAI and Anthropic chat APIs. The classifier
//! uses JSON mode; the `general` platform uses plain chat.

pub mod anthropic_client;
pub mod backend;
pub mod client_factory;
pub mod llm_client;
pub mod openai_client;

pub use anthropic_client::AnthropicClient;
pub use backend::LlmBackend;
pub use client_factory::create_llm_client;
pub use llm_client::{LlmClient, CLASSIFICATION_TEMPERATURE};
pub use openai_client::OpenAiClient;
