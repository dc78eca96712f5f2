//! OpenAI Client
//!
//! LLM client implementation for the OpenAI chat completions API.

use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::llm_client::{LlmClient, CLASSIFICATION_TEMPERATURE, JSON_ONLY_INSTRUCTION};
use crate::config::LlmConfig;

/// Default OpenAI model
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI API client
#[derive(Clone)]
pub struct OpenAiClient {
    api_key: String,
    client: reqwest::Client,
    model: String,
    base_url: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    /// Create from the loaded LLM configuration
    pub fn from_config(api_key: String, config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key,
            client,
            model: config.openai_model.clone(),
            base_url: config.openai_base_url.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Whether the model accepts `response_format: json_object`
    fn supports_json_mode(&self) -> bool {
        let model = self.model.as_str();
        model.starts_with("gpt-4o")
            || model.starts_with("gpt-4-turbo")
            || model.starts_with("gpt-4.1")
            || model.starts_with("gpt-3.5-turbo-1106")
    }

    /// o-series models take `max_completion_tokens` and reject `temperature`
    fn is_reasoning_model(&self) -> bool {
        let mut chars = self.model.chars();
        chars.next() == Some('o') && chars.next().map_or(false, |c| c.is_ascii_digit())
    }

    fn request_body(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
        temperature: f32,
    ) -> serde_json::Value {
        let native_json = json_mode && self.supports_json_mode();
        let system = if json_mode && !native_json {
            format!("{}\n\n{}", system_prompt, JSON_ONLY_INSTRUCTION)
        } else {
            system_prompt.to_string()
        };

        let mut body = serde_json::json!({
            "model": &self.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user_prompt}
            ]
        });

        if self.is_reasoning_model() {
            body["max_completion_tokens"] = self.max_tokens.into();
        } else {
            body["max_tokens"] = self.max_tokens.into();
            body["temperature"] = temperature.into();
        }
        if native_json {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        body
    }

    /// Internal API call implementation
    async fn call_api(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        json_mode: bool,
        temperature: f32,
    ) -> Result<String> {
        let body = self.request_body(system_prompt, user_prompt, json_mode, temperature);
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        tracing::debug!(model = %self.model, json_mode, "OpenAI request");

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("OpenAI API error {}: {}", status, body));
        }

        #[derive(Deserialize)]
        struct Message {
            content: Option<String>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(Deserialize)]
        struct ApiResponse {
            choices: Vec<Choice>,
        }

        let api_response: ApiResponse = response.json().await?;
        api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("OpenAI returned no choices"))
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn chat(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.call_api(system_prompt, user_prompt, false, self.temperature)
            .await
    }

    async fn chat_json(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        self.call_api(system_prompt, user_prompt, true, CLASSIFICATION_TEMPERATURE)
            .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn provider_name(&self) -> &str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(model: &str) -> OpenAiClient {
        let config = LlmConfig {
            openai_model: model.to_string(),
            ..LlmConfig::default()
        };
        OpenAiClient::from_config("test-key".into(), &config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_default_client() {
        let client = client(DEFAULT_MODEL);
        assert_eq!(client.model_name(), "gpt-4");
        assert_eq!(client.provider_name(), "OpenAI");
    }

    #[test]
    fn test_json_mode_support() {
        assert!(!client("gpt-4").supports_json_mode());
        assert!(client("gpt-4o-mini").supports_json_mode());
        assert!(client("gpt-4.1").supports_json_mode());
        assert!(!client("o1-mini").supports_json_mode());
        assert!(!client("o3-mini").supports_json_mode());
    }

    #[test]
    fn test_reasoning_model_body() {
        let body = client("o3-mini").request_body("sys", "hi", true, 0.1);
        assert_eq!(body["max_completion_tokens"], 2000);
        assert!(body.get("max_tokens").is_none());
        assert!(body.get("temperature").is_none());
        assert!(body.get("response_format").is_none());
        let system = body["messages"][0]["content"].as_str().unwrap();
        assert!(system.ends_with(JSON_ONLY_INSTRUCTION));

        let body = client("gpt-4o").request_body("sys", "hi", true, 0.1);
        assert_eq!(body["max_tokens"], 2000);
        assert!(body["temperature"].as_f64().unwrap() < 0.2);
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["content"], "sys");
    }
}
