//! Provider selection for `LLM_BACKEND`

use std::fmt;
use std::str::FromStr;

use crate::config::LlmConfig;
use crate::error::ConfigError;
use crate::secrets::SecretName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmBackend {
    #[default]
    OpenAi,
    Anthropic,
}

impl LlmBackend {
    pub const ALL: [LlmBackend; 2] = [LlmBackend::OpenAi, LlmBackend::Anthropic];

    /// Spelling accepted in `LLM_BACKEND`
    pub fn key(self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "openai",
            LlmBackend::Anthropic => "anthropic",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LlmBackend::OpenAi => "OpenAI",
            LlmBackend::Anthropic => "Anthropic",
        }
    }

    /// Credential the provider's API key is resolved from
    pub fn secret(self) -> SecretName {
        match self {
            LlmBackend::OpenAi => SecretName::OPENAI_API_KEY,
            LlmBackend::Anthropic => SecretName::ANTHROPIC_API_KEY,
        }
    }

    /// Model configured for this provider
    pub fn model(self, config: &LlmConfig) -> &str {
        match self {
            LlmBackend::OpenAi => &config.openai_model,
            LlmBackend::Anthropic => &config.anthropic_model,
        }
    }
}

impl FromStr for LlmBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|backend| backend.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::invalid("LLM_BACKEND", s, "expected openai or anthropic"))
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend() {
        assert_eq!(" OpenAI ".parse::<LlmBackend>().unwrap(), LlmBackend::OpenAi);
        assert_eq!("anthropic".parse::<LlmBackend>().unwrap(), LlmBackend::Anthropic);

        let err = "claude".parse::<LlmBackend>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::invalid("LLM_BACKEND", "claude", "expected openai or anthropic")
        );
    }

    #[test]
    fn test_backend_credentials_and_models() {
        assert_eq!(LlmBackend::default().secret(), SecretName::OPENAI_API_KEY);
        assert_eq!(LlmBackend::Anthropic.secret(), SecretName::ANTHROPIC_API_KEY);

        let config = LlmConfig {
            anthropic_model: "claude-3-haiku".into(),
            ..LlmConfig::default()
        };
        assert_eq!(LlmBackend::OpenAi.model(&config), "gpt-4");
        assert_eq!(LlmBackend::Anthropic.model(&config), "claude-3-haiku");
    }
}
