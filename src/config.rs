//! Process configuration
//!
//! [`AppConfig`] is built once at startup and handed to every client, the
//! classifier and the router. Values come from the environment (a `.env`
//! file is loaded by the binaries through dotenvy); tests build it from an
//! explicit lookup with [`AppConfig::from_lookup`].

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::llm::{anthropic_client, openai_client, LlmBackend};

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// LLM provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub openai_model: String,
    pub anthropic_model: String,
    pub max_tokens: u32,
    /// Temperature for conversational replies
    pub temperature: f32,
    pub openai_base_url: String,
    pub anthropic_base_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            backend: LlmBackend::default(),
            openai_model: openai_client::DEFAULT_MODEL.to_string(),
            anthropic_model: anthropic_client::DEFAULT_MODEL.to_string(),
            max_tokens: 2000,
            temperature: 0.7,
            openai_base_url: openai_client::DEFAULT_BASE_URL.to_string(),
            anthropic_base_url: anthropic_client::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Azure Key Vault settings
#[derive(Debug, Clone, PartialEq)]
pub struct VaultConfig {
    pub use_key_vault: bool,
    pub url: Option<String>,
    pub secret_prefix: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl VaultConfig {
    /// Vault lookups happen only when switched on and a URL is known
    pub fn enabled(&self) -> bool {
        self.use_key_vault && self.url.is_some()
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            use_key_vault: true,
            url: None,
            secret_prefix: None,
            tenant_id: None,
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AsanaConfig {
    pub base_url: String,
    pub workspace_gid: Option<String>,
}

impl Default for AsanaConfig {
    fn default() -> Self {
        Self {
            base_url: "https://app.asana.com/api/1.0".to_string(),
            workspace_gid: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GithubConfig {
    pub api_url: String,
    pub organization: Option<String>,
    pub default_repo: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            organization: None,
            default_repo: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkspaceConfig {
    pub project_path: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            project_path: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingConfig {
    /// Intents below this confidence are not dispatched; 0.0 disables the gate
    pub min_confidence: f64,
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub llm: LlmConfig,
    pub vault: VaultConfig,
    pub asana: AsanaConfig,
    pub github: GithubConfig,
    pub workspace: WorkspaceConfig,
    pub routing: RoutingConfig,
    pub http_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            llm: LlmConfig::default(),
            vault: VaultConfig::default(),
            asana: AsanaConfig::default(),
            github: GithubConfig::default(),
            workspace: WorkspaceConfig::default(),
            routing: RoutingConfig::default(),
            http_timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    /// Load from an arbitrary key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = AppConfig::default();

        let api = ApiConfig {
            host: get("API_HOST").unwrap_or(defaults.api.host),
            port: parse_or(&get, "API_PORT", defaults.api.port)?,
        };

        let backend = match get("LLM_BACKEND") {
            Some(value) => value.parse::<LlmBackend>()?,
            None => defaults.llm.backend,
        };
        let max_tokens: u32 = parse_or(&get, "MAX_TOKENS", defaults.llm.max_tokens)?;
        if max_tokens == 0 {
            return Err(ConfigError::invalid("MAX_TOKENS", "0", "must be positive"));
        }
        let temperature: f32 = parse_or(&get, "TEMPERATURE", defaults.llm.temperature)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::invalid(
                "TEMPERATURE",
                &temperature.to_string(),
                "must be between 0.0 and 2.0",
            ));
        }
        let llm = LlmConfig {
            backend,
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.llm.openai_model),
            anthropic_model: get("ANTHROPIC_MODEL").unwrap_or(defaults.llm.anthropic_model),
            max_tokens,
            temperature,
            openai_base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.llm.openai_base_url),
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or(defaults.llm.anthropic_base_url),
        };

        let use_key_vault = match get("USE_KEY_VAULT") {
            Some(value) => parse_bool("USE_KEY_VAULT", &value)?,
            None => defaults.vault.use_key_vault,
        };
        let vault = VaultConfig {
            use_key_vault,
            url: get("AZURE_KEY_VAULT_URL"),
            secret_prefix: get("KEY_VAULT_SECRET_PREFIX"),
            tenant_id: get("AZURE_TENANT_ID"),
            client_id: get("AZURE_CLIENT_ID"),
            client_secret: get("AZURE_CLIENT_SECRET"),
        };
        if let Some(url) = &vault.url {
            url::Url::parse(url)
                .map_err(|e| ConfigError::invalid("AZURE_KEY_VAULT_URL", url, e.to_string()))?;
        }

        let asana = AsanaConfig {
            base_url: get("ASANA_BASE_URL").unwrap_or(defaults.asana.base_url),
            workspace_gid: get("ASANA_WORKSPACE_GID"),
        };

        let github = GithubConfig {
            api_url: get("GITHUB_API_URL").unwrap_or(defaults.github.api_url),
            organization: get("GITHUB_ORGANIZATION"),
            default_repo: get("GITHUB_DEFAULT_REPO"),
        };

        let workspace = WorkspaceConfig {
            project_path: get("DEFAULT_PROJECT_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace.project_path),
        };

        let min_confidence: f64 = parse_or(&get, "MIN_CONFIDENCE", 0.0)?;
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(ConfigError::invalid(
                "MIN_CONFIDENCE",
                &min_confidence.to_string(),
                "must be between 0.0 and 1.0",
            ));
        }

        let timeout_secs: u64 = parse_or(&get, "HTTP_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "HTTP_TIMEOUT_SECS",
                "0",
                "must be positive",
            ));
        }

        Ok(Self {
            api,
            llm,
            vault,
            asana,
            github,
            workspace,
            routing: RoutingConfig { min_confidence },
            http_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(value) => value
            .parse::<T>()
            .map_err(|e| ConfigError::invalid(key, &value, e.to_string())),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected a boolean")),
    }
}
