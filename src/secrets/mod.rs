//! Credential resolution
//!
//! Credentials live either in Azure Key Vault or in the process environment.
//! [`SecretResolver`] tries the vault first (when enabled) and falls back to
//! the environment variable, once per client at construction.

pub mod env_store;
pub mod key_vault;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::VaultConfig;
use crate::error::SecretResolutionError;

pub use env_store::EnvSecretStore;
pub use key_vault::KeyVaultSecretStore;

/// A named credential store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when the secret does not exist
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretResolutionError>;

    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretResolutionError>;

    async fn delete_secret(&self, name: &str) -> Result<(), SecretResolutionError>;

    async fn list_secrets(&self) -> Result<Vec<String>, SecretResolutionError>;

    /// Store name for logging
    fn store_name(&self) -> &str;
}

/// A well-known credential: its vault name and its environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecretName {
    pub vault_name: &'static str,
    pub env_var: &'static str,
}

impl SecretName {
    pub const ASANA_ACCESS_TOKEN: SecretName = SecretName {
        vault_name: "asana-access-token",
        env_var: "ASANA_ACCESS_TOKEN",
    };
    pub const GITHUB_TOKEN: SecretName = SecretName {
        vault_name: "github-token",
        env_var: "GITHUB_TOKEN",
    };
    pub const OPENAI_API_KEY: SecretName = SecretName {
        vault_name: "openai-api-key",
        env_var: "OPENAI_API_KEY",
    };
    pub const ANTHROPIC_API_KEY: SecretName = SecretName {
        vault_name: "anthropic-api-key",
        env_var: "ANTHROPIC_API_KEY",
    };

    pub fn all() -> [SecretName; 4] {
        [
            Self::ASANA_ACCESS_TOKEN,
            Self::GITHUB_TOKEN,
            Self::OPENAI_API_KEY,
            Self::ANTHROPIC_API_KEY,
        ]
    }
}

/// Vault-then-environment credential lookup
pub struct SecretResolver {
    vault: Option<Arc<dyn SecretStore>>,
    env: Arc<dyn SecretStore>,
    prefix: String,
}

impl SecretResolver {
    pub fn new(vault: Option<Arc<dyn SecretStore>>, env: Arc<dyn SecretStore>) -> Self {
        Self {
            vault,
            env,
            prefix: String::new(),
        }
    }

    /// Prefix prepended to vault secret names (not to env vars)
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Environment-only resolver
    pub fn env_only(env: EnvSecretStore) -> Self {
        Self::new(None, Arc::new(env))
    }

    /// Build from configuration, wiring the vault store when enabled
    pub fn from_config(
        config: &VaultConfig,
        env: EnvSecretStore,
        http_timeout: std::time::Duration,
    ) -> Result<Self, SecretResolutionError> {
        let vault: Option<Arc<dyn SecretStore>> = match (&config.url, config.use_key_vault) {
            (Some(url), true) => Some(Arc::new(KeyVaultSecretStore::from_config(
                url,
                config,
                http_timeout,
            )?)),
            _ => None,
        };
        let resolver = Self::new(vault, Arc::new(env))
            .with_prefix(config.secret_prefix.clone().unwrap_or_default());
        Ok(resolver)
    }

    pub fn vault(&self) -> Option<&Arc<dyn SecretStore>> {
        self.vault.as_ref()
    }

    pub fn prefixed(&self, name: &str) -> String {
        format!("{}{}", self.prefix, name)
    }

    /// Resolve a credential; vault errors are logged and fall through to env
    pub async fn resolve(&self, secret: SecretName) -> Result<String, SecretResolutionError> {
        if let Some(vault) = &self.vault {
            let vault_name = self.prefixed(secret.vault_name);
            match vault.get_secret(&vault_name).await {
                Ok(Some(value)) => {
                    tracing::debug!(secret = %vault_name, "Resolved secret from Key Vault");
                    return Ok(value);
                }
                Ok(None) => {
                    tracing::debug!(secret = %vault_name, "Secret not in Key Vault, trying environment");
                }
                Err(e) => {
                    tracing::warn!(secret = %vault_name, error = %e, "Key Vault lookup failed, trying environment");
                }
            }
        }

        match self.env.get_secret(secret.vault_name).await? {
            Some(value) => Ok(value),
            None => Err(SecretResolutionError::Missing {
                name: secret.vault_name.to_string(),
                env_var: secret.env_var.to_string(),
            }),
        }
    }
}
