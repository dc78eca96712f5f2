//! Environment-backed secret store

use std::collections::HashMap;

use async_trait::async_trait;

use super::{SecretName, SecretStore};
use crate::error::SecretResolutionError;

/// Read-only view of environment variables, snapshotted at construction
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore {
    vars: HashMap<String, String>,
}

impl EnvSecretStore {
    pub fn from_env() -> Self {
        Self {
            vars: std::env::vars().collect(),
        }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// `asana-access-token` -> `ASANA_ACCESS_TOKEN`
    pub fn env_key(name: &str) -> String {
        name.to_uppercase().replace('-', "_")
    }
}

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretResolutionError> {
        Ok(self
            .vars
            .get(&Self::env_key(name))
            .filter(|v| !v.trim().is_empty())
            .cloned())
    }

    async fn set_secret(&self, name: &str, _value: &str) -> Result<(), SecretResolutionError> {
        Err(SecretResolutionError::ReadOnly(format!(
            "cannot write {} to the environment",
            Self::env_key(name)
        )))
    }

    async fn delete_secret(&self, name: &str) -> Result<(), SecretResolutionError> {
        Err(SecretResolutionError::ReadOnly(format!(
            "cannot delete {} from the environment",
            Self::env_key(name)
        )))
    }

    /// Only the well-known credentials are listed
    async fn list_secrets(&self) -> Result<Vec<String>, SecretResolutionError> {
        Ok(SecretName::all()
            .into_iter()
            .filter(|s| self.vars.get(s.env_var).is_some_and(|v| !v.trim().is_empty()))
            .map(|s| s.vault_name.to_string())
            .collect())
    }

    fn store_name(&self) -> &str {
        "environment"
    }
}
