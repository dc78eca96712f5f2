//! Azure Key Vault secret store
//!
//! Talks to the Key Vault REST API directly with reqwest. Access tokens come
//! from a service principal (client credentials) when `AZURE_TENANT_ID`,
//! `AZURE_CLIENT_ID` and `AZURE_CLIENT_SECRET` are all set, otherwise from
//! the instance metadata service (managed identity).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use url::Url;

use super::SecretStore;
use crate::config::VaultConfig;
use crate::error::SecretResolutionError;

const API_VERSION: &str = "7.4";
const VAULT_SCOPE: &str = "https://vault.azure.net/.default";
const VAULT_RESOURCE: &str = "https://vault.azure.net";
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";
const DEFAULT_IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";

/// Tokens are refreshed this long before they expire
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// How the store obtains vault access tokens
#[derive(Debug, Clone)]
pub enum VaultCredential {
    ClientSecret {
        tenant_id: String,
        client_id: String,
        client_secret: String,
        authority: String,
    },
    ManagedIdentity {
        endpoint: String,
    },
    /// Pre-issued bearer token
    Static(String),
}

impl VaultCredential {
    pub fn from_config(config: &VaultConfig) -> Self {
        match (&config.tenant_id, &config.client_id, &config.client_secret) {
            (Some(tenant_id), Some(client_id), Some(client_secret)) => {
                tracing::info!("Using client secret credential for Key Vault access");
                VaultCredential::ClientSecret {
                    tenant_id: tenant_id.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                    authority: DEFAULT_AUTHORITY.to_string(),
                }
            }
            _ => {
                tracing::info!("Using managed identity for Key Vault access");
                VaultCredential::ManagedIdentity {
                    endpoint: DEFAULT_IMDS_ENDPOINT.to_string(),
                }
            }
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Key Vault backed [`SecretStore`] with an in-process read cache
pub struct KeyVaultSecretStore {
    vault_url: Url,
    client: reqwest::Client,
    credential: VaultCredential,
    token: RwLock<Option<CachedToken>>,
    cache: RwLock<HashMap<String, String>>,
}

impl KeyVaultSecretStore {
    pub fn new(
        vault_url: &str,
        credential: VaultCredential,
        client: reqwest::Client,
    ) -> Result<Self, SecretResolutionError> {
        let vault_url = Url::parse(vault_url)
            .map_err(|e| SecretResolutionError::Vault(format!("invalid vault URL: {}", e)))?;
        Ok(Self {
            vault_url,
            client,
            credential,
            token: RwLock::new(None),
            cache: RwLock::new(HashMap::new()),
        })
    }

    pub fn from_config(
        vault_url: &str,
        config: &VaultConfig,
        timeout: Duration,
    ) -> Result<Self, SecretResolutionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SecretResolutionError::Vault(e.to_string()))?;
        Self::new(vault_url, VaultCredential::from_config(config), client)
    }

    pub fn vault_url(&self) -> &str {
        self.vault_url.as_str()
    }

    fn secret_url(&self, name: Option<&str>) -> Result<Url, SecretResolutionError> {
        let mut url = self.vault_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                SecretResolutionError::Vault("vault URL cannot be a base".to_string())
            })?;
            segments.pop_if_empty().push("secrets");
            if let Some(name) = name {
                segments.push(name);
            }
        }
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        Ok(url)
    }

    async fn access_token(&self) -> Result<String, SecretResolutionError> {
        if let VaultCredential::Static(token) = &self.credential {
            return Ok(token.clone());
        }

        {
            let cached = self.token.read().await;
            if let Some(token) = cached.as_ref() {
                if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                    return Ok(token.value.clone());
                }
            }
        }

        let (value, expires_in) = self.fetch_token().await?;
        let mut cached = self.token.write().await;
        *cached = Some(CachedToken {
            value: value.clone(),
            expires_at: Instant::now() + Duration::from_secs(expires_in.min(86_400)),
        });
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<(String, u64), SecretResolutionError> {
        // IMDS returns expires_in as a string
        #[derive(Deserialize)]
        struct TokenResponse {
            access_token: String,
            #[serde(default)]
            expires_in: Option<serde_json::Value>,
        }

        let request = match &self.credential {
            VaultCredential::ClientSecret {
                tenant_id,
                client_id,
                client_secret,
                authority,
            } => {
                let url = format!(
                    "{}/{}/oauth2/v2.0/token",
                    authority.trim_end_matches('/'),
                    tenant_id
                );
                self.client.post(url).form(&[
                    ("grant_type", "client_credentials"),
                    ("client_id", client_id.as_str()),
                    ("client_secret", client_secret.as_str()),
                    ("scope", VAULT_SCOPE),
                ])
            }
            VaultCredential::ManagedIdentity { endpoint } => self
                .client
                .get(endpoint)
                .header("Metadata", "true")
                .query(&[("api-version", "2018-02-01"), ("resource", VAULT_RESOURCE)]),
            VaultCredential::Static(token) => return Ok((token.clone(), 3600)),
        };

        let response = request.send().await.map_err(vault_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SecretResolutionError::Vault(format!(
                "token request failed with {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await.map_err(vault_error)?;
        let expires_in = match token.expires_in {
            Some(serde_json::Value::Number(n)) => n.as_u64().unwrap_or(3600),
            Some(serde_json::Value::String(s)) => s.parse().unwrap_or(3600),
            _ => 3600,
        };
        Ok((token.access_token, expires_in))
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, SecretResolutionError> {
        let token = self.access_token().await?;
        request.bearer_auth(token).send().await.map_err(vault_error)
    }
}

fn vault_error(err: reqwest::Error) -> SecretResolutionError {
    SecretResolutionError::Vault(err.to_string())
}

async fn status_error(response: reqwest::Response, action: &str) -> SecretResolutionError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    SecretResolutionError::Vault(format!("{} failed with {}: {}", action, status, body))
}

#[async_trait]
impl SecretStore for KeyVaultSecretStore {
    async fn get_secret(&self, name: &str) -> Result<Option<String>, SecretResolutionError> {
        if let Some(value) = self.cache.read().await.get(name) {
            return Ok(Some(value.clone()));
        }

        #[derive(Deserialize)]
        struct SecretBundle {
            value: Option<String>,
        }

        let url = self.secret_url(Some(name))?;
        let response = self.send(self.client.get(url)).await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(status_error(response, "get secret").await);
        }

        let bundle: SecretBundle = response.json().await.map_err(vault_error)?;
        if let Some(value) = &bundle.value {
            self.cache
                .write()
                .await
                .insert(name.to_string(), value.clone());
            tracing::info!(secret = %name, "Retrieved secret from Key Vault");
        }
        Ok(bundle.value)
    }

    async fn set_secret(&self, name: &str, value: &str) -> Result<(), SecretResolutionError> {
        let url = self.secret_url(Some(name))?;
        let response = self
            .send(
                self.client
                    .put(url)
                    .json(&serde_json::json!({ "value": value })),
            )
            .await?;
        if !response.status().is_success() {
            return Err(status_error(response, "set secret").await);
        }
        self.cache
            .write()
            .await
            .insert(name.to_string(), value.to_string());
        tracing::info!(secret = %name, "Stored secret in Key Vault");
        Ok(())
    }

    async fn delete_secret(&self, name: &str) -> Result<(), SecretResolutionError> {
        let url = self.secret_url(Some(name))?;
        let response = self.send(self.client.delete(url)).await?;
        self.cache.write().await.remove(name);
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(SecretResolutionError::Missing {
                name: name.to_string(),
                env_var: super::EnvSecretStore::env_key(name),
            });
        }
        if !response.status().is_success() {
            return Err(status_error(response, "delete secret").await);
        }
        tracing::info!(secret = %name, "Deleted secret from Key Vault");
        Ok(())
    }

    async fn list_secrets(&self) -> Result<Vec<String>, SecretResolutionError> {
        #[derive(Deserialize)]
        struct SecretItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct SecretPage {
            #[serde(default)]
            value: Vec<SecretItem>,
            #[serde(rename = "nextLink")]
            next_link: Option<String>,
        }

        let mut names = Vec::new();
        let mut next = Some(self.secret_url(None)?.to_string());
        while let Some(url) = next.take() {
            let response = self.send(self.client.get(url)).await?;
            if !response.status().is_success() {
                return Err(status_error(response, "list secrets").await);
            }
            let page: SecretPage = response.json().await.map_err(vault_error)?;
            names.extend(page.value.into_iter().filter_map(|item| {
                item.id
                    .trim_end_matches('/')
                    .rsplit('/')
                    .next()
                    .map(str::to_string)
            }));
            next = page.next_link.filter(|link| !link.is_empty());
        }
        Ok(names)
    }

    fn store_name(&self) -> &str {
        "azure-key-vault"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(url: &str) -> KeyVaultSecretStore {
        KeyVaultSecretStore::new(
            url,
            VaultCredential::Static("t".into()),
            reqwest::Client::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_secret_url() {
        let store = store("https://kv-test.vault.azure.net/");
        assert_eq!(
            store.secret_url(Some("github-token")).unwrap().as_str(),
            "https://kv-test.vault.azure.net/secrets/github-token?api-version=7.4"
        );
        assert_eq!(
            store.secret_url(None).unwrap().as_str(),
            "https://kv-test.vault.azure.net/secrets?api-version=7.4"
        );
    }

    #[test]
    fn test_credential_selection() {
        let mut config = VaultConfig::default();
        assert!(matches!(
            VaultCredential::from_config(&config),
            VaultCredential::ManagedIdentity { .. }
        ));

        config.tenant_id = Some("tenant".into());
        config.client_id = Some("client".into());
        config.client_secret = Some("secret".into());
        assert!(matches!(
            VaultCredential::from_config(&config),
            VaultCredential::ClientSecret { .. }
        ));
    }

    #[test]
    fn test_rejects_bad_url() {
        assert!(KeyVaultSecretStore::new(
            "not a url",
            VaultCredential::Static("t".into()),
            reqwest::Client::new()
        )
        .is_err());
    }
}
