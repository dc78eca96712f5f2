//! Process wiring
//!
//! Resolves credentials, builds the platform and LLM clients and assembles
//! the [`Assistant`]. A platform whose credential cannot be resolved or
//! whose client cannot be built is left unavailable; the others still work.

use std::sync::Arc;

use crate::assistant::Assistant;
use crate::classifier::IntentClassifier;
use crate::config::AppConfig;
use crate::error::SecretResolutionError;
use crate::llm::{create_llm_client, LlmClient};
use crate::platforms::{
    AsanaClient, ClientSlot, CodeHost, EditorWorkspace, GithubClient, LocalWorkspace, TaskTracker,
};
use crate::router::{CommandRouter, RouterSettings};
use crate::secrets::{EnvSecretStore, SecretName, SecretResolver};

/// Build the resolver for this process
///
/// A misconfigured vault degrades to environment-only lookups.
pub fn secret_resolver(config: &AppConfig, env: EnvSecretStore) -> SecretResolver {
    if !config.vault.enabled() {
        return SecretResolver::env_only(env);
    }
    match SecretResolver::from_config(&config.vault, env.clone(), config.http_timeout) {
        Ok(resolver) => resolver,
        Err(e) => {
            tracing::warn!(error = %e, "Key Vault unavailable, using environment only");
            SecretResolver::env_only(env)
        }
    }
}

/// Wire every client from configuration and the process environment
pub async fn build_assistant(config: &AppConfig) -> Assistant {
    let resolver = secret_resolver(config, EnvSecretStore::from_env());
    build_assistant_with(config, &resolver).await
}

/// Wire every client, resolving credentials through `resolver`
pub async fn build_assistant_with(config: &AppConfig, resolver: &SecretResolver) -> Assistant {
    let llm = llm_slot(config, resolver).await;
    let asana = asana_slot(config, resolver).await;
    let github = github_slot(config, resolver).await;
    let vscode: ClientSlot<dyn EditorWorkspace> = ClientSlot::ready(Arc::new(LocalWorkspace::new(
        config.workspace.project_path.clone(),
    )));

    tracing::info!(
        llm = llm.is_ready(),
        asana = asana.is_ready(),
        github = github.is_ready(),
        workspace = %config.workspace.project_path.display(),
        "Clients initialised"
    );

    let router = CommandRouter::new(RouterSettings {
        min_confidence: config.routing.min_confidence,
    })
    .with_asana(asana)
    .with_github(github)
    .with_vscode(vscode)
    .with_responder(llm.clone());

    Assistant::new(IntentClassifier::from_slot(llm), router)
}

async fn resolve_or_reason(
    resolver: &SecretResolver,
    secret: SecretName,
) -> Result<String, String> {
    resolver.resolve(secret).await.map_err(|e: SecretResolutionError| {
        tracing::warn!(secret = secret.vault_name, error = %e, "Credential unavailable");
        e.to_string()
    })
}

async fn llm_slot(config: &AppConfig, resolver: &SecretResolver) -> ClientSlot<dyn LlmClient> {
    let key = match resolve_or_reason(resolver, config.llm.backend.secret()).await {
        Ok(key) => key,
        Err(reason) => return ClientSlot::unavailable(reason),
    };
    match create_llm_client(&config.llm, key, config.http_timeout) {
        Ok(client) => ClientSlot::ready(client),
        Err(e) => ClientSlot::unavailable(format!("LLM client: {}", e)),
    }
}

async fn asana_slot(config: &AppConfig, resolver: &SecretResolver) -> ClientSlot<dyn TaskTracker> {
    let token = match resolve_or_reason(resolver, SecretName::ASANA_ACCESS_TOKEN).await {
        Ok(token) => token,
        Err(reason) => return ClientSlot::unavailable(reason),
    };
    match AsanaClient::new(token, &config.asana, config.http_timeout) {
        Ok(client) => ClientSlot::ready(Arc::new(client)),
        Err(e) => ClientSlot::unavailable(format!("Asana client: {}", e)),
    }
}

async fn github_slot(config: &AppConfig, resolver: &SecretResolver) -> ClientSlot<dyn CodeHost> {
    let token = match resolve_or_reason(resolver, SecretName::GITHUB_TOKEN).await {
        Ok(token) => token,
        Err(reason) => return ClientSlot::unavailable(reason),
    };
    match GithubClient::new(token, &config.github, config.http_timeout) {
        Ok(client) => ClientSlot::ready(Arc::new(client)),
        Err(e) => ClientSlot::unavailable(format!("GitHub client: {}", e)),
    }
}
