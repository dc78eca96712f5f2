//! workbridge REST server
//!
//! Reads configuration from the environment (and `.env` when present):
//!   API_HOST / API_PORT   listen address (default: 0.0.0.0:8000)
//!   LLM_BACKEND           openai (default) or anthropic
//!   USE_KEY_VAULT         resolve credentials from Azure Key Vault first
//!
//! ```bash
//! cargo run --bin workbridge_server
//! curl -X POST http://localhost:8000/api/command \
//!   -H "Content-Type: application/json" \
//!   -d '{"command": "Create a task for implementing user authentication"}'
//! ```

use anyhow::Result;

use workbridge::config::AppConfig;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,workbridge=debug,tower_http=info".into()),
        )
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(
        backend = %config.llm.backend,
        model = config.llm.backend.model(&config.llm),
        key_vault = config.vault.enabled(),
        "Starting workbridge server"
    );

    workbridge::api::serve(config).await
}
