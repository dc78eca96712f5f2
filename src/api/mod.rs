//! REST API
//!
//! Exposes the command pipeline over HTTP:
//! - `POST /api/command`, `POST /api/sync`, `GET /api/status`, `GET /api/health`
//! - direct platform endpoints under `/api/asana`, `/api/github`, `/api/vscode`
//! - webhook receivers under `/api/webhooks`

pub mod error;
pub mod routes;
pub mod types;
pub mod webhooks;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::assistant::Assistant;
use crate::bootstrap;
use crate::config::AppConfig;

pub use error::AppError;
pub use routes::{create_command_router, AppState};
pub use webhooks::create_webhook_router;

/// Full application router with CORS and request tracing
pub fn create_router(assistant: Arc<Assistant>) -> Router {
    create_command_router(assistant.clone())
        .merge(create_webhook_router(assistant))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Build all clients from `config` and serve until the process exits
pub async fn serve(config: AppConfig) -> Result<()> {
    let assistant = Arc::new(bootstrap::build_assistant(&config).await);
    let app = create_router(assistant);

    let bind_addr = config.api.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind to {}", bind_addr))?;
    tracing::info!("workbridge listening on {}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
