//! Inbound webhooks from Asana and GitHub
//!
//! Events are logged and acknowledged; nothing is dispatched from them.
//! Signatures are not verified.

use axum::{
    body::Bytes,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use super::routes::AppState;
use super::types::WebhookAck;

pub const HOOK_SECRET_HEADER: &str = "x-hook-secret";
pub const GITHUB_EVENT_HEADER: &str = "x-github-event";

pub fn create_webhook_router(state: AppState) -> Router {
    Router::new()
        .route("/api/webhooks/asana", post(asana_webhook))
        .route("/api/webhooks/github", post(github_webhook))
        .with_state(state)
}

// ============================================================================
// Asana
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct AsanaEvents {
    #[serde(default)]
    pub events: Vec<AsanaEvent>,
}

#[derive(Debug, Deserialize)]
pub struct AsanaEvent {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub resource: Option<AsanaResource>,
}

#[derive(Debug, Deserialize)]
pub struct AsanaResource {
    #[serde(default)]
    pub gid: String,
    #[serde(default)]
    pub resource_type: String,
}

/// Parse an Asana event callback; an empty or unreadable body has no events
pub fn parse_asana_events(body: &[u8]) -> AsanaEvents {
    if body.iter().all(u8::is_ascii_whitespace) {
        return AsanaEvents::default();
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Unreadable Asana webhook body");
        AsanaEvents::default()
    })
}

/// POST /api/webhooks/asana - handshake and event callbacks
async fn asana_webhook(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    // Handshake: echo the secret back to confirm the subscription
    if let Some(secret) = headers.get(HOOK_SECRET_HEADER) {
        tracing::info!("Asana webhook handshake");
        let mut response_headers = HeaderMap::new();
        response_headers.insert(HeaderName::from_static(HOOK_SECRET_HEADER), secret.clone());
        return (
            StatusCode::OK,
            response_headers,
            Json(WebhookAck::events(0)),
        );
    }

    let payload = parse_asana_events(&body);
    for event in &payload.events {
        let Some(resource) = &event.resource else {
            continue;
        };
        if resource.resource_type != "task" {
            continue;
        }
        match event.action.as_str() {
            "added" => tracing::info!(task_gid = %resource.gid, "Asana task added"),
            "changed" => tracing::info!(task_gid = %resource.gid, "Asana task changed"),
            other => tracing::debug!(task_gid = %resource.gid, action = other, "Asana task event"),
        }
    }

    (
        StatusCode::OK,
        HeaderMap::new(),
        Json(WebhookAck::events(payload.events.len())),
    )
}

// ============================================================================
// GitHub
// ============================================================================

/// POST /api/webhooks/github - issue, pull request and ping events
async fn github_webhook(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let event = headers
        .get(GITHUB_EVENT_HEADER)
        .and_then(|v: &HeaderValue| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let action = payload.get("action").and_then(Value::as_str).unwrap_or("");

    match (event.as_str(), action) {
        ("issues", "opened" | "edited") => {
            let number = payload.pointer("/issue/number").and_then(Value::as_u64);
            tracing::info!(issue_number = number, action, "GitHub issue event");
        }
        ("pull_request", "opened" | "closed") => {
            let number = payload
                .pointer("/pull_request/number")
                .and_then(Value::as_u64);
            tracing::info!(pr_number = number, action, "GitHub pull request event");
        }
        ("ping", _) => {
            let zen = payload.get("zen").and_then(Value::as_str).unwrap_or("");
            tracing::info!(zen, "GitHub webhook ping");
        }
        _ => tracing::debug!(event = %event, action, "GitHub event acknowledged"),
    }

    Json(WebhookAck::event(event))
}
