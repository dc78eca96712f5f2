//! REST clients against local axum mock servers

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use workbridge::config::{AsanaConfig, GithubConfig, LlmConfig};
use workbridge::error::PlatformErrorKind;
use workbridge::llm::{LlmClient, OpenAiClient};
use workbridge::platforms::{
    AsanaClient, CodeHost, GithubClient, IssueState, NewIssue, NewTask, TaskTracker,
};
use workbridge::secrets::key_vault::VaultCredential;
use workbridge::secrets::{KeyVaultSecretStore, SecretStore};

const TIMEOUT: Duration = Duration::from_secs(5);

async fn spawn(app: Router) -> String {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn authorized(headers: &HeaderMap, token: &str) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", token))
        .unwrap_or(false)
}

// ── Asana ───────────────────────────────────────────────────────

fn asana_mock() -> Router {
    Router::new()
        .route(
            "/workspaces",
            get(|| async { Json(json!({"data": [{"gid": "ws1", "name": "Acme"}]})) }),
        )
        .route(
            "/workspaces/:ws/projects",
            get(|Path(ws): Path<String>, headers: HeaderMap| async move {
                if !authorized(&headers, "asana-token") {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"errors": [{"message": "Not Authorized"}]})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({"data": [
                        {"gid": "p1", "name": format!("{} roadmap", ws)},
                        {"gid": "p2", "name": "Backlog"}
                    ]})),
                )
            }),
        )
        .route(
            "/tasks/:gid",
            get(|Path(gid): Path<String>| async move {
                if gid == "missing" {
                    return (
                        StatusCode::NOT_FOUND,
                        Json(json!({"errors": [{"message": "task: Unknown object: missing"}]})),
                    );
                }
                (
                    StatusCode::OK,
                    Json(json!({"data": {"gid": gid, "name": "Write docs", "completed": false}})),
                )
            }),
        )
        .route(
            "/tasks",
            post(|Json(body): Json<Value>| async move {
                let data = &body["data"];
                Json(json!({"data": {
                    "gid": "t-new",
                    "name": data["name"],
                    "notes": data["notes"],
                    "projects": [{"gid": data["workspace"]}],
                }}))
            }),
        )
}

#[tokio::test]
async fn test_asana_projects_use_first_workspace() {
    let base_url = spawn(asana_mock()).await;
    let config = AsanaConfig {
        base_url,
        workspace_gid: None,
    };
    let client = AsanaClient::new("asana-token".into(), &config, TIMEOUT).unwrap();

    let projects = client.get_projects().await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].name, "ws1 roadmap");
}

#[tokio::test]
async fn test_asana_error_kinds() {
    let base_url = spawn(asana_mock()).await;
    let config = AsanaConfig {
        base_url,
        workspace_gid: Some("ws9".into()),
    };

    let bad_token = AsanaClient::new("wrong".into(), &config, TIMEOUT).unwrap();
    let err = bad_token.get_projects().await.unwrap_err();
    assert_eq!(err.kind, PlatformErrorKind::Auth);
    assert_eq!(err.message, "Not Authorized");

    let client = AsanaClient::new("asana-token".into(), &config, TIMEOUT).unwrap();
    let err = client.get_task("missing").await.unwrap_err();
    assert_eq!(err.kind, PlatformErrorKind::NotFound);
    assert!(err.message.contains("Unknown object"));
}

#[tokio::test]
async fn test_asana_create_task_in_configured_workspace() {
    let base_url = spawn(asana_mock()).await;
    let config = AsanaConfig {
        base_url,
        workspace_gid: Some("ws9".into()),
    };
    let client = AsanaClient::new("asana-token".into(), &config, TIMEOUT).unwrap();

    let task = client
        .create_task(NewTask {
            name: "Ship it".into(),
            notes: "from test".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(task.gid, "t-new");
    assert_eq!(task.notes.as_deref(), Some("from test"));
    assert_eq!(task.projects[0].gid, "ws9");
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let config = AsanaConfig {
        base_url: "http://127.0.0.1:9".into(),
        workspace_gid: Some("ws".into()),
    };
    let client = AsanaClient::new("t".into(), &config, TIMEOUT).unwrap();
    let err = client.get_task("1").await.unwrap_err();
    assert_eq!(err.kind, PlatformErrorKind::Network);
}

// ── GitHub ──────────────────────────────────────────────────────

fn github_mock() -> Router {
    Router::new()
        .route(
            "/repos/acme/api/issues",
            get(|Query(q): Query<std::collections::HashMap<String, String>>| async move {
                let state = q.get("state").cloned().unwrap_or_default();
                Json(json!([
                    {"number": 1, "title": "Bug", "state": state, "labels": [{"name": "bug"}],
                     "html_url": "https://github.com/acme/api/issues/1"},
                    {"number": 2, "title": "PR", "state": state, "html_url": "https://github.com/acme/api/pull/2",
                     "pull_request": {"url": "x"}}
                ]))
            })
            .post(|Json(body): Json<Value>| async move {
                let status = if body["title"].is_string() {
                    StatusCode::CREATED
                } else {
                    StatusCode::UNPROCESSABLE_ENTITY
                };
                (
                    status,
                    Json(json!({"number": 12, "html_url": "https://github.com/acme/api/issues/12"})),
                )
            }),
        )
        .route(
            "/orgs/acme/repos",
            get(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({"message": "API rate limit exceeded"})),
                )
                    .into_response()
            }),
        )
}

fn github_config(api_url: String) -> GithubConfig {
    GithubConfig {
        api_url,
        organization: Some("acme".into()),
        default_repo: Some("api".into()),
    }
}

#[tokio::test]
async fn test_github_create_issue() {
    let api_url = spawn(github_mock()).await;
    let client = GithubClient::new("gh".into(), &github_config(api_url), TIMEOUT).unwrap();

    let created = client
        .create_issue(
            None,
            NewIssue {
                title: "login bug".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(created.issue_number, 12);
    assert_eq!(created.url, "https://github.com/acme/api/issues/12");
}

#[tokio::test]
async fn test_github_issues_skip_pull_requests() {
    let api_url = spawn(github_mock()).await;
    let client = GithubClient::new("gh".into(), &github_config(api_url), TIMEOUT).unwrap();

    let issues = client
        .get_issues(Some("acme/api"), IssueState::Closed)
        .await
        .unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].labels, vec!["bug"]);
    assert_eq!(issues[0].state, "closed");
}

#[tokio::test]
async fn test_github_rate_limit() {
    let api_url = spawn(github_mock()).await;
    let client = GithubClient::new("gh".into(), &github_config(api_url), TIMEOUT).unwrap();

    let err = client.get_repositories(None).await.unwrap_err();
    assert_eq!(err.kind, PlatformErrorKind::RateLimited);
    assert_eq!(err.message, "API rate limit exceeded");
}

// ── OpenAI ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_openai_chat_json() {
    let app = Router::new().route(
        "/chat/completions",
        post(|Json(body): Json<Value>| async move {
            // gpt-4 has no native JSON mode, so the instruction goes in the prompt
            let json_mode = body.get("response_format").is_some();
            let temperature = body["temperature"].as_f64().unwrap_or_default();
            Json(json!({"choices": [{"message": {"content": format!(
                "{{\"json_mode\": {}, \"temperature\": {:.1}}}",
                json_mode, temperature
            )}}]}))
        }),
    );
    let base_url = spawn(app).await;
    let config = LlmConfig {
        openai_base_url: base_url,
        ..Default::default()
    };
    let client = OpenAiClient::from_config("sk-test".into(), &config, TIMEOUT).unwrap();

    let raw = client.chat_json("system", "user").await.unwrap();
    let reply: Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(reply, json!({"json_mode": false, "temperature": 0.3}));
}

// ── Key Vault ───────────────────────────────────────────────────

#[tokio::test]
async fn test_key_vault_get_and_missing() {
    let app = Router::new().route(
        "/secrets/:name",
        get(|Path(name): Path<String>, headers: HeaderMap| async move {
            if !authorized(&headers, "vault-token") {
                return (StatusCode::UNAUTHORIZED, Json(json!({}))).into_response();
            }
            match name.as_str() {
                "github-token" => Json(json!({"value": "ghp_abc"})).into_response(),
                _ => (
                    StatusCode::NOT_FOUND,
                    Json(json!({"error": {"code": "SecretNotFound"}})),
                )
                    .into_response(),
            }
        }),
    );
    let vault_url = spawn(app).await;
    let store = KeyVaultSecretStore::new(
        &vault_url,
        VaultCredential::Static("vault-token".into()),
        reqwest::Client::new(),
    )
    .unwrap();

    assert_eq!(
        store.get_secret("github-token").await.unwrap().as_deref(),
        Some("ghp_abc")
    );
    assert_eq!(store.get_secret("asana-access-token").await.unwrap(), None);
}
