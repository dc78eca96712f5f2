//! Command, sync, status and direct platform endpoints

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::Value;

use super::error::AppError;
use super::types::*;
use crate::assistant::Assistant;
use crate::envelope::{CommandResult, ErrorCategory};
use crate::intent::{Intent, Platform};
use crate::router::SyncRequest;

pub type AppState = Arc<Assistant>;

const SERVICE_NAME: &str = "workbridge";
const VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// ROUTER
// =============================================================================

/// Routes for the command pipeline and the direct platform endpoints
pub fn create_command_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        .route("/api/command", post(process_command))
        .route("/api/sync", post(sync))
        .route("/api/status", get(status))
        // Asana
        .route("/api/asana/projects", get(asana_projects))
        .route(
            "/api/asana/projects/:project_gid/tasks",
            get(asana_project_tasks),
        )
        .route("/api/asana/tasks", post(asana_create_task))
        // GitHub
        .route("/api/github/repositories", get(github_repositories))
        .route(
            "/api/github/repositories/:repo/issues",
            get(github_repository_issues),
        )
        .route("/api/github/issues", post(github_create_issue))
        // VS Code
        .route("/api/vscode/workspace/files", get(vscode_workspace_files))
        .route("/api/vscode/git/status", get(vscode_git_status))
        .route("/api/vscode/open-project", post(vscode_open_project))
        .with_state(state)
}

/// 400 for results the caller could fix by changing the request
fn status_for(result: &CommandResult) -> StatusCode {
    match result.error_category() {
        Some(ErrorCategory::UnsupportedOperation | ErrorCategory::InvalidParameters) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::OK,
    }
}

// =============================================================================
// PIPELINE HANDLERS
// =============================================================================

/// GET / - service identity
async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        service: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        status: "running".to_string(),
    })
}

/// GET /api/health - liveness, no external calls
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        timestamp: Utc::now(),
    })
}

/// POST /api/command - classify and dispatch a natural-language command
async fn process_command(
    State(assistant): State<AppState>,
    body: Result<Json<CommandRequest>, JsonRejection>,
) -> Result<Json<CommandResult>, AppError> {
    let Json(request) = body?;
    let command = request.command.trim();
    if command.is_empty() {
        return Err(AppError::bad_request("Command must not be empty"));
    }
    let result = assistant
        .process_command(command, request.context.as_ref())
        .await;
    Ok(Json(result))
}

/// POST /api/sync - copy an entity between Asana and GitHub
async fn sync(
    State(assistant): State<AppState>,
    body: Result<Json<SyncRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = body?;
    let result = assistant.sync(request).await;
    Ok((status_for(&result), Json(result)))
}

/// GET /api/status - per-platform availability
async fn status(State(assistant): State<AppState>) -> impl IntoResponse {
    Json(assistant.status().await)
}

// =============================================================================
// DIRECT PLATFORM HANDLERS
// =============================================================================

async fn dispatch(assistant: &Assistant, intent: Intent) -> (StatusCode, Json<CommandResult>) {
    let result = assistant.router().dispatch(intent).await;
    (status_for(&result), Json(result))
}

fn body_object(body: Result<Json<Value>, JsonRejection>) -> Result<ParameterBody, AppError> {
    let Json(value) = body?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(AppError::bad_request("Request body must be a JSON object")),
    }
}

/// GET /api/asana/projects - list workspace projects
async fn asana_projects(State(assistant): State<AppState>) -> impl IntoResponse {
    dispatch(
        &assistant,
        Intent::new("list_projects", Platform::Asana, "get_projects"),
    )
    .await
}

/// GET /api/asana/projects/:project_gid/tasks - tasks of one project
async fn asana_project_tasks(
    State(assistant): State<AppState>,
    Path(project_gid): Path<String>,
    Query(query): Query<TasksQuery>,
) -> impl IntoResponse {
    let intent = Intent::new("list_tasks", Platform::Asana, "get_tasks")
        .with_parameter("project_gid", project_gid)
        .with_parameter("completed", query.completed);
    dispatch(&assistant, intent).await
}

/// POST /api/asana/tasks - create a task from explicit fields
async fn asana_create_task(
    State(assistant): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let intent = Intent::new("create_task", Platform::Asana, "create_task")
        .with_parameters(body_object(body)?);
    Ok(dispatch(&assistant, intent).await)
}

/// GET /api/github/repositories - repositories of the org or user
async fn github_repositories(
    State(assistant): State<AppState>,
    Query(query): Query<RepositoriesQuery>,
) -> impl IntoResponse {
    let mut intent = Intent::new("list_repositories", Platform::Github, "get_repositories");
    if let Some(organization) = query.organization {
        intent = intent.with_parameter("organization", organization);
    }
    dispatch(&assistant, intent).await
}

/// GET /api/github/repositories/:repo/issues - issues of one repository
async fn github_repository_issues(
    State(assistant): State<AppState>,
    Path(repo): Path<String>,
    Query(query): Query<IssuesQuery>,
) -> impl IntoResponse {
    let intent = Intent::new("list_issues", Platform::Github, "get_issues")
        .with_parameter("repo_name", repo)
        .with_parameter("state", query.state.as_str());
    dispatch(&assistant, intent).await
}

/// POST /api/github/issues - create an issue from explicit fields
async fn github_create_issue(
    State(assistant): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let intent = Intent::new("create_issue", Platform::Github, "create_issue")
        .with_parameters(body_object(body)?);
    Ok(dispatch(&assistant, intent).await)
}

/// GET /api/vscode/workspace/files - files under the workspace root
async fn vscode_workspace_files(
    State(assistant): State<AppState>,
    Query(query): Query<FilesQuery>,
) -> impl IntoResponse {
    let mut intent = Intent::new("list_files", Platform::Vscode, "get_workspace_files");
    if let Some(pattern) = query.pattern {
        intent = intent.with_parameter("pattern", pattern);
    }
    dispatch(&assistant, intent).await
}

/// GET /api/vscode/git/status - git status of the workspace
async fn vscode_git_status(State(assistant): State<AppState>) -> impl IntoResponse {
    dispatch(
        &assistant,
        Intent::new("git_status", Platform::Vscode, "git_status"),
    )
    .await
}

/// POST /api/vscode/open-project - open a folder in the editor
async fn vscode_open_project(
    State(assistant): State<AppState>,
    Query(query): Query<OpenProjectQuery>,
) -> impl IntoResponse {
    let mut intent = Intent::new("open_project", Platform::Vscode, "open_project");
    if let Some(project_path) = query.project_path {
        intent = intent.with_parameter("project_path", project_path);
    }
    dispatch(&assistant, intent).await
}
