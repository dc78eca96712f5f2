//! Platform clients
//!
//! One trait per external platform. The router only sees the traits, so
//! tests swap in stubs and production wires the REST/CLI implementations.

pub mod asana;
pub mod github;
pub mod types;
pub mod vscode;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::{DispatchError, PlatformError};

pub use asana::AsanaClient;
pub use github::GithubClient;
pub use types::*;
pub use vscode::LocalWorkspace;

/// Task tracking (Asana)
#[async_trait]
pub trait TaskTracker: Send + Sync {
    async fn get_projects(&self) -> Result<Vec<Project>, PlatformError>;

    /// Tasks of a project, or the caller's own tasks when no project is given
    async fn get_tasks(
        &self,
        project_gid: Option<&str>,
        completed: bool,
    ) -> Result<Vec<Task>, PlatformError>;

    async fn get_task(&self, task_gid: &str) -> Result<Task, PlatformError>;

    async fn create_task(&self, task: NewTask) -> Result<Task, PlatformError>;

    async fn update_task(
        &self,
        task_gid: &str,
        updates: Map<String, Value>,
    ) -> Result<Task, PlatformError>;

    async fn complete_task(&self, task_gid: &str) -> Result<Task, PlatformError> {
        let mut updates = Map::new();
        updates.insert("completed".to_string(), Value::Bool(true));
        self.update_task(task_gid, updates).await
    }

    async fn search_tasks(
        &self,
        query: &str,
        project_gid: Option<&str>,
    ) -> Result<Vec<Task>, PlatformError>;

    async fn add_comment(&self, task_gid: &str, text: &str) -> Result<Comment, PlatformError>;
}

/// Source hosting (GitHub)
///
/// `repo` is a bare repository name, an `owner/name` pair, or `None` for the
/// configured default repository.
#[async_trait]
pub trait CodeHost: Send + Sync {
    async fn get_repositories(
        &self,
        organization: Option<&str>,
    ) -> Result<Vec<Repository>, PlatformError>;

    async fn get_repository(&self, repo: Option<&str>) -> Result<Repository, PlatformError>;

    async fn get_issues(
        &self,
        repo: Option<&str>,
        state: IssueState,
    ) -> Result<Vec<Issue>, PlatformError>;

    async fn get_issue(&self, repo: Option<&str>, number: u64) -> Result<Issue, PlatformError>;

    async fn create_issue(
        &self,
        repo: Option<&str>,
        issue: NewIssue,
    ) -> Result<CreatedIssue, PlatformError>;

    async fn update_issue(
        &self,
        repo: Option<&str>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<Issue, PlatformError>;

    async fn add_issue_comment(
        &self,
        repo: Option<&str>,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, PlatformError>;

    async fn get_pull_requests(
        &self,
        repo: Option<&str>,
        state: IssueState,
    ) -> Result<Vec<PullRequest>, PlatformError>;

    async fn create_pull_request(
        &self,
        repo: Option<&str>,
        pr: NewPullRequest,
    ) -> Result<CreatedPullRequest, PlatformError>;

    async fn get_commits(
        &self,
        repo: Option<&str>,
        branch: Option<&str>,
    ) -> Result<Vec<Commit>, PlatformError>;

    async fn search_repositories(&self, query: &str) -> Result<Vec<RepoSearchHit>, PlatformError>;
}

/// Local editor workspace (VS Code)
#[async_trait]
pub trait EditorWorkspace: Send + Sync {
    /// Workspace root all relative paths resolve against
    fn root(&self) -> &Path;

    async fn open_project(&self, path: Option<&str>) -> Result<EditorAction, PlatformError>;

    async fn open_file(&self, path: &str, line: Option<u32>)
        -> Result<EditorAction, PlatformError>;

    async fn get_settings(&self) -> Result<Map<String, Value>, PlatformError>;

    /// Merge into `.vscode/settings.json`; returns the merged settings
    async fn update_settings(
        &self,
        settings: Map<String, Value>,
    ) -> Result<Map<String, Value>, PlatformError>;

    async fn create_task(&self, task_config: Value) -> Result<EditorAction, PlatformError>;

    async fn create_launch_config(&self, config: Value) -> Result<EditorAction, PlatformError>;

    async fn create_snippet(
        &self,
        language: &str,
        name: &str,
        snippet: Value,
    ) -> Result<EditorAction, PlatformError>;

    async fn install_extension(&self, extension_id: &str) -> Result<EditorAction, PlatformError>;

    async fn list_extensions(&self) -> Result<Vec<String>, PlatformError>;

    async fn get_workspace_files(&self, pattern: Option<&str>)
        -> Result<Vec<String>, PlatformError>;

    async fn git_status(&self) -> Result<GitStatus, PlatformError>;

    /// Apply a language preset: workspace settings plus recommended extensions
    async fn setup_project(&self, project_type: &str) -> Result<ProjectSetup, PlatformError> {
        let Some((settings, extensions)) = vscode::project_preset(project_type) else {
            return Ok(ProjectSetup {
                project_type: project_type.to_string(),
                recognized: false,
                settings: Value::Object(Map::new()),
                installed_extensions: Vec::new(),
                failed_extensions: Vec::new(),
            });
        };

        self.update_settings(settings.clone()).await?;

        let mut installed = Vec::new();
        let mut failed = Vec::new();
        for &extension in extensions {
            match self.install_extension(extension).await {
                Ok(outcome) if outcome.success => installed.push(extension.to_string()),
                Ok(_) => failed.push(extension.to_string()),
                Err(e) => {
                    tracing::warn!(extension, error = %e, "Extension install failed");
                    failed.push(extension.to_string());
                }
            }
        }

        Ok(ProjectSetup {
            project_type: project_type.to_string(),
            recognized: true,
            settings: Value::Object(settings),
            installed_extensions: installed,
            failed_extensions: failed,
        })
    }
}

/// A platform client, or the reason it could not be built
pub enum ClientSlot<T: ?Sized> {
    Ready(Arc<T>),
    Unavailable(String),
}

impl<T: ?Sized> ClientSlot<T> {
    pub fn ready(client: Arc<T>) -> Self {
        ClientSlot::Ready(client)
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        ClientSlot::Unavailable(reason.into())
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ClientSlot::Ready(_))
    }

    /// The client, or `DispatchError::Unavailable` naming `platform`
    pub fn get(&self, platform: &str) -> Result<&Arc<T>, DispatchError> {
        match self {
            ClientSlot::Ready(client) => Ok(client),
            ClientSlot::Unavailable(reason) => Err(DispatchError::Unavailable {
                platform: platform.to_string(),
                reason: reason.clone(),
            }),
        }
    }
}

impl<T: ?Sized> Clone for ClientSlot<T> {
    fn clone(&self) -> Self {
        match self {
            ClientSlot::Ready(client) => ClientSlot::Ready(Arc::clone(client)),
            ClientSlot::Unavailable(reason) => ClientSlot::Unavailable(reason.clone()),
        }
    }
}

/// Turn a non-success provider response into a [`PlatformError`]
///
/// Pulls the provider's own message out of `{"message": ..}` (GitHub) or
/// `{"errors": [{"message": ..}]}` (Asana) bodies when present.
pub(crate) async fn error_from_response(response: reqwest::Response) -> PlatformError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    v.pointer("/errors/0/message")
                        .and_then(Value::as_str)
                        .map(str::to_string)
                })
        })
        .unwrap_or_else(|| {
            if body.is_empty() {
                status.to_string()
            } else {
                body
            }
        });
    PlatformError::from_status(status, message)
}
