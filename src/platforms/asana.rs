//! Asana REST client
//!
//! Every Asana response wraps its payload in `{"data": ...}`. The default
//! workspace comes from configuration or, failing that, the first workspace
//! of the token's user; it is looked up once and cached.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::OnceCell;

use super::types::{Comment, NewTask, Project, Task};
use super::{error_from_response, TaskTracker};
use crate::config::AsanaConfig;
use crate::error::{PlatformError, PlatformErrorKind};

const TASK_FIELDS: &str =
    "name,notes,completed,assignee.name,due_on,projects.name,tags.name,permalink_url";
const TASK_LIST_FIELDS: &str = "name,notes,completed,assignee.name,due_on";

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

pub struct AsanaClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    workspace: OnceCell<String>,
}

impl AsanaClient {
    pub fn new(
        token: String,
        config: &AsanaConfig,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let workspace = match &config.workspace_gid {
            Some(gid) => OnceCell::new_with(Some(gid.clone())),
            None => OnceCell::new(),
        };
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
            workspace,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PlatformError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let envelope: DataEnvelope<T> = response.json().await?;
        Ok(envelope.data)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        self.send(self.client.get(self.url(path)).query(query)).await
    }

    /// Configured workspace, else the user's first workspace
    pub async fn workspace_gid(&self) -> Result<&str, PlatformError> {
        let gid = self
            .workspace
            .get_or_try_init(|| async {
                let workspaces: Vec<Project> = self.get("/workspaces", &[]).await?;
                let first = workspaces.into_iter().next().ok_or_else(|| {
                    PlatformError::new(PlatformErrorKind::NotFound, "No Asana workspace found")
                })?;
                tracing::debug!(workspace = %first.gid, "Using first Asana workspace");
                Ok::<_, PlatformError>(first.gid)
            })
            .await?;
        Ok(gid.as_str())
    }
}

#[async_trait]
impl TaskTracker for AsanaClient {
    async fn get_projects(&self) -> Result<Vec<Project>, PlatformError> {
        let workspace = self.workspace_gid().await?;
        self.get(
            &format!("/workspaces/{}/projects", workspace),
            &[("opt_fields", "name")],
        )
        .await
    }

    async fn get_tasks(
        &self,
        project_gid: Option<&str>,
        completed: bool,
    ) -> Result<Vec<Task>, PlatformError> {
        // completed_since=now returns only incomplete tasks
        let mut query = vec![("opt_fields", TASK_LIST_FIELDS)];
        if !completed {
            query.push(("completed_since", "now"));
        }

        match project_gid {
            Some(project) => {
                self.get(&format!("/projects/{}/tasks", project), &query)
                    .await
            }
            None => {
                let workspace = self.workspace_gid().await?;
                query.push(("assignee", "me"));
                query.push(("workspace", workspace));
                self.get("/tasks", &query).await
            }
        }
    }

    async fn get_task(&self, task_gid: &str) -> Result<Task, PlatformError> {
        self.get(
            &format!("/tasks/{}", task_gid),
            &[("opt_fields", TASK_FIELDS)],
        )
        .await
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, PlatformError> {
        let mut data = json!({
            "name": task.name,
            "notes": task.notes,
        });
        match &task.project_gid {
            Some(project) => data["projects"] = json!([project]),
            None => {
                let workspace = self.workspace_gid().await?;
                data["workspace"] = json!(workspace);
            }
        }
        if let Some(assignee) = &task.assignee {
            data["assignee"] = json!(assignee);
        }
        if let Some(due_on) = &task.due_on {
            data["due_on"] = json!(due_on);
        }

        let created: Task = self
            .send(
                self.client
                    .post(self.url("/tasks"))
                    .query(&[("opt_fields", TASK_FIELDS)])
                    .json(&json!({ "data": data })),
            )
            .await?;
        tracing::info!(task = %created.gid, "Created Asana task");
        Ok(created)
    }

    async fn update_task(
        &self,
        task_gid: &str,
        updates: Map<String, Value>,
    ) -> Result<Task, PlatformError> {
        if updates.is_empty() {
            return Err(PlatformError::invalid_request("No task fields to update"));
        }
        self.send(
            self.client
                .put(self.url(&format!("/tasks/{}", task_gid)))
                .query(&[("opt_fields", TASK_FIELDS)])
                .json(&json!({ "data": updates })),
        )
        .await
    }

    async fn search_tasks(
        &self,
        query: &str,
        project_gid: Option<&str>,
    ) -> Result<Vec<Task>, PlatformError> {
        let workspace = self.workspace_gid().await?;
        let mut params = vec![("text", query), ("opt_fields", TASK_LIST_FIELDS)];
        if let Some(project) = project_gid {
            params.push(("projects.any", project));
        }
        self.get(&format!("/workspaces/{}/tasks/search", workspace), &params)
            .await
    }

    async fn add_comment(&self, task_gid: &str, text: &str) -> Result<Comment, PlatformError> {
        self.send(
            self.client
                .post(self.url(&format!("/tasks/{}/stories", task_gid)))
                .json(&json!({ "data": { "text": text } })),
        )
        .await
    }
}
