//! Cross-platform sync between Asana tasks and GitHub issues
//!
//! Each sync is read source, create target, then comment a back-link onto
//! the source. Steps are not atomic: when a later step fails, the payloads
//! of the steps that already took effect travel in the error context.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::params::{SyncIssueParams, SyncTaskParams};
use super::{to_payload, CommandRouter};
use crate::envelope::CommandResult;
use crate::error::DispatchError;
use crate::intent::{Intent, Platform};
use crate::platforms::{NewIssue, NewTask};

/// Label put on issues created from Asana tasks
pub const SYNC_LABEL: &str = "asana-sync";

/// Body of `POST /api/sync`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub source_platform: String,
    pub target_platform: String,
    pub source_id: String,
    #[serde(default)]
    pub additional_params: Map<String, Value>,
}

impl SyncRequest {
    pub fn new(
        source_platform: impl Into<String>,
        target_platform: impl Into<String>,
        source_id: impl Into<String>,
    ) -> Self {
        Self {
            source_platform: source_platform.into(),
            target_platform: target_platform.into(),
            source_id: source_id.into(),
            additional_params: Map::new(),
        }
    }

    /// The `multi` intent this request dispatches as
    ///
    /// Pairs other than asana/github produce an action the router rejects
    /// as unsupported.
    pub fn into_intent(self) -> Intent {
        let source = self.source_platform.trim().to_ascii_lowercase();
        let target = self.target_platform.trim().to_ascii_lowercase();

        let mut parameters = self.additional_params;
        let action = match (source.as_str(), target.as_str()) {
            ("asana", "github") => {
                parameters.insert("task_gid".into(), Value::String(self.source_id));
                "sync_task_to_issue".to_string()
            }
            ("github", "asana") => {
                parameters.insert("issue_number".into(), Value::String(self.source_id));
                "sync_issue_to_task".to_string()
            }
            _ => format!("sync_{}_to_{}", source, target),
        };

        Intent::new("sync", Platform::Multi, action).with_parameters(parameters)
    }
}

impl CommandRouter {
    /// Run a sync request through the normal dispatch path
    pub async fn sync(&self, request: SyncRequest) -> CommandResult {
        tracing::info!(
            source = %request.source_platform,
            target = %request.target_platform,
            source_id = %request.source_id,
            "Sync requested"
        );
        self.dispatch(request.into_intent()).await
    }

    pub(crate) async fn sync_task_to_issue(
        &self,
        params: SyncTaskParams,
    ) -> Result<Value, DispatchError> {
        let asana = self.asana_slot().get("asana")?;
        let github = self.github_slot().get("github")?;

        let task = asana
            .get_task(&params.task_gid)
            .await
            .map_err(|e| DispatchError::platform("asana", e))?;
        let source = to_payload(&task)?;

        let issue = NewIssue {
            title: task.name.clone(),
            body: Some(format!(
                "Synced from Asana task: {}\n\nTask ID: {}",
                task.notes.as_deref().unwrap_or_default(),
                task.gid
            )),
            assignee: None,
            labels: vec![SYNC_LABEL.to_string()],
        };
        let created = github
            .create_issue(params.repo_name.as_deref(), issue)
            .await
            .map_err(|e| {
                DispatchError::platform("github", e).after(json!({ "asana_task": source }))
            })?;
        let target = to_payload(&created)?;

        let comment = format!("GitHub issue created: {}", created.url);
        asana
            .add_comment(&task.gid, &comment)
            .await
            .map_err(|e| {
                DispatchError::platform("asana", e).after(json!({
                    "asana_task": source,
                    "github_issue": target,
                }))
            })?;

        tracing::info!(task_gid = %task.gid, issue_number = created.issue_number, "Synced task to issue");
        Ok(json!({
            "action": "task_synced_to_issue",
            "asana_task": source,
            "github_issue": target,
        }))
    }

    pub(crate) async fn sync_issue_to_task(
        &self,
        params: SyncIssueParams,
    ) -> Result<Value, DispatchError> {
        let github = self.github_slot().get("github")?;
        let asana = self.asana_slot().get("asana")?;
        let repo = params.repo_name.as_deref();

        let issue = github
            .get_issue(repo, params.issue_number)
            .await
            .map_err(|e| DispatchError::platform("github", e))?;
        let source = to_payload(&issue)?;

        let task = NewTask {
            name: issue.title.clone(),
            notes: format!(
                "Synced from GitHub issue #{}\n\n{}\n\nIssue URL: {}",
                issue.number,
                issue.body.as_deref().unwrap_or_default(),
                issue.html_url
            ),
            project_gid: params.project_gid,
            assignee: None,
            due_on: None,
        };
        let created = asana.create_task(task).await.map_err(|e| {
            DispatchError::platform("asana", e).after(json!({ "github_issue": source }))
        })?;
        let target = to_payload(&created)?;

        let link = created.permalink_url.as_deref().unwrap_or(&created.gid);
        let comment = format!("Asana task created: {}", link);
        github
            .add_issue_comment(repo, issue.number, &comment)
            .await
            .map_err(|e| {
                DispatchError::platform("github", e).after(json!({
                    "github_issue": source,
                    "asana_task": target,
                }))
            })?;

        tracing::info!(issue_number = issue.number, task_gid = %created.gid, "Synced issue to task");
        Ok(json!({
            "action": "issue_synced_to_task",
            "github_issue": source,
            "asana_task": target,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asana_to_github_intent() {
        let mut request = SyncRequest::new("Asana", "github", "1201");
        request
            .additional_params
            .insert("repo_name".into(), json!("api"));
        let intent = request.into_intent();

        assert_eq!(intent.platform, Platform::Multi);
        assert_eq!(intent.action, "sync_task_to_issue");
        assert_eq!(intent.parameters["task_gid"], json!("1201"));
        assert_eq!(intent.parameters["repo_name"], json!("api"));
    }

    #[test]
    fn test_github_to_asana_intent() {
        let intent = SyncRequest::new("github", "asana", "#17").into_intent();
        assert_eq!(intent.action, "sync_issue_to_task");
        assert_eq!(intent.parameters["issue_number"], json!("#17"));
    }

    #[test]
    fn test_other_pair_names_unknown_action() {
        let intent = SyncRequest::new("vscode", "asana", "x").into_intent();
        assert_eq!(intent.action, "sync_vscode_to_asana");
    }
}
