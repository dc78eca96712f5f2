//! Typed action arguments
//!
//! Each action deserializes `Intent.parameters` into one of these structs.
//! A missing required field or a wrong type becomes `invalid_parameters`.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::DispatchError;
use crate::platforms::{IssueState, IssueUpdate, NewIssue, NewPullRequest};

pub fn parse<T: DeserializeOwned>(
    action: &str,
    parameters: &Map<String, Value>,
) -> Result<T, DispatchError> {
    serde_json::from_value(Value::Object(parameters.clone()))
        .map_err(|e| DispatchError::invalid_parameters(action, e.to_string()))
}

/// LLMs emit issue numbers both as `42` and `"42"`; also accepts `"#42"`
pub fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(u64),
        Text(String),
    }

    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::Text(s) => s
            .trim()
            .trim_start_matches('#')
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("'{}' is not an issue number", s))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// ============================================================================
// Asana
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTaskParams {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub task_name: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub project_gid: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub due_on: Option<String>,
}

impl CreateTaskParams {
    pub fn explicit_name(&self) -> Option<String> {
        non_blank(self.task_name.clone()).or_else(|| non_blank(self.name.clone()))
    }
}

#[derive(Debug, Deserialize)]
pub struct GetTasksParams {
    #[serde(default)]
    pub project_gid: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskRef {
    pub task_gid: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskParams {
    pub task_gid: String,
    #[serde(default)]
    pub updates: Option<Map<String, Value>>,
    /// Top-level fields other than `task_gid`, used when `updates` is absent
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl UpdateTaskParams {
    pub fn into_updates(self) -> Map<String, Value> {
        self.updates.unwrap_or(self.rest)
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchTasksParams {
    pub query: String,
    #[serde(default)]
    pub project_gid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TaskCommentParams {
    pub task_gid: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl TaskCommentParams {
    pub fn text(&self) -> Option<String> {
        non_blank(self.text.clone()).or_else(|| non_blank(self.comment.clone()))
    }
}

// ============================================================================
// GitHub
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RepoParams {
    #[serde(default)]
    pub repo_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RepositoriesParams {
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FlatIssue {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub labels: Option<Vec<String>>,
}

/// Issue fields may come flat or nested under `issue_data`
#[derive(Debug, Deserialize)]
pub struct CreateIssueParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub issue_data: Option<NewIssue>,
    #[serde(flatten)]
    pub flat: FlatIssue,
}

impl CreateIssueParams {
    pub fn issue(self) -> Result<NewIssue, DispatchError> {
        if let Some(issue) = self.issue_data {
            if issue.title.trim().is_empty() {
                return Err(DispatchError::invalid_parameters(
                    "create_issue",
                    "issue title must not be empty",
                ));
            }
            return Ok(issue);
        }
        let title = non_blank(self.flat.title).ok_or_else(|| {
            DispatchError::invalid_parameters("create_issue", "missing field `title`")
        })?;
        Ok(NewIssue {
            title,
            body: self.flat.body,
            assignee: self.flat.assignee,
            labels: self.flat.labels.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueListParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub state: IssueState,
}

#[derive(Debug, Deserialize)]
pub struct UpdateIssueParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub issue_number: u64,
    #[serde(default)]
    pub updates: Option<IssueUpdate>,
    #[serde(flatten)]
    pub flat: IssueUpdate,
}

impl UpdateIssueParams {
    pub fn update(self) -> IssueUpdate {
        self.updates.unwrap_or(self.flat)
    }
}

#[derive(Debug, Deserialize)]
pub struct IssueCommentParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub issue_number: u64,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl IssueCommentParams {
    pub fn body(&self) -> Option<String> {
        non_blank(self.body.clone()).or_else(|| non_blank(self.comment.clone()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FlatPullRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub head: Option<String>,
    #[serde(default)]
    pub base: Option<String>,
}

/// PR fields may come flat or nested under `pr_data`
#[derive(Debug, Deserialize)]
pub struct CreatePullRequestParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub pr_data: Option<NewPullRequest>,
    #[serde(flatten)]
    pub flat: FlatPullRequest,
}

impl CreatePullRequestParams {
    pub fn pull_request(self) -> Result<NewPullRequest, DispatchError> {
        if let Some(pr) = self.pr_data {
            return Ok(pr);
        }
        let title = non_blank(self.flat.title)
            .ok_or_else(|| DispatchError::invalid_parameters("create_pr", "missing field `title`"))?;
        let head = non_blank(self.flat.head)
            .ok_or_else(|| DispatchError::invalid_parameters("create_pr", "missing field `head`"))?;
        Ok(NewPullRequest {
            title,
            body: self.flat.body,
            head,
            base: non_blank(self.flat.base),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct CommitsParams {
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

// ============================================================================
// VS Code
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct OpenProjectParams {
    #[serde(default)]
    pub project_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpenFileParams {
    pub file_path: String,
    #[serde(default)]
    pub line_number: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct SetupProjectParams {
    pub project_type: String,
}

#[derive(Debug, Deserialize)]
pub struct VscodeTaskParams {
    pub task_config: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LaunchConfigParams {
    pub launch_config: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SnippetParams {
    pub language: String,
    pub snippet_name: String,
    pub snippet_config: Value,
}

#[derive(Debug, Deserialize)]
pub struct ExtensionParams {
    pub extension_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SettingsParams {
    pub settings: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct WorkspaceFilesParams {
    #[serde(default)]
    pub pattern: Option<String>,
}

// ============================================================================
// Multi-platform sync
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SyncTaskParams {
    pub task_gid: String,
    #[serde(default)]
    pub repo_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SyncIssueParams {
    #[serde(deserialize_with = "lenient_u64")]
    pub issue_number: u64,
    #[serde(default)]
    pub repo_name: Option<String>,
    #[serde(default)]
    pub project_gid: Option<String>,
}

// ============================================================================
// General
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RespondParams {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_issue_flat_and_nested() {
        let flat: CreateIssueParams =
            parse("create_issue", &map(json!({"title": "login bug", "labels": ["bug"]}))).unwrap();
        let issue = flat.issue().unwrap();
        assert_eq!(issue.title, "login bug");
        assert_eq!(issue.labels, vec!["bug"]);

        let nested: CreateIssueParams = parse(
            "create_issue",
            &map(json!({"repo_name": "api", "issue_data": {"title": "crash", "body": "trace"}})),
        )
        .unwrap();
        assert_eq!(nested.repo_name.as_deref(), Some("api"));
        assert_eq!(nested.issue().unwrap().body.as_deref(), Some("trace"));
    }

    #[test]
    fn test_issue_requires_title() {
        let params: CreateIssueParams = parse("create_issue", &map(json!({"body": "x"}))).unwrap();
        assert!(matches!(
            params.issue(),
            Err(DispatchError::InvalidParameters { .. })
        ));
    }

    #[test]
    fn test_lenient_issue_number() {
        let p: SyncIssueParams = parse("sync_issue_to_task", &map(json!({"issue_number": "#42"}))).unwrap();
        assert_eq!(p.issue_number, 42);
        let p: SyncIssueParams = parse("sync_issue_to_task", &map(json!({"issue_number": 7}))).unwrap();
        assert_eq!(p.issue_number, 7);
        assert!(parse::<SyncIssueParams>("sync_issue_to_task", &map(json!({"issue_number": "abc"}))).is_err());
    }

    #[test]
    fn test_update_task_uses_rest_fields() {
        let p: UpdateTaskParams = parse(
            "update_task",
            &map(json!({"task_gid": "1", "completed": true, "name": "renamed"})),
        )
        .unwrap();
        let updates = p.into_updates();
        assert_eq!(updates.get("completed"), Some(&json!(true)));
        assert!(!updates.contains_key("task_gid"));
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        let err = parse::<GetTasksParams>("get_tasks", &map(json!({"completed": "yes please"})))
            .unwrap_err();
        assert!(matches!(err, DispatchError::InvalidParameters { .. }));
    }

    #[test]
    fn test_bad_state_rejected() {
        assert!(parse::<IssueListParams>("get_issues", &map(json!({"state": "merged"}))).is_err());
    }
}
