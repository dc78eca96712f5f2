//! Command Router
//!
//! Maps `(platform, action)` onto a platform client call, passing the
//! intent's parameters as typed arguments. Every outcome comes back as a
//! [`CommandResult`] carrying the dispatched intent; nothing panics and
//! nothing is retried.

pub mod params;
pub mod status;
pub mod sync;

use std::time::Instant;

use serde::Serialize;
use serde_json::{json, Value};

use crate::envelope::CommandResult;
use crate::error::{DispatchError, PlatformError};
use crate::intent::{Intent, Platform};
use crate::llm::LlmClient;
use crate::platforms::{ClientSlot, CodeHost, EditorWorkspace, NewTask, TaskTracker};

use params::*;

pub use status::{PlatformStatus, StatusReport};
pub use sync::SyncRequest;

const ASANA_ACTIONS: &[&str] = &[
    "create_task",
    "create_new_task",
    "get_tasks",
    "get_task",
    "update_task",
    "complete_task",
    "search_tasks",
    "get_projects",
    "add_comment",
];

const GITHUB_ACTIONS: &[&str] = &[
    "create_issue",
    "get_issues",
    "update_issue",
    "add_comment",
    "create_pr",
    "get_pull_requests",
    "get_repositories",
    "get_repository",
    "get_commits",
    "search_repositories",
];

const VSCODE_ACTIONS: &[&str] = &[
    "open_project",
    "open_file",
    "setup_project",
    "create_task",
    "create_launch_config",
    "create_snippet",
    "install_extension",
    "list_extensions",
    "get_settings",
    "update_settings",
    "get_workspace_files",
    "git_status",
];

const MULTI_ACTIONS: &[&str] = &["sync_task_to_issue", "sync_issue_to_task"];

/// Actions the router accepts for a platform
///
/// `general` accepts any action, so its list is empty.
pub fn supported_actions(platform: &Platform) -> &'static [&'static str] {
    match platform {
        Platform::Asana => ASANA_ACTIONS,
        Platform::Github => GITHUB_ACTIONS,
        Platform::Vscode => VSCODE_ACTIONS,
        Platform::Multi => MULTI_ACTIONS,
        Platform::General | Platform::Other(_) => &[],
    }
}

/// Prompt for conversational replies on the `general` platform
const RESPONDER_PROMPT: &str = "You are an assistant that helps developers coordinate work between Asana, GitHub and VS Code. Give clear, actionable answers and ask for clarification when a request is ambiguous.";

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouterSettings {
    /// Intents below this confidence are not dispatched; 0.0 disables the gate
    pub min_confidence: f64,
}

/// The original command text, for actions that fall back to it
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    pub command: &'a str,
    pub context: Option<&'a Value>,
}

pub struct CommandRouter {
    asana: ClientSlot<dyn TaskTracker>,
    github: ClientSlot<dyn CodeHost>,
    vscode: ClientSlot<dyn EditorWorkspace>,
    responder: ClientSlot<dyn LlmClient>,
    settings: RouterSettings,
}

impl CommandRouter {
    /// A router with every platform unavailable until a client is attached
    pub fn new(settings: RouterSettings) -> Self {
        Self {
            asana: ClientSlot::unavailable("Asana client not configured"),
            github: ClientSlot::unavailable("GitHub client not configured"),
            vscode: ClientSlot::unavailable("VS Code workspace not configured"),
            responder: ClientSlot::unavailable("LLM client not configured"),
            settings,
        }
    }

    pub fn with_asana(mut self, slot: ClientSlot<dyn TaskTracker>) -> Self {
        self.asana = slot;
        self
    }

    pub fn with_github(mut self, slot: ClientSlot<dyn CodeHost>) -> Self {
        self.github = slot;
        self
    }

    pub fn with_vscode(mut self, slot: ClientSlot<dyn EditorWorkspace>) -> Self {
        self.vscode = slot;
        self
    }

    pub fn with_responder(mut self, slot: ClientSlot<dyn LlmClient>) -> Self {
        self.responder = slot;
        self
    }

    pub fn settings(&self) -> RouterSettings {
        self.settings
    }

    /// Dispatch an intent with no originating command text
    pub async fn dispatch(&self, intent: Intent) -> CommandResult {
        self.dispatch_in_context(intent, None).await
    }

    /// Dispatch an intent; `ctx` feeds command-text fallbacks
    pub async fn dispatch_in_context(
        &self,
        intent: Intent,
        ctx: Option<&DispatchContext<'_>>,
    ) -> CommandResult {
        let started = Instant::now();
        match self.route(&intent, ctx).await {
            Ok(payload) => {
                tracing::info!(
                    platform = %intent.platform,
                    action = %intent.action,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Dispatch succeeded"
                );
                CommandResult::succeeded(intent, payload)
            }
            Err(err) => {
                tracing::warn!(
                    platform = %intent.platform,
                    action = %intent.action,
                    error = %err,
                    "Dispatch failed"
                );
                CommandResult::failed(Some(intent), err.detail())
            }
        }
    }

    async fn route(
        &self,
        intent: &Intent,
        ctx: Option<&DispatchContext<'_>>,
    ) -> Result<Value, DispatchError> {
        let threshold = self.settings.min_confidence;
        if threshold > 0.0 && intent.confidence < threshold {
            return Err(DispatchError::LowConfidence {
                confidence: intent.confidence,
                threshold,
            });
        }

        let action = intent.action.as_str();
        let platform = &intent.platform;
        if !matches!(platform, Platform::General) && !supported_actions(platform).contains(&action)
        {
            return Err(DispatchError::unsupported(platform.as_str(), action));
        }

        match platform {
            Platform::Asana => self.route_asana(intent, ctx).await,
            Platform::Github => self.route_github(intent).await,
            Platform::Vscode => self.route_vscode(intent).await,
            Platform::Multi => self.route_multi(intent).await,
            Platform::General => self.respond(intent, ctx).await,
            Platform::Other(name) => Err(DispatchError::unsupported(name.as_str(), action)),
        }
    }

    async fn route_asana(
        &self,
        intent: &Intent,
        ctx: Option<&DispatchContext<'_>>,
    ) -> Result<Value, DispatchError> {
        let action = intent.action.as_str();
        let p = &intent.parameters;
        let asana = self.asana.get("asana")?;
        let fail = |e: PlatformError| DispatchError::platform("asana", e);

        match action {
            "create_task" | "create_new_task" => {
                let params: CreateTaskParams = parse(action, p)?;
                let command = ctx.map(|c| c.command);
                let name = params
                    .explicit_name()
                    .or_else(|| command.and_then(task_name_from_command))
                    .ok_or_else(|| {
                        DispatchError::invalid_parameters(action, "missing field `name`")
                    })?;
                let notes = params.notes.unwrap_or_else(|| match command {
                    Some(command) => format!("Task created via AI assistant: {}", command),
                    None => String::new(),
                });
                let task = NewTask {
                    name,
                    notes,
                    project_gid: params.project_gid,
                    assignee: params.assignee,
                    due_on: params.due_on,
                };
                to_payload(asana.create_task(task).await.map_err(fail)?)
            }
            "get_tasks" => {
                let params: GetTasksParams = parse(action, p)?;
                to_payload(
                    asana
                        .get_tasks(params.project_gid.as_deref(), params.completed)
                        .await
                        .map_err(fail)?,
                )
            }
            "get_task" => {
                let params: TaskRef = parse(action, p)?;
                to_payload(asana.get_task(&params.task_gid).await.map_err(fail)?)
            }
            "update_task" => {
                let params: UpdateTaskParams = parse(action, p)?;
                let task_gid = params.task_gid.clone();
                let updates = params.into_updates();
                if updates.is_empty() {
                    return Err(DispatchError::invalid_parameters(
                        action,
                        "no fields to update",
                    ));
                }
                to_payload(asana.update_task(&task_gid, updates).await.map_err(fail)?)
            }
            "complete_task" => {
                let params: TaskRef = parse(action, p)?;
                to_payload(asana.complete_task(&params.task_gid).await.map_err(fail)?)
            }
            "search_tasks" => {
                let params: SearchTasksParams = parse(action, p)?;
                to_payload(
                    asana
                        .search_tasks(&params.query, params.project_gid.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "get_projects" => to_payload(asana.get_projects().await.map_err(fail)?),
            "add_comment" => {
                let params: TaskCommentParams = parse(action, p)?;
                let text = params.text().ok_or_else(|| {
                    DispatchError::invalid_parameters(action, "missing field `text`")
                })?;
                to_payload(
                    asana
                        .add_comment(&params.task_gid, &text)
                        .await
                        .map_err(fail)?,
                )
            }
            _ => Err(DispatchError::unsupported("asana", action)),
        }
    }

    async fn route_github(&self, intent: &Intent) -> Result<Value, DispatchError> {
        let action = intent.action.as_str();
        let p = &intent.parameters;
        let github = self.github.get("github")?;
        let fail = |e: PlatformError| DispatchError::platform("github", e);

        match action {
            "create_issue" => {
                let params: CreateIssueParams = parse(action, p)?;
                let repo = params.repo_name.clone();
                let issue = params.issue()?;
                to_payload(
                    github
                        .create_issue(repo.as_deref(), issue)
                        .await
                        .map_err(fail)?,
                )
            }
            "get_issues" => {
                let params: IssueListParams = parse(action, p)?;
                to_payload(
                    github
                        .get_issues(params.repo_name.as_deref(), params.state)
                        .await
                        .map_err(fail)?,
                )
            }
            "update_issue" => {
                let params: UpdateIssueParams = parse(action, p)?;
                let repo = params.repo_name.clone();
                let number = params.issue_number;
                let update = params.update();
                if update.is_empty() {
                    return Err(DispatchError::invalid_parameters(
                        action,
                        "no fields to update",
                    ));
                }
                to_payload(
                    github
                        .update_issue(repo.as_deref(), number, update)
                        .await
                        .map_err(fail)?,
                )
            }
            "add_comment" => {
                let params: IssueCommentParams = parse(action, p)?;
                let body = params.body().ok_or_else(|| {
                    DispatchError::invalid_parameters(action, "missing field `body`")
                })?;
                to_payload(
                    github
                        .add_issue_comment(params.repo_name.as_deref(), params.issue_number, &body)
                        .await
                        .map_err(fail)?,
                )
            }
            "create_pr" => {
                let params: CreatePullRequestParams = parse(action, p)?;
                let repo = params.repo_name.clone();
                let pr = params.pull_request()?;
                to_payload(
                    github
                        .create_pull_request(repo.as_deref(), pr)
                        .await
                        .map_err(fail)?,
                )
            }
            "get_pull_requests" => {
                let params: IssueListParams = parse(action, p)?;
                to_payload(
                    github
                        .get_pull_requests(params.repo_name.as_deref(), params.state)
                        .await
                        .map_err(fail)?,
                )
            }
            "get_repositories" => {
                let params: RepositoriesParams = parse(action, p)?;
                to_payload(
                    github
                        .get_repositories(params.organization.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "get_repository" => {
                let params: RepoParams = parse(action, p)?;
                to_payload(
                    github
                        .get_repository(params.repo_name.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "get_commits" => {
                let params: CommitsParams = parse(action, p)?;
                to_payload(
                    github
                        .get_commits(params.repo_name.as_deref(), params.branch.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "search_repositories" => {
                let params: SearchParams = parse(action, p)?;
                to_payload(
                    github
                        .search_repositories(&params.query)
                        .await
                        .map_err(fail)?,
                )
            }
            _ => Err(DispatchError::unsupported("github", action)),
        }
    }

    async fn route_vscode(&self, intent: &Intent) -> Result<Value, DispatchError> {
        let action = intent.action.as_str();
        let p = &intent.parameters;
        let vscode = self.vscode.get("vscode")?;
        let fail = |e: PlatformError| DispatchError::platform("vscode", e);

        match action {
            "open_project" => {
                let params: OpenProjectParams = parse(action, p)?;
                to_payload(
                    vscode
                        .open_project(params.project_path.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "open_file" => {
                let params: OpenFileParams = parse(action, p)?;
                to_payload(
                    vscode
                        .open_file(&params.file_path, params.line_number)
                        .await
                        .map_err(fail)?,
                )
            }
            "setup_project" => {
                let params: SetupProjectParams = parse(action, p)?;
                to_payload(
                    vscode
                        .setup_project(&params.project_type)
                        .await
                        .map_err(fail)?,
                )
            }
            "create_task" => {
                let params: VscodeTaskParams = parse(action, p)?;
                to_payload(
                    vscode
                        .create_task(Value::Object(params.task_config))
                        .await
                        .map_err(fail)?,
                )
            }
            "create_launch_config" => {
                let params: LaunchConfigParams = parse(action, p)?;
                to_payload(
                    vscode
                        .create_launch_config(Value::Object(params.launch_config))
                        .await
                        .map_err(fail)?,
                )
            }
            "create_snippet" => {
                let params: SnippetParams = parse(action, p)?;
                to_payload(
                    vscode
                        .create_snippet(&params.language, &params.snippet_name, params.snippet_config)
                        .await
                        .map_err(fail)?,
                )
            }
            "install_extension" => {
                let params: ExtensionParams = parse(action, p)?;
                to_payload(
                    vscode
                        .install_extension(&params.extension_id)
                        .await
                        .map_err(fail)?,
                )
            }
            "list_extensions" => to_payload(vscode.list_extensions().await.map_err(fail)?),
            "get_settings" => to_payload(vscode.get_settings().await.map_err(fail)?),
            "update_settings" => {
                let params: SettingsParams = parse(action, p)?;
                to_payload(vscode.update_settings(params.settings).await.map_err(fail)?)
            }
            "get_workspace_files" => {
                let params: WorkspaceFilesParams = parse(action, p)?;
                to_payload(
                    vscode
                        .get_workspace_files(params.pattern.as_deref())
                        .await
                        .map_err(fail)?,
                )
            }
            "git_status" => to_payload(vscode.git_status().await.map_err(fail)?),
            _ => Err(DispatchError::unsupported("vscode", action)),
        }
    }

    async fn route_multi(&self, intent: &Intent) -> Result<Value, DispatchError> {
        let action = intent.action.as_str();
        match action {
            "sync_task_to_issue" => {
                let params: SyncTaskParams = parse(action, &intent.parameters)?;
                self.sync_task_to_issue(params).await
            }
            "sync_issue_to_task" => {
                let params: SyncIssueParams = parse(action, &intent.parameters)?;
                self.sync_issue_to_task(params).await
            }
            _ => Err(DispatchError::unsupported("multi", action)),
        }
    }

    /// Conversational reply for intents with no platform action
    async fn respond(
        &self,
        intent: &Intent,
        ctx: Option<&DispatchContext<'_>>,
    ) -> Result<Value, DispatchError> {
        let params: RespondParams = parse(&intent.action, &intent.parameters)?;
        let message = params
            .message
            .filter(|m| !m.trim().is_empty())
            .or_else(|| ctx.map(|c| c.command.to_string()))
            .unwrap_or_else(|| intent.intent.clone());

        let llm = self.responder.get("general")?;
        let user_prompt = match ctx.and_then(|c| c.context) {
            Some(context) => format!("Context: {}\n\n{}", context, message),
            None => message,
        };
        let reply = llm
            .chat(RESPONDER_PROMPT, &user_prompt)
            .await
            .map_err(|e| DispatchError::platform("general", PlatformError::upstream(e.to_string())))?;
        Ok(json!({ "response": reply }))
    }

    pub(crate) fn asana_slot(&self) -> &ClientSlot<dyn TaskTracker> {
        &self.asana
    }

    pub(crate) fn github_slot(&self) -> &ClientSlot<dyn CodeHost> {
        &self.github
    }

    pub(crate) fn vscode_slot(&self) -> &ClientSlot<dyn EditorWorkspace> {
        &self.vscode
    }
}

/// Serialize a client payload into the result body
pub(crate) fn to_payload<T: Serialize>(value: T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| {
        DispatchError::platform(
            "router",
            PlatformError::upstream(format!("Unserializable payload: {}", e)),
        )
    })
}

/// Derive a task name from "Create a task for ..." style commands
pub fn task_name_from_command(command: &str) -> Option<String> {
    const PREFIXES: &[&str] = &[
        "create a new task for",
        "create a task for",
        "create a task to",
        "create a task",
        "create task for",
        "create task",
        "add a task for",
        "add a task",
    ];
    let trimmed = command.trim();
    let lower = trimmed.to_ascii_lowercase();
    let rest = PREFIXES
        .iter()
        .find(|prefix| {
            // Whole words only, so "create tasks for" is not "create task" + "s for"
            lower.starts_with(*prefix)
                && lower[prefix.len()..]
                    .chars()
                    .next()
                    .map_or(true, |c| c.is_whitespace() || c == ':')
        })
        .map(|prefix| &trimmed[prefix.len()..])
        .unwrap_or(trimmed)
        .trim()
        .trim_start_matches(':')
        .trim();
    if rest.is_empty() {
        return None;
    }
    let mut chars = rest.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_name_from_command() {
        assert_eq!(
            task_name_from_command("Create a task for implementing user authentication").as_deref(),
            Some("Implementing user authentication")
        );
        assert_eq!(
            task_name_from_command("create task: fix flaky tests").as_deref(),
            Some("Fix flaky tests")
        );
        assert_eq!(task_name_from_command("Create a task").as_deref(), None);
        assert_eq!(
            task_name_from_command("Create tasks for the release checklist").as_deref(),
            Some("Create tasks for the release checklist")
        );
        assert_eq!(
            task_name_from_command("add a taskbar icon").as_deref(),
            Some("Add a taskbar icon")
        );
        assert_eq!(
            task_name_from_command("create a task to\tupdate docs").as_deref(),
            Some("Update docs")
        );
        assert_eq!(
            task_name_from_command("Write release notes").as_deref(),
            Some("Write release notes")
        );
    }

    #[test]
    fn test_action_tables() {
        assert!(supported_actions(&Platform::Asana).contains(&"create_new_task"));
        assert!(supported_actions(&Platform::Github).contains(&"create_pr"));
        assert!(!supported_actions(&Platform::Github).contains(&"delete_repo"));
        assert!(supported_actions(&Platform::Other("jira".into())).is_empty());
    }
}
