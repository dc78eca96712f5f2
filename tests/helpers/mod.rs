//! Stub clients shared by the integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};

use workbridge::error::{PlatformError, PlatformErrorKind};
use workbridge::llm::LlmClient;
use workbridge::platforms::*;
use workbridge::router::{CommandRouter, RouterSettings};

// ── LLM ─────────────────────────────────────────────────────────

pub struct StubLlm {
    pub intent_json: String,
    pub reply: String,
}

impl StubLlm {
    pub fn new(intent_json: Value) -> Arc<Self> {
        Arc::new(Self {
            intent_json: intent_json.to_string(),
            reply: "Happy to help.".to_string(),
        })
    }
}

#[async_trait]
impl LlmClient for StubLlm {
    async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.reply.clone())
    }
    async fn chat_json(&self, _system: &str, _user: &str) -> Result<String> {
        Ok(self.intent_json.clone())
    }
    fn model_name(&self) -> &str {
        "stub-model"
    }
    fn provider_name(&self) -> &str {
        "stub"
    }
}

// ── Asana ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubTracker {
    pub fail_all: Option<PlatformError>,
    pub fail_create: Option<PlatformError>,
    pub created: Mutex<Vec<NewTask>>,
    pub comments: Mutex<Vec<(String, String)>>,
}

impl StubTracker {
    pub fn failing(kind: PlatformErrorKind, message: &str) -> Self {
        Self {
            fail_all: Some(PlatformError::new(kind, message)),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), PlatformError> {
        match &self.fail_all {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub fn sample_task(gid: &str) -> Task {
    Task {
        gid: gid.to_string(),
        name: "Implement user authentication".to_string(),
        notes: Some("OAuth with GitHub".to_string()),
        completed: false,
        assignee: None,
        due_on: None,
        projects: Vec::new(),
        tags: Vec::new(),
        permalink_url: Some(format!("https://app.asana.com/0/0/{}", gid)),
    }
}

#[async_trait]
impl TaskTracker for StubTracker {
    async fn get_projects(&self) -> Result<Vec<Project>, PlatformError> {
        self.check()?;
        Ok((1..=7)
            .map(|i| Project {
                gid: i.to_string(),
                name: format!("Project {}", i),
            })
            .collect())
    }

    async fn get_tasks(
        &self,
        _project_gid: Option<&str>,
        _completed: bool,
    ) -> Result<Vec<Task>, PlatformError> {
        self.check()?;
        Ok(vec![sample_task("100")])
    }

    async fn get_task(&self, task_gid: &str) -> Result<Task, PlatformError> {
        self.check()?;
        Ok(sample_task(task_gid))
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, PlatformError> {
        self.check()?;
        if let Some(e) = &self.fail_create {
            return Err(e.clone());
        }
        let mut created = sample_task("900");
        created.name = task.name.clone();
        created.notes = Some(task.notes.clone());
        self.created.lock().unwrap().push(task);
        Ok(created)
    }

    async fn update_task(
        &self,
        task_gid: &str,
        updates: Map<String, Value>,
    ) -> Result<Task, PlatformError> {
        self.check()?;
        let mut task = sample_task(task_gid);
        if let Some(Value::Bool(completed)) = updates.get("completed") {
            task.completed = *completed;
        }
        Ok(task)
    }

    async fn search_tasks(
        &self,
        _query: &str,
        _project_gid: Option<&str>,
    ) -> Result<Vec<Task>, PlatformError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn add_comment(&self, task_gid: &str, text: &str) -> Result<Comment, PlatformError> {
        self.check()?;
        self.comments
            .lock()
            .unwrap()
            .push((task_gid.to_string(), text.to_string()));
        Ok(Comment {
            gid: "c1".to_string(),
            text: text.to_string(),
            created_at: None,
        })
    }
}

// ── GitHub ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct StubHost {
    pub fail_all: Option<PlatformError>,
    pub fail_create: Option<PlatformError>,
    pub created: Mutex<Vec<(Option<String>, NewIssue)>>,
    pub comments: Mutex<Vec<(u64, String)>>,
}

impl StubHost {
    pub fn failing(kind: PlatformErrorKind, message: &str) -> Self {
        Self {
            fail_all: Some(PlatformError::new(kind, message)),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), PlatformError> {
        match &self.fail_all {
            Some(e) => Err(e.clone()),
            None => Ok(()),
        }
    }
}

pub fn sample_issue(number: u64) -> Issue {
    Issue {
        number,
        title: "Login fails on Safari".to_string(),
        body: Some("Steps to reproduce".to_string()),
        state: "open".to_string(),
        labels: vec!["bug".to_string()],
        assignee: None,
        html_url: format!("https://github.com/acme/api/issues/{}", number),
        created_at: None,
        updated_at: None,
    }
}

fn sample_repo(name: &str) -> Repository {
    Repository {
        name: name.to_string(),
        full_name: format!("acme/{}", name),
        description: None,
        clone_url: None,
        html_url: format!("https://github.com/acme/{}", name),
        default_branch: Some("main".to_string()),
        language: Some("Rust".to_string()),
        created_at: None,
        updated_at: None,
    }
}

#[async_trait]
impl CodeHost for StubHost {
    async fn get_repositories(
        &self,
        _organization: Option<&str>,
    ) -> Result<Vec<Repository>, PlatformError> {
        self.check()?;
        Ok(vec![sample_repo("api"), sample_repo("web")])
    }

    async fn get_repository(&self, repo: Option<&str>) -> Result<Repository, PlatformError> {
        self.check()?;
        Ok(sample_repo(repo.unwrap_or("api")))
    }

    async fn get_issues(
        &self,
        _repo: Option<&str>,
        _state: IssueState,
    ) -> Result<Vec<Issue>, PlatformError> {
        self.check()?;
        Ok(vec![sample_issue(1), sample_issue(2)])
    }

    async fn get_issue(&self, _repo: Option<&str>, number: u64) -> Result<Issue, PlatformError> {
        self.check()?;
        Ok(sample_issue(number))
    }

    async fn create_issue(
        &self,
        repo: Option<&str>,
        issue: NewIssue,
    ) -> Result<CreatedIssue, PlatformError> {
        self.check()?;
        if let Some(e) = &self.fail_create {
            return Err(e.clone());
        }
        self.created
            .lock()
            .unwrap()
            .push((repo.map(str::to_string), issue));
        Ok(CreatedIssue {
            issue_number: 42,
            url: "https://github.com/acme/api/issues/42".to_string(),
        })
    }

    async fn update_issue(
        &self,
        _repo: Option<&str>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<Issue, PlatformError> {
        self.check()?;
        let mut issue = sample_issue(number);
        if let Some(state) = update.state {
            issue.state = state;
        }
        Ok(issue)
    }

    async fn add_issue_comment(
        &self,
        _repo: Option<&str>,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, PlatformError> {
        self.check()?;
        self.comments.lock().unwrap().push((number, body.to_string()));
        Ok(IssueComment {
            id: 7,
            body: body.to_string(),
            html_url: format!("https://github.com/acme/api/issues/{}#issuecomment-7", number),
            created_at: None,
        })
    }

    async fn get_pull_requests(
        &self,
        _repo: Option<&str>,
        _state: IssueState,
    ) -> Result<Vec<PullRequest>, PlatformError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn create_pull_request(
        &self,
        _repo: Option<&str>,
        _pr: NewPullRequest,
    ) -> Result<CreatedPullRequest, PlatformError> {
        self.check()?;
        Ok(CreatedPullRequest {
            pr_number: 5,
            url: "https://github.com/acme/api/pull/5".to_string(),
        })
    }

    async fn get_commits(
        &self,
        _repo: Option<&str>,
        _branch: Option<&str>,
    ) -> Result<Vec<Commit>, PlatformError> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn search_repositories(&self, _query: &str) -> Result<Vec<RepoSearchHit>, PlatformError> {
        self.check()?;
        Ok(Vec::new())
    }
}

// ── VS Code ─────────────────────────────────────────────────────

pub struct StubWorkspace {
    root: PathBuf,
}

impl Default for StubWorkspace {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/work/project"),
        }
    }
}

#[async_trait]
impl EditorWorkspace for StubWorkspace {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn open_project(&self, path: Option<&str>) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("open_project", true).with_target(path.unwrap_or(".")))
    }

    async fn open_file(
        &self,
        path: &str,
        _line: Option<u32>,
    ) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("open_file", true).with_target(path))
    }

    async fn get_settings(&self) -> Result<Map<String, Value>, PlatformError> {
        Ok(Map::new())
    }

    async fn update_settings(
        &self,
        settings: Map<String, Value>,
    ) -> Result<Map<String, Value>, PlatformError> {
        Ok(settings)
    }

    async fn create_task(&self, _task_config: Value) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("create_task", true))
    }

    async fn create_launch_config(&self, _config: Value) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("create_launch_config", true))
    }

    async fn create_snippet(
        &self,
        _language: &str,
        name: &str,
        _snippet: Value,
    ) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("create_snippet", true).with_target(name))
    }

    async fn install_extension(&self, extension_id: &str) -> Result<EditorAction, PlatformError> {
        Ok(EditorAction::new("install_extension", true).with_target(extension_id))
    }

    async fn list_extensions(&self) -> Result<Vec<String>, PlatformError> {
        Ok(vec!["rust-lang.rust-analyzer".to_string()])
    }

    async fn get_workspace_files(
        &self,
        _pattern: Option<&str>,
    ) -> Result<Vec<String>, PlatformError> {
        Ok(vec!["Cargo.toml".to_string(), "src/main.rs".to_string()])
    }

    async fn git_status(&self) -> Result<GitStatus, PlatformError> {
        Ok(GitStatus {
            clean: true,
            ..Default::default()
        })
    }
}

// ── Router assembly ─────────────────────────────────────────────

pub struct Stubs {
    pub tracker: Arc<StubTracker>,
    pub host: Arc<StubHost>,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            tracker: Arc::new(StubTracker::default()),
            host: Arc::new(StubHost::default()),
        }
    }
}

impl Stubs {
    pub fn router(&self) -> CommandRouter {
        CommandRouter::new(RouterSettings::default())
            .with_asana(ClientSlot::ready(self.tracker.clone() as Arc<dyn TaskTracker>))
            .with_github(ClientSlot::ready(self.host.clone() as Arc<dyn CodeHost>))
            .with_vscode(ClientSlot::ready(
                Arc::new(StubWorkspace::default()) as Arc<dyn EditorWorkspace>
            ))
    }
}
