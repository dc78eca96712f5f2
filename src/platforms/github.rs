//! GitHub REST client

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::OnceCell;

use super::types::{
    Commit, CreatedIssue, CreatedPullRequest, Issue, IssueComment, IssueState, IssueUpdate,
    NewIssue, NewPullRequest, PullRequest, RepoSearchHit, Repository,
};
use super::{error_from_response, CodeHost};
use crate::config::GithubConfig;
use crate::error::PlatformError;

const API_VERSION: &str = "2022-11-28";
const COMMIT_LIMIT: &str = "50";
const SEARCH_LIMIT: &str = "20";

// ============================================================================
// Wire shapes
// ============================================================================

#[derive(Deserialize)]
struct Login {
    login: String,
}

#[derive(Deserialize)]
struct Label {
    name: String,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    #[serde(default)]
    labels: Vec<Label>,
    #[serde(default)]
    assignee: Option<Login>,
    html_url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    /// Present when the "issue" is actually a pull request
    #[serde(default)]
    pull_request: Option<Value>,
}

impl From<RawIssue> for Issue {
    fn from(raw: RawIssue) -> Self {
        Issue {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            state: raw.state,
            labels: raw.labels.into_iter().map(|l| l.name).collect(),
            assignee: raw.assignee.map(|a| a.login),
            html_url: raw.html_url,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct RawRef {
    #[serde(rename = "ref")]
    name: String,
}

#[derive(Deserialize)]
struct RawPull {
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    state: String,
    head: RawRef,
    base: RawRef,
    #[serde(default)]
    user: Option<Login>,
    html_url: String,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

impl From<RawPull> for PullRequest {
    fn from(raw: RawPull) -> Self {
        PullRequest {
            number: raw.number,
            title: raw.title,
            body: raw.body,
            state: raw.state,
            head: raw.head.name,
            base: raw.base.name,
            user: raw.user.map(|u| u.login),
            html_url: raw.html_url,
            created_at: raw.created_at,
            updated_at: raw.updated_at,
        }
    }
}

#[derive(Deserialize)]
struct RawCommitAuthor {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
struct RawCommitDetail {
    message: String,
    #[serde(default)]
    author: Option<RawCommitAuthor>,
}

#[derive(Deserialize)]
struct RawCommit {
    sha: String,
    commit: RawCommitDetail,
    html_url: String,
}

impl From<RawCommit> for Commit {
    fn from(raw: RawCommit) -> Self {
        let (author, date) = match raw.commit.author {
            Some(a) => (a.name, a.date),
            None => (None, None),
        };
        Commit {
            sha: raw.sha,
            message: raw.commit.message,
            author,
            date,
            html_url: raw.html_url,
        }
    }
}

#[derive(Deserialize)]
struct RawSearchRepo {
    name: String,
    full_name: String,
    #[serde(default)]
    description: Option<String>,
    html_url: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
}

#[derive(Deserialize)]
struct SearchPage {
    items: Vec<RawSearchRepo>,
}

#[derive(Deserialize)]
struct Created {
    number: u64,
    html_url: String,
}

// ============================================================================
// Client
// ============================================================================

pub struct GithubClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
    organization: Option<String>,
    default_repo: Option<String>,
    login: OnceCell<String>,
}

impl GithubClient {
    pub fn new(
        token: String,
        config: &GithubConfig,
        timeout: Duration,
    ) -> Result<Self, PlatformError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("workbridge/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token,
            organization: config.organization.clone(),
            default_repo: config.default_repo.clone(),
            login: OnceCell::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PlatformError> {
        let response = request
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        Ok(response.json().await?)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, PlatformError> {
        self.send(self.client.get(self.url(path)).query(query))
            .await
    }

    /// Login of the token's user, fetched once
    async fn login(&self) -> Result<&str, PlatformError> {
        let login = self
            .login
            .get_or_try_init(|| async {
                let user: Login = self.get("/user", &[]).await?;
                Ok::<_, PlatformError>(user.login)
            })
            .await?;
        Ok(login.as_str())
    }

    /// `owner/name` for a repo argument, applying the default repo and owner
    pub async fn full_name(&self, repo: Option<&str>) -> Result<String, PlatformError> {
        let repo = repo
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .or(self.default_repo.as_deref())
            .ok_or_else(|| {
                PlatformError::invalid_request(
                    "No repository given and GITHUB_DEFAULT_REPO is not set",
                )
            })?;

        if repo.contains('/') {
            return Ok(repo.to_string());
        }
        let owner = match &self.organization {
            Some(org) => org.as_str(),
            None => self.login().await?,
        };
        Ok(format!("{}/{}", owner, repo))
    }
}

#[async_trait]
impl CodeHost for GithubClient {
    async fn get_repositories(
        &self,
        organization: Option<&str>,
    ) -> Result<Vec<Repository>, PlatformError> {
        let query = [("per_page", "100")];
        match organization.or(self.organization.as_deref()) {
            Some(org) => self.get(&format!("/orgs/{}/repos", org), &query).await,
            None => self.get("/user/repos", &query).await,
        }
    }

    async fn get_repository(&self, repo: Option<&str>) -> Result<Repository, PlatformError> {
        let full_name = self.full_name(repo).await?;
        self.get(&format!("/repos/{}", full_name), &[]).await
    }

    async fn get_issues(
        &self,
        repo: Option<&str>,
        state: IssueState,
    ) -> Result<Vec<Issue>, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let raw: Vec<RawIssue> = self
            .get(
                &format!("/repos/{}/issues", full_name),
                &[("state", state.as_str()), ("per_page", "100")],
            )
            .await?;
        // The issues endpoint also lists pull requests
        Ok(raw
            .into_iter()
            .filter(|i| i.pull_request.is_none())
            .map(Issue::from)
            .collect())
    }

    async fn get_issue(&self, repo: Option<&str>, number: u64) -> Result<Issue, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let raw: RawIssue = self
            .get(&format!("/repos/{}/issues/{}", full_name, number), &[])
            .await?;
        Ok(raw.into())
    }

    async fn create_issue(
        &self,
        repo: Option<&str>,
        issue: NewIssue,
    ) -> Result<CreatedIssue, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let mut body = json!({
            "title": issue.title,
            "body": issue.body.unwrap_or_default(),
            "labels": issue.labels,
        });
        if let Some(assignee) = issue.assignee {
            body["assignees"] = json!([assignee]);
        }

        let created: Created = self
            .send(
                self.client
                    .post(self.url(&format!("/repos/{}/issues", full_name)))
                    .json(&body),
            )
            .await?;
        tracing::info!(repo = %full_name, issue = created.number, "Created GitHub issue");
        Ok(CreatedIssue {
            issue_number: created.number,
            url: created.html_url,
        })
    }

    async fn update_issue(
        &self,
        repo: Option<&str>,
        number: u64,
        update: IssueUpdate,
    ) -> Result<Issue, PlatformError> {
        if update.is_empty() {
            return Err(PlatformError::invalid_request("No issue fields to update"));
        }
        let full_name = self.full_name(repo).await?;
        let raw: RawIssue = self
            .send(
                self.client
                    .patch(self.url(&format!("/repos/{}/issues/{}", full_name, number)))
                    .json(&update),
            )
            .await?;
        Ok(raw.into())
    }

    async fn add_issue_comment(
        &self,
        repo: Option<&str>,
        number: u64,
        body: &str,
    ) -> Result<IssueComment, PlatformError> {
        let full_name = self.full_name(repo).await?;
        self.send(
            self.client
                .post(self.url(&format!(
                    "/repos/{}/issues/{}/comments",
                    full_name, number
                )))
                .json(&json!({ "body": body })),
        )
        .await
    }

    async fn get_pull_requests(
        &self,
        repo: Option<&str>,
        state: IssueState,
    ) -> Result<Vec<PullRequest>, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let raw: Vec<RawPull> = self
            .get(
                &format!("/repos/{}/pulls", full_name),
                &[("state", state.as_str()), ("per_page", "100")],
            )
            .await?;
        Ok(raw.into_iter().map(PullRequest::from).collect())
    }

    async fn create_pull_request(
        &self,
        repo: Option<&str>,
        pr: NewPullRequest,
    ) -> Result<CreatedPullRequest, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let base = match pr.base {
            Some(base) => base,
            None => self
                .get_repository(Some(&full_name))
                .await?
                .default_branch
                .unwrap_or_else(|| "main".to_string()),
        };

        let created: Created = self
            .send(
                self.client
                    .post(self.url(&format!("/repos/{}/pulls", full_name)))
                    .json(&json!({
                        "title": pr.title,
                        "body": pr.body.unwrap_or_default(),
                        "head": pr.head,
                        "base": base,
                    })),
            )
            .await?;
        tracing::info!(repo = %full_name, pr = created.number, "Created GitHub pull request");
        Ok(CreatedPullRequest {
            pr_number: created.number,
            url: created.html_url,
        })
    }

    async fn get_commits(
        &self,
        repo: Option<&str>,
        branch: Option<&str>,
    ) -> Result<Vec<Commit>, PlatformError> {
        let full_name = self.full_name(repo).await?;
        let mut query = vec![("per_page", COMMIT_LIMIT)];
        if let Some(branch) = branch {
            query.push(("sha", branch));
        }
        let raw: Vec<RawCommit> = self
            .get(&format!("/repos/{}/commits", full_name), &query)
            .await?;
        Ok(raw.into_iter().map(Commit::from).collect())
    }

    async fn search_repositories(&self, query: &str) -> Result<Vec<RepoSearchHit>, PlatformError> {
        let page: SearchPage = self
            .get(
                "/search/repositories",
                &[("q", query), ("per_page", SEARCH_LIMIT)],
            )
            .await?;
        Ok(page
            .items
            .into_iter()
            .map(|r| RepoSearchHit {
                name: r.name,
                full_name: r.full_name,
                description: r.description,
                html_url: r.html_url,
                language: r.language,
                stars: r.stargazers_count,
            })
            .collect())
    }
}
