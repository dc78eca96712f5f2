//! Per-platform availability checks
//!
//! Each platform is checked concurrently and reported on its own; one
//! platform failing never fails the report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::CommandRouter;
use crate::error::DispatchError;

/// Entities listed inline in a check
const PREVIEW_LEN: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformStatus {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PlatformStatus {
    fn up(details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Self {
            available: true,
            error: None,
            details,
        }
    }

    fn down(error: impl ToString) -> Self {
        Self {
            available: false,
            error: Some(error.to_string()),
            details: Map::new(),
        }
    }

    fn from_check(check: Result<Value, DispatchError>) -> Self {
        match check {
            Ok(details) => Self::up(details),
            Err(e) => Self::down(e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub asana: PlatformStatus,
    pub github: PlatformStatus,
    pub vscode: PlatformStatus,
    pub timestamp: DateTime<Utc>,
}

impl StatusReport {
    pub fn all_available(&self) -> bool {
        self.asana.available && self.github.available && self.vscode.available
    }
}

impl CommandRouter {
    /// Check every platform concurrently
    pub async fn status(&self) -> StatusReport {
        let (asana, github, vscode) = futures::join!(
            self.check_asana(),
            self.check_github(),
            self.check_vscode()
        );

        let report = StatusReport {
            asana: PlatformStatus::from_check(asana),
            github: PlatformStatus::from_check(github),
            vscode: PlatformStatus::from_check(vscode),
            timestamp: Utc::now(),
        };
        tracing::debug!(
            asana = report.asana.available,
            github = report.github.available,
            vscode = report.vscode.available,
            "Status checked"
        );
        report
    }

    async fn check_asana(&self) -> Result<Value, DispatchError> {
        let asana = self.asana_slot().get("asana")?;
        let projects = asana
            .get_projects()
            .await
            .map_err(|e| DispatchError::platform("asana", e))?;
        let preview: Vec<_> = projects.iter().take(PREVIEW_LEN).collect();
        Ok(json!({
            "projects_count": projects.len(),
            "projects": preview,
        }))
    }

    async fn check_github(&self) -> Result<Value, DispatchError> {
        let github = self.github_slot().get("github")?;
        let repositories = github
            .get_repositories(None)
            .await
            .map_err(|e| DispatchError::platform("github", e))?;
        let preview: Vec<_> = repositories.iter().take(PREVIEW_LEN).collect();
        Ok(json!({
            "repositories_count": repositories.len(),
            "repositories": preview,
        }))
    }

    async fn check_vscode(&self) -> Result<Value, DispatchError> {
        let vscode = self.vscode_slot().get("vscode")?;
        let files = vscode
            .get_workspace_files(None)
            .await
            .map_err(|e| DispatchError::platform("vscode", e))?;
        // Not a git checkout is still a usable workspace
        let git_status = match vscode.git_status().await {
            Ok(status) => json!(status),
            Err(e) => json!({ "error": e.to_string() }),
        };
        Ok(json!({
            "workspace_path": vscode.root().display().to_string(),
            "workspace_files_count": files.len(),
            "git_status": git_status,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_flat() {
        let status = PlatformStatus::up(json!({"projects_count": 3}));
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value, json!({"available": true, "projects_count": 3}));

        let down = serde_json::to_value(PlatformStatus::down("token missing")).unwrap();
        assert_eq!(down, json!({"available": false, "error": "token missing"}));
    }
}
