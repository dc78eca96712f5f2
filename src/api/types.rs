//! Request and response bodies of the HTTP surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::platforms::IssueState;

/// POST /api/command
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CommandRequest {
    #[serde(default)]
    pub command: String,
    #[serde(default)]
    pub context: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub service: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub events: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl WebhookAck {
    pub fn events(count: usize) -> Self {
        Self {
            status: "received".to_string(),
            events: Some(count),
            event: None,
        }
    }

    pub fn event(name: impl Into<String>) -> Self {
        Self {
            status: "received".to_string(),
            events: None,
            event: Some(name.into()),
        }
    }
}

// ============================================================================
// Direct endpoint query strings
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct TasksQuery {
    #[serde(default)]
    pub completed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct RepositoriesQuery {
    #[serde(default)]
    pub organization: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssuesQuery {
    #[serde(default)]
    pub state: IssueState,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilesQuery {
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Omitting `project_path` opens the workspace root
#[derive(Debug, Default, Deserialize)]
pub struct OpenProjectQuery {
    #[serde(default)]
    pub project_path: Option<String>,
}

/// JSON object body forwarded as intent parameters
pub type ParameterBody = Map<String, Value>;
