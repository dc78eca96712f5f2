//! Result envelope returned to callers
//!
//! Every command, sync or direct platform request ends in a
//! [`CommandResult`]. On failure the `result` field carries an
//! [`ErrorDetail`] instead of a platform payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::PlatformErrorKind;
use crate::intent::Intent;

/// Top-level failure category written into `result.error`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    ClassificationError,
    UnsupportedOperation,
    InvalidParameters,
    PlatformClientError,
    SecretResolutionError,
    LowConfidence,
}

/// Error payload placed into a failed result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub error: ErrorCategory,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<PlatformErrorKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    pub message: String,

    /// Payloads of steps that completed before the failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl ErrorDetail {
    pub fn new(error: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            error,
            kind: None,
            platform: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_kind(mut self, kind: PlatformErrorKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }
}

/// Normalized success/failure envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,

    /// The intent that was dispatched; `None` only when classification failed
    pub intent: Option<Intent>,

    /// Platform payload on success, [`ErrorDetail`] on failure
    pub result: Value,

    pub timestamp: DateTime<Utc>,

    pub request_id: Uuid,
}

impl CommandResult {
    pub fn succeeded(intent: Intent, payload: Value) -> Self {
        Self {
            success: true,
            intent: Some(intent),
            result: payload,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    pub fn failed(intent: Option<Intent>, detail: ErrorDetail) -> Self {
        let result = serde_json::to_value(&detail).unwrap_or_else(|_| {
            serde_json::json!({ "error": "platform_client_error", "message": detail.message })
        });
        Self {
            success: false,
            intent,
            result,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4(),
        }
    }

    /// Decode the error detail of a failed result
    pub fn error_detail(&self) -> Option<ErrorDetail> {
        if self.success {
            return None;
        }
        serde_json::from_value(self.result.clone()).ok()
    }

    pub fn error_category(&self) -> Option<ErrorCategory> {
        self.error_detail().map(|d| d.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Platform;

    #[test]
    fn test_failed_round_trips_detail() {
        let detail = ErrorDetail::new(ErrorCategory::UnsupportedOperation, "no such action")
            .with_platform("asana");
        let result = CommandResult::failed(
            Some(Intent::new("x", Platform::Asana, "explode")),
            detail.clone(),
        );

        assert!(!result.success);
        assert_eq!(result.error_detail(), Some(detail));
        assert_eq!(result.result["error"], "unsupported_operation");
        assert!(result.result.get("kind").is_none());
    }

    #[test]
    fn test_success_has_no_detail() {
        let result = CommandResult::succeeded(
            Intent::new("get_repositories", Platform::Github, "get_repositories"),
            serde_json::json!([]),
        );
        assert!(result.success);
        assert_eq!(result.error_category(), None);
    }

    #[test]
    fn test_timestamp_serializes_rfc3339() {
        let result = CommandResult::failed(
            None,
            ErrorDetail::new(ErrorCategory::ClassificationError, "bad"),
        );
        let json = serde_json::to_value(&result).unwrap();
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok());
        assert!(json["intent"].is_null());
    }
}
