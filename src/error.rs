//! Error taxonomy for the command pipeline
//!
//! Every failure a caller can observe maps onto one of these types. The
//! router converts them into a `success: false` [`CommandResult`] through
//! [`ErrorDetail`]; nothing here is retried.
//!
//! [`CommandResult`]: crate::envelope::CommandResult
//! [`ErrorDetail`]: crate::envelope::ErrorDetail

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::envelope::{ErrorCategory, ErrorDetail};

/// Why a platform client call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformErrorKind {
    /// Credential rejected (401/403)
    Auth,
    /// Entity does not exist (404)
    NotFound,
    /// Provider throttled the call (429)
    RateLimited,
    /// Transport failure, timeout or process spawn failure
    Network,
    /// Provider rejected the request shape (other 4xx)
    InvalidRequest,
    /// Provider failed or replied with something unreadable (5xx, bad body)
    Upstream,
    /// Client was never constructed (credential missing)
    Unavailable,
}

impl PlatformErrorKind {
    /// Map an HTTP status from a provider API onto an error kind
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => PlatformErrorKind::Auth,
            404 => PlatformErrorKind::NotFound,
            429 => PlatformErrorKind::RateLimited,
            400..=499 => PlatformErrorKind::InvalidRequest,
            _ => PlatformErrorKind::Upstream,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformErrorKind::Auth => "auth",
            PlatformErrorKind::NotFound => "not_found",
            PlatformErrorKind::RateLimited => "rate_limited",
            PlatformErrorKind::Network => "network",
            PlatformErrorKind::InvalidRequest => "invalid_request",
            PlatformErrorKind::Upstream => "upstream",
            PlatformErrorKind::Unavailable => "unavailable",
        }
    }
}

impl std::fmt::Display for PlatformErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Failure surfaced by a platform client, passed through unchanged
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct PlatformError {
    pub kind: PlatformErrorKind,
    pub message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Build from a non-success provider response
    pub fn from_status(status: reqwest::StatusCode, message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::from_status(status), message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::InvalidRequest, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Upstream, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PlatformErrorKind::Network, message)
    }
}

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            return PlatformError::from_status(status, err.to_string());
        }
        if err.is_decode() {
            return PlatformError::upstream(format!("Unreadable response body: {}", err));
        }
        PlatformError::network(err.to_string())
    }
}

impl From<std::io::Error> for PlatformError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => {
                PlatformError::new(PlatformErrorKind::NotFound, err.to_string())
            }
            std::io::ErrorKind::TimedOut => PlatformError::network(err.to_string()),
            _ => PlatformError::upstream(err.to_string()),
        }
    }
}

/// The LLM could not produce a usable intent
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClassificationError {
    #[error("Command is empty")]
    EmptyCommand,

    #[error("Intent classifier unavailable: {0}")]
    Unavailable(String),

    #[error("LLM call failed: {0}")]
    Llm(String),

    #[error("Unparseable intent from LLM: {message}")]
    Unparseable { message: String, raw: String },
}

impl ClassificationError {
    pub fn detail(&self) -> ErrorDetail {
        ErrorDetail::new(ErrorCategory::ClassificationError, self.to_string())
    }
}

/// A credential could not be resolved from the vault or the environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretResolutionError {
    #[error("Secret '{name}' not found in Key Vault or environment variable {env_var}")]
    Missing { name: String, env_var: String },

    #[error("Key Vault request failed: {0}")]
    Vault(String),

    #[error("Secret store is read-only: {0}")]
    ReadOnly(String),
}

/// Invalid environment configuration; fatal at startup
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn invalid(key: &str, value: &str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Why a single dispatch did not produce a platform payload
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Unsupported operation: platform '{platform}' has no action '{action}'")]
    Unsupported { platform: String, action: String },

    #[error("Invalid parameters for '{action}': {message}")]
    InvalidParameters { action: String, message: String },

    #[error("{platform} client error: {source}")]
    Platform {
        platform: String,
        #[source]
        source: PlatformError,
    },

    #[error("{platform} client unavailable: {reason}")]
    Unavailable { platform: String, reason: String },

    #[error("Intent confidence {confidence:.2} is below the routing threshold {threshold:.2}")]
    LowConfidence { confidence: f64, threshold: f64 },

    /// A composed operation failed after earlier steps already took effect
    #[error("{source}")]
    Partial {
        source: Box<DispatchError>,
        completed: serde_json::Value,
    },
}

impl DispatchError {
    pub fn unsupported(platform: impl Into<String>, action: impl Into<String>) -> Self {
        DispatchError::Unsupported {
            platform: platform.into(),
            action: action.into(),
        }
    }

    pub fn invalid_parameters(action: impl Into<String>, message: impl Into<String>) -> Self {
        DispatchError::InvalidParameters {
            action: action.into(),
            message: message.into(),
        }
    }

    pub fn platform(platform: impl Into<String>, source: PlatformError) -> Self {
        DispatchError::Platform {
            platform: platform.into(),
            source,
        }
    }

    /// Wrap this error with the payloads of steps that already succeeded
    pub fn after(self, completed: serde_json::Value) -> Self {
        DispatchError::Partial {
            source: Box::new(self),
            completed,
        }
    }

    /// Convert into the wire-level detail placed in a failed result
    pub fn detail(&self) -> ErrorDetail {
        match self {
            DispatchError::Unsupported { .. } => {
                ErrorDetail::new(ErrorCategory::UnsupportedOperation, self.to_string())
            }
            DispatchError::InvalidParameters { .. } => {
                ErrorDetail::new(ErrorCategory::InvalidParameters, self.to_string())
            }
            DispatchError::Platform { platform, source } => {
                ErrorDetail::new(ErrorCategory::PlatformClientError, source.message.clone())
                    .with_kind(source.kind)
                    .with_platform(platform)
            }
            DispatchError::Unavailable { platform, .. } => {
                ErrorDetail::new(ErrorCategory::SecretResolutionError, self.to_string())
                    .with_kind(PlatformErrorKind::Unavailable)
                    .with_platform(platform)
            }
            DispatchError::LowConfidence { .. } => {
                ErrorDetail::new(ErrorCategory::LowConfidence, self.to_string())
            }
            DispatchError::Partial { source, completed } => {
                source.detail().with_context(completed.clone())
            }
        }
    }
}
