//! Intent structures for natural-language commands
//!
//! These structures represent what the classifier extracted from a command
//! and are what the router dispatches on.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Platform an intent targets
///
/// Unknown names are kept verbatim in [`Platform::Other`] so the router can
/// report exactly what the classifier asked for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    /// Asana task tracking
    Asana,
    /// GitHub source hosting
    Github,
    /// Local VS Code workspace
    Vscode,
    /// Composition across Asana and GitHub (sync)
    Multi,
    /// No platform action; answer conversationally
    General,
    /// Anything else the classifier produced
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Asana => "asana",
            Platform::Github => "github",
            Platform::Vscode => "vscode",
            Platform::Multi => "multi",
            Platform::General => "general",
            Platform::Other(name) => name,
        }
    }

    /// The platforms with a fixed action table
    pub fn known() -> [Platform; 5] {
        [
            Platform::Asana,
            Platform::Github,
            Platform::Vscode,
            Platform::Multi,
            Platform::General,
        ]
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "asana" => Platform::Asana,
            "github" => Platform::Github,
            "vscode" => Platform::Vscode,
            "multi" => Platform::Multi,
            "general" => Platform::General,
            _ => Platform::Other(value),
        }
    }
}

impl From<&str> for Platform {
    fn from(value: &str) -> Self {
        Platform::from(value.to_string())
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured classification of a natural-language command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Intent label, e.g. "create_task", "sync_issue"
    pub intent: String,

    /// Platform the action runs against
    pub platform: Platform,

    /// Action name within the platform's table
    pub action: String,

    /// Action arguments as produced by the classifier
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Map<String, Value>,

    /// Classifier confidence (0.0 to 1.0), advisory
    #[serde(default)]
    pub confidence: f64,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Intent {
    pub fn new(intent: impl Into<String>, platform: Platform, action: impl Into<String>) -> Self {
        Self {
            intent: intent.into(),
            platform,
            action: action.into(),
            parameters: Map::new(),
            confidence: 1.0,
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Map<String, Value>) -> Self {
        self.parameters.extend(parameters);
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Check the confidence is a usable probability
    pub fn has_valid_confidence(&self) -> bool {
        self.confidence.is_finite() && (0.0..=1.0).contains(&self.confidence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_platform_from_str() {
        assert_eq!(Platform::from("asana"), Platform::Asana);
        assert_eq!(Platform::from("GitHub"), Platform::Github);
        assert_eq!(Platform::from(" vscode "), Platform::Vscode);
        assert_eq!(Platform::from("multi"), Platform::Multi);
        assert_eq!(
            Platform::from("jira"),
            Platform::Other("jira".to_string())
        );
    }

    #[test]
    fn test_unknown_platform_survives_serde() {
        let intent: Intent = serde_json::from_value(json!({
            "intent": "create_ticket",
            "platform": "jira",
            "action": "create_ticket",
            "parameters": {"summary": "x"},
            "confidence": 0.4
        }))
        .unwrap();
        assert_eq!(intent.platform, Platform::Other("jira".to_string()));

        let back = serde_json::to_value(&intent).unwrap();
        assert_eq!(back["platform"], "jira");
    }

    #[test]
    fn test_missing_optional_fields() {
        let intent: Intent = serde_json::from_value(json!({
            "intent": "get_repositories",
            "platform": "github",
            "action": "get_repositories",
            "parameters": null
        }))
        .unwrap();
        assert!(intent.parameters.is_empty());
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_confidence_range() {
        let intent = Intent::new("x", Platform::General, "respond");
        assert!(intent.clone().with_confidence(0.0).has_valid_confidence());
        assert!(intent.clone().with_confidence(1.0).has_valid_confidence());
        assert!(!intent.clone().with_confidence(1.2).has_valid_confidence());
        assert!(!intent.with_confidence(f64::NAN).has_valid_confidence());
    }
}
