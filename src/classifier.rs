//! LLM-based intent classification
//!
//! Sends the raw command (plus optional caller context) to the LLM in JSON
//! mode and parses the reply into an [`Intent`]. The parser is a strict
//! pass-through: whatever the LLM put in the JSON object is what the router
//! sees, apart from defaults for missing `parameters`/`confidence`.

use std::sync::Arc;

use serde_json::Value;

use crate::error::ClassificationError;
use crate::intent::{Intent, Platform};
use crate::llm::LlmClient;
use crate::platforms::ClientSlot;
use crate::router::supported_actions;

/// Longest raw LLM reply kept in an error
const RAW_EXCERPT_CHARS: usize = 500;

pub struct IntentClassifier {
    llm: ClientSlot<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self {
            llm: ClientSlot::ready(llm),
        }
    }

    pub fn from_slot(llm: ClientSlot<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub fn is_available(&self) -> bool {
        self.llm.is_ready()
    }

    /// Classify a command into an intent
    pub async fn classify(
        &self,
        command: &str,
        context: Option<&Value>,
    ) -> Result<Intent, ClassificationError> {
        let command = command.trim();
        if command.is_empty() {
            return Err(ClassificationError::EmptyCommand);
        }

        let llm = match &self.llm {
            ClientSlot::Ready(llm) => llm,
            ClientSlot::Unavailable(reason) => {
                return Err(ClassificationError::Unavailable(reason.clone()))
            }
        };

        let system_prompt = build_system_prompt();
        let user_prompt = build_user_prompt(command, context);

        tracing::debug!(
            provider = llm.provider_name(),
            model = llm.model_name(),
            "Classifying command"
        );

        let raw = llm
            .chat_json(&system_prompt, &user_prompt)
            .await
            .map_err(|e| ClassificationError::Llm(e.to_string()))?;

        let intent = parse_intent(&raw)?;
        tracing::info!(
            platform = %intent.platform,
            action = %intent.action,
            confidence = intent.confidence,
            "Classified command"
        );
        Ok(intent)
    }
}

fn build_system_prompt() -> String {
    let mut table = String::new();
    for platform in Platform::known() {
        let actions = supported_actions(&platform);
        let listed = if actions.is_empty() {
            "respond (conversational answer, no platform call)".to_string()
        } else {
            actions.join(", ")
        };
        table.push_str(&format!("- {}: {}\n", platform, listed));
    }

    format!(
        r#"You route developer requests between Asana (tasks), GitHub (issues, pull requests, repositories) and a local VS Code workspace.

Classify the request into exactly one platform and action:
{table}
Use "multi" only for syncing between Asana and GitHub. Use "general" when no platform action fits; put the question in parameters.message.

Respond with a JSON object containing:
- intent: short label for the user's goal (e.g. "create_task", "sync_issue", "setup_project")
- platform: one of asana, github, vscode, multi, general
- action: one of the actions listed for that platform
- parameters: object with the arguments for the action (e.g. name, notes, project_gid, repo_name, title, body, issue_number, task_gid)
- confidence: number between 0 and 1"#
    )
}

fn build_user_prompt(command: &str, context: Option<&Value>) -> String {
    let context = context
        .and_then(|c| serde_json::to_string_pretty(c).ok())
        .unwrap_or_else(|| "{}".to_string());
    format!("User Input: {}\n\nContext: {}", command, context)
}

/// Parse an LLM reply into an intent
///
/// Accepts the JSON object bare, inside a markdown fence, or embedded in
/// surrounding prose.
pub fn parse_intent(raw: &str) -> Result<Intent, ClassificationError> {
    let json_str = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let intent = match serde_json::from_str::<Intent>(json_str) {
        Ok(intent) => intent,
        Err(e) => {
            let extracted = match (json_str.find('{'), json_str.rfind('}')) {
                (Some(start), Some(end)) if start < end => &json_str[start..=end],
                _ => return Err(unparseable(e.to_string(), raw)),
            };
            serde_json::from_str::<Intent>(extracted)
                .map_err(|inner| unparseable(format!("{} (after extraction: {})", e, inner), raw))?
        }
    };

    if !intent.has_valid_confidence() {
        return Err(unparseable(
            format!("confidence {} is outside [0, 1]", intent.confidence),
            raw,
        ));
    }
    Ok(intent)
}

fn unparseable(message: String, raw: &str) -> ClassificationError {
    ClassificationError::Unparseable {
        message,
        raw: raw.chars().take(RAW_EXCERPT_CHARS).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FixedLlm {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedLlm {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn chat(&self, _system: &str, _user: &str) -> Result<String> {
            Ok(self.reply.clone())
        }
        async fn chat_json(&self, _system: &str, user: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(user.to_string());
            Ok(self.reply.clone())
        }
        fn model_name(&self) -> &str {
            "fixed"
        }
        fn provider_name(&self) -> &str {
            "test"
        }
    }

    #[tokio::test]
    async fn test_classify_create_task() {
        let payload = json!({
            "intent": "create_task",
            "platform": "asana",
            "action": "create_task",
            "parameters": {"name": "Implement user authentication"},
            "confidence": 0.92
        });
        let llm = FixedLlm::new(&payload.to_string());
        let classifier = IntentClassifier::new(llm.clone());

        let intent = classifier
            .classify("Create a task for implementing user authentication", None)
            .await
            .unwrap();

        assert_eq!(intent.platform, Platform::Asana);
        assert_eq!(intent.action, "create_task");
        assert_eq!(serde_json::to_value(&intent).unwrap(), payload);

        let prompts = llm.prompts.lock().unwrap();
        assert!(prompts[0].contains("Create a task for implementing user authentication"));
    }

    #[tokio::test]
    async fn test_context_is_embedded() {
        let llm = FixedLlm::new(
            r#"{"intent":"get_issues","platform":"github","action":"get_issues","confidence":0.8}"#,
        );
        let classifier = IntentClassifier::new(llm.clone());
        classifier
            .classify("show open issues", Some(&json!({"repo_name": "api"})))
            .await
            .unwrap();
        assert!(llm.prompts.lock().unwrap()[0].contains("\"repo_name\": \"api\""));
    }

    #[tokio::test]
    async fn test_empty_command_skips_llm() {
        let llm = FixedLlm::new("{}");
        let classifier = IntentClassifier::new(llm.clone());
        let err = classifier.classify("   ", None).await.unwrap_err();
        assert_eq!(err, ClassificationError::EmptyCommand);
        assert!(llm.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_llm() {
        let classifier = IntentClassifier::from_slot(ClientSlot::unavailable("no key"));
        assert!(matches!(
            classifier.classify("hello", None).await,
            Err(ClassificationError::Unavailable(_))
        ));
    }

    #[test]
    fn test_parse_fenced() {
        let raw = "```json\n{\"intent\":\"x\",\"platform\":\"vscode\",\"action\":\"git_status\",\"confidence\":0.5}\n```";
        let intent = parse_intent(raw).unwrap();
        assert_eq!(intent.platform, Platform::Vscode);
        assert!(intent.parameters.is_empty());
    }

    #[test]
    fn test_parse_embedded_in_prose() {
        let raw = "Sure! Here you go: {\"intent\":\"x\",\"platform\":\"general\",\"action\":\"respond\"} Hope that helps.";
        let intent = parse_intent(raw).unwrap();
        assert_eq!(intent.platform, Platform::General);
        assert_eq!(intent.confidence, 0.0);
    }

    #[test]
    fn test_parse_rejects_garbage_and_bad_confidence() {
        assert!(matches!(
            parse_intent("I cannot help with that."),
            Err(ClassificationError::Unparseable { .. })
        ));
        assert!(parse_intent(
            r#"{"intent":"x","platform":"asana","action":"get_tasks","confidence":7}"#
        )
        .is_err());
    }

    #[test]
    fn test_system_prompt_lists_actions() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("sync_task_to_issue"));
        assert!(prompt.contains("install_extension"));
        assert!(prompt.contains("- general: respond"));
    }
}
