//! Command pipeline: classify, then dispatch

use std::sync::Arc;

use serde_json::Value;

use crate::classifier::IntentClassifier;
use crate::envelope::CommandResult;
use crate::router::{CommandRouter, DispatchContext, StatusReport, SyncRequest};

/// The classifier and router behind every front end
pub struct Assistant {
    classifier: IntentClassifier,
    router: Arc<CommandRouter>,
}

impl Assistant {
    pub fn new(classifier: IntentClassifier, router: CommandRouter) -> Self {
        Self {
            classifier,
            router: Arc::new(router),
        }
    }

    pub fn router(&self) -> &Arc<CommandRouter> {
        &self.router
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    /// Classify `command` and dispatch the resulting intent
    ///
    /// A classification failure is terminal: the result has no intent and a
    /// `classification_error` detail.
    pub async fn process_command(&self, command: &str, context: Option<&Value>) -> CommandResult {
        tracing::info!(command = %command, "Processing command");

        let intent = match self.classifier.classify(command, context).await {
            Ok(intent) => intent,
            Err(e) => {
                tracing::warn!(error = %e, "Classification failed");
                return CommandResult::failed(None, e.detail());
            }
        };

        let ctx = DispatchContext { command, context };
        self.router.dispatch_in_context(intent, Some(&ctx)).await
    }

    pub async fn sync(&self, request: SyncRequest) -> CommandResult {
        self.router.sync(request).await
    }

    pub async fn status(&self) -> StatusReport {
        self.router.status().await
    }
}
