//! Natural-language command router for Asana, GitHub and VS Code workspaces
//!
//! A command string is classified by an LLM into an [`Intent`], the
//! [`CommandRouter`] dispatches that intent to the matching platform client,
//! and the outcome comes back as a [`CommandResult`] envelope.
//!
//! ## Architecture
//!
//! ```text
//! HTTP / CLI → IntentClassifier → CommandRouter → Platform client → CommandResult
//! ```
//!
//! ## Backend Selection
//!
//! Set `LLM_BACKEND` environment variable:
//! - `openai` (default): OpenAI chat completions
//! - `anthropic`: Anthropic messages API

pub mod assistant;
pub mod bootstrap;
pub mod classifier;
pub mod config;
pub mod envelope;
pub mod error;
pub mod intent;
pub mod llm;
pub mod platforms;
pub mod router;
pub mod secrets;

#[cfg(feature = "server")]
pub mod api;

// Re-exports for convenience
pub use assistant::Assistant;
pub use classifier::IntentClassifier;
pub use config::AppConfig;
pub use envelope::{CommandResult, ErrorCategory, ErrorDetail};
pub use intent::{Intent, Platform};
pub use router::{CommandRouter, RouterSettings};
