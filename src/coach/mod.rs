//! Coach: LLM-backed argument mining and rebuttal suggestions
//!
//! The coach is advisory. Every call is bounded by a timeout and every
//! failure degrades to a neutral default, so ingestion never waits on it.
//!
//! Implementations:
//! - `OpenAiCoach`: OpenAI-compatible chat completions in JSON mode
//! - `DisabledCoach`: no endpoint configured; always unavailable
//! - `MockCoach`: preconfigured responses (testing)

mod mock;
mod openai;

pub use mock::MockCoach;
pub use openai::OpenAiCoach;

use crate::config::CoachConfig;
use crate::graph::{ArgType, Message, MessageId, RelationType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Returned when suggestions cannot be produced
pub const FALLBACK_SUGGESTION: &str = "Unable to generate suggestions right now.";

/// Errors from coach operations
#[derive(Debug, thiserror::Error)]
pub enum CoachError {
    #[error("coach not available: {0}")]
    Unavailable(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("response parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for CoachError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

pub type CoachResult<T> = Result<T, CoachError>;

/// A prior message as shown to the coach
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: MessageId,
    pub content: String,
    #[serde(rename = "type")]
    pub arg_type: ArgType,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            arg_type: message.arg_type,
        }
    }
}

/// Structure the coach read into a message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentAnalysis {
    pub arg_type: ArgType,
    pub relation_type: RelationType,
    pub target_id: Option<MessageId>,
    pub feedback: Option<String>,
}

impl ArgumentAnalysis {
    /// Read a model reply, defaulting whatever is missing or malformed
    ///
    /// Accepts `type`/`arg_type`, `relation`/`relation_type`, and a target
    /// given as a number or a numeric string.
    pub fn from_json(value: &Value) -> Self {
        let text = |keys: &[&str]| {
            keys.iter()
                .find_map(|k| value.get(*k).and_then(Value::as_str))
                .map(str::to_string)
        };

        let arg_type = text(&["type", "arg_type"])
            .and_then(|s| ArgType::parse(&s))
            .unwrap_or_default();
        let relation_type = text(&["relation", "relation_type"])
            .and_then(|s| RelationType::parse(&s))
            .unwrap_or_default();
        let target_id = match value.get("target_id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .map(MessageId::new);
        let feedback = text(&["feedback"]).filter(|f| !f.trim().is_empty());

        // A relation without a target means nothing
        let relation_type = if target_id.is_some() {
            relation_type
        } else {
            RelationType::None
        };

        Self {
            arg_type,
            relation_type,
            target_id,
            feedback,
        }
    }
}

/// Coach backend
#[async_trait]
pub trait Coach: Send + Sync {
    /// Whether calls can succeed at all
    fn is_enabled(&self) -> bool {
        true
    }

    /// Classify `content` against the recent history of its session
    async fn analyze(&self, content: &str, history: &[HistoryEntry]) -> CoachResult<ArgumentAnalysis>;

    /// Propose rebuttals to `target`, given recent debate context
    async fn suggest(&self, target: &str, context: &[String]) -> CoachResult<Vec<String>>;
}

/// Coach used when no endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCoach;

#[async_trait]
impl Coach for DisabledCoach {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn analyze(&self, _content: &str, _history: &[HistoryEntry]) -> CoachResult<ArgumentAnalysis> {
        Err(CoachError::Unavailable("no coach configured".to_string()))
    }

    async fn suggest(&self, _target: &str, _context: &[String]) -> CoachResult<Vec<String>> {
        Err(CoachError::Unavailable("no coach configured".to_string()))
    }
}

/// Build the coach described by `config`
///
/// Without an API key the coach is disabled rather than failing startup.
pub fn from_config(config: &CoachConfig) -> Arc<dyn Coach> {
    match OpenAiCoach::from_config(config) {
        Ok(coach) => {
            info!(endpoint = %config.endpoint, model = %config.model, "coach enabled");
            Arc::new(coach)
        }
        Err(e) => {
            info!(reason = %e, "coach disabled");
            Arc::new(DisabledCoach)
        }
    }
}

/// Run `analyze` under `timeout`, falling back to an unrelated claim
pub async fn analyze_or_default(
    coach: &dyn Coach,
    timeout: Duration,
    content: &str,
    history: &[HistoryEntry],
) -> ArgumentAnalysis {
    if !coach.is_enabled() {
        return ArgumentAnalysis::default();
    }
    match tokio::time::timeout(timeout, coach.analyze(content, history)).await {
        Ok(Ok(analysis)) => analysis,
        Ok(Err(e)) => {
            warn!(error = %e, "argument mining failed, using defaults");
            ArgumentAnalysis::default()
        }
        Err(_) => {
            warn!(error = %CoachError::Timeout(timeout), "argument mining failed, using defaults");
            ArgumentAnalysis::default()
        }
    }
}

/// Run `suggest` under `timeout`, falling back to a single apology
pub async fn suggest_or_fallback(
    coach: &dyn Coach,
    timeout: Duration,
    target: &str,
    context: &[String],
) -> Vec<String> {
    let result = match tokio::time::timeout(timeout, coach.suggest(target, context)).await {
        Ok(result) => result,
        Err(_) => Err(CoachError::Timeout(timeout)),
    };
    match result {
        Ok(suggestions) if !suggestions.is_empty() => suggestions,
        Ok(_) => vec![FALLBACK_SUGGESTION.to_string()],
        Err(e) => {
            warn!(error = %e, "suggestion generation failed");
            vec![FALLBACK_SUGGESTION.to_string()]
        }
    }
}
