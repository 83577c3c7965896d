//! OpenAI-compatible chat-completions coach

use super::{ArgumentAnalysis, Coach, CoachError, CoachResult, HistoryEntry};
use crate::config::CoachConfig;
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

const ANALYSIS_PROMPT: &str = r#"You are an expert in formal logic reviewing one message of a live debate.
1. Extract its argumentative structure: is it a claim or a premise, and does it attack, support or ignore an earlier message?
2. Look for weaknesses: fallacies (ad hominem, slippery slope, straw man) or missing evidence.

Reply with a JSON object:
{
  "content": "one-line summary",
  "type": "claim" | "premise",
  "relation": "attack" | "support" | "none",
  "target_id": <id of the earlier message it responds to> | null,
  "feedback": "one short piece of advice about the argument's strength, or null"
}"#;

const SUGGESTION_PROMPT: &str = r#"You are a debate strategist helping a participant win.
Study the target argument and propose three logical lines of attack: a rebuttal, an undercut and an attack on a premise.

Reply with a JSON object:
{
  "suggestions": ["...", "...", "..."]
}"#;

/// Coach backed by a chat-completions endpoint in JSON mode
pub struct OpenAiCoach {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl OpenAiCoach {
    /// Requires an API key; the endpoint is the API base (e.g. `.../v1`)
    pub fn from_config(config: &CoachConfig) -> CoachResult<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CoachError::Unavailable("no API key configured".to_string()))?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Send one system + user exchange and parse the JSON reply
    async fn complete(&self, system: &str, user: String) -> CoachResult<Value> {
        let request = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ],
            "response_format": { "type": "json_object" }
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CoachError::Request(format!("{}: {}", status, body)));
        }

        let data: Value = response.json().await?;
        let content = data["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| CoachError::Parse("missing message content".to_string()))?;
        debug!(model = %self.model, bytes = content.len(), "coach replied");

        serde_json::from_str(content).map_err(|e| CoachError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Coach for OpenAiCoach {
    async fn analyze(&self, content: &str, history: &[HistoryEntry]) -> CoachResult<ArgumentAnalysis> {
        let history = serde_json::to_string(history).map_err(|e| CoachError::Parse(e.to_string()))?;
        let reply = self
            .complete(
                ANALYSIS_PROMPT,
                format!("Context: {}\n\nMessage: {}", history, content),
            )
            .await?;
        Ok(ArgumentAnalysis::from_json(&reply))
    }

    async fn suggest(&self, target: &str, context: &[String]) -> CoachResult<Vec<String>> {
        let reply = self
            .complete(
                SUGGESTION_PROMPT,
                format!(
                    "Debate context:\n{}\n\nTARGET ARGUMENT TO ATTACK: {}",
                    context.join("\n"),
                    target
                ),
            )
            .await?;
        parse_suggestions(&reply)
    }
}

fn parse_suggestions(reply: &Value) -> CoachResult<Vec<String>> {
    let items = reply
        .get("suggestions")
        .and_then(Value::as_array)
        .ok_or_else(|| CoachError::Parse("missing suggestions array".to_string()))?;
    Ok(items
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect())
}
