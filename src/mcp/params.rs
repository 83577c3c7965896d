//! MCP tool parameter structs with schemars-derived JSON schemas.

use schemars::JsonSchema;
use serde::Deserialize;

// ── Debate params ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct CreateDebateParams {
    #[schemars(description = "Question or motion under debate")]
    pub topic: String,
}

// ── Session params ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SessionParams {
    #[schemars(description = "The debate ID")]
    pub debate_id: i64,
    #[schemars(description = "Session key (default: 'default_session')")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct PostMessageParams {
    #[schemars(description = "The debate ID")]
    pub debate_id: i64,
    #[schemars(description = "Session key (default: 'default_session')")]
    pub session_id: Option<String>,
    #[schemars(description = "Name of the participant posting")]
    pub username: String,
    pub content: String,
    #[schemars(description = "'claim' or 'premise'. Leave arg_type, relation_type and target_id empty to let the coach classify the message")]
    pub arg_type: Option<String>,
    #[schemars(description = "'attack', 'support' or 'none'")]
    pub relation_type: Option<String>,
    #[schemars(description = "ID of the earlier message this one responds to")]
    pub target_id: Option<u64>,
    pub feedback: Option<String>,
    #[schemars(description = "Explicit message ID; reposting an existing ID is a no-op")]
    pub id: Option<u64>,
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SuggestParams {
    #[schemars(description = "The debate ID")]
    pub debate_id: i64,
    #[schemars(description = "Session key; searches every session of the debate when omitted")]
    pub session_id: Option<String>,
    #[schemars(description = "ID of the message to rebut")]
    pub target_id: u64,
}
