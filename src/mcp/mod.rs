//! MCP server for dialectic: lets agents take part in debates through the
//! Model Context Protocol.
//!
//! Tools: list_debates, create_debate, list_messages, post_message,
//! reset_session, session_graph, suggest_rebuttals.

pub mod params;

use params::*;
use crate::api::{DebateApi, Submission};
use crate::config::Config;
use crate::graph::{ArgType, DebateId, MessageId, RelationType, SessionId};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::Serialize;
use tracing::{error, info};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ok_text(text: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

fn err_text(msg: String) -> Result<CallToolResult, McpError> {
    Ok(CallToolResult::error(vec![Content::text(msg)]))
}

fn ok_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    match serde_json::to_string_pretty(value) {
        Ok(text) => ok_text(text),
        Err(e) => err_text(format!("failed to serialize result: {}", e)),
    }
}

fn session_id(raw: Option<String>) -> SessionId {
    raw.map(SessionId::new)
        .filter(|s| !s.is_blank())
        .unwrap_or_default()
}

/// Turn tool arguments into a submission, rejecting unknown enum values
fn submission(p: PostMessageParams) -> Result<(DebateId, Submission), String> {
    let arg_type = p
        .arg_type
        .map(|s| ArgType::parse(&s).ok_or_else(|| format!("unknown arg_type '{}'", s)))
        .transpose()?;
    let relation_type = p
        .relation_type
        .map(|s| RelationType::parse(&s).ok_or_else(|| format!("unknown relation_type '{}'", s)))
        .transpose()?;

    let mut submission = Submission::new(p.username, p.content).in_session(session_id(p.session_id));
    submission.id = p.id.map(MessageId::new);
    submission.arg_type = arg_type;
    submission.relation_type = relation_type;
    submission.target_id = p.target_id.map(MessageId::new);
    submission.feedback = p.feedback;
    Ok((DebateId::new(p.debate_id), submission))
}

// ---------------------------------------------------------------------------
// DialecticMcpServer
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct DialecticMcpServer {
    api: DebateApi,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl DialecticMcpServer {
    pub fn new(api: DebateApi) -> Self {
        Self {
            api,
            tool_router: Self::tool_router(),
        }
    }

    // ── Debate tools ────────────────────────────────────────────────────

    #[tool(description = "List all debates, newest first")]
    fn list_debates(&self) -> Result<CallToolResult, McpError> {
        match self.api.list_debates() {
            Ok(debates) => ok_json(&debates),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Create a debate on a topic")]
    fn create_debate(
        &self,
        Parameters(p): Parameters<CreateDebateParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.api.create_debate(&p.topic) {
            Ok(debate) => ok_json(&debate),
            Err(e) => err_text(e.to_string()),
        }
    }

    // ── Session tools ───────────────────────────────────────────────────

    #[tool(description = "List the messages of a debate session, each with the current winning message IDs")]
    async fn list_messages(
        &self,
        Parameters(p): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let messages = self
            .api
            .fetch_messages(DebateId::new(p.debate_id), &session_id(p.session_id))
            .await;
        ok_json(&messages)
    }

    #[tool(description = "Post a message to a debate session; returns it with the updated winners")]
    async fn post_message(
        &self,
        Parameters(p): Parameters<PostMessageParams>,
    ) -> Result<CallToolResult, McpError> {
        let (debate_id, submission) = match submission(p) {
            Ok(parsed) => parsed,
            Err(msg) => return err_text(msg),
        };
        match self.api.submit_message(debate_id, submission).await {
            Ok(accepted) => ok_json(&accepted.message),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Delete every message of a debate session and start over")]
    async fn reset_session(
        &self,
        Parameters(p): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let session = session_id(p.session_id);
        match self.api.reset_session(DebateId::new(p.debate_id), &session).await {
            Ok(removed) => ok_json(&serde_json::json!({ "session_id": session, "removed": removed })),
            Err(e) => err_text(e.to_string()),
        }
    }

    #[tool(description = "Show a session's argument graph: messages labelled IN/OUT/UNDEC, attack and support edges, and winners")]
    async fn session_graph(
        &self,
        Parameters(p): Parameters<SessionParams>,
    ) -> Result<CallToolResult, McpError> {
        let snapshot = self
            .api
            .session_graph(DebateId::new(p.debate_id), &session_id(p.session_id))
            .await;
        ok_json(&snapshot)
    }

    // ── Coach tools ─────────────────────────────────────────────────────

    #[tool(description = "Suggest lines of attack against a message")]
    async fn suggest_rebuttals(
        &self,
        Parameters(p): Parameters<SuggestParams>,
    ) -> Result<CallToolResult, McpError> {
        // Without a session the message is found anywhere in the debate
        let session = p.session_id.map(SessionId::new).filter(|s| !s.is_blank());
        match self
            .api
            .suggestions(DebateId::new(p.debate_id), session.as_ref(), MessageId::new(p.target_id))
            .await
        {
            Ok(suggestions) => ok_json(&serde_json::json!({ "suggestions": suggestions })),
            Err(e) => err_text(e.to_string()),
        }
    }
}

#[tool_handler]
impl ServerHandler for DialecticMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "dialectic MCP server: post arguments to debate sessions and read which messages currently win"
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run_mcp_server(config: &Config) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    rt.block_on(async {
        let api = match DebateApi::from_config(config) {
            Ok(api) => api,
            Err(e) => {
                error!(database = %config.database.display(), error = %e, "failed to open database");
                return 1;
            }
        };

        info!("dialectic mcp server starting on stdio");

        let service = match DialecticMcpServer::new(api).serve(rmcp::transport::stdio()).await {
            Ok(s) => s,
            Err(e) => {
                error!(error = %e, "failed to start MCP server");
                return 1;
            }
        };

        if let Err(e) = service.waiting().await {
            error!(error = %e, "MCP server error");
            return 1;
        }

        0
    })
}
