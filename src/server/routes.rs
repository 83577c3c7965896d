//! REST handlers

use super::AppState;
use crate::api::{ApiError, Submission};
use crate::graph::{Debate, DebateId, Message, MessageId, SessionId};
use crate::session::{Score, SessionError, SessionSnapshot};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<SessionId>,
}

impl SessionQuery {
    /// The requested session; an empty `?session_id=` counts as absent
    pub fn selected(self) -> Option<SessionId> {
        self.session_id.filter(|s| !s.is_blank())
    }

    fn session(self) -> SessionId {
        self.selected().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateDebate {
    pub topic: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::DebateNotFound(_) | ApiError::MessageNotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::EmptyContent | ApiError::EmptyTopic => StatusCode::BAD_REQUEST,
            ApiError::Session(
                SessionError::InvalidTarget { .. }
                | SessionError::NonMonotonicId { .. }
                | SessionError::IdOutOfRange { .. }
                | SessionError::IdsExhausted,
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Session(SessionError::Closed(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Session(_) | ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

/// GET /api/debates
pub async fn list_debates(State(state): State<AppState>) -> Result<Json<Vec<Debate>>, ApiError> {
    Ok(Json(state.api.list_debates()?))
}

/// POST /api/debates
pub async fn create_debate(
    State(state): State<AppState>,
    Json(body): Json<CreateDebate>,
) -> Result<(StatusCode, Json<Debate>), ApiError> {
    let debate = state.api.create_debate(&body.topic)?;
    Ok((StatusCode::CREATED, Json(debate)))
}

/// GET /api/debates/:debate_id/messages
pub async fn list_messages(
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
) -> Json<Vec<Message>> {
    Json(state.api.fetch_messages(debate_id, &query.session()).await)
}

/// POST /api/debates/:debate_id/messages
///
/// A `session_id` in the body wins over the query string.
pub async fn post_message(
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
    Json(mut submission): Json<Submission>,
) -> Result<Json<Message>, ApiError> {
    if submission.session_id.as_ref().map_or(true, SessionId::is_blank) {
        submission.session_id = query.selected();
    }
    let accepted = state.api.submit_message(debate_id, submission).await?;
    Ok(Json(accepted.message))
}

/// DELETE /api/debates/:debate_id/messages
pub async fn reset_session(
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let session_id = query.session();
    let removed = state.api.reset_session(debate_id, &session_id).await?;
    Ok(Json(json!({ "session_id": session_id, "removed": removed })))
}

/// GET /api/debates/:debate_id/graph
pub async fn session_graph(
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
) -> Json<SessionSnapshot> {
    Json(state.api.session_graph(debate_id, &query.session()).await)
}

/// GET /api/debates/:debate_id/scores
pub async fn scores(
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
) -> Json<Vec<Score>> {
    Json(state.api.scores(debate_id, &query.session()).await)
}

/// GET /api/debates/:debate_id/suggestions/:target_id
pub async fn suggestions(
    State(state): State<AppState>,
    Path((debate_id, target_id)): Path<(DebateId, MessageId)>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<Value>, ApiError> {
    let suggestions = state
        .api
        .suggestions(debate_id, query.selected().as_ref(), target_id)
        .await?;
    Ok(Json(json!({ "suggestions": suggestions })))
}
