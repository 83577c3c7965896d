//! WebSocket stream of accepted messages

use super::routes::SessionQuery;
use super::AppState;
use crate::broadcast::Subscription;
use crate::graph::DebateId;
use axum::extract::ws::{Message as Frame, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::interval;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

const PING_EVERY: Duration = Duration::from_secs(30);
const PONG_TIMEOUT: Duration = Duration::from_secs(60);

/// GET /ws/debates/:debate_id
///
/// One text frame per accepted message: the message JSON, carrying its
/// `session_id` and `current_winners`. `?session_id=` narrows the stream.
pub async fn debate_stream(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(debate_id): Path<DebateId>,
    Query(query): Query<SessionQuery>,
) -> impl IntoResponse {
    let connection = Uuid::new_v4();
    let session_id = query.selected();
    info!(%debate_id, %connection, session = ?session_id, "websocket upgrade requested");
    // Subscribe before the handshake completes so no event is missed
    let subscription = state.api.subscribe(debate_id, session_id);
    ws.on_upgrade(move |socket| stream_events(socket, subscription, connection))
}

async fn stream_events(socket: WebSocket, mut subscription: Subscription, connection: Uuid) {
    let (mut sender, mut receiver) = socket.split();
    let mut ping = interval(PING_EVERY);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    warn!(%connection, "websocket client unresponsive, closing");
                    break;
                }
                if sender.send(Frame::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Frame::Close(_))) | None => break,
                    Some(Ok(Frame::Pong(_))) => last_pong = Instant::now(),
                    Some(Ok(Frame::Ping(payload))) => {
                        let _ = sender.send(Frame::Pong(payload)).await;
                    }
                    Some(Ok(_)) => debug!(%connection, "ignoring client frame"),
                    Some(Err(e)) => {
                        error!(%connection, error = %e, "websocket receive error");
                        break;
                    }
                }
            }

            event = subscription.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(e) => {
                        error!(%connection, error = %e, "failed to serialize event");
                        continue;
                    }
                };
                if sender.send(Frame::Text(payload)).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(%connection, debate_id = %subscription.debate_id(), "websocket closed");
}
