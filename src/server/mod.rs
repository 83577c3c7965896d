//! HTTP and WebSocket transport
//!
//! Thin axum layer over [`DebateApi`]: every handler parses its request,
//! makes one API call and renders the result.

mod routes;
mod ws;

use crate::api::DebateApi;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared state of every handler
#[derive(Clone)]
pub struct AppState {
    pub api: DebateApi,
}

/// Build the router for `api`
pub fn router(api: DebateApi) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route(
            "/api/debates",
            get(routes::list_debates).post(routes::create_debate),
        )
        .route(
            "/api/debates/:debate_id/messages",
            get(routes::list_messages)
                .post(routes::post_message)
                .delete(routes::reset_session),
        )
        .route("/api/debates/:debate_id/graph", get(routes::session_graph))
        .route("/api/debates/:debate_id/scores", get(routes::scores))
        .route(
            "/api/debates/:debate_id/suggestions/:target_id",
            get(routes::suggestions),
        )
        .route("/ws/debates/:debate_id", get(ws::debate_stream))
        .with_state(AppState { api })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serve `api` on `addr` until Ctrl-C
pub async fn serve(api: DebateApi, addr: SocketAddr) -> std::io::Result<()> {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "failed to bind");
            return Err(e);
        }
    };
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router(api))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("HTTP server received shutdown signal");
        })
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}
