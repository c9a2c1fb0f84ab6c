//! Axum HTTP channel serving the JSON API under `/api/`.
//!
//! `run()` drives the axum event loop; the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown.
//!
//! ```text
//! GET  /api/health
//! POST /api/message
//! POST /api/session
//! GET  /api/session/{session_id}
//! POST /api/session/{session_id}/reports
//! GET  /api/session/{session_id}/reports?type=&status=&min_priority=
//! ```

mod api;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::runtime::{Component, ComponentFuture};

use super::state::AssistantState;

/// Router state injected into every handler. Cheap to clone.
#[derive(Clone)]
pub(crate) struct AxumState {
    pub channel_id: Arc<str>,
    pub assistant: Arc<AssistantState>,
}

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<AssistantState>,
}

impl AxumChannel {
    pub fn new(channel_id: impl Into<String>, bind_addr: impl Into<String>, state: Arc<AssistantState>) -> Self {
        Self { channel_id: channel_id.into(), bind_addr: bind_addr.into(), state }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(self.channel_id, self.bind_addr, self.state, shutdown))
    }
}

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    assistant: Arc<AssistantState>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let app = router(&channel_id, assistant);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "http channel listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "http channel shut down");
    Ok(())
}

/// Build the API router. Public so tests can drive it without a socket.
pub fn router(channel_id: &str, assistant: Arc<AssistantState>) -> Router {
    let state = AxumState { channel_id: Arc::from(channel_id), assistant };
    Router::new()
        .route("/api/health", get(api::health))
        .route("/api/message", post(api::message))
        .route("/api/session", post(api::create_session))
        .route("/api/session/{session_id}", get(api::session_detail))
        .route(
            "/api/session/{session_id}/reports",
            post(api::submit_report).get(api::list_reports),
        )
        .with_state(state)
}
