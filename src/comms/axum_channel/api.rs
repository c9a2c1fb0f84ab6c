//! Handlers for `/api/*` routes.
//!
//! Errors are JSON bodies of the form `{"error": code, "message": text}`.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::reports::{ReportFilter, ReportSubmission};

use super::AxumState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct MessageRequest {
    message: String,
    session_id: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct ReportQuery {
    #[serde(rename = "type")]
    kind: Option<String>,
    status: Option<String>,
    min_priority: Option<String>,
}

impl ReportQuery {
    fn into_filter(self) -> Result<ReportFilter, AppError> {
        fn parse<T: std::str::FromStr<Err = AppError>>(v: Option<String>) -> Result<Option<T>, AppError> {
            v.filter(|s| !s.trim().is_empty()).map(|s| s.parse()).transpose()
        }
        Ok(ReportFilter {
            kind: parse(self.kind)?,
            status: parse(self.status)?,
            min_priority: parse(self.min_priority)?,
        })
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn error_response(e: AppError) -> Response {
    match e {
        AppError::UnknownSession(_) => (StatusCode::NOT_FOUND, json_error("not_found", e)).into_response(),
        AppError::Report(_) | AppError::Comms(_) => {
            (StatusCode::BAD_REQUEST, json_error("bad_request", e)).into_response()
        }
        other => (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", other)).into_response(),
    }
}

/// Body or query strings that fail to deserialise.
fn rejected(channel_id: &str, detail: String) -> Response {
    debug!(%channel_id, "request rejected: {detail}");
    error_response(AppError::Comms(detail))
}

/// Unparseable ids are treated like ids that were never issued.
fn parse_session_id(raw: &str) -> Result<Uuid, Response> {
    Uuid::parse_str(raw).map_err(|_| error_response(AppError::UnknownSession(raw.to_string())))
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let body = json!({
        "status": "ok",
        "name": state.assistant.name(),
        "providers": state.assistant.provider_labels(),
        "sessions": state.assistant.sessions().len().await,
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/message
pub(super) async fn message(
    State(state): State<AxumState>,
    body: Result<Json<MessageRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(&state.channel_id, rejection.body_text()),
    };
    let session_id = req.session_id.as_deref().and_then(|s| Uuid::parse_str(s).ok());

    match state.assistant.send_message(session_id, &req.message).await {
        Ok((session_id, reply)) => {
            debug!(channel_id = %state.channel_id, %session_id, provider = %reply.provider, "message answered");
            let body = json!({
                "session_id": session_id,
                "reply": reply.text,
                "provider": reply.provider,
                "warnings": reply.warnings,
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            warn!(channel_id = %state.channel_id, "message rejected: {e}");
            error_response(e)
        }
    }
}

/// POST /api/session
///
/// Opens an empty session so reports can be filed before any chat.
pub(super) async fn create_session(State(state): State<AxumState>) -> Response {
    let session_id = state.assistant.open_session().await;
    match state.assistant.snapshot(session_id).await {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /api/session/{session_id}
pub(super) async fn session_detail(State(state): State<AxumState>, Path(raw): Path<String>) -> Response {
    let session_id = match parse_session_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match state.assistant.snapshot(session_id).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /api/session/{session_id}/reports
pub(super) async fn submit_report(
    State(state): State<AxumState>,
    Path(raw): Path<String>,
    body: Result<Json<ReportSubmission>, JsonRejection>,
) -> Response {
    let session_id = match parse_session_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Json(submission) = match body {
        Ok(body) => body,
        Err(rejection) => return rejected(&state.channel_id, rejection.body_text()),
    };
    match state.assistant.submit_report(session_id, submission).await {
        Ok(report) => (StatusCode::CREATED, Json(report)).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, %session_id, "report rejected: {e}");
            error_response(e)
        }
    }
}

/// GET /api/session/{session_id}/reports
pub(super) async fn list_reports(
    State(state): State<AxumState>,
    Path(raw): Path<String>,
    query: Result<Query<ReportQuery>, QueryRejection>,
) -> Response {
    let session_id = match parse_session_id(&raw) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return rejected(&state.channel_id, rejection.body_text()),
    };
    let filter = match query.into_filter() {
        Ok(f) => f,
        Err(e) => return error_response(e),
    };
    match state.assistant.list_reports(session_id, &filter).await {
        Ok(reports) => {
            let body = json!({ "session_id": session_id, "reports": reports });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => error_response(e),
    }
}
