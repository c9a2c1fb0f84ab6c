//! Shared state handed to every channel.
//!
//! Channels hold an `Arc<AssistantState>` and only use the typed methods
//! below; the router and session registry stay private.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppError;
use crate::llm::Message;
use crate::reports::{IncidentReport, ReportFilter, ReportSubmission};
use crate::router::{ResponseRouter, RouterReply};
use crate::session::{SessionRegistry, SharedSession};

/// Read-only view of a session for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub messages: Vec<Message>,
    pub report_count: usize,
}

pub struct AssistantState {
    name: String,
    max_tokens: u32,
    router: ResponseRouter,
    sessions: Arc<SessionRegistry>,
}

impl AssistantState {
    pub fn new(name: impl Into<String>, max_tokens: u32, router: ResponseRouter, sessions: Arc<SessionRegistry>) -> Self {
        Self { name: name.into(), max_tokens, router, sessions }
    }

    pub fn from_config(config: &Config, sessions: Arc<SessionRegistry>) -> Self {
        Self::new(
            config.assistant.name.clone(),
            config.assistant.max_tokens,
            ResponseRouter::from_config(config),
            sessions,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn provider_labels(&self) -> Vec<&str> {
        self.router.provider_labels()
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub async fn open_session(&self) -> Uuid {
        self.sessions.create().await.0
    }

    /// `session_id` if it is still registered, otherwise a fresh session.
    pub async fn resume_session(&self, session_id: Uuid) -> Uuid {
        self.sessions.get_or_create(Some(session_id)).await.0
    }

    /// Route one user turn. An absent or unknown `session_id` starts a new
    /// session; the id actually used is returned with the reply.
    pub async fn send_message(&self, session_id: Option<Uuid>, text: &str) -> Result<(Uuid, RouterReply), AppError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::Comms("message must not be empty".into()));
        }
        let (id, session) = self.sessions.get_or_create(session_id).await;
        let reply = session.lock().await.turn(&self.router, text, self.max_tokens).await;
        debug!(session_id = %id, provider = %reply.provider, "reply routed");
        Ok((id, reply))
    }

    pub async fn snapshot(&self, session_id: Uuid) -> Result<SessionSnapshot, AppError> {
        let session = self.session(session_id).await?;
        let s = session.lock().await;
        Ok(SessionSnapshot {
            session_id,
            created_at: s.created_at,
            messages: s.conversation.messages().to_vec(),
            report_count: s.reports.len(),
        })
    }

    pub async fn submit_report(&self, session_id: Uuid, submission: ReportSubmission) -> Result<IncidentReport, AppError> {
        let session = self.session(session_id).await?;
        let mut s = session.lock().await;
        let report = s.reports.submit(submission)?;
        s.touch();
        Ok(report)
    }

    pub async fn list_reports(&self, session_id: Uuid, filter: &ReportFilter) -> Result<Vec<IncidentReport>, AppError> {
        let session = self.session(session_id).await?;
        let s = session.lock().await;
        Ok(s.reports.list(filter))
    }

    async fn session(&self, id: Uuid) -> Result<SharedSession, AppError> {
        self.sessions
            .get(id)
            .await
            .ok_or_else(|| AppError::UnknownSession(id.to_string()))
    }
}
