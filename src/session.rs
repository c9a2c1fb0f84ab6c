//! Per-user sessions: a conversation plus the reports filed during it.
//!
//! The registry hands out `Arc<Mutex<Session>>` so one session's turns run
//! in order while other sessions proceed independently. Sessions idle past
//! the retention window are evicted by the background pruner.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};
use uuid::Uuid;

use crate::llm::Conversation;
use crate::reports::ReportStore;
use crate::router::{ResponseRouter, RouterReply};

#[derive(Debug)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    /// Last chat turn or report filed; drives idle eviction.
    pub last_active: DateTime<Utc>,
    pub conversation: Conversation,
    pub reports: ReportStore,
}

impl Session {
    pub fn new(id: Uuid, system_prompt: &str) -> Self {
        let conversation = if system_prompt.trim().is_empty() {
            Conversation::without_system()
        } else {
            Conversation::new(system_prompt)
        };
        let now = Utc::now();
        Self { id, created_at: now, last_active: now, conversation, reports: ReportStore::new() }
    }

    pub fn touch(&mut self) {
        self.last_active = Utc::now();
    }

    /// Append `text` as a user turn, route it, and append the reply.
    pub async fn turn(&mut self, router: &ResponseRouter, text: &str, max_tokens: u32) -> RouterReply {
        self.touch();
        self.conversation.push_user(text);
        let reply = router.respond(&self.conversation, max_tokens).await;
        self.conversation.push_assistant(reply.text.clone());
        debug!(session_id = %self.id, provider = %reply.provider, turns = self.conversation.len(), "turn complete");
        reply
    }
}

pub type SharedSession = Arc<Mutex<Session>>;

#[derive(Debug)]
pub struct SessionRegistry {
    system_prompt: String,
    sessions: RwLock<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { system_prompt: system_prompt.into(), sessions: RwLock::new(HashMap::new()) }
    }

    pub async fn create(&self) -> (Uuid, SharedSession) {
        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(Session::new(id, &self.system_prompt)));
        self.sessions.write().await.insert(id, session.clone());
        info!(session_id = %id, "session started");
        (id, session)
    }

    pub async fn get(&self, id: Uuid) -> Option<SharedSession> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Existing session for `id`, or a fresh one when `id` is absent or unknown.
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, SharedSession) {
        if let Some(id) = id {
            if let Some(session) = self.get(id).await {
                return (id, session);
            }
            debug!(session_id = %id, "unknown session id, starting a new session");
        }
        self.create().await
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Prune reports older than `max_age` across every session.
    pub async fn prune_reports(&self, max_age: Duration) -> usize {
        let sessions: Vec<SharedSession> = self.sessions.read().await.values().cloned().collect();
        let mut removed = 0;
        for session in sessions {
            removed += session.lock().await.reports.prune_older_than(max_age);
        }
        removed
    }

    /// Drop sessions with no activity in the last `max_idle`.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        self.evict_idle_before(Utc::now() - max_idle).await
    }

    /// Drop sessions last active before `cutoff`. A session that is locked
    /// mid-turn counts as active and stays.
    pub async fn evict_idle_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(s) => s.last_active >= cutoff,
            Err(_) => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            info!(removed, remaining = sessions.len(), "idle sessions evicted");
        }
        removed
    }
}
