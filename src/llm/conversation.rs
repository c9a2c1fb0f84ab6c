//! Role-tagged message sequence exchanged with providers.
//!
//! A [`Conversation`] is append-only. Its system instruction, when present,
//! is always element zero and there is no way to replace or remove it.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Start a conversation with a fixed system instruction.
    pub fn new(system_prompt: impl Into<String>) -> Self {
        Self { messages: vec![Message::system(system_prompt)] }
    }

    /// Start a conversation without a system instruction.
    pub fn without_system() -> Self {
        Self::default()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    pub fn system(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Content of the most recent user turn.
    pub fn latest_user(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// The system instruction plus at most `cap` of the newest turns.
    ///
    /// `cap == 0` means unbounded. The kept turns always open on a user
    /// message; an assistant reply whose question fell outside the cap is
    /// dropped too.
    pub fn window(&self, cap: usize) -> Vec<Message> {
        let (head, turns) = match self.messages.first() {
            Some(first) if first.role == Role::System => (Some(first), &self.messages[1..]),
            _ => (None, &self.messages[..]),
        };
        let cut = if cap == 0 { 0 } else { turns.len().saturating_sub(cap) };
        let skip = turns[cut..]
            .iter()
            .position(|m| m.role == Role::User)
            .map_or(cut, |offset| cut + offset);
        head.into_iter().chain(turns[skip..].iter()).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
