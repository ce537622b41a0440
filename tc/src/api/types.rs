//! Wire types for the assistant endpoints
//!
//! These mirror the JSON bodies of `/tasks/ai/assist/` and `/tasks/ai/chats/`.
//! Plans travel as raw JSON here; [`crate::plan::Plan`] gives the typed view.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Backend-assigned chat identifier
pub type ChatId = i64;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// A single message in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

/// Summary of a persisted conversation thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub updated_at: Option<String>,
}

/// Body of `POST /tasks/ai/assist/`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssistRequest {
    /// User text (empty for confirmations)
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub confirm: bool,

    /// The plan being confirmed, exactly as the backend proposed it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actions: Option<Value>,
}

impl AssistRequest {
    /// A regular chat message
    pub fn message(text: impl Into<String>, chat_id: Option<ChatId>) -> Self {
        let message = text.into();
        debug!(len = message.len(), ?chat_id, "AssistRequest::message: called");
        Self {
            message,
            chat_id,
            confirm: false,
            actions: None,
        }
    }

    /// A confirmation carrying the previously proposed plan verbatim
    pub fn confirm(chat_id: Option<ChatId>, actions: Value) -> Self {
        debug!(?chat_id, "AssistRequest::confirm: called");
        Self {
            message: String::new(),
            chat_id,
            confirm: true,
            actions: Some(actions),
        }
    }
}

/// Response of `POST /tasks/ai/assist/`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistReply {
    #[serde(default)]
    pub reply: Option<String>,

    #[serde(default)]
    pub chat_id: Option<ChatId>,

    /// Proposed plan (only present when nothing was executed)
    #[serde(default)]
    pub plan: Option<Value>,

    #[serde(default)]
    pub requires_confirmation: bool,

    /// Per-kind execution summary lines, e.g. "задач создано: 2"
    #[serde(default, deserialize_with = "null_as_empty")]
    pub created: Vec<String>,

    #[serde(default)]
    pub executed: bool,
}

impl AssistReply {
    /// A plain text answer with no plan attached
    pub fn text(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            ..Default::default()
        }
    }

    /// A proposed plan awaiting confirmation
    pub fn proposal(plan: Value) -> Self {
        Self {
            plan: Some(plan),
            requires_confirmation: true,
            ..Default::default()
        }
    }

    /// A confirm answered with another proposal instead of executing
    pub fn declined_execution(&self) -> bool {
        self.requires_confirmation && !self.executed
    }

    /// Reply text with surrounding whitespace removed, if there is any
    pub fn reply_text(&self) -> Option<&str> {
        self.reply.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Body of `GET /tasks/ai/chats/`
#[derive(Debug, Deserialize)]
pub(crate) struct ChatList {
    #[serde(default)]
    pub chats: Vec<ChatSummary>,
}

/// Body of `GET /tasks/ai/chats/{id}/`
#[derive(Debug, Deserialize)]
pub(crate) struct ChatHistory {
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
