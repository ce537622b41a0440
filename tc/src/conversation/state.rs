//! Session state owned by the conversation controller

use crate::api::{ChatId, ChatMessage};
use crate::plan::Plan;

use super::GREETING;

/// Where the conversation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No chat loaded
    Idle,
    /// Messages shown, the user may type
    AwaitingInput,
    /// A plan is pending and input is disabled
    AwaitingConfirmation,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::AwaitingInput => write!(f, "awaiting-input"),
            Self::AwaitingConfirmation => write!(f, "awaiting-confirmation"),
        }
    }
}

/// State of one open chat panel
///
/// Lives only as long as the panel; message content is never persisted on
/// the client.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub chat_id: Option<ChatId>,
    pub messages: Vec<ChatMessage>,
    pub pending_plan: Option<Plan>,
    pub requires_confirmation: bool,
    pub last_executed: bool,
    pub loading: bool,
}

impl SessionState {
    /// A new chat seeded with the greeting
    pub fn fresh() -> Self {
        Self::with_messages(None, vec![ChatMessage::assistant(GREETING)])
    }

    /// An existing chat with its fetched history
    pub fn from_history(chat_id: ChatId, messages: Vec<ChatMessage>) -> Self {
        Self::with_messages(Some(chat_id), messages)
    }

    fn with_messages(chat_id: Option<ChatId>, messages: Vec<ChatMessage>) -> Self {
        Self {
            chat_id,
            messages,
            pending_plan: None,
            requires_confirmation: false,
            last_executed: false,
            loading: false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.requires_confirmation && self.pending_plan.is_some() {
            Phase::AwaitingConfirmation
        } else {
            Phase::AwaitingInput
        }
    }

    pub(crate) fn clear_plan(&mut self) {
        self.pending_plan = None;
        self.requires_confirmation = false;
    }
}
