//! Conversation controller for the assistant chat
//!
//! Owns the session state (messages, active chat, pending plan) and drives the
//! confirmation gate: a proposed plan is only executed after an explicit
//! confirm, and only the exact plan the backend proposed.

mod machine;
mod state;

pub use machine::{ConfirmOutcome, ConfirmTicket, Conversation, SendOutcome, SendTicket};
pub use state::{Phase, SessionState};

use thiserror::Error;

use crate::api::{ApiError, ChatId};

/// First assistant message of every new chat
pub const GREETING: &str = "Привет! Я помогу с задачами: приоритеты, дедлайны, разбиение на шаги. Чем помочь?";

/// Shown when a message could not be delivered
pub const SEND_FALLBACK: &str = "Извините, сервис ИИ сейчас недоступен.";

/// Shown when a confirmed plan could not be executed
pub const CONFIRM_FAILED: &str = "Не удалось выполнить изменения.";

/// Used when the backend confirms execution without any text
pub const EXECUTED_DEFAULT: &str = "Изменения выполнены.";

/// Rejected transitions
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("Chat panel is not open")]
    NotOpen,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("A request is already in flight")]
    Busy,

    #[error("A plan is awaiting confirmation; confirm or cancel it first")]
    AwaitingConfirmation,

    #[error("There is no plan to confirm")]
    NothingToConfirm,

    #[error("Failed to load chat {chat_id}: {source}")]
    History {
        chat_id: ChatId,
        #[source]
        source: ApiError,
    },
}
