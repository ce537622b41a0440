//! ChatTransport trait definition

use async_trait::async_trait;
use tracing::debug;

use super::{ApiError, AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary};
use crate::plan::Plan;

/// Transport for the assistant endpoints
///
/// Every operation reports failure through [`ApiError`]; callers treat any
/// error as a recoverable, user-visible condition.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Post a message (or a confirmation) to the assistant
    async fn send_message(&self, request: AssistRequest) -> Result<AssistReply, ApiError>;

    /// List chat summaries, most recent first
    async fn list_chats(&self) -> Result<Vec<ChatSummary>, ApiError>;

    /// Fetch the full message history of a chat
    async fn get_chat_messages(&self, chat_id: ChatId) -> Result<Vec<ChatMessage>, ApiError>;

    /// Ask the backend to execute a plan it proposed earlier
    ///
    /// The plan goes back exactly as it was received.
    async fn confirm_plan(&self, chat_id: Option<ChatId>, plan: &Plan) -> Result<AssistReply, ApiError> {
        debug!(?chat_id, items = plan.total_items(), "confirm_plan: called");
        self.send_message(AssistRequest::confirm(chat_id, plan.raw().clone()))
            .await
    }
}
