//! Conversation state machine
//!
//! Mutating operations are two-phase: `begin_*` validates the transition,
//! applies the optimistic part and returns a ticket; `finish_*` reconciles the
//! ticket with the transport result. A ticket whose epoch no longer matches
//! (the chat was switched, reset or closed meanwhile) is discarded.
//! `send` and `confirm` run both phases around the transport call.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{CONFIRM_FAILED, ConversationError, EXECUTED_DEFAULT, Phase, SEND_FALLBACK, SessionState};
use crate::api::{ApiError, AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary, ChatTransport};
use crate::effects::EffectPropagator;
use crate::plan::Plan;

/// In-flight message send
#[derive(Debug, Clone)]
pub struct SendTicket {
    epoch: u64,
    request: AssistRequest,
}

impl SendTicket {
    pub fn request(&self) -> &AssistRequest {
        &self.request
    }
}

/// In-flight plan confirmation
#[derive(Debug, Clone)]
pub struct ConfirmTicket {
    epoch: u64,
    chat_id: Option<ChatId>,
    plan: Plan,
}

impl ConfirmTicket {
    pub fn chat_id(&self) -> Option<ChatId> {
        self.chat_id
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }
}

/// Result of a send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The assistant answered in text (possibly nothing)
    Replied,
    /// A non-empty plan is now awaiting confirmation
    PlanProposed { items: usize },
    /// Transport failed; the fallback message was appended
    Failed,
    /// The session changed while the request was in flight
    Stale,
}

/// Result of a confirmation
#[derive(Debug)]
pub enum ConfirmOutcome {
    Executed(AssistReply),
    /// The backend answered but did not run the plan
    NotExecuted(AssistReply),
    Failed(ApiError),
    Stale,
}

/// Controller for one chat panel
pub struct Conversation {
    transport: Arc<dyn ChatTransport>,
    effects: EffectPropagator,
    session: Option<SessionState>,
    chats: Vec<ChatSummary>,
    epoch: u64,
}

impl Conversation {
    /// Create a controller with the panel closed
    pub fn new(transport: Arc<dyn ChatTransport>, effects: EffectPropagator) -> Self {
        Self {
            transport,
            effects,
            session: None,
            chats: Vec::new(),
            epoch: 0,
        }
    }

    pub fn session(&self) -> Option<&SessionState> {
        self.session.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.session.as_ref().map_or(Phase::Idle, SessionState::phase)
    }

    pub fn chat_id(&self) -> Option<ChatId> {
        self.session.as_ref().and_then(|s| s.chat_id)
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.session.as_ref().map(|s| s.messages.as_slice()).unwrap_or_default()
    }

    pub fn pending_plan(&self) -> Option<&Plan> {
        self.session.as_ref().and_then(|s| s.pending_plan.as_ref())
    }

    pub fn is_loading(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.loading)
    }

    /// Chat summaries from the last successful refresh
    pub fn chats(&self) -> &[ChatSummary] {
        &self.chats
    }

    /// Current session epoch; bumped whenever the session is replaced
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn replace_session(&mut self, session: Option<SessionState>) {
        self.epoch += 1;
        self.session = session;
        debug!(epoch = self.epoch, "replace_session: session replaced");
    }

    /// Open the panel with a fresh chat; no-op when already open
    pub fn open(&mut self) {
        debug!("open: called");
        if self.session.is_none() {
            self.replace_session(Some(SessionState::fresh()));
        }
    }

    /// Close the panel and drop the session
    pub fn close(&mut self) {
        debug!("close: called");
        self.replace_session(None);
    }

    /// Start over with an empty chat
    pub fn new_chat(&mut self) {
        debug!(previous = ?self.chat_id(), "new_chat: called");
        self.replace_session(Some(SessionState::fresh()));
    }

    /// Load an existing chat, replacing the current session
    ///
    /// On failure the current session is left untouched.
    pub async fn select_chat(&mut self, chat_id: ChatId) -> Result<usize, ConversationError> {
        debug!(%chat_id, "select_chat: called");
        let messages = self
            .transport
            .get_chat_messages(chat_id)
            .await
            .map_err(|source| {
                warn!(%chat_id, error = %source, "select_chat: failed to load history");
                ConversationError::History { chat_id, source }
            })?;

        let count = messages.len();
        self.replace_session(Some(SessionState::from_history(chat_id, messages)));
        info!(%chat_id, count, "Loaded chat");
        Ok(count)
    }

    /// Re-fetch the chat list; failures keep the previous list
    pub async fn refresh_chats(&mut self) -> Result<usize, ApiError> {
        debug!("refresh_chats: called");
        match self.transport.list_chats().await {
            Ok(chats) => {
                self.chats = chats;
                Ok(self.chats.len())
            }
            Err(e) => {
                warn!(error = %e, "refresh_chats: failed to list chats");
                Err(e)
            }
        }
    }

    /// Phase one of a send: validate, append the user message, mark loading
    pub fn begin_send(&mut self, text: &str) -> Result<SendTicket, ConversationError> {
        let epoch = self.epoch;
        let session = self.session.as_mut().ok_or(ConversationError::NotOpen)?;
        let text = text.trim();
        debug!(len = text.len(), loading = session.loading, "begin_send: called");

        if session.loading {
            return Err(ConversationError::Busy);
        }
        if session.phase() == Phase::AwaitingConfirmation {
            return Err(ConversationError::AwaitingConfirmation);
        }
        if text.is_empty() {
            return Err(ConversationError::EmptyMessage);
        }

        session.messages.push(ChatMessage::user(text));
        session.loading = true;
        session.last_executed = false;

        Ok(SendTicket {
            epoch,
            request: AssistRequest::message(text, session.chat_id),
        })
    }

    /// Phase two of a send: reconcile with the transport result
    pub fn finish_send(&mut self, ticket: SendTicket, result: Result<AssistReply, ApiError>) -> SendOutcome {
        if ticket.epoch != self.epoch {
            debug!(ticket_epoch = ticket.epoch, epoch = self.epoch, "finish_send: stale response discarded");
            return SendOutcome::Stale;
        }
        let Some(session) = self.session.as_mut() else {
            return SendOutcome::Stale;
        };
        session.loading = false;

        let reply = match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "finish_send: transport failed");
                session.messages.push(ChatMessage::assistant(SEND_FALLBACK));
                return SendOutcome::Failed;
            }
        };

        if session.chat_id.is_none()
            && let Some(chat_id) = reply.chat_id
        {
            debug!(%chat_id, "finish_send: adopting chat id");
            session.chat_id = Some(chat_id);
        }

        if let Some(plan) = proposed_plan(&reply) {
            let items = plan.total_items();
            debug!(items, "finish_send: plan awaiting confirmation");
            session.pending_plan = Some(plan);
            session.requires_confirmation = true;
            return SendOutcome::PlanProposed { items };
        }

        if let Some(text) = reply.reply_text() {
            session.messages.push(ChatMessage::assistant(text));
        }
        SendOutcome::Replied
    }

    /// Send a message and reconcile the reply
    pub async fn send(&mut self, text: &str) -> Result<SendOutcome, ConversationError> {
        let ticket = self.begin_send(text)?;
        let had_chat = ticket.request.chat_id.is_some();

        let result = self.transport.send_message(ticket.request.clone()).await;
        let outcome = self.finish_send(ticket, result);

        if !had_chat && outcome != SendOutcome::Stale && self.chat_id().is_some() {
            // A new chat was created on the backend
            let _ = self.refresh_chats().await;
        }
        Ok(outcome)
    }

    /// Phase one of a confirmation: validate and mark loading
    pub fn begin_confirm(&mut self) -> Result<ConfirmTicket, ConversationError> {
        let epoch = self.epoch;
        let session = self.session.as_mut().ok_or(ConversationError::NotOpen)?;
        debug!(loading = session.loading, "begin_confirm: called");

        if session.loading {
            return Err(ConversationError::Busy);
        }
        let plan = match (&session.pending_plan, session.requires_confirmation) {
            (Some(plan), true) => plan.clone(),
            _ => return Err(ConversationError::NothingToConfirm),
        };

        session.loading = true;
        Ok(ConfirmTicket {
            epoch,
            chat_id: session.chat_id,
            plan,
        })
    }

    /// Phase two of a confirmation
    ///
    /// On failure the plan stays pending so the user can retry or cancel.
    pub fn finish_confirm(&mut self, ticket: ConfirmTicket, result: Result<AssistReply, ApiError>) -> ConfirmOutcome {
        if ticket.epoch != self.epoch {
            debug!(ticket_epoch = ticket.epoch, epoch = self.epoch, "finish_confirm: stale response discarded");
            return ConfirmOutcome::Stale;
        }
        let Some(session) = self.session.as_mut() else {
            return ConfirmOutcome::Stale;
        };
        session.loading = false;

        match result {
            Ok(reply) if reply.declined_execution() => {
                warn!(chat_id = ?reply.chat_id, "finish_confirm: backend did not execute, plan kept pending");
                let text = reply.reply_text().unwrap_or(CONFIRM_FAILED);
                session.messages.push(ChatMessage::assistant(text));
                ConfirmOutcome::NotExecuted(reply)
            }
            Ok(reply) => {
                let text = reply.reply_text().unwrap_or(EXECUTED_DEFAULT);
                session.messages.push(ChatMessage::assistant(text));
                session.clear_plan();
                session.last_executed = true;
                if session.chat_id.is_none() {
                    session.chat_id = reply.chat_id;
                }
                info!(items = ticket.plan.total_items(), "Plan executed");
                ConfirmOutcome::Executed(reply)
            }
            Err(e) => {
                warn!(error = %e, "finish_confirm: execution failed, plan kept pending");
                session.messages.push(ChatMessage::assistant(CONFIRM_FAILED));
                ConfirmOutcome::Failed(e)
            }
        }
    }

    /// Execute the pending plan, then refresh and notify
    pub async fn confirm(&mut self) -> Result<ConfirmOutcome, ConversationError> {
        let ticket = self.begin_confirm()?;
        let result = self.transport.confirm_plan(ticket.chat_id, &ticket.plan).await;
        let outcome = self.finish_confirm(ticket, result);
        self.apply_effects(&outcome).await;
        Ok(outcome)
    }

    /// Run the side effects of a confirmation outcome
    pub async fn apply_effects(&self, outcome: &ConfirmOutcome) {
        match outcome {
            ConfirmOutcome::Executed(reply) => {
                self.effects.on_executed(reply).await;
            }
            ConfirmOutcome::NotExecuted(_) => {
                self.effects.on_not_executed();
            }
            ConfirmOutcome::Failed(e) => {
                self.effects.on_failed(e);
            }
            ConfirmOutcome::Stale => {}
        }
    }

    /// Drop the pending plan without contacting the backend
    pub fn cancel(&mut self) -> Result<(), ConversationError> {
        let session = self.session.as_mut().ok_or(ConversationError::NotOpen)?;
        debug!(loading = session.loading, "cancel: called");

        if session.phase() != Phase::AwaitingConfirmation {
            return Err(ConversationError::NothingToConfirm);
        }
        if session.loading {
            return Err(ConversationError::Busy);
        }
        session.clear_plan();
        Ok(())
    }
}

/// The plan a reply asks to confirm, if it has anything in it
fn proposed_plan(reply: &AssistReply) -> Option<Plan> {
    if !reply.requires_confirmation {
        return None;
    }
    let raw = reply.plan.clone()?;
    match Plan::from_value(raw) {
        Ok(plan) if !plan.is_empty() => Some(plan),
        Ok(_) => {
            debug!("proposed_plan: empty plan ignored");
            None
        }
        Err(e) => {
            warn!(error = %e, "proposed_plan: unusable plan ignored");
            None
        }
    }
}
