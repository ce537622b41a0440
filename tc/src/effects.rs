//! Side effects of an executed plan
//!
//! After the backend applies a confirmed plan, the task data shown elsewhere
//! is stale and the user should hear about the result. Both happen here and
//! neither can fail the chat flow.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::{ApiError, AssistReply};
use crate::conversation::{CONFIRM_FAILED, EXECUTED_DEFAULT};

/// Re-fetches task data after a mutation
#[async_trait]
pub trait Refresher: Send + Sync {
    async fn load_tasks(&self) -> Result<(), ApiError>;
    async fn load_categories(&self) -> Result<(), ApiError>;
    async fn load_stats(&self) -> Result<(), ApiError>;
}

/// Notice severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
}

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            message: message.into(),
        }
    }
}

/// Fire-and-forget feedback channel
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Success text for an executed plan
///
/// Prefers the backend's per-kind summary, then the reply text.
pub fn execution_message(reply: &AssistReply) -> String {
    let created: Vec<&str> = reply
        .created
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if !created.is_empty() {
        return created.join("; ");
    }
    reply.reply_text().unwrap_or(EXECUTED_DEFAULT).to_string()
}

/// Runs refresh and notification after confirmation
#[derive(Clone)]
pub struct EffectPropagator {
    refresher: Arc<dyn Refresher>,
    notifier: Arc<dyn Notifier>,
}

impl EffectPropagator {
    pub fn new(refresher: Arc<dyn Refresher>, notifier: Arc<dyn Notifier>) -> Self {
        Self { refresher, notifier }
    }

    /// Refresh the store and announce success
    ///
    /// Each refresh is attempted even if an earlier one failed; failures are
    /// only logged.
    pub async fn on_executed(&self, reply: &AssistReply) -> Notice {
        debug!(created = reply.created.len(), "on_executed: called");

        if let Err(e) = self.refresher.load_tasks().await {
            warn!(error = %e, "on_executed: failed to reload tasks");
        }
        if let Err(e) = self.refresher.load_categories().await {
            warn!(error = %e, "on_executed: failed to reload categories");
        }
        if let Err(e) = self.refresher.load_stats().await {
            warn!(error = %e, "on_executed: failed to reload stats");
        }

        let notice = Notice::success(execution_message(reply));
        self.notifier.notify(notice.clone());
        notice
    }

    /// Announce a confirmation the backend answered without executing
    pub fn on_not_executed(&self) -> Notice {
        debug!("on_not_executed: called");
        let notice = Notice::error(CONFIRM_FAILED);
        self.notifier.notify(notice.clone());
        notice
    }

    /// Announce a failed execution
    pub fn on_failed(&self, error: &ApiError) -> Notice {
        debug!(%error, "on_failed: called");
        let notice = Notice::error(CONFIRM_FAILED);
        self.notifier.notify(notice.clone());
        notice
    }
}
