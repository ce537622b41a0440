//! taskchat - assistant chat client for the task manager
//!
//! The assistant answers free-form requests and, when a request would change
//! data, proposes a plan instead of acting. Nothing is executed until the user
//! confirms, and the confirmation carries back exactly the plan that was shown.
//!
//! # Modules
//!
//! - [`api`] - Chat transport trait, HTTP client and task store client
//! - [`plan`] - Typed plan model and the human-readable summary
//! - [`conversation`] - Session state machine with the confirmation gate
//! - [`effects`] - Refresh and notification after an executed plan
//! - [`repl`] - Interactive chat
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod api;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod effects;
pub mod plan;
pub mod repl;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary, ChatTransport, Role};
pub use config::{ApiConfig, ChatConfig, Config};
pub use conversation::{ConfirmOutcome, Conversation, ConversationError, Phase, SendOutcome, SessionState};
pub use effects::{EffectPropagator, Notice, NoticeKind, Notifier, Refresher};
pub use plan::{Plan, PlanPreview, PlanSummary, summarize};
