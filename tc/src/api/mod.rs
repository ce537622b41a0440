//! Backend API module
//!
//! Provides the chat transport used by the conversation controller and the
//! store client used to refresh task data after a plan is executed.

pub mod client;
mod error;
mod http;
pub mod store;
mod types;

pub use client::ChatTransport;
pub use error::ApiError;
pub use http::ApiClient;
pub use store::{Category, RemoteStore, StoreSnapshot, Task, TaskStats};
pub use types::{AssistReply, AssistRequest, ChatId, ChatMessage, ChatSummary, Role};
