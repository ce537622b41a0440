//! Interactive chat REPL
//!
//! Drives a [`Conversation`] from the terminal: plain lines are sent to the
//! assistant, slash commands confirm or cancel plans and switch chats.

mod session;

pub use session::{ConsoleNotifier, ReplSession};

use std::sync::Arc;

use eyre::Result;
use tracing::info;

use crate::api::{ApiClient, RemoteStore};
use crate::config::Config;
use crate::conversation::Conversation;
use crate::effects::EffectPropagator;

/// Run the interactive REPL
///
/// This is the main entry point for `tc chat`.
pub async fn run_interactive(config: &Config, initial_message: Option<String>) -> Result<()> {
    // Validate token early
    config.validate()?;

    let client = ApiClient::from_config(&config.api).map_err(|e| eyre::eyre!("Failed to create API client: {}", e))?;
    info!(base_url = %client.base_url(), "Starting chat");

    let store = RemoteStore::new(client.clone());
    let effects = EffectPropagator::new(Arc::new(store.clone()), Arc::new(ConsoleNotifier));
    let conversation = Conversation::new(Arc::new(client), effects);

    let mut session = ReplSession::new(conversation, store, config.chat.clone());
    session.run(initial_message).await
}
