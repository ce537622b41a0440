//! taskchat - assistant chat for the task manager
//!
//! CLI entry point: interactive chat, chat listing and history.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use taskchat::api::{ApiClient, ChatId, ChatTransport, Role};
use taskchat::cli::{Cli, Command, OutputFormat, get_log_path};
use taskchat::config::Config;
use taskchat::plan::summary::format_deadline;
use taskchat::repl;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    let log_dir = log_path.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("taskchat loaded config: base_url={}", config.api.base_url);

    match cli.command {
        Some(Command::Chat { message }) => repl::run_interactive(&config, message).await,
        Some(Command::Chats { format }) => cmd_chats(&config, format).await,
        Some(Command::Show { chat_id, format }) => cmd_show(&config, chat_id, format).await,
        None => repl::run_interactive(&config, None).await,
    }
}

fn client(config: &Config) -> Result<ApiClient> {
    config.validate()?;
    ApiClient::from_config(&config.api).context("Failed to create API client")
}

/// List previous chats
async fn cmd_chats(config: &Config, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_chats: called");
    let chats = client(config)?.list_chats().await.context("Failed to list chats")?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&chats)?),
        OutputFormat::Text => {
            if chats.is_empty() {
                println!("No chats yet");
            }
            for chat in &chats {
                let updated = chat
                    .updated_at
                    .as_deref()
                    .map(format_deadline)
                    .unwrap_or_default();
                println!("{:>6}  {:<40}  {}", chat.id, chat.title, updated.dimmed());
            }
        }
    }
    Ok(())
}

/// Print a chat's history
async fn cmd_show(config: &Config, chat_id: ChatId, format: OutputFormat) -> Result<()> {
    debug!(%chat_id, %format, "cmd_show: called");
    let messages = client(config)?
        .get_chat_messages(chat_id)
        .await
        .context(format!("Failed to load chat {}", chat_id))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&messages)?),
        OutputFormat::Text => {
            for message in &messages {
                let role = match message.role {
                    Role::User => "you:".bright_green(),
                    Role::Assistant => "ai:".bright_blue(),
                };
                println!("{} {}", role, message.content);
            }
        }
    }
    Ok(())
}
