//! REPL session management

use std::io::{self, Write};

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, warn};

use crate::api::{ChatId, ChatMessage, ChatSummary, RemoteStore, Role, Task};
use crate::config::ChatConfig;
use crate::conversation::{ConfirmOutcome, Conversation, ConversationError, Phase, SendOutcome};
use crate::effects::{Notice, NoticeKind, Notifier, Refresher};
use crate::plan::PlanPreview;
use crate::plan::summary::format_deadline;

/// Shown while a request is in flight
const TYPING: &str = "Печатаю...";

/// Prints notices to the terminal
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Success => println!("{} {}", "✓".bright_green(), notice.message.green()),
            NoticeKind::Error => println!("{} {}", "✗".bright_red(), notice.message.red()),
        }
    }
}

/// Interactive REPL session
pub struct ReplSession {
    conversation: Conversation,
    store: RemoteStore,
    chat: ChatConfig,
    preview: Option<PlanPreview>,
}

impl ReplSession {
    /// Create a new REPL session
    pub fn new(conversation: Conversation, store: RemoteStore, chat: ChatConfig) -> Self {
        Self {
            conversation,
            store,
            chat,
            preview: None,
        }
    }

    /// Run the REPL main loop
    pub async fn run(&mut self, initial_message: Option<String>) -> Result<()> {
        self.conversation.open();
        self.print_welcome();
        self.print_messages(0);

        if let Err(e) = self.conversation.refresh_chats().await {
            warn!(error = %e, "run: initial chat list unavailable");
        }

        // If initial message provided, send it first
        if let Some(message) = initial_message {
            println!("{} {}", ">".bright_green(), message);
            self.process_user_input(&message).await;
        }

        // Create readline editor for proper line editing
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;

        loop {
            let readline = rl.readline(&self.prompt());

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }

                    let _ = rl.add_history_entry(input);

                    if input.starts_with('/') {
                        match self.handle_slash_command(input).await {
                            SlashResult::Continue => continue,
                            SlashResult::Quit => break,
                        }
                    } else {
                        self.process_user_input(input).await;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        self.conversation.close();
        println!("Goodbye!");
        Ok(())
    }

    fn prompt(&self) -> String {
        match self.conversation.phase() {
            Phase::AwaitingConfirmation => format!("{} ", "?".bright_yellow()),
            _ => format!("{} ", ">".bright_green()),
        }
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "taskchat".bright_cyan().bold());
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Handle slash commands
    async fn handle_slash_command(&mut self, input: &str) -> SlashResult {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let cmd = parts.first().copied().unwrap_or("");
        debug!(%cmd, "handle_slash_command: called");

        match cmd {
            "/help" | "/h" => self.print_help(),
            "/quit" | "/q" | "/exit" => return SlashResult::Quit,
            "/new" => {
                self.conversation.new_chat();
                self.preview = None;
                println!("{}", "New chat.".dimmed());
                self.print_messages(0);
            }
            "/chats" => self.list_chats().await,
            "/open" => match parts.get(1).map(|s| s.parse::<ChatId>()) {
                Some(Ok(chat_id)) => self.open_chat(chat_id).await,
                _ => println!("{} Usage: /open <id>", "?".yellow()),
            },
            "/confirm" | "/y" => self.confirm().await,
            "/cancel" | "/n" => self.cancel(),
            "/plan" => self.print_plan(),
            "/all" => {
                match self.preview.as_mut() {
                    Some(preview) if preview.can_expand() || preview.is_expanded() => {
                        preview.toggle_expanded();
                    }
                    Some(_) => println!("{}", "Nothing more to show.".dimmed()),
                    None => println!("{}", "No plan pending.".dimmed()),
                }
                self.print_plan();
            }
            "/raw" => {
                if let Some(preview) = self.preview.as_mut() {
                    preview.toggle_raw();
                }
                self.print_plan();
            }
            "/tasks" => self.print_tasks().await,
            "/categories" => self.print_categories().await,
            "/history" => self.print_history(),
            _ => {
                println!("{} Unknown command: {}", "?".yellow(), cmd);
                println!("Type {} for available commands", "/help".yellow());
            }
        }
        SlashResult::Continue
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Show this help", "/help".yellow());
        println!("  {:16} Exit", "/quit".yellow());
        println!("  {:16} Start a new chat", "/new".yellow());
        println!("  {:16} List previous chats", "/chats".yellow());
        println!("  {:16} Open a previous chat", "/open <id>".yellow());
        println!("  {:16} Execute the pending plan", "/confirm".yellow());
        println!("  {:16} Discard the pending plan", "/cancel".yellow());
        println!("  {:16} Show the pending plan", "/plan".yellow());
        println!("  {:16} Show all plan items / collapse", "/all".yellow());
        println!("  {:16} Toggle the raw plan JSON", "/raw".yellow());
        println!("  {:16} Show tasks", "/tasks".yellow());
        println!("  {:16} Show categories", "/categories".yellow());
        println!("  {:16} Show this chat's messages", "/history".yellow());
        println!();
    }

    /// Send a message and print what came back
    async fn process_user_input(&mut self, input: &str) {
        let before = self.conversation.messages().len();
        print_typing();

        match self.conversation.send(input).await {
            Ok(SendOutcome::PlanProposed { items }) => {
                debug!(items, "process_user_input: plan proposed");
                self.preview = self
                    .conversation
                    .pending_plan()
                    .map(|plan| PlanPreview::new(plan, self.chat.preview_limit).with_raw(self.chat.show_raw_plan));
                self.print_plan();
            }
            Ok(SendOutcome::Stale) => {}
            Ok(_) => self.print_new_replies(before),
            Err(ConversationError::AwaitingConfirmation) => {
                println!(
                    "{} Confirm with {} or discard with {} first",
                    "?".yellow(),
                    "/confirm".yellow(),
                    "/cancel".yellow()
                );
            }
            Err(e) => println!("{} {}", "!".yellow(), e),
        }
        println!();
    }

    async fn confirm(&mut self) {
        let before = self.conversation.messages().len();
        print_typing();

        match self.conversation.confirm().await {
            Ok(ConfirmOutcome::Executed(_)) => {
                self.preview = None;
                self.print_new_replies(before);
            }
            Ok(ConfirmOutcome::NotExecuted(_)) => {
                debug!("confirm: not executed, plan kept pending");
                self.print_new_replies(before);
                println!("{}", "The plan is still pending: /confirm to retry, /cancel to discard".dimmed());
            }
            Ok(ConfirmOutcome::Failed(e)) => {
                debug!(error = %e, "confirm: plan kept pending");
                self.print_new_replies(before);
                println!("{}", "The plan is still pending: /confirm to retry, /cancel to discard".dimmed());
            }
            Ok(ConfirmOutcome::Stale) => {}
            Err(e) => println!("{} {}", "!".yellow(), e),
        }
    }

    fn cancel(&mut self) {
        match self.conversation.cancel() {
            Ok(()) => {
                self.preview = None;
                println!("{}", "Plan discarded.".dimmed());
            }
            Err(e) => println!("{} {}", "!".yellow(), e),
        }
    }

    async fn list_chats(&mut self) {
        if let Err(e) = self.conversation.refresh_chats().await {
            println!("{} Failed to load chats: {}", "!".red(), e);
            return;
        }
        let chats = self.conversation.chats();
        if chats.is_empty() {
            println!("{}", "No chats yet.".dimmed());
            return;
        }
        let current = self.conversation.chat_id();
        println!();
        for chat in chats {
            let marker = if Some(chat.id) == current { "*" } else { " " };
            println!("{} {}", marker.bright_green(), format_chat_line(chat));
        }
        println!();
    }

    async fn open_chat(&mut self, chat_id: ChatId) {
        match self.conversation.select_chat(chat_id).await {
            Ok(_) => {
                self.preview = None;
                println!("{}", format!("Chat #{}", chat_id).dimmed());
                self.print_messages(0);
            }
            Err(e) => println!("{} {}", "!".red(), e),
        }
    }

    fn print_plan(&self) {
        let Some(preview) = &self.preview else {
            println!("{}", "No plan pending.".dimmed());
            return;
        };
        println!();
        println!("{}", "Proposed changes:".bright_cyan());
        println!("{}", preview.render());
        println!();
        if preview.can_expand() && !preview.is_expanded() {
            println!("{}", "/all to show every item".dimmed());
        }
        println!(
            "{} to execute, {} to discard",
            "/confirm".bright_green(),
            "/cancel".bright_red()
        );
    }

    async fn print_tasks(&self) {
        if let Err(e) = self.store.load_tasks().await {
            println!("{} Failed to load tasks: {}", "!".red(), e);
            return;
        }
        if let Err(e) = self.store.load_stats().await {
            warn!(error = %e, "print_tasks: stats unavailable");
        }
        let snapshot = self.store.snapshot().await;

        println!();
        if let Some(stats) = &snapshot.stats {
            println!(
                "{}",
                format!(
                    "Всего: {}, выполнено: {}, в работе: {}, просрочено: {} ({:.0}%)",
                    stats.total_tasks,
                    stats.completed_tasks,
                    stats.pending_tasks,
                    stats.overdue_tasks,
                    stats.completion_rate
                )
                .bright_cyan()
            );
        }
        if snapshot.tasks.is_empty() {
            println!("{}", "No tasks.".dimmed());
        }
        for task in &snapshot.tasks {
            let line = format_task_line(task);
            if task.is_done {
                println!("  {}", line.dimmed());
            } else if task.is_overdue {
                println!("  {}", line.red());
            } else {
                println!("  {}", line);
            }
        }
        println!();
    }

    async fn print_categories(&self) {
        if let Err(e) = self.store.load_categories().await {
            println!("{} Failed to load categories: {}", "!".red(), e);
            return;
        }
        let snapshot = self.store.snapshot().await;

        println!();
        if snapshot.categories.is_empty() {
            println!("{}", "No categories.".dimmed());
        }
        for category in &snapshot.categories {
            let count = category.task_count.map(|n| format!(" ({})", n)).unwrap_or_default();
            println!("  #{} {}{}", category.id, category.name.bold(), count.dimmed());
        }
        println!();
    }

    /// Print conversation history
    fn print_history(&self) {
        if self.conversation.messages().is_empty() {
            println!("{}", "No conversation history.".dimmed());
            return;
        }
        println!();
        println!("{}", "Conversation History:".bright_cyan());
        self.print_messages(0);
    }

    fn print_messages(&self, from: usize) {
        for message in self.conversation.messages().iter().skip(from) {
            print_message(message);
        }
    }

    fn print_new_replies(&self, before: usize) {
        for message in self.conversation.messages().iter().skip(before) {
            if message.role == Role::Assistant {
                print_message(message);
            }
        }
    }
}

fn print_typing() {
    print!("{}\r", TYPING.dimmed());
    let _ = io::stdout().flush();
}

fn print_message(message: &ChatMessage) {
    match message.role {
        Role::User => println!("{} {}", "you:".bright_green(), message.content),
        Role::Assistant => println!("{} {}", "ai:".bright_blue(), message.content),
    }
}

/// One line per chat: id, title and last update
pub(crate) fn format_chat_line(chat: &ChatSummary) -> String {
    let title = if chat.title.trim().is_empty() { "(без названия)" } else { chat.title.trim() };
    match chat.updated_at.as_deref().or(chat.created_at.as_deref()) {
        Some(ts) => format!("#{} {} [{}]", chat.id, title, format_deadline(ts)),
        None => format!("#{} {}", chat.id, title),
    }
}

/// One line per task with its flags
pub(crate) fn format_task_line(task: &Task) -> String {
    let mut line = format!("[{}] #{} {}", if task.is_done { "x" } else { " " }, task.id, task.title);
    if let Some(priority) = task.priority {
        line.push_str(&format!(" • {}", priority));
    }
    if let Some(deadline) = &task.deadline {
        line.push_str(&format!(" • {}", format_deadline(deadline)));
    }
    if let Some(category) = &task.category_name {
        line.push_str(&format!(" • {}", category));
    }
    line
}

/// Result of handling a slash command
enum SlashResult {
    Continue,
    Quit,
}
