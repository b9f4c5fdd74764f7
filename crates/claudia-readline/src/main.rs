use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use claudia_application::{SessionController, StatusPoller};
use claudia_backend::{ClaudiaConfig, HttpBackend};
use claudia_core::BackendStatus;
use claudia_core::conversation::{DeliveryStatus, Message, MessageRole};

/// CLI helper for rustyline that provides completion, highlighting, and hints.
#[derive(Clone)]
struct CliHelper {
    commands: Vec<String>,
}

impl CliHelper {
    fn new() -> Self {
        Self {
            commands: vec![
                "/new".to_string(),
                "/list".to_string(),
                "/open".to_string(),
                "/delete".to_string(),
                "/status".to_string(),
                "/rate".to_string(),
                "/help".to_string(),
            ],
        }
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line = &line[..pos];

        if line.starts_with('/') {
            let candidates: Vec<Pair> = self
                .commands
                .iter()
                .filter(|cmd| cmd.starts_with(line))
                .map(|cmd| Pair {
                    display: cmd.clone(),
                    replacement: cmd.clone(),
                })
                .collect();
            Ok((0, candidates))
        } else {
            Ok((0, vec![]))
        }
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if line.starts_with('/') {
            Owned(line.bright_cyan().to_string())
        } else {
            Borrowed(line)
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        let line = &line[..pos];

        if line.starts_with('/') && !line.contains(' ') {
            self.commands
                .iter()
                .find(|cmd| cmd.starts_with(line) && cmd.len() > line.len())
                .map(|cmd| cmd[line.len()..].to_string())
        } else {
            None
        }
    }
}

impl Validator for CliHelper {}

fn status_badge(status: BackendStatus) -> String {
    let label = format!("[{}]", status);
    match status {
        BackendStatus::Online => label.bright_green().to_string(),
        BackendStatus::Demo => label.bright_blue().to_string(),
        BackendStatus::Connecting => label.bright_yellow().to_string(),
        BackendStatus::Offline => label.bright_red().to_string(),
    }
}

fn render_message(message: &Message) {
    match message.role {
        MessageRole::User => {
            println!("{}", format!("> {}", message.content).green());
        }
        MessageRole::Assistant => {
            for line in message.content.lines() {
                println!("{}", line.bright_blue());
            }
            let mut tags = Vec::new();
            if let Some(model) = &message.metadata.model {
                tags.push(model.clone());
            }
            match message.metadata.status {
                DeliveryStatus::Demo => tags.push("demo".to_string()),
                DeliveryStatus::Error => tags.push("error".to_string()),
                DeliveryStatus::Ok => {}
            }
            if !tags.is_empty() {
                println!("{}", format!("  ({})", tags.join(", ")).bright_black());
            }
        }
    }
}

fn print_help() {
    println!("{}", "Commands:".bright_yellow());
    println!("{}", "  /new           start a new conversation".bright_black());
    println!("{}", "  /list          list conversations".bright_black());
    println!("{}", "  /open <n>      open conversation n from the list".bright_black());
    println!("{}", "  /delete <n>    delete conversation n from the list".bright_black());
    println!("{}", "  /status        show backend status".bright_black());
    println!("{}", "  /rate <1-5>    rate Claudia's last reply".bright_black());
    println!("{}", "  quit           exit".bright_black());
    println!("{}", "Anything else is sent to Claudia as a message.".bright_black());
}

async fn print_conversations(controller: &SessionController) {
    let conversations = controller.conversations().await;
    if conversations.is_empty() {
        println!("{}", "No conversations yet. Start one with /new.".bright_black());
        return;
    }
    let active_id = controller.active_conversation().await.map(|c| c.id);
    for (index, conversation) in conversations.iter().enumerate() {
        let marker = if Some(conversation.id) == active_id {
            "*"
        } else {
            " "
        };
        println!(
            "{}",
            format!("{} {:>2}. {}", marker, index + 1, conversation.title).yellow()
        );
    }
}

/// Resolves a 1-based list index typed by the user.
async fn conversation_at(
    controller: &SessionController,
    argument: Option<&str>,
) -> Option<claudia_core::conversation::Conversation> {
    let index: usize = argument?.parse().ok()?;
    let conversations = controller.conversations().await;
    conversations.get(index.checked_sub(1)?).cloned()
}

async fn handle_command(controller: &SessionController, line: &str) {
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default();
    let argument = parts.next();

    match command {
        "/new" => {
            if controller.create_conversation().await.is_some() {
                println!("{}", "Started a new conversation.".bright_green());
            } else {
                println!("{}", "No user resolved yet, try again.".bright_red());
            }
        }
        "/list" => print_conversations(controller).await,
        "/open" => match conversation_at(controller, argument).await {
            Some(conversation) => {
                controller.select_conversation(&conversation).await;
                println!("{}", format!("Opened \"{}\"", conversation.title).bright_green());
                for message in controller.messages().await {
                    render_message(&message);
                }
            }
            None => println!("{}", "Usage: /open <n> (see /list)".bright_red()),
        },
        "/delete" => match conversation_at(controller, argument).await {
            Some(conversation) => {
                controller.delete_conversation(conversation.id).await;
                print_conversations(controller).await;
            }
            None => println!("{}", "Usage: /delete <n> (see /list)".bright_red()),
        },
        "/status" => {
            let status = controller.check_backend_status().await;
            println!("{} {}", "Backend:".bright_yellow(), status_badge(status));
        }
        "/rate" => {
            let rating = argument.and_then(|arg| arg.parse::<i32>().ok());
            let last_reply = controller
                .messages()
                .await
                .into_iter()
                .rev()
                .find(|m| m.role == MessageRole::Assistant);
            match (rating, last_reply) {
                (Some(rating), Some(reply)) => {
                    match controller.rate_message(reply.id, rating, None).await {
                        Ok(()) => println!("{}", "Thanks for the feedback!".bright_green()),
                        Err(e) => {
                            println!("{}", format!("Could not record feedback: {}", e).bright_red())
                        }
                    }
                }
                (None, _) => println!("{}", "Usage: /rate <1-5>".bright_red()),
                (_, None) => println!("{}", "Nothing to rate yet.".bright_red()),
            }
        }
        "/help" => print_help(),
        _ => println!("{}", "Unknown command, try /help".bright_black()),
    }
}

/// The main entry point for the Claudia terminal client.
///
/// Sets up the backend gateway and session controller, starts the status
/// poller, and runs a rustyline REPL: slash commands manage conversations,
/// anything else is sent to Claudia as a chat message.
#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ClaudiaConfig::load();
    let backend = Arc::new(HttpBackend::new(&config));
    let controller = Arc::new(SessionController::new(backend, config.clone()));

    println!("{}", "=== Claudia.AI ===".bright_magenta().bold());
    println!("{}", "Connecting to backend...".bright_black());
    controller.initialize().await;
    println!("{} {}", "Backend:".bright_yellow(), status_badge(controller.status().await));
    println!("{}", "Type /help for commands, or just say hello.".bright_black());
    println!();

    let poller = StatusPoller::start(controller.clone(), config.poll_interval);

    // ===== REPL Setup =====
    let helper = CliHelper::new();
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    // ===== Main REPL Loop =====
    loop {
        let readline = rl.readline(">> ");

        match readline {
            Ok(line) => {
                let trimmed = line.trim();

                // Handle quit command
                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }

                // Skip empty lines
                if trimmed.is_empty() {
                    continue;
                }

                // Add to history
                let _ = rl.add_history_entry(&line);

                if trimmed.starts_with('/') {
                    handle_command(&controller, trimmed).await;
                    continue;
                }

                // A plain line is a chat message
                let before = controller.messages().await.len();
                println!("{}", "Claudia is thinking...".bright_black());
                controller.send_message(trimmed).await;

                let messages = controller.messages().await;
                if messages.len() == before {
                    // No active conversation yet; one was prepared instead
                    println!(
                        "{}",
                        "Started a new conversation, send your message again.".bright_yellow()
                    );
                    continue;
                }
                if let Some(reply) = messages.last()
                    && reply.role == MessageRole::Assistant
                {
                    render_message(reply);
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    // Stop the status poll; outstanding requests are discarded
    poller.stop();

    Ok(())
}
