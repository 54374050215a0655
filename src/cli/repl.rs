use colored::Colorize;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::task::{JoinError, JoinHandle};

use super::commands::is_yes;
use super::output::{print_failure, print_products, print_reply, print_selection};
use super::OutputFormat;
use crate::app::SharedSession;
use crate::selection::Toggled;
use crate::utils::{log_error, Result};

/// A parsed line of chat input
#[derive(Debug, Clone, PartialEq)]
pub(super) enum ChatInput {
    Add(String),
    Toggle(String),
    Remove(String),
    Selected,
    Products(Option<String>),
    Routine,
    Clear,
    Help,
    Quit,
    Message(String),
    Empty,
    Unknown(String),
}

impl ChatInput {
    pub(super) fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ChatInput::Empty;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return ChatInput::Message(line.to_string());
        };

        let (command, arg) = match rest.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, Some(arg.trim().to_string()).filter(|a| !a.is_empty())),
            None => (rest, None),
        };

        match (command, arg) {
            ("add", Some(id)) => ChatInput::Add(id),
            ("toggle", Some(id)) => ChatInput::Toggle(id),
            ("remove", Some(id)) => ChatInput::Remove(id),
            ("selected", _) => ChatInput::Selected,
            ("products", category) => ChatInput::Products(category),
            ("routine", _) => ChatInput::Routine,
            ("clear", _) => ChatInput::Clear,
            ("help", _) => ChatInput::Help,
            ("quit" | "exit", _) => ChatInput::Quit,
            _ => ChatInput::Unknown(line.to_string()),
        }
    }
}

const HELP: &str = "\
Commands:
  /products [category]  list products
  /add <id>             select a product
  /toggle <id>          select or deselect a product
  /remove <id>          deselect a product
  /selected             show your selection
  /routine              generate a routine for your selection
  /clear                remove every selected product
  /help                 show this help
  /quit                 leave
Anything else is sent to the assistant.";

type Reply = std::result::Result<Result<String>, JoinError>;

/// Interactive chat loop over stdin.
///
/// Replies are awaited in the background so input keeps being read; a
/// message typed before the previous reply arrived is answered with the
/// busy notice.
pub async fn run_chat(session: SharedSession, format: OutputFormat) -> anyhow::Result<()> {
    println!("{}", "Routine Builder chat. Type /help for commands.".bold());
    session.inspect(|s| print_selection(s.selection())).await;

    let mut revisions = session.inspect(|s| s.selection().subscribe()).await;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight: Option<JoinHandle<Result<String>>> = None;

    prompt("> ");
    loop {
        let line = tokio::select! {
            reply = wait_for(&mut in_flight) => {
                in_flight = None;
                show_reply(reply, format);
                prompt("> ");
                continue;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            if let Some(task) = in_flight.take() {
                show_reply(task.await, format);
            }
            break;
        };

        match ChatInput::parse(&line) {
            ChatInput::Empty => {}
            ChatInput::Quit => break,
            ChatInput::Help => println!("{}", HELP),
            ChatInput::Selected => session.inspect(|s| print_selection(s.selection())).await,
            ChatInput::Products(category) => {
                session
                    .inspect(|s| {
                        let items = s.catalog().filter(category.as_deref(), None);
                        print_products(&items, s.selection());
                    })
                    .await
            }
            ChatInput::Add(input) => {
                let (id, added) = session
                    .update(|s| {
                        let id = s.resolve_id(&input);
                        let added = s.add(&id);
                        (id, added)
                    })
                    .await;
                match added {
                    Ok(true) => println!("{} product {}", "Added".green(), id),
                    Ok(false) => println!("Product {} is already selected", id),
                    Err(e) => println!("{}", e.user_message().red()),
                }
            }
            ChatInput::Toggle(input) => {
                let (id, toggled) = session
                    .update(|s| {
                        let id = s.resolve_id(&input);
                        let toggled = s.toggle(&id);
                        (id, toggled)
                    })
                    .await;
                match toggled {
                    Ok(Toggled::Added) => println!("{} product {}", "Added".green(), id),
                    Ok(Toggled::Removed) => println!("{} product {}", "Removed".yellow(), id),
                    Err(e) => println!("{}", e.user_message().red()),
                }
            }
            ChatInput::Remove(input) => {
                let (id, removed) = session
                    .update(|s| {
                        let id = s.resolve_id(&input);
                        let removed = s.remove(&id);
                        (id, removed)
                    })
                    .await;
                if removed {
                    println!("{} product {}", "Removed".yellow(), id);
                } else {
                    println!("Product {} was not selected", id);
                }
            }
            ChatInput::Clear => {
                let count = session.inspect(|s| s.selection().len()).await;
                let confirmed = count == 0 || confirm(&mut lines, count).await?;
                if session.update(|s| s.clear(|_| confirmed)).await {
                    println!("Selection cleared.");
                }
            }
            ChatInput::Routine => match session.begin_routine() {
                Ok(request) => {
                    println!("{}", "Generating your routine...".dimmed());
                    in_flight = Some(tokio::spawn(request));
                }
                Err(e) => print_failure(&e),
            },
            ChatInput::Message(text) => match session.begin_message(&text) {
                Ok(request) => in_flight = Some(tokio::spawn(request)),
                Err(e) => print_failure(&e),
            },
            ChatInput::Unknown(line) => {
                println!("Unknown command: {}. Type /help for commands.", line);
            }
        }

        if revisions.has_changed().unwrap_or(false) {
            revisions.borrow_and_update();
            println!("{}", "Selection changed, starting a fresh conversation.".dimmed());
        }
        if in_flight.is_none() {
            prompt("> ");
        }
    }

    Ok(())
}

/// Resolves with the in-flight reply, or never when nothing is pending
async fn wait_for(in_flight: &mut Option<JoinHandle<Result<String>>>) -> Reply {
    match in_flight {
        Some(task) => task.await,
        None => std::future::pending().await,
    }
}

fn show_reply(reply: Reply, format: OutputFormat) {
    match reply {
        Ok(Ok(text)) => print_reply(&text, format),
        Ok(Err(e)) => print_failure(&e),
        Err(e) => log_error("💥", format!("Assistant task failed: {}", e)),
    }
}

async fn confirm(lines: &mut Lines<BufReader<Stdin>>, count: usize) -> anyhow::Result<bool> {
    prompt(&format!("Remove all {} selected products? [y/N] ", count));
    Ok(lines.next_line().await?.is_some_and(|answer| is_yes(&answer)))
}

fn prompt(text: &str) {
    print!("{}", text);
    let _ = std::io::stdout().flush();
}
