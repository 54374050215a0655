use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};

use super::output::{print_failure, print_products, print_reply, print_selection};
use super::repl::run_chat;
use super::{Cli, Commands, OutputFormat};
use crate::app::{
    get_config_dir, get_data_dir, init_config, Config, Session, SharedSession, TransportMode,
};
use crate::models::ServiceFactory;
use crate::relay;
use crate::selection::Toggled;

/// Handle a CLI subcommand. Returns false when the command failed in a way
/// the user has already been told about.
pub async fn handle_command(cli: &Cli, config: Config) -> Result<bool> {
    let default = Commands::Chat;
    let command = cli.command.as_ref().unwrap_or(&default);

    match command {
        Commands::Init => {
            let path = init_config()?;
            println!("Configuration at: {}", path.display());
            Ok(true)
        }
        Commands::Relay { bind } => {
            let mut relay_config = config.relay.clone();
            if let Some(bind) = bind {
                relay_config.bind = bind.clone();
            }
            relay::serve(relay_config).await?;
            Ok(true)
        }
        Commands::Status => {
            show_status(&config);
            Ok(true)
        }
        Commands::Chat => {
            let session = Session::from_config(&config)?;
            run_chat(SharedSession::new(session), cli.output_format).await?;
            Ok(true)
        }
        _ => {
            let mut session = Session::from_config(&config)?;
            run_session_command(command, &mut session, cli.output_format).await
        }
    }
}

async fn run_session_command(
    command: &Commands,
    session: &mut Session,
    format: OutputFormat,
) -> Result<bool> {
    match command {
        Commands::Categories => {
            for category in session.catalog().categories() {
                println!("  • {}", category.green());
            }
        }
        Commands::Products { category, search } => {
            if search.is_some() && !session.catalog().search_enabled() {
                println!("{}", "Search is disabled in this configuration; showing all matches for the category.".dimmed());
            }
            let items = session
                .catalog()
                .filter(category.as_deref(), search.as_deref());
            print_products(&items, session.selection());
        }
        Commands::Add { id } => {
            let id = session.resolve_id(id);
            match session.add(&id) {
                Ok(true) => println!("{} product {}", "Added".green(), id),
                Ok(false) => println!("Product {} is already selected", id),
                Err(e) => {
                    println!("{}", e.user_message().red());
                    return Ok(false);
                }
            }
        }
        Commands::Toggle { id } => {
            let id = session.resolve_id(id);
            match session.toggle(&id) {
                Ok(Toggled::Added) => println!("{} product {}", "Added".green(), id),
                Ok(Toggled::Removed) => println!("{} product {}", "Removed".yellow(), id),
                Err(e) => {
                    println!("{}", e.user_message().red());
                    return Ok(false);
                }
            }
        }
        Commands::Remove { id } => {
            let id = session.resolve_id(id);
            if session.remove(&id) {
                println!("{} product {}", "Removed".yellow(), id);
            } else {
                println!("Product {} was not selected", id);
            }
        }
        Commands::Selected => print_selection(session.selection()),
        Commands::Clear { yes } => {
            let cleared = session.clear(|count| *yes || confirm_on_stdin(count));
            if cleared {
                println!("Selection cleared.");
            } else {
                println!("Nothing changed.");
            }
        }
        Commands::Ask { message } => match session.send_message(message).await {
            Ok(reply) => print_reply(&reply, format),
            Err(e) => {
                tracing::error!("Assistant request failed: {}", e);
                print_failure(&e);
                return Ok(false);
            }
        },
        Commands::Routine => match session.generate_routine().await {
            Ok(reply) => print_reply(&reply, format),
            Err(e) => {
                tracing::error!("Routine request failed: {}", e);
                print_failure(&e);
                return Ok(false);
            }
        },
        Commands::Init | Commands::Relay { .. } | Commands::Status | Commands::Chat => {
            unreachable!("handled before a session is built")
        }
    }
    Ok(true)
}

/// Ask before wiping the selection
pub fn confirm_on_stdin(count: usize) -> bool {
    if count == 0 {
        return true;
    }
    print!("Remove all {} selected products? [y/N] ", count);
    let _ = io::stdout().flush();

    let mut answer = String::new();
    if io::stdin().lock().read_line(&mut answer).is_err() {
        return false;
    }
    is_yes(&answer)
}

pub(super) fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Show configuration and connectivity status
fn show_status(config: &Config) {
    println!("Routine Builder v{}", env!("CARGO_PKG_VERSION"));
    println!();

    match get_config_dir() {
        Ok(dir) => println!("  Config dir: {}", dir.display()),
        Err(e) => println!("  {} Config dir: {}", "[ERROR]".red(), e),
    }
    match get_data_dir(config) {
        Ok(dir) => println!("  Data dir:   {}", dir.display()),
        Err(e) => println!("  {} Data dir: {}", "[ERROR]".red(), e),
    }
    println!("  Catalog:    {}", config.catalog.path.display());
    println!(
        "  Features:   persistence={} search={}",
        config.features.persistence, config.features.search
    );

    let mode = match config.completion.mode {
        TransportMode::Relay => "relay",
        TransportMode::Direct => "direct (development only)",
    };
    println!("  Transport:  {}", mode);
    match ServiceFactory::transport(&config.completion, |name| std::env::var(name).ok()) {
        Ok(_) => println!("  {} Assistant configured", "[OK]".green()),
        Err(e) => println!("  {} {}", "[WARNING]".yellow(), e),
    }
    println!();
}
