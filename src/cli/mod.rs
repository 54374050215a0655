/// CLI argument parsing and command handling - Gateway
mod args;
mod commands;
mod output;
mod repl;

pub use args::{Cli, Commands, OutputFormat};
pub use commands::{confirm_on_stdin, handle_command};
pub use output::format_reply;
pub use repl::run_chat;
