use anyhow::Result;
use clap::Parser;

use routine_builder::{app::load_config, cli::{handle_command, Cli}, utils::init_logger};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Logs go to stderr; RUST_LOG overrides the default level
    init_logger(if cli.verbose { "debug" } else { "info" });

    let config = load_config(cli.config.as_deref())?;

    if !handle_command(&cli, config).await? {
        std::process::exit(1);
    }

    Ok(())
}
