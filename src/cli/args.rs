use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "routine")]
#[command(version)]
#[command(about = "Pick products and get an AI-generated routine for them", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// How assistant replies are printed
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output_format: OutputFormat,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a default configuration file
    Init,
    /// List product categories
    Categories,
    /// List products, optionally filtered
    Products {
        /// Only show this category
        #[arg(short = 'C', long)]
        category: Option<String>,
        /// Keyword search (when search is enabled)
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Select a product (no change if already selected)
    Add {
        /// Product id
        id: String,
    },
    /// Select a product, or deselect it if already selected
    Toggle {
        /// Product id
        id: String,
    },
    /// Deselect a product
    Remove {
        /// Product id
        id: String,
    },
    /// Show selected products
    Selected,
    /// Remove every selected product
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask the assistant a one-off question about your selection
    Ask {
        /// The question
        message: String,
    },
    /// Generate a routine for the selected products
    Routine,
    /// Interactive chat session (default)
    Chat,
    /// Run the credential-injecting relay server
    Relay {
        /// Address to listen on, overrides relay.bind
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show configuration and connectivity status
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Normalized plain text
    Text,
    /// HTML fragment
    Html,
    /// JSON with raw and normalized reply
    Json,
}
