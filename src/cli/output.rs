use colored::Colorize;
use serde_json::json;

use super::OutputFormat;
use crate::catalog::CatalogItem;
use crate::format::{normalize, to_html};
use crate::selection::SelectionStore;
use crate::utils::RoutineError;

/// Render an assistant reply in the requested format
pub fn format_reply(reply: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => normalize(reply),
        OutputFormat::Html => to_html(reply),
        OutputFormat::Json => serde_json::to_string_pretty(&json!({
            "reply": reply,
            "normalized": normalize(reply),
        }))
        .unwrap_or_else(|e| format!("{{\"error\": \"Failed to serialize reply: {}\"}}", e)),
    }
}

pub fn print_reply(reply: &str, format: OutputFormat) {
    if format == OutputFormat::Text {
        println!("{} {}", "Assistant:".magenta().bold(), format_reply(reply, format));
    } else {
        println!("{}", format_reply(reply, format));
    }
}

/// Fallback text for a failed request
pub fn print_failure(err: &RoutineError) {
    println!("{} {}", "Assistant:".magenta().bold(), err.user_message().yellow());
}

pub fn print_products(items: &[&CatalogItem], selection: &SelectionStore) {
    if items.is_empty() {
        println!("{}", "No products match.".dimmed());
        return;
    }
    for item in items {
        let marker = if selection.contains(&item.id) {
            "[x]".green().bold()
        } else {
            "[ ]".normal()
        };
        println!(
            "{} {:>4}  {} {} {}",
            marker,
            item.id.to_string().cyan(),
            item.name.bold(),
            format!("by {}", item.brand).dimmed(),
            format!("({})", item.category).dimmed()
        );
    }
}

pub fn print_selection(selection: &SelectionStore) {
    if selection.is_empty() {
        println!("No products selected yet. Use `toggle <id>` to add some!");
        return;
    }
    println!("Selected products ({}):", selection.len());
    for item in selection.all() {
        println!("  • {} {} {}", item.id.to_string().cyan(), item.name.bold(), format!("by {}", item.brand).dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_reply_variants() {
        let reply = "Routine: 1. Cleanse 2. Moisturize";
        assert_eq!(
            format_reply(reply, OutputFormat::Text),
            "Routine:\n\n1. Cleanse\n2. Moisturize"
        );
        assert!(format_reply(reply, OutputFormat::Html).contains("<ol>"));

        let value: serde_json::Value =
            serde_json::from_str(&format_reply(reply, OutputFormat::Json)).unwrap();
        assert_eq!(value["reply"], reply);
        assert_eq!(value["normalized"], "Routine:\n\n1. Cleanse\n2. Moisturize");
    }
}
