use pulldown_cmark::{html, Options, Parser};

use super::normalize::normalize;

/// Render assistant text as HTML, normalizing it first
pub fn to_html(text: &str) -> String {
    let normalized = normalize(text);

    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);

    let parser = Parser::new_ext(&normalized, options);
    let mut out = String::with_capacity(normalized.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}
