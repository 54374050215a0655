use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::VecDeque;

static NUMBERED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(\d{1,3})[.)]\s+(\S.*)$").expect("valid regex"));

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*+•]\s+(\S.*)$").expect("valid regex"));

/// A step marker at line start or after whitespace, e.g. "... 2. Tone"
static INLINE_STEP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)(\d{1,3})[.)]\s").expect("valid regex"));

static INLINE_BULLET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+•\s+").expect("valid regex"));

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Paragraph(Vec<String>),
    Ordered { number: String, text: String },
    Bullet(String),
}

impl Block {
    fn is_item(&self) -> bool {
        !matches!(self, Block::Paragraph(_))
    }

    fn same_list(&self, other: &Block) -> bool {
        matches!(
            (self, other),
            (Block::Ordered { .. }, Block::Ordered { .. }) | (Block::Bullet(_), Block::Bullet(_))
        )
    }

    fn render(&self) -> String {
        match self {
            Block::Paragraph(lines) => lines.join("\n"),
            Block::Ordered { number, text } => format!("{}. {}", number, text),
            Block::Bullet(text) => format!("- {}", text),
        }
    }
}

/// Normalize assistant text into one structure marker per line.
///
/// Numbered steps become `N. text` items (the model's numbering is kept),
/// bullet markers become `- text`, paragraphs are separated by exactly one
/// blank line, and steps run together on one line are split apart. Colons
/// are never treated as structure, so "10:00" stays intact.
///
/// Applying it to its own output returns the output unchanged.
pub fn normalize(text: &str) -> String {
    let lines: Vec<String> = text
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .lines()
        .flat_map(split_inline)
        .collect();

    render(&parse(&lines))
}

/// Break a line with several run-together markers into one line per marker
fn split_inline(line: &str) -> Vec<String> {
    let line = line.trim_end();
    let mut out = Vec::new();

    for piece in INLINE_BULLET_RE.replace_all(line, "\n• ").split('\n') {
        let starts: Vec<usize> = INLINE_STEP_RE
            .captures_iter(piece)
            .filter_map(|caps| caps.get(1).map(|m| m.start()))
            .collect();

        if starts.len() < 2 {
            out.push(piece.to_string());
            continue;
        }

        let head = piece[..starts[0]].trim();
        if !head.is_empty() {
            out.push(head.to_string());
        }
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(piece.len());
            out.push(piece[start..end].trim().to_string());
        }
    }

    out
}

fn parse(lines: &[String]) -> Vec<Block> {
    let mut blocks: Vec<Block> = Vec::new();
    let mut pending: VecDeque<String> = lines.iter().cloned().collect();
    let mut paragraph_open = false;

    while let Some(raw) = pending.pop_front() {
        let line = raw.trim();
        if line.is_empty() {
            paragraph_open = false;
            continue;
        }

        if let Some(caps) = NUMBERED_RE.captures(line) {
            blocks.push(Block::Ordered {
                number: caps[1].to_string(),
                text: caps[2].trim().to_string(),
            });
            paragraph_open = false;
            continue;
        }

        if let Some(caps) = BULLET_RE.captures(line) {
            blocks.push(Block::Bullet(caps[1].trim().to_string()));
            paragraph_open = false;
            continue;
        }

        // Indented text right under an item continues that item. The joined
        // item is split again, since the join can bring markers together.
        let indented = raw.starts_with("  ") || raw.starts_with('\t');
        if indented && blocks.last().is_some_and(Block::is_item) {
            if let Some(item) = blocks.pop() {
                let joined = format!("{} {}", item.render(), line);
                for piece in split_inline(&joined).into_iter().rev() {
                    pending.push_front(piece);
                }
                continue;
            }
        }

        if paragraph_open {
            if let Some(Block::Paragraph(para)) = blocks.last_mut() {
                para.push(line.to_string());
                continue;
            }
        }

        blocks.push(Block::Paragraph(vec![line.to_string()]));
        paragraph_open = true;
    }

    blocks
}

fn render(blocks: &[Block]) -> String {
    let mut out = String::new();

    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            let prev = &blocks[i - 1];
            out.push_str(if prev.is_item() && prev.same_list(block) { "\n" } else { "\n\n" });
        }
        out.push_str(&block.render());
    }

    out
}
