//! Message formatting
//!
//! Turns untrusted backend text into a safe HTML fragment:
//!
//! 1. HTML-significant characters are escaped (entities that are already
//!    escaped stay as they are)
//! 2. bare `http(s)://` URLs become links opening in a new context
//! 3. runs of lines starting with `•`, `-` or `*` become `<ul>` lists
//! 4. remaining newlines become `<br>`
//!
//! The only markup that survives is the markup this module emits itself,
//! so `format_message(format_message(x)) == format_message(x)`:
//!
//! - `<br>`
//! - complete `<ul><li>...</li></ul>` runs
//! - `http(s)` anchors in its exact shape whose text is the href
//!
//! Everything else, including lookalike anchors and stray list tags, is
//! escaped as text.

use std::sync::OnceLock;

use regex::Regex;

const ANCHOR_ATTRS: &str = r#"target="_blank" rel="noopener noreferrer""#;
const ENTITIES: [&str; 5] = ["&amp;", "&lt;", "&gt;", "&quot;", "&#39;"];
const BULLETS: [char; 3] = ['•', '-', '*'];

fn url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"'`]+"#).expect("valid URL regex"))
}

/// Markup the formatter itself produces. Anchors are matched whole so the
/// link text can be compared with the href.
fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(concat!(
            r#"<a href="(https?://[^"<>\s]*)" target="_blank" rel="noopener noreferrer">([^<]*)</a>"#,
            r#"|<br\s*/?>|</?ul>|</?li>"#
        ))
        .expect("valid tag regex")
    })
}

#[derive(Debug, Clone, PartialEq)]
enum Tag {
    /// Escaped href, shown as its own text
    Anchor(String),
    Break,
    ListOpen,
    ListClose,
    ItemOpen,
    ItemClose,
}

impl Tag {
    fn render(&self) -> String {
        match self {
            Tag::Anchor(href) => format!(r#"<a href="{href}" {ANCHOR_ATTRS}>{href}</a>"#),
            Tag::Break => "<br>".to_string(),
            Tag::ListOpen => "<ul>".to_string(),
            Tag::ListClose => "</ul>".to_string(),
            Tag::ItemOpen => "<li>".to_string(),
            Tag::ItemClose => "</li>".to_string(),
        }
    }

    fn is_list(&self) -> bool {
        matches!(
            self,
            Tag::ListOpen | Tag::ListClose | Tag::ItemOpen | Tag::ItemClose
        )
    }
}

#[derive(Debug)]
struct Token {
    start: usize,
    end: usize,
    tag: Tag,
}

impl Token {
    /// `None` for markup that only looks like ours: an anchor whose text
    /// differs from its href stays plain text.
    fn parse(caps: regex::Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let tag = match (caps.get(1), caps.get(2)) {
            (Some(href), Some(text)) if href.as_str() == text.as_str() => {
                Tag::Anchor(escape_html(href.as_str()))
            }
            (Some(_), _) => return None,
            _ => match whole.as_str() {
                "<ul>" => Tag::ListOpen,
                "</ul>" => Tag::ListClose,
                "<li>" => Tag::ItemOpen,
                "</li>" => Tag::ItemClose,
                _ => Tag::Break,
            },
        };
        Some(Self {
            start: whole.start(),
            end: whole.end(),
            tag,
        })
    }
}

/// Format untrusted message text into a safe HTML fragment
pub fn format_message(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let mut out = String::with_capacity(normalized.len() + 16);
    let mut list_open = false;
    let mut previous_was_line = false;

    for line in normalized.split('\n') {
        match bullet_item(line) {
            Some(item) => {
                if !list_open {
                    out.push_str("<ul>");
                    list_open = true;
                }
                out.push_str("<li>");
                out.push_str(&format_inline(item, false));
                out.push_str("</li>");
                previous_was_line = false;
            }
            None => {
                if list_open {
                    out.push_str("</ul>");
                    list_open = false;
                } else if previous_was_line {
                    out.push_str("<br>");
                }
                out.push_str(&format_inline(line, true));
                previous_was_line = true;
            }
        }
    }
    if list_open {
        out.push_str("</ul>");
    }
    out
}

/// Terminal projection: no markup, bullets normalised to `•`
pub fn plain_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(|line| match bullet_item(line) {
            Some(item) => format!("  • {item}"),
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Content of a bullet line, if `line` is one
fn bullet_item(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    let rest = trimmed.strip_prefix(BULLETS)?;
    if rest.starts_with(char::is_whitespace) {
        Some(rest.trim_start())
    } else {
        None
    }
}

/// Escape and linkify one line, passing formatter markup through. Markup
/// that is rejected is escaped along with the text around it.
fn format_inline(segment: &str, allow_lists: bool) -> String {
    let tokens: Vec<Token> = tag_regex()
        .captures_iter(segment)
        .filter_map(Token::parse)
        .collect();
    let accepted = accepted_tokens(&tokens, allow_lists);

    let mut out = String::with_capacity(segment.len());
    let mut cursor = 0;
    for (token, keep) in tokens.iter().zip(accepted) {
        if !keep {
            continue;
        }
        out.push_str(&linkify(&segment[cursor..token.start]));
        out.push_str(&token.tag.render());
        cursor = token.end;
    }
    out.push_str(&linkify(&segment[cursor..]));
    out
}

/// Anchors and breaks always pass; list tags only as complete
/// `<ul>(<li>...</li>)+</ul>` runs.
fn accepted_tokens(tokens: &[Token], allow_lists: bool) -> Vec<bool> {
    let mut accepted: Vec<bool> = tokens.iter().map(|t| !t.tag.is_list()).collect();
    if !allow_lists {
        return accepted;
    }
    let mut idx = 0;
    while idx < tokens.len() {
        if tokens[idx].tag == Tag::ListOpen {
            if let Some(close) = list_run_end(tokens, idx) {
                accepted[idx..=close].fill(true);
                idx = close + 1;
                continue;
            }
        }
        idx += 1;
    }
    accepted
}

/// Index of the `</ul>` closing a well-formed run opened at `open`. Items
/// may hold text, anchors and breaks but no list markup, and nothing may
/// sit between the structural tags.
fn list_run_end(tokens: &[Token], open: usize) -> Option<usize> {
    let mut last_end = tokens[open].end;
    let mut in_item = false;
    let mut items = 0;
    for (idx, token) in tokens.iter().enumerate().skip(open + 1) {
        match token.tag {
            Tag::ItemOpen if !in_item && token.start == last_end => {
                in_item = true;
                items += 1;
            }
            Tag::ItemClose if in_item => in_item = false,
            Tag::ListClose if !in_item && items > 0 && token.start == last_end => {
                return Some(idx)
            }
            Tag::Anchor(_) | Tag::Break if in_item => {}
            _ => return None,
        }
        last_end = token.end;
    }
    None
}

fn linkify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;

    for found in url_regex().find_iter(text) {
        let url = trim_url(found.as_str());
        out.push_str(&escape_html(&text[cursor..found.start()]));
        let escaped = escape_html(url);
        out.push_str(&format!(r#"<a href="{escaped}" {ANCHOR_ATTRS}>{escaped}</a>"#));
        cursor = found.start() + url.len();
    }
    out.push_str(&escape_html(&text[cursor..]));
    out
}

/// Drop trailing sentence punctuation the URL regex swallowed
fn trim_url(url: &str) -> &str {
    let mut trimmed = url.trim_end_matches(['.', ',', '!', '?', ':']);
    if trimmed.ends_with(')') && !trimmed.contains('(') {
        trimmed = trimmed.trim_end_matches(')');
        trimmed = trimmed.trim_end_matches(['.', ',', '!', '?', ':']);
    }
    trimmed
}

/// Escape HTML-significant characters, leaving existing entities intact
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (idx, ch) in text.char_indices() {
        match ch {
            '&' if ENTITIES.iter().any(|e| text[idx..].starts_with(e)) => out.push('&'),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
