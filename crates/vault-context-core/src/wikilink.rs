//! Wikilink parsing: `[[Target]]` and `[[Target|Display Text]]`.

use std::sync::OnceLock;

use regex::Regex;

use crate::models::NOTE_EXTENSION;

fn wikilink_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\[\[([^\]|]+)(?:\|([^\]]*))?\]\]").expect("wikilink pattern is valid")
    })
}

/// One wikilink occurrence in a note body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WikiLink<'a> {
    /// Link target, trimmed.
    pub target: &'a str,
    pub display: Option<&'a str>,
    /// Byte offset of the opening `[[`.
    pub start: usize,
    /// Byte offset just past the closing `]]`.
    pub end: usize,
}

/// All wikilinks in `content`, in document order.
pub fn parse_links(content: &str) -> impl Iterator<Item = WikiLink<'_>> {
    wikilink_regex().captures_iter(content).filter_map(|caps| {
        let whole = caps.get(0)?;
        let target = caps.get(1)?.as_str().trim();
        Some(WikiLink {
            target,
            display: caps.get(2).map(|m| m.as_str()),
            start: whole.start(),
            end: whole.end(),
        })
    })
}

/// A link matches when its target equals `name`, or equals `name` once the
/// note extension is appended to the link target.
pub fn link_matches(link_target: &str, name: &str) -> bool {
    if link_target == name {
        return true;
    }
    name.strip_suffix(NOTE_EXTENSION)
        .and_then(|s| s.strip_suffix('.'))
        .is_some_and(|base| base == link_target)
}

/// Text around `content[start..end]`, extended by up to `radius` characters
/// on each side (clamped to the content) and trimmed.
pub fn excerpt(content: &str, start: usize, end: usize, radius: usize) -> &str {
    let from = if radius == 0 {
        start
    } else {
        content[..start]
            .char_indices()
            .rev()
            .nth(radius - 1)
            .map(|(i, _)| i)
            .unwrap_or(0)
    };
    let to = content[end..]
        .char_indices()
        .nth(radius)
        .map(|(i, _)| end + i)
        .unwrap_or(content.len());
    content[from..to].trim()
}
