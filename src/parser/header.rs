use std::sync::LazyLock;

use regex::Regex;

use crate::config::ParserConfig;
use crate::error::RegisterError;

// <name>(<number>, <party>, <constituency>) with the number optional.
static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<name>[\w\-,. ]+?)\s*\((?:(?P<number>\d+),\s*)?(?P<party>\w+),?\s*[^)]*\)\s*$").unwrap()
});

#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    pub first_name: String,
    pub last_name: String,
    /// Lowercased party code.
    pub party: String,
    pub rep_number: Option<u32>,
}

pub fn parse_header(text: &str) -> Result<Header, RegisterError> {
    let text = text.trim();
    let caps = HEADER_RE
        .captures(text)
        .ok_or_else(|| RegisterError::header(text, "does not match <name>(<party>, ...)"))?;

    let (last_name, first_name) = caps["name"]
        .split_once(',')
        .ok_or_else(|| RegisterError::header(text, "name has no comma"))?;

    let rep_number = caps
        .name("number")
        .map(|m| m.as_str().parse::<u32>())
        .transpose()
        .map_err(|_| RegisterError::header(text, "representative number out of range"))?;

    Ok(Header {
        first_name: first_name.trim().to_string(),
        last_name: last_name.trim().to_string(),
        party: caps["party"].to_lowercase(),
        rep_number,
    })
}

/// Whether a bold header runs on into the next fragment.
///
/// True for a hyphenated line break, a known split name, or any header whose
/// parenthetical is not closed yet (name and parenthetical on separate fragments).
pub fn is_continued(bold: &str, cfg: &ParserConfig) -> bool {
    let bold = bold.trim();
    bold.ends_with('-') || cfg.is_split_header(bold) || !bold.ends_with(')')
}

pub fn join_continuation(head: &str, tail: &str) -> String {
    let head = head.trim();
    let tail = tail.trim();
    match head.strip_suffix('-') {
        Some(stem) => format!("{}{}", stem, tail),
        None => format!("{} {}", head, tail),
    }
}
