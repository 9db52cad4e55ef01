//! Layout token stream: pages of positioned text fragments.
//!
//! The stream comes from an external extractor (`pdftohtml -xml`). We only read its
//! output, never run it. A JSON rendition of the same shape is accepted as well.

use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegisterError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutFragment {
    /// Full text of the fragment, bold runs included.
    #[serde(default)]
    pub text: String,
    /// Text of the bold run, if the fragment carried one.
    #[serde(default)]
    pub bold: Option<String>,
    /// Horizontal offset, the only positional signal we use.
    pub column: i32,
}

#[cfg(test)]
impl LayoutFragment {
    pub fn plain(column: i32, text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: None,
            column,
        }
    }

    pub fn bold(column: i32, text: &str) -> Self {
        Self {
            text: text.to_string(),
            bold: Some(text.to_string()),
            column,
        }
    }
}

impl LayoutFragment {
    /// Bold text, trimmed, when it is not blank.
    pub fn bold_text(&self) -> Option<&str> {
        self.bold.as_deref().map(str::trim).filter(|b| !b.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutPage {
    /// Page-number label as printed by the extractor.
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub fragments: Vec<LayoutFragment>,
}

impl LayoutPage {
    /// True when `text` is just the page's own number (a footer, not content).
    pub fn is_page_label(&self, text: &str) -> bool {
        !self.number.is_empty() && text.trim() == self.number
    }

    /// Plain text of every fragment, one per line.
    pub fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Load a layout file, picking the reader by extension (`.json` or pdftohtml `.xml`).
pub fn load(path: &Path) -> Result<Vec<LayoutPage>, RegisterError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| RegisterError::Layout(format!("{}: {}", path.display(), e)))?;
    let pages = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => from_json(&raw)?,
        _ => from_pdftohtml_xml(&raw)?,
    };
    debug!("Loaded {} pages from {}", pages.len(), path.display());
    Ok(pages)
}

pub fn from_json(raw: &str) -> Result<Vec<LayoutPage>, RegisterError> {
    serde_json::from_str(raw).map_err(|e| RegisterError::Layout(e.to_string()))
}

/// Parse `pdftohtml -xml` output into pages.
///
/// `<page number="N">` opens a page, each `<text left="L">` inside it is a fragment.
/// Character data nested in `<b>` is collected separately as the bold variant.
pub fn from_pdftohtml_xml(xml: &str) -> Result<Vec<LayoutPage>, RegisterError> {
    let mut reader = quick_xml::Reader::from_str(xml);
    let mut pages: Vec<LayoutPage> = Vec::new();
    let mut fragment: Option<LayoutFragment> = None;
    let mut bold_depth = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"page" => pages.push(LayoutPage {
                    number: attr(&e, b"number")?.unwrap_or_default(),
                    fragments: Vec::new(),
                }),
                b"text" => {
                    let column = attr(&e, b"left")?
                        .map(|l| parse_column(&l))
                        .transpose()?
                        .unwrap_or_default();
                    fragment = Some(LayoutFragment {
                        column,
                        ..Default::default()
                    });
                }
                b"b" if fragment.is_some() => bold_depth += 1,
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(f) = fragment.as_mut() {
                    let text = e.unescape().map_err(xml_error)?;
                    f.text.push_str(&text);
                    if bold_depth > 0 {
                        f.bold.get_or_insert_with(String::new).push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"text" => {
                    if let Some(f) = fragment.take() {
                        let page = pages.last_mut().ok_or_else(|| {
                            RegisterError::Layout("<text> outside of <page>".into())
                        })?;
                        page.fragments.push(f);
                    }
                    bold_depth = 0;
                }
                b"b" => bold_depth = bold_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(pages)
}

fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>, RegisterError> {
    match e.try_get_attribute(name).map_err(xml_error)? {
        Some(a) => Ok(Some(a.unescape_value().map_err(xml_error)?.to_string())),
        None => Ok(None),
    }
}

fn parse_column(raw: &str) -> Result<i32, RegisterError> {
    // Some extractor versions emit fractional offsets.
    raw.trim()
        .parse::<f64>()
        .map(|v| v.round() as i32)
        .map_err(|_| RegisterError::Layout(format!("bad column offset {:?}", raw)))
}

fn xml_error(e: impl std::fmt::Display) -> RegisterError {
    RegisterError::Layout(e.to_string())
}
