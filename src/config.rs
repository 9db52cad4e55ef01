use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Category column used by registers that never print a canonical label on page one.
pub const LEGACY_CATEGORY_COLUMN: i32 = 85;
/// Interest column of the older register layout, still accepted for legacy documents.
pub const LEGACY_INTEREST_COLUMN: i32 = 255;

/// Per-run parser settings. Everything here is read-only once loaded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Phrase preceding the "as of" date on the first page.
    pub date_marker: String,
    /// Bold headings that separate register sections and are not representatives.
    pub section_headings: Vec<String>,
    /// Rows meaning "no information received / none registered".
    pub no_information_phrases: Vec<String>,
    /// Headers the extractor always breaks over two fragments.
    pub split_header_names: Vec<String>,
    pub legacy_category_column: i32,
    pub legacy_interest_column: i32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            date_marker: "Ajourført pr.".to_string(),
            section_headings: vec![
                "Representanter".to_string(),
                "Regjeringsmedlemmer".to_string(),
                "Vararepresentanter".to_string(),
            ],
            no_information_phrases: vec![
                "Ingen registrerte opplysninger".to_string(),
                "Opplysninger ikke mottatt".to_string(),
            ],
            split_header_names: Vec::new(),
            legacy_category_column: LEGACY_CATEGORY_COLUMN,
            legacy_interest_column: LEGACY_INTEREST_COLUMN,
        }
    }
}

impl ParserConfig {
    /// Read a JSON config file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let cfg: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        info!("Loaded parser config from {}", path.display());
        Ok(cfg)
    }

    pub fn is_section_heading(&self, text: &str) -> bool {
        self.section_headings.iter().any(|h| h == text.trim())
    }

    pub fn is_no_information(&self, text: &str) -> bool {
        self.no_information_phrases.iter().any(|p| p == text.trim())
    }

    pub fn is_split_header(&self, text: &str) -> bool {
        self.split_header_names.iter().any(|n| n == text.trim())
    }
}
