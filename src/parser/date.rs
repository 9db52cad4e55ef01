use chrono::NaiveDate;
use serde::Serialize;

use crate::config::ParserConfig;
use crate::error::RegisterError;
use crate::layout::LayoutPage;

const MONTHS_NB: &[(&str, &str)] = &[
    ("januar", "01"),
    ("februar", "02"),
    ("mars", "03"),
    ("april", "04"),
    ("mai", "05"),
    ("juni", "06"),
    ("juli", "07"),
    ("august", "08"),
    ("september", "09"),
    ("oktober", "10"),
    ("november", "11"),
    ("desember", "12"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentMeta {
    pub updated_at: NaiveDate,
}

/// Derive the document meta from the first page's text.
pub fn document_meta(first_page: &LayoutPage, cfg: &ParserConfig) -> Result<DocumentMeta, RegisterError> {
    let updated_at = parse_updated_at(&first_page.text(), &cfg.date_marker)?;
    Ok(DocumentMeta { updated_at })
}

/// Find `marker` in `text` and read "<day>. <month> <year>" after it.
pub fn parse_updated_at(text: &str, marker: &str) -> Result<NaiveDate, RegisterError> {
    let start = text
        .find(marker)
        .ok_or_else(|| RegisterError::Date(format!("marker {:?} not found", marker)))?;
    let rest = text[start + marker.len()..].lines().next().unwrap_or("");
    let cleaned = rest.to_lowercase().replace('.', "");

    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    let &[day, month, year] = tokens.as_slice() else {
        return Err(RegisterError::Date(format!("unexpected date expression {:?}", rest.trim())));
    };

    let month = MONTHS_NB
        .iter()
        .find(|(name, _)| *name == month)
        .map(|(_, number)| *number)
        .ok_or_else(|| RegisterError::Date(format!("unknown month {:?}", month)))?;

    // zero pad day
    let day = if day.len() == 1 { format!("0{}", day) } else { day.to_string() };

    NaiveDate::parse_from_str(&format!("{} {} {}", day, month, year), "%d %m %Y")
        .map_err(|e| RegisterError::Date(format!("{:?}: {}", rest.trim(), e)))
}
