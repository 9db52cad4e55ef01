pub mod categories;
pub mod columns;
pub mod date;
pub mod header;
pub mod segment;

use tracing::info;

use crate::config::ParserConfig;
use crate::error::RegisterError;
use crate::layout::LayoutPage;
use categories::CategoryTable;
use columns::LayoutProfile;
use date::DocumentMeta;
use segment::{Representative, SegmentStats};

#[derive(Debug)]
pub struct ParsedDocument {
    pub meta: DocumentMeta,
    pub profile: LayoutProfile,
    pub representatives: Vec<Representative>,
    pub stats: SegmentStats,
}

/// Three-step pipeline: first page → meta + column profile → segmented records.
pub fn parse_document(
    pages: &[LayoutPage],
    cfg: &ParserConfig,
    table: &CategoryTable,
) -> Result<ParsedDocument, RegisterError> {
    let first = pages
        .first()
        .ok_or_else(|| RegisterError::segmentation("-", "document has no pages"))?;

    let meta = date::document_meta(first, cfg)?;
    let profile = LayoutProfile::classify(first, table, cfg);
    info!("Register of {}: {:?}", meta.updated_at, profile);

    let (representatives, stats) = segment::segment(pages, profile, cfg, table)?;
    info!(
        "Parsed {} representatives from {} pages ({} header fragments, {} joined)",
        representatives.len(),
        pages.len(),
        stats.header_fragments,
        stats.swallowed_headers
    );

    Ok(ParsedDocument {
        meta,
        profile,
        representatives,
        stats,
    })
}

// ── Tests ──
