use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::categories::{CategoryTable, NO_INFORMATION, NO_INTERESTS};
use super::columns::LayoutProfile;
use super::header::{self, Header};
use crate::config::ParserConfig;
use crate::error::RegisterError;
use crate::layout::{LayoutFragment, LayoutPage};

static NUMBERED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(\d+)\.(?:\s|$)").unwrap());
static LEADING_DIGITS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*(\d+)").unwrap());

const SECTION_MARK: char = '§';

/// One category entry: either disclosed text or a "nothing to declare" flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Interest {
    Flag(bool),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Representative {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rep_number: Option<u32>,
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    pub by_category: BTreeMap<String, Interest>,
}

/// Counters backing the record-count invariant.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SegmentStats {
    pub header_fragments: usize,
    pub swallowed_headers: usize,
}

/// What the previous fragment left unfinished.
#[derive(Debug)]
enum Continuation {
    /// A header split over two fragments; holds the first half.
    Header(String),
    /// Interest text ended in a hyphen; the next fragment's text joins it directly.
    Body,
}

/// In-progress record, owned by the segmenter until sealed.
#[derive(Debug)]
struct Draft {
    header: Header,
    by_category: BTreeMap<String, Interest>,
    category: Option<String>,
    buffer: String,
}

impl Draft {
    fn new(header: Header) -> Self {
        Self {
            header,
            by_category: BTreeMap::new(),
            category: None,
            buffer: String::new(),
        }
    }

    fn switch_category(&mut self, code: &str) {
        self.flush();
        if code == NO_INTERESTS || code == NO_INFORMATION {
            self.by_category.insert(code.to_string(), Interest::Flag(true));
        }
        self.category = Some(code.to_string());
    }

    fn push_line(&mut self, text: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(text);
    }

    /// Move buffered text into the category map under the current code.
    fn flush(&mut self) {
        let text = std::mem::take(&mut self.buffer);
        if text.is_empty() {
            return;
        }
        let Some(code) = self.category.clone() else {
            warn!("Dropping interest text outside any category: {:?}", text);
            return;
        };
        match self.by_category.get_mut(&code) {
            // sentinels stay flags
            Some(Interest::Flag(_)) => {}
            Some(Interest::Text(existing)) => {
                existing.push('\n');
                existing.push_str(&text);
            }
            None => {
                self.by_category.insert(code, Interest::Text(text));
            }
        }
    }

    fn seal(mut self) -> Representative {
        self.flush();
        Representative {
            rep_number: self.header.rep_number,
            first_name: self.header.first_name,
            last_name: self.header.last_name,
            party: self.header.party,
            by_category: self.by_category,
        }
    }
}

/// Fragment-at-a-time state machine turning the token stream into records.
///
/// `current` is `None` while awaiting the first header. `pending` carries a
/// continuation from one fragment to the next instead of peeking ahead.
pub struct Segmenter<'a> {
    cfg: &'a ParserConfig,
    table: &'a CategoryTable,
    profile: LayoutProfile,
    current: Option<Draft>,
    pending: Option<Continuation>,
    sealed: Vec<Representative>,
    stats: SegmentStats,
}

impl<'a> Segmenter<'a> {
    pub fn new(profile: LayoutProfile, cfg: &'a ParserConfig, table: &'a CategoryTable) -> Self {
        Self {
            cfg,
            table,
            profile,
            current: None,
            pending: None,
            sealed: Vec::new(),
            stats: SegmentStats::default(),
        }
    }

    pub fn push(&mut self, page: &LayoutPage, fragment: &LayoutFragment) -> Result<(), RegisterError> {
        let text = fragment.text.trim();

        // footers and blank runs between the two halves are not the continuation
        if self.pending.is_some() && (text.is_empty() || page.is_page_label(text)) {
            return Ok(());
        }

        match self.pending.take() {
            Some(Continuation::Header(head)) => return self.finish_header(page, &head, fragment),
            Some(Continuation::Body) => {
                if fragment.bold_text().is_none() && fragment.column != self.profile.category_column() {
                    self.append_body(text, true);
                    return Ok(());
                }
                // a header or marker follows: the hyphen was real
                if let Some(draft) = self.current.as_mut() {
                    draft.buffer.push('-');
                }
            }
            None => {}
        }

        if let Some(bold) = fragment.bold_text() {
            if self.cfg.is_section_heading(bold) {
                return Ok(());
            }
            return self.start_header(page, bold);
        }

        if text.is_empty() || page.is_page_label(text) || text.starts_with(&self.cfg.date_marker) {
            return Ok(());
        }

        if fragment.column == self.profile.category_column() && self.cfg.is_no_information(text) {
            self.draft_mut(page, "no-information row", text)?
                .switch_category(NO_INFORMATION);
            return Ok(());
        }

        if fragment.column == self.profile.category_column() {
            let code = category_code(text, self.table);
            if !self.table.contains(&code) {
                return Err(RegisterError::segmentation(
                    &page.number,
                    format!("unknown category code {:?} in {:?}", code, text),
                ));
            }
            self.draft_mut(page, "category marker", text)?
                .switch_category(&code);
            return Ok(());
        }

        if self.profile.is_interest_column(fragment.column) {
            self.draft_mut(page, "interest text", text)?;
            self.append_body(text, false);
        }

        Ok(())
    }

    /// Flush and seal the last record.
    pub fn finish(mut self) -> Result<(Vec<Representative>, SegmentStats), RegisterError> {
        match self.pending.take() {
            Some(Continuation::Header(head)) => self.open_record(&head)?,
            Some(Continuation::Body) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.buffer.push('-');
                }
            }
            None => {}
        }
        if let Some(draft) = self.current.take() {
            self.sealed.push(draft.seal());
        }
        Ok((self.sealed, self.stats))
    }

    fn start_header(&mut self, page: &LayoutPage, bold: &str) -> Result<(), RegisterError> {
        self.stats.header_fragments += 1;
        if let Some(draft) = self.current.take() {
            self.sealed.push(draft.seal());
        }
        if header::is_continued(bold, self.cfg) {
            debug!("Page {}: header {:?} continues in next fragment", page.number, bold);
            self.pending = Some(Continuation::Header(bold.to_string()));
            return Ok(());
        }
        self.open_record(bold)
    }

    fn finish_header(
        &mut self,
        page: &LayoutPage,
        head: &str,
        fragment: &LayoutFragment,
    ) -> Result<(), RegisterError> {
        let tail = match fragment.bold_text() {
            Some(bold) => {
                self.stats.header_fragments += 1;
                self.stats.swallowed_headers += 1;
                bold
            }
            None => fragment.text.trim(),
        };
        let joined = header::join_continuation(head, tail);
        debug!("Page {}: joined split header {:?}", page.number, joined);
        self.open_record(&joined)
    }

    fn open_record(&mut self, text: &str) -> Result<(), RegisterError> {
        let header = header::parse_header(text)?;
        self.current = Some(Draft::new(header));
        Ok(())
    }

    fn append_body(&mut self, text: &str, joined: bool) {
        let Some(draft) = self.current.as_mut() else {
            return;
        };
        let (text, hyphenated) = match text.strip_suffix('-') {
            Some(stem) => (stem, true),
            None => (text, false),
        };
        if joined {
            draft.buffer.push_str(text);
        } else {
            draft.push_line(text);
        }
        if hyphenated {
            self.pending = Some(Continuation::Body);
        }
    }

    fn draft_mut(&mut self, page: &LayoutPage, what: &str, text: &str) -> Result<&mut Draft, RegisterError> {
        self.current.as_mut().ok_or_else(|| {
            RegisterError::segmentation(
                &page.number,
                format!("{} {:?} before any representative header", what, text),
            )
        })
    }
}

/// Resolve the category code of a category-column fragment.
///
/// "§ 2 ..." and "2." carry the code; an exact canonical label maps back to its code;
/// anything else is the "no registrable interests" boilerplate.
pub fn category_code(text: &str, table: &CategoryTable) -> String {
    let text = text.trim();
    if let Some(rest) = text.strip_prefix(SECTION_MARK) {
        if let Some(caps) = LEADING_DIGITS_RE.captures(rest) {
            return caps[1].to_string();
        }
    }
    if let Some(caps) = NUMBERED_RE.captures(text) {
        return caps[1].to_string();
    }
    if let Some(code) = table.code_for_label(text) {
        return code.to_string();
    }
    NO_INTERESTS.to_string()
}

/// Run the segmenter over every page.
pub fn segment(
    pages: &[LayoutPage],
    profile: LayoutProfile,
    cfg: &ParserConfig,
    table: &CategoryTable,
) -> Result<(Vec<Representative>, SegmentStats), RegisterError> {
    let mut segmenter = Segmenter::new(profile, cfg, table);
    for page in pages {
        for fragment in &page.fragments {
            segmenter.push(page, fragment)?;
        }
    }
    segmenter.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CURRENT: LayoutProfile = LayoutProfile::Current {
        category_column: 57,
        interest_column: 241,
    };

    fn page(number: &str, fragments: Vec<LayoutFragment>) -> LayoutPage {
        LayoutPage {
            number: number.into(),
            fragments,
        }
    }

    fn run(pages: &[LayoutPage]) -> Result<(Vec<Representative>, SegmentStats), RegisterError> {
        segment(pages, CURRENT, &ParserConfig::default(), &CategoryTable::standard())
    }

    fn text(rep: &Representative, code: &str) -> String {
        match rep.by_category.get(code) {
            Some(Interest::Text(t)) => t.clone(),
            other => panic!("expected text under {}, got {:?}", code, other),
        }
    }

    #[test]
    fn multi_line_category_text() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::plain(57, "2."),
                LayoutFragment::plain(241, "Styreleder X"),
                LayoutFragment::plain(241, "Y (lønnet)"),
            ],
        )])
        .unwrap();
        assert_eq!(reps.len(), 1);
        assert_eq!(reps[0].party, "frp");
        assert_eq!(text(&reps[0], "2"), "Styreleder X\nY (lønnet)");
    }

    #[test]
    fn hyphenation_same_page() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::plain(57, "§ 9 Aksjer mv."),
                LayoutFragment::plain(241, "HRE Hold-"),
                LayoutFragment::plain(241, "ing AS"),
                LayoutFragment::plain(241, "Equinor"),
            ],
        )])
        .unwrap();
        assert_eq!(text(&reps[0], "9"), "HRE Holding AS\nEquinor");
    }

    #[test]
    fn hyphenation_across_pages_skips_footer() {
        let (reps, _) = run(&[
            page(
                "4",
                vec![
                    LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                    LayoutFragment::plain(57, "§ 11 Gaver"),
                    LayoutFragment::plain(241, "Armbåndsur fra OSCE i Gene-"),
                    LayoutFragment::plain(430, "4"),
                ],
            ),
            page("5", vec![LayoutFragment::plain(241, "ve, 2014.")]),
        ])
        .unwrap();
        assert_eq!(text(&reps[0], "11"), "Armbåndsur fra OSCE i Geneve, 2014.");
    }

    #[test]
    fn trailing_hyphen_before_header_is_kept() {
        let (reps, stats) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::plain(57, "§ 4"),
                LayoutFragment::plain(241, "Jurymedlem mars-"),
                LayoutFragment::bold(57, "Berg, Ola (SV, Akershus)"),
            ],
        )])
        .unwrap();
        assert_eq!(reps.len(), 2);
        assert_eq!(stats.swallowed_headers, 0);
        assert_eq!(text(&reps[0], "4"), "Jurymedlem mars-");
    }

    #[test]
    fn empty_section_gives_empty_map() {
        let (reps, stats) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::bold(57, "Berg, Ola (SV, Akershus)"),
                LayoutFragment::plain(57, "Gaver"),
                LayoutFragment::plain(241, "Bok"),
            ],
        )])
        .unwrap();
        assert_eq!(reps.len(), 2);
        assert!(reps[0].by_category.is_empty());
        assert_eq!(text(&reps[1], "11"), "Bok");
        assert_eq!(stats.header_fragments, 2);
    }

    #[test]
    fn section_headings_are_not_records() {
        let (reps, stats) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Representanter"),
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::bold(57, "Vararepresentanter"),
                LayoutFragment::plain(57, "2."),
                LayoutFragment::plain(241, "Styreleder X"),
            ],
        )])
        .unwrap();
        assert_eq!(reps.len(), 1);
        assert_eq!(stats.header_fragments, 1);
        assert_eq!(text(&reps[0], "2"), "Styreleder X");
    }

    #[test]
    fn split_header_swallows_next_fragment() {
        let (reps, stats) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Berg, Ola (SV, Akers-"),
                LayoutFragment::bold(57, "hus)"),
                LayoutFragment::bold(57, "Andersen, Kari Anne"),
                LayoutFragment::bold(57, "(Ap, Oslo)"),
                LayoutFragment::plain(57, "Har ingen registreringspliktige interesser"),
            ],
        )])
        .unwrap();
        assert_eq!(reps.len(), 2);
        assert_eq!(stats.header_fragments - stats.swallowed_headers, reps.len());
        assert_eq!(reps[0].first_name, "Ola");
        assert_eq!(reps[1].first_name, "Kari Anne");
        assert_eq!(reps[1].party, "ap");
        assert_eq!(reps[1].by_category.get("1"), Some(&Interest::Flag(true)));
    }

    #[test]
    fn split_header_across_page_break() {
        let (reps, stats) = run(&[
            page(
                "2",
                vec![
                    LayoutFragment::bold(57, "Berg, Ola (SV, Akers-"),
                    LayoutFragment::plain(57, "  "),
                    LayoutFragment::plain(430, "2"),
                ],
            ),
            page(
                "3",
                vec![
                    LayoutFragment::bold(57, "hus)"),
                    LayoutFragment::plain(57, "§ 2"),
                    LayoutFragment::plain(241, "Styremedlem A"),
                ],
            ),
        ])
        .unwrap();
        assert_eq!(reps.len(), 1);
        assert_eq!((reps[0].last_name.as_str(), reps[0].first_name.as_str()), ("Berg", "Ola"));
        assert_eq!(reps[0].party, "sv");
        assert_eq!(text(&reps[0], "2"), "Styremedlem A");
        assert_eq!(stats.header_fragments - stats.swallowed_headers, reps.len());
    }

    #[test]
    fn label_spelling_variant_keeps_text() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Aas, Johan(FrP, Nord-Trøndelag)"),
                LayoutFragment::plain(57, "Styreverv  m.v."),
                LayoutFragment::plain(241, "Styreleder X"),
            ],
        )])
        .unwrap();
        assert_eq!(reps[0].by_category.len(), 1);
        assert_eq!(text(&reps[0], "2"), "Styreleder X");
    }

    #[test]
    fn no_information_phrase_only_in_category_column() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                LayoutFragment::plain(57, "§ 98"),
                LayoutFragment::plain(241, "Ingen registrerte opplysninger"),
            ],
        )])
        .unwrap();
        assert!(reps[0].by_category.get("0").is_none());
        assert_eq!(text(&reps[0], "98"), "Ingen registrerte opplysninger");
    }

    #[test]
    fn no_information_row_is_flag() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                LayoutFragment::plain(57, "Ingen registrerte opplysninger"),
            ],
        )])
        .unwrap();
        assert_eq!(reps[0].by_category.get("0"), Some(&Interest::Flag(true)));
        assert_eq!(reps[0].by_category.len(), 1);
    }

    #[test]
    fn text_under_no_interests_stays_flag() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                LayoutFragment::plain(57, "1."),
                LayoutFragment::plain(241, "Har ingen registreringspliktige interesser"),
            ],
        )])
        .unwrap();
        assert_eq!(reps[0].by_category.get("1"), Some(&Interest::Flag(true)));
    }

    #[test]
    fn repeated_category_appends() {
        let (reps, _) = run(&[
            page(
                "1",
                vec![
                    LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                    LayoutFragment::plain(57, "§ 2"),
                    LayoutFragment::plain(241, "Styremedlem A"),
                ],
            ),
            page(
                "2",
                vec![
                    LayoutFragment::plain(57, "§ 2"),
                    LayoutFragment::plain(241, "Styremedlem B"),
                ],
            ),
        ])
        .unwrap();
        assert_eq!(text(&reps[0], "2"), "Styremedlem A\nStyremedlem B");
    }

    #[test]
    fn body_before_header_is_error() {
        let err = run(&[page("1", vec![LayoutFragment::plain(241, "Styreleder X")])]).unwrap_err();
        assert!(matches!(err, RegisterError::Segmentation { ref page, .. } if page == "1"));

        let err = run(&[page("1", vec![LayoutFragment::plain(57, "2.")])]).unwrap_err();
        assert!(matches!(err, RegisterError::Segmentation { .. }));
    }

    #[test]
    fn unknown_category_is_error() {
        let err = run(&[page(
            "3",
            vec![
                LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                LayoutFragment::plain(57, "§ 42"),
            ],
        )])
        .unwrap_err();
        assert!(matches!(err, RegisterError::Segmentation { ref message, .. } if message.contains("\"42\"")));
    }

    #[test]
    fn bad_header_is_error() {
        let err = run(&[page("1", vec![LayoutFragment::bold(57, "Johan Aas (FrP, Oslo)")])]).unwrap_err();
        assert!(matches!(err, RegisterError::Header { .. }));
    }

    #[test]
    fn unrelated_columns_ignored() {
        let (reps, _) = run(&[page(
            "1",
            vec![
                LayoutFragment::bold(57, "Dahl, Eva (MDG, Oslo)"),
                LayoutFragment::plain(150, "Side"),
                LayoutFragment::plain(57, "   "),
                LayoutFragment::plain(57, "1"),
            ],
        )])
        .unwrap();
        assert!(reps[0].by_category.is_empty());
    }

    #[test]
    fn category_codes() {
        let table = CategoryTable::standard();
        assert_eq!(category_code("§ 4 Lønnet stilling mv.", &table), "4");
        assert_eq!(category_code("§11", &table), "11");
        assert_eq!(category_code("98.", &table), "98");
        assert_eq!(category_code("10. Utenlandsreiser", &table), "10");
        assert_eq!(category_code("Eiendom i næring", &table), "8");
        assert_eq!(category_code("Aksjer m.v.", &table), "9");
        assert_eq!(category_code("Har ingen registreringsplik-", &table), "1");
    }

    #[test]
    fn record_count_matches_headers() {
        let mut fragments = Vec::new();
        for i in 0..25 {
            if i % 5 == 0 {
                fragments.push(LayoutFragment::bold(57, &format!("Navn{}, Per", i)));
                fragments.push(LayoutFragment::bold(57, "(H, Oslo)"));
            } else {
                fragments.push(LayoutFragment::bold(57, &format!("Navn{}, Per (H, Oslo)", i)));
            }
            fragments.push(LayoutFragment::plain(57, "2."));
            fragments.push(LayoutFragment::plain(241, "Styremedlem"));
        }
        let (reps, stats) = run(&[page("1", fragments)]).unwrap();
        assert_eq!(stats.header_fragments, 30);
        assert_eq!(stats.swallowed_headers, 5);
        assert_eq!(reps.len(), stats.header_fragments - stats.swallowed_headers);
    }
}
