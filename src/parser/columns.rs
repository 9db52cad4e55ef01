use super::categories::CategoryTable;
use crate::config::ParserConfig;
use crate::layout::LayoutPage;

/// Column geometry of one document, resolved once from its first page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutProfile {
    /// A canonical category label was found on page one; its column is the category column.
    Current {
        category_column: i32,
        interest_column: i32,
    },
    /// No label found. Category column falls back to the historical offset and the
    /// historical interest column is accepted next to the inferred one.
    Legacy {
        category_column: i32,
        interest_column: i32,
        legacy_interest_column: i32,
    },
}

impl LayoutProfile {
    pub fn classify(first_page: &LayoutPage, table: &CategoryTable, cfg: &ParserConfig) -> Self {
        let labelled = first_page
            .fragments
            .iter()
            .find(|f| table.is_label(&f.text))
            .map(|f| f.column);

        let category_column = labelled.unwrap_or(cfg.legacy_category_column);

        let interest_column = first_page
            .fragments
            .iter()
            .filter(|f| {
                !f.text.trim().is_empty()
                    && !first_page.is_page_label(&f.text)
                    && f.column > category_column
            })
            .map(|f| f.column)
            .max()
            .unwrap_or(cfg.legacy_interest_column);

        match labelled {
            Some(_) => Self::Current {
                category_column,
                interest_column,
            },
            None => Self::Legacy {
                category_column,
                interest_column,
                legacy_interest_column: cfg.legacy_interest_column,
            },
        }
    }

    pub fn category_column(&self) -> i32 {
        match self {
            Self::Current { category_column, .. } | Self::Legacy { category_column, .. } => {
                *category_column
            }
        }
    }

    pub fn is_interest_column(&self, column: i32) -> bool {
        match *self {
            Self::Current { interest_column, .. } => column == interest_column,
            Self::Legacy {
                interest_column,
                legacy_interest_column,
                ..
            } => column == interest_column || column == legacy_interest_column,
        }
    }
}
