//! Category-keyed records → one field per canonical category label.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::parser::categories::CategoryTable;
use crate::parser::segment::{Interest, Representative};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rep_number: Option<u32>,
    pub first_name: String,
    pub last_name: String,
    pub party: String,
    /// Keyed by canonical label, or by the raw code when the table lacks it.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Interest>,
}

pub trait Flatten {
    fn flatten(&self, table: &CategoryTable) -> FlatRecord;
}

impl Flatten for Representative {
    fn flatten(&self, table: &CategoryTable) -> FlatRecord {
        let fields = self
            .by_category
            .iter()
            .map(|(code, interest)| {
                let label = match table.label(code) {
                    Some(label) => label.to_string(),
                    None => {
                        warn!(
                            "Unknown category code {:?} for {}, {}; keeping raw code",
                            code, self.last_name, self.first_name
                        );
                        code.clone()
                    }
                };
                (label, interest.clone())
            })
            .collect();

        FlatRecord {
            rep_number: self.rep_number,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            party: self.party.clone(),
            fields,
        }
    }
}

/// Already flat.
impl Flatten for FlatRecord {
    fn flatten(&self, _table: &CategoryTable) -> FlatRecord {
        self.clone()
    }
}

pub fn flatten_all<T: Flatten>(records: &[T], table: &CategoryTable) -> Vec<FlatRecord> {
    records.iter().map(|r| r.flatten(table)).collect()
}
