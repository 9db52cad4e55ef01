/// "No information received / none registered" rows.
pub const NO_INFORMATION: &str = "0";
/// "Har ingen registreringspliktige interesser": declared no registrable interests.
pub const NO_INTERESTS: &str = "1";

const REVISION: &str = "2020";

const STANDARD: &[(&str, &str)] = &[
    (NO_INFORMATION, "Ingen registrerte opplysninger"),
    (NO_INTERESTS, "Har ingen registreringspliktige interesser"),
    ("2", "Styreverv mv."),
    ("3", "Selvstendig næring"),
    ("4", "Lønnet stilling mv."),
    ("5", "Tidligere arbeidsgiver"),
    ("6", "Framtidig arbeidsgiver"),
    ("7", "Økonomisk støtte"),
    ("8", "Eiendom i næring"),
    ("9", "Aksjer mv."),
    ("10", "Utenlandsreiser"),
    ("11", "Gaver"),
    ("12", "Gjeld"),
    ("98", "Andre forhold"),
];

/// Ordered code → label lookup. Built once, then only ever borrowed.
///
/// The label order doubles as the column schedule for tabular export.
#[derive(Debug, Clone)]
pub struct CategoryTable {
    revision: String,
    entries: Vec<(String, String)>,
}

impl CategoryTable {
    pub fn standard() -> Self {
        Self::from_entries(REVISION, STANDARD.iter().copied())
    }

    pub fn from_entries<'a>(
        revision: &str,
        entries: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            revision: revision.to_string(),
            entries: entries
                .into_iter()
                .map(|(c, l)| (c.to_string(), l.to_string()))
                .collect(),
        }
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn label(&self, code: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(c, _)| c == code)
            .map(|(_, l)| l.as_str())
    }

    /// Reverse lookup, tolerant of the `m.v.` spelling and of runs of whitespace.
    pub fn code_for_label(&self, label: &str) -> Option<&str> {
        let label = normalize_label(label);
        self.entries
            .iter()
            .find(|(_, l)| normalize_label(l) == label)
            .map(|(c, _)| c.as_str())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.label(code).is_some()
    }

    pub fn is_label(&self, text: &str) -> bool {
        self.code_for_label(text).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(c, l)| (c.as_str(), l.as_str()))
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, l)| l.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .map(|word| if word == "m.v." { "mv." } else { word })
        .collect::<Vec<_>>()
        .join(" ")
}
