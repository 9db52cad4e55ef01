use thiserror::Error;

/// Everything that can abort the parse of a single register document.
///
/// All variants are fatal for the document at hand only; batch callers log them
/// and move on to the next file.
#[derive(Debug, Error)]
pub enum RegisterError {
    /// The "as of" date marker is missing or the date after it is malformed.
    #[error("date: {0}")]
    Date(String),

    /// A bold fragment that should be a representative header does not parse.
    #[error("header {text:?}: {reason}")]
    Header { text: String, reason: &'static str },

    /// Content showed up where no record can hold it, or used an unknown category.
    #[error("page {page}: {message}")]
    Segmentation { page: String, message: String },

    /// The layout file itself could not be read. Upstream of the parser proper.
    #[error("layout: {0}")]
    Layout(String),
}

impl RegisterError {
    pub fn header(text: &str, reason: &'static str) -> Self {
        Self::Header {
            text: text.to_string(),
            reason,
        }
    }

    pub fn segmentation(page: &str, message: impl Into<String>) -> Self {
        Self::Segmentation {
            page: page.to_string(),
            message: message.into(),
        }
    }
}
