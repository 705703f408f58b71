use chrono::{DateTime, Utc};
use serde::Serialize;

/// A PDF discovered on a parent page of a site.
#[derive(Debug, Clone, Serialize)]
pub struct PdfFile {
    pub id: i32,
    pub pdf_uri: String,
    pub parent_uri: String,
    pub site_id: i32,
    pub file_hash: String,
    pub pdf_returns_404: bool,
    pub parent_returns_404: bool,
    pub pdf_is_archived: bool,
    pub passed_contains_accessible_in_title: bool,
    pub pdf_is_removed: bool,
    pub removed_at: Option<DateTime<Utc>>,
    pub scanned_at: DateTime<Utc>,
}

impl PdfFile {
    pub fn pair(&self) -> PdfPair {
        PdfPair::new(&self.pdf_uri, &self.parent_uri)
    }
}

/// Identity of a discovered PDF for existence checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PdfPair {
    pub pdf_uri: String,
    pub parent_uri: String,
}

impl PdfPair {
    pub fn new(pdf_uri: impl Into<String>, parent_uri: impl Into<String>) -> Self {
        Self {
            pdf_uri: pdf_uri.into(),
            parent_uri: parent_uri.into(),
        }
    }

    /// Whether the PDF URI mentions "accessible", case-insensitively.
    pub fn mentions_accessible(&self) -> bool {
        self.pdf_uri.to_lowercase().contains("accessible")
    }
}

impl std::fmt::Display for PdfPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (on {})", self.pdf_uri, self.parent_uri)
    }
}
