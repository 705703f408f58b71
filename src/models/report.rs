use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the text of a PDF is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfTextType {
    /// Has an extractable text layer.
    Text,
    /// Only scanned images, no extractable text.
    ImageOnly,
}

impl PdfTextType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::ImageOnly => "Image Only",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "Image Only" => Self::ImageOnly,
            _ => Self::Text,
        }
    }
}

/// Normalized conformance result for one PDF's content.
///
/// Reports are content-addressed: `pdf_hash` is the SHA-256 of the PDF bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConformanceReport {
    pub pdf_hash: String,
    pub violations: i32,
    pub failed_checks: i32,
    pub tagged: bool,
    pub check_for_image_only: bool,
    pub pdf_text_type: PdfTextType,
    pub title_set: bool,
    pub language_set: bool,
    pub page_count: i32,
    pub has_form: bool,
}

/// A PDF row joined with its report, for reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ReportSummary {
    pub pdf_uri: String,
    pub parent_uri: String,
    pub pdf_is_archived: bool,
    pub pdf_returns_404: bool,
    pub parent_returns_404: bool,
    pub pdf_is_removed: bool,
    pub report: ConformanceReport,
    pub checked_at: DateTime<Utc>,
}
