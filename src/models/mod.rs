//! Data models for pdfaudit.

mod failure;
mod pdf_file;
mod report;
mod site;

pub use failure::Failure;
pub use pdf_file::{PdfFile, PdfPair};
pub use report::{ConformanceReport, PdfTextType, ReportSummary};
pub use site::{folder_name_for_domain, normalize_domain, Site};
