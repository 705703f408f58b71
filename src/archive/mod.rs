//! Archive detection.
//!
//! Two independent signals mark a PDF as archived: tokens in its URL, its
//! parent URL or its file name, and archive markers on the live parent page.

mod heuristics;
mod page;

pub use heuristics::{filename_of, is_archived};
pub use page::{archived_links, is_document_link, link_key};
