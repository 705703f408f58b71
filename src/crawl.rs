//! Crawl output contract.
//!
//! The crawler writes one folder per site (domain with `.` replaced by `-`),
//! each holding a text file with one `<pdf_url> <parent_url>[ ...]` line per
//! discovered PDF.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::models::PdfPair;

/// Failure message stored for lines that don't carry both URLs.
pub const MALFORMED_LINE_MESSAGE: &str = "Couldn't unpack file url and location";

/// Parsed crawl output of one site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlOutput {
    /// Distinct pairs in file order.
    pub entries: Vec<PdfPair>,
    /// Non-empty lines that could not be split into two URLs.
    pub malformed: Vec<String>,
}

impl CrawlOutput {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one crawl line. Trailing tokens are ignored.
pub fn parse_line(line: &str) -> Option<PdfPair> {
    let mut tokens = line.split_whitespace();
    let pdf_uri = tokens.next()?;
    let parent_uri = tokens.next()?;
    Some(PdfPair::new(pdf_uri, parent_uri))
}

/// Parse a whole crawl file.
pub fn parse_crawl_output(text: &str) -> CrawlOutput {
    let mut output = CrawlOutput::default();
    let mut seen = HashSet::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match parse_line(trimmed) {
            Some(pair) => {
                if seen.insert(pair.clone()) {
                    output.entries.push(pair);
                }
            }
            None => output.malformed.push(trimmed.to_string()),
        }
    }
    output
}

/// Read a crawl file. A missing file is `Ok(None)`, never an empty crawl.
pub async fn read_crawl_output(path: &Path) -> std::io::Result<Option<CrawlOutput>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(parse_crawl_output(&text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// A per-site crawl folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFolder {
    /// Folder name, e.g. `access-sfsu-edu`.
    pub name: String,
    pub crawl_file: PathBuf,
}

impl SiteFolder {
    pub fn new(root: &Path, name: &str, crawl_filename: &str) -> Self {
        Self {
            name: name.to_string(),
            crawl_file: root.join(name).join(crawl_filename),
        }
    }
}

/// All site folders under the crawl root, sorted by name.
pub fn list_site_folders(root: &Path, crawl_filename: &str) -> std::io::Result<Vec<SiteFolder>> {
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            if !name.starts_with('.') {
                folders.push(SiteFolder::new(root, name, crawl_filename));
            }
        }
    }
    folders.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(folders)
}
