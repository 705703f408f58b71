//! Box shared-link support.
//!
//! Provides functionality to:
//! - Detect Box share URLs (`https://<tenant>.box.com/s/<hash>`, with or without `app.`)
//! - Normalize share URL variants to one canonical form
//! - Read the item list embedded in a share page
//! - Build the direct download URL for a shared PDF

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Why a share link cannot be turned into a downloadable PDF.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedShareError {
    #[error("Not a Box share link: {0}")]
    InvalidUrl(String),
    #[error("Box share is a folder, not a single file")]
    Folder,
    #[error("Box share points to {name} (.{extension}), not a PDF")]
    NotPdf { name: String, extension: String },
    #[error("Box share page lists no items")]
    NoItems,
    #[error("Box share page could not be parsed: {0}")]
    Unparseable(String),
}

static SHARE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://(?:[a-z0-9-]+\.)*box\.com/s/([a-z0-9]+)").unwrap()
});

static ITEMS_BLOB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""items":\[\{.*?\}\]"#).unwrap());

/// Kind of item listed on a share page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareItemKind {
    File,
    Folder,
}

/// An item listed on a Box share page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareItem {
    pub id: String,
    pub name: String,
    pub extension: Option<String>,
    pub kind: ShareItemKind,
}

/// A share link resolved to a direct download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedShare {
    /// Direct binary download URL.
    pub download_url: String,
    /// File name as shown by Box, used instead of the opaque share URL.
    pub filename: String,
}

/// Check if a URL is a Box share link.
pub fn is_box_share_url(url: &str) -> bool {
    SHARE_URL.is_match(url.trim())
}

/// Extract the share hash from a Box share URL.
pub fn extract_share_hash(url: &str) -> Option<String> {
    SHARE_URL
        .captures(url.trim())
        .map(|c| c[1].to_ascii_lowercase())
}

/// Canonical form of a URL for comparisons.
///
/// Box share links collapse `*.app.box.com` onto `*.box.com` and lose their query,
/// fragment and trailing slash. Other URLs only lose a trailing slash.
pub fn normalize_box_url(url: &str) -> String {
    let trimmed = url.trim();
    if !is_box_share_url(trimmed) {
        return trimmed.trim_end_matches('/').to_string();
    }

    let Ok(parsed) = Url::parse(trimmed) else {
        return trimmed.trim_end_matches('/').to_string();
    };
    let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    let host = host.replacen(".app.box.com", ".box.com", 1);
    let host = if host == "app.box.com" {
        "box.com".to_string()
    } else {
        host
    };

    format!(
        "https://{}{}",
        host,
        parsed.path().trim_end_matches('/')
    )
}

/// Host that serves downloads for a share URL (the `app.` variant).
fn download_host(share_url: &str) -> Option<String> {
    let parsed = Url::parse(share_url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    if host.contains(".app.box.com") || host == "app.box.com" {
        Some(host)
    } else if host == "box.com" {
        Some("app.box.com".to_string())
    } else {
        Some(host.replacen(".box.com", ".app.box.com", 1))
    }
}

/// Generate a direct download URL for a shared file.
pub fn file_download_url(host: &str, share_hash: &str, file_id: &str) -> String {
    format!(
        "https://{}/index.php?rm=box_download_shared_file&shared_name={}&file_id=f_{}",
        host,
        urlencoding::encode(share_hash),
        urlencoding::encode(file_id)
    )
}

/// Read the items embedded in a share page's `Box.postStreamData` script.
pub fn parse_share_page(html: &str) -> Result<Vec<ShareItem>, UnsupportedShareError> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("script")
        .map_err(|e| UnsupportedShareError::Unparseable(e.to_string()))?;

    let script = document
        .select(&selector)
        .map(|el| el.text().collect::<String>())
        .find(|text| text.contains("Box.postStreamData"))
        .ok_or_else(|| UnsupportedShareError::Unparseable("no Box.postStreamData".to_string()))?;

    let value = stream_data_json(&script)?;
    let mut items = Vec::new();
    let mut seen = HashSet::new();
    collect_items(&value, &mut items, &mut seen);
    Ok(items)
}

/// Parse the JSON assigned to `Box.postStreamData`, falling back to the bare items array.
fn stream_data_json(script: &str) -> Result<Value, UnsupportedShareError> {
    let assigned = script
        .find("Box.postStreamData")
        .and_then(|pos| script[pos..].find('{').map(|start| pos + start))
        .and_then(|start| {
            script[start..]
                .rfind('}')
                .map(|end| &script[start..=start + end])
        });

    if let Some(blob) = assigned {
        if let Ok(value) = serde_json::from_str::<Value>(blob) {
            return Ok(value);
        }
    }

    let items = ITEMS_BLOB
        .find(script)
        .ok_or(UnsupportedShareError::NoItems)?;
    serde_json::from_str(&format!("{{{}}}", items.as_str()))
        .map_err(|e| UnsupportedShareError::Unparseable(e.to_string()))
}

fn collect_items(value: &Value, items: &mut Vec<ShareItem>, seen: &mut HashSet<String>) {
    match value {
        Value::Array(values) => {
            for v in values {
                collect_items(v, items, seen);
            }
        }
        Value::Object(map) => {
            if let Some(item) = share_item(map) {
                if seen.insert(item.id.clone()) {
                    items.push(item);
                }
            }
            for v in map.values() {
                collect_items(v, items, seen);
            }
        }
        _ => {}
    }
}

fn share_item(map: &serde_json::Map<String, Value>) -> Option<ShareItem> {
    let kind = match map.get("type").and_then(Value::as_str)? {
        "file" => ShareItemKind::File,
        "folder" => ShareItemKind::Folder,
        _ => return None,
    };
    let id = match map.get("id")? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let name = map.get("name").and_then(Value::as_str)?.to_string();
    let extension = map
        .get("extension")
        .and_then(Value::as_str)
        .map(|s| s.to_ascii_lowercase());

    Some(ShareItem {
        id,
        name,
        extension,
        kind,
    })
}

/// Pick the single shared PDF from a page's items.
pub fn select_pdf(items: &[ShareItem]) -> Result<&ShareItem, UnsupportedShareError> {
    if items.iter().any(|i| i.kind == ShareItemKind::Folder) {
        return Err(UnsupportedShareError::Folder);
    }
    let files: Vec<&ShareItem> = items
        .iter()
        .filter(|i| i.kind == ShareItemKind::File)
        .collect();

    match files.as_slice() {
        [] => Err(UnsupportedShareError::NoItems),
        [file] => match file.extension.as_deref() {
            Some("pdf") => Ok(file),
            other => Err(UnsupportedShareError::NotPdf {
                name: file.name.clone(),
                extension: other.unwrap_or_default().to_string(),
            }),
        },
        _ => Err(UnsupportedShareError::Folder),
    }
}

/// Turn a share URL and its page HTML into a direct download.
pub fn resolve_from_page(share_url: &str, html: &str) -> Result<ResolvedShare, UnsupportedShareError> {
    let hash = extract_share_hash(share_url)
        .ok_or_else(|| UnsupportedShareError::InvalidUrl(share_url.to_string()))?;
    let host = download_host(share_url)
        .ok_or_else(|| UnsupportedShareError::InvalidUrl(share_url.to_string()))?;

    let items = parse_share_page(html)?;
    let pdf = select_pdf(&items)?;

    Ok(ResolvedShare {
        download_url: file_download_url(&host, &hash, &pdf.id),
        filename: pdf.name.clone(),
    })
}
