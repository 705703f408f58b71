//! PDF structure inspection for the fields veraPDF does not report directly.
//!
//! Uses poppler's `pdfinfo` and `pdftotext` when they are installed and falls
//! back to scanning the raw bytes for the relevant dictionary keys.

use std::path::Path;
use std::process::{Output, Stdio};
use std::sync::LazyLock;
use std::time::Duration;

use regex::bytes::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::models::PdfTextType;

/// Document-level structure facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PdfStructure {
    pub tagged: bool,
    pub title_set: bool,
    pub language_set: bool,
    pub page_count: i32,
    pub has_form: bool,
    pub image_only: bool,
}

impl PdfStructure {
    pub fn text_type(&self) -> PdfTextType {
        if self.image_only {
            PdfTextType::ImageOnly
        } else {
            PdfTextType::Text
        }
    }
}

/// Fields read from `pdfinfo` output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfInfo {
    pub tagged: Option<bool>,
    pub has_form: Option<bool>,
    pub pages: Option<i32>,
    pub title: Option<String>,
}

/// Parse `pdfinfo` output.
pub fn parse_pdfinfo(output: &str) -> PdfInfo {
    let mut info = PdfInfo::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            "Tagged" => info.tagged = Some(value.eq_ignore_ascii_case("yes")),
            "Form" => info.has_form = Some(!value.eq_ignore_ascii_case("none")),
            "Pages" => info.pages = value.parse().ok(),
            "Title" if !value.is_empty() => info.title = Some(value.to_string()),
            _ => {}
        }
    }
    info
}

static MARKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/MarkInfo\s*<<[^>]*/Marked\s+true").unwrap());
static STRUCT_TREE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/StructTreeRoot\b").unwrap());
static LANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Lang\s*(?:\(\s*[^)\s]|<\s*[0-9A-Fa-f])").unwrap());
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Title\s*(?:\(\s*[^)\s]|<\s*[0-9A-Fa-f])").unwrap());
static ACROFORM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/AcroForm\b").unwrap());
static PAGE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/Type\s*/Page\b").unwrap());
static FONT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/Font\b").unwrap());

/// Best-effort structure read from uncompressed dictionary text.
///
/// Misses keys that live inside compressed object streams.
pub fn inspect_bytes(bytes: &[u8]) -> PdfStructure {
    let page_count = PAGE.find_iter(bytes).count();
    PdfStructure {
        tagged: MARKED.is_match(bytes) || STRUCT_TREE.is_match(bytes),
        title_set: TITLE.is_match(bytes),
        language_set: LANG.is_match(bytes),
        page_count: page_count.min(i32::MAX as usize) as i32,
        has_form: ACROFORM.is_match(bytes),
        image_only: !FONT.is_match(bytes),
    }
}

/// Inspect a PDF on disk; `bytes` are its contents.
///
/// Each poppler call is bounded by `timeout`; one that runs over counts as
/// unavailable.
pub async fn inspect(path: &Path, bytes: &[u8], timeout: Duration) -> PdfStructure {
    let raw = inspect_bytes(bytes);

    let Some(info) = run_pdfinfo(path, timeout).await else {
        debug!("pdfinfo unavailable, using raw structure scan");
        return raw;
    };

    let page_count = info.pages.unwrap_or(raw.page_count);
    let image_only = match run_pdftotext(path, timeout).await {
        Some(text) => page_count > 0 && text.trim().is_empty(),
        None => raw.image_only,
    };

    PdfStructure {
        tagged: info.tagged.unwrap_or(raw.tagged),
        title_set: info.title.is_some() || raw.title_set,
        // pdfinfo does not print the catalog language
        language_set: raw.language_set,
        page_count,
        has_form: info.has_form.unwrap_or(raw.has_form),
        image_only,
    }
}

/// Run a tool to completion, or give up after `timeout`.
async fn run_tool(cmd: &mut Command, timeout: Duration) -> Option<Output> {
    let result = tokio::time::timeout(timeout, cmd.kill_on_drop(true).output()).await;
    match result {
        Ok(output) => output.ok(),
        Err(_) => {
            debug!("{:?} timed out after {:?}", cmd.as_std().get_program(), timeout);
            None
        }
    }
}

async fn run_pdfinfo(path: &Path, timeout: Duration) -> Option<PdfInfo> {
    let output = run_tool(
        Command::new("pdfinfo")
            .arg(path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped()),
        timeout,
    )
    .await?;

    if !output.status.success() {
        debug!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        );
        return None;
    }
    Some(parse_pdfinfo(&String::from_utf8_lossy(&output.stdout)))
}

async fn run_pdftotext(path: &Path, timeout: Duration) -> Option<String> {
    let output = run_tool(
        Command::new("pdftotext")
            .args(["-q", "-enc", "UTF-8"])
            .arg(path)
            .arg("-")
            .stdout(Stdio::piped())
            .stderr(Stdio::null()),
        timeout,
    )
    .await?;

    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}
