//! Archive markers in the content of a parent page.
//!
//! A heading or paragraph mentioning an archive phrase opens an archived
//! section that runs until the next heading of the same or a higher level.
//! A page-wide "Archived Content" notice archives everything after it.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::fetch::box_share::{is_box_share_url, normalize_box_url};

const SECTION_PHRASES: &[&str] = &[
    "archive",
    "past events",
    "past-events",
    "legacy",
    "historical",
    "outdated",
    "obsolete",
    "superseded",
    "deprecated",
    "no longer current",
    "no longer maintained",
];

const PAGE_WIDE_PHRASES: &[&str] = &[
    "archived content",
    "this page has been archived",
    "this page is archived",
];

/// Headings are levels 1-6; paragraphs before any heading act as level 6.
const NO_HEADING_LEVEL: u8 = 6;

static MARKERS: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, a[href]").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Section(u8),
    PageWide,
}

/// Comparison key for a document link: URL-normalized, with Box share
/// variants collapsed to one form.
pub fn link_key(url: &str) -> String {
    let parsed = Url::parse(url.trim())
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.trim().to_string());
    normalize_box_url(&parsed)
}

/// Whether a URL points at a document the scan pipeline handles.
pub fn is_document_link(url: &str) -> bool {
    if is_box_share_url(url) {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or_default();
    path.to_ascii_lowercase().ends_with(".pdf")
}

fn heading_level(name: &str) -> Option<u8> {
    match name {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

fn text_of(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().to_lowercase()
}

fn mentions(text: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| text.contains(p))
}

/// Document links on the page that sit inside an archived region.
///
/// Links are resolved against `page_url` and returned as [`link_key`]s.
pub fn archived_links(html: &str, page_url: &str) -> HashSet<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();

    let mut archived = HashSet::new();
    let mut scope: Option<Scope> = None;
    let mut current_level = NO_HEADING_LEVEL;

    for el in document.select(&MARKERS) {
        let name = el.value().name();

        if let Some(level) = heading_level(name) {
            let text = text_of(&el);
            if scope == Some(Scope::PageWide) {
                continue;
            }
            if mentions(&text, PAGE_WIDE_PHRASES) {
                scope = Some(Scope::PageWide);
                continue;
            }
            current_level = level;
            match scope {
                // Nested headings stay inside the open section.
                Some(Scope::Section(open)) if level > open => {}
                _ => {
                    scope = mentions(&text, SECTION_PHRASES).then_some(Scope::Section(level));
                }
            }
            continue;
        }

        if name == "p" {
            if scope == Some(Scope::PageWide) {
                continue;
            }
            let text = text_of(&el);
            if mentions(&text, PAGE_WIDE_PHRASES) {
                scope = Some(Scope::PageWide);
            } else if scope.is_none() && mentions(&text, SECTION_PHRASES) {
                scope = Some(Scope::Section(current_level));
            }
            continue;
        }

        if scope.is_none() {
            continue;
        }
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        let resolved = match &base {
            Some(base) => base.join(href.trim()).map(|u| u.to_string()).ok(),
            None => Url::parse(href.trim()).map(|u| u.to_string()).ok(),
        };
        if let Some(link) = resolved.filter(|l| is_document_link(l)) {
            archived.insert(link_key(&link));
        }
    }

    archived
}
