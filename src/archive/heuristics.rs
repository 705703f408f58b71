/// Tokens that mark a URL as archived anywhere they appear.
const ARCHIVE_KEYWORDS: &[&str] = &[
    "archive",
    "archived",
    "archives",
    "old-site",
    "old_site",
    "legacy",
    "deprecated",
    "obsolete",
    "superseded",
    "historical",
    "past-events",
    "past_events",
    "outdated",
];

const ARCHIVE_PATHS: &[&str] = &[
    "/old/",
    "/backup/",
    "/previous/",
    "/outdated/",
    "/archive/",
    "/archived/",
    "/legacy/",
    "/obsolete/",
    "/deprecated/",
];

const ARCHIVE_PREFIXES: &[&str] = &[
    "archived_",
    "old_",
    "legacy_",
    "deprecated_",
    "obsolete_",
    "outdated_",
    "superseded_",
];

/// Checked against the file name without its extension.
const ARCHIVE_SUFFIXES: &[&str] = &[
    "_archived",
    "_old",
    "_legacy",
    "_deprecated",
    "_obsolete",
    "_outdated",
];

/// Lowercased last path segment of a URL, without query or fragment.
pub fn filename_of(uri: &str) -> String {
    let without_query = uri.split(['?', '#']).next().unwrap_or_default();
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// URL and file name heuristic.
///
/// `filename` overrides the name taken from `pdf_uri`; share links carry
/// their real name only on the share page.
pub fn is_archived(pdf_uri: &str, parent_uri: &str, filename: Option<&str>) -> bool {
    if pdf_uri.is_empty() && parent_uri.is_empty() {
        return false;
    }

    let pdf_lower = pdf_uri.to_lowercase();
    let parent_lower = parent_uri.to_lowercase();
    let in_either = |token: &&str| pdf_lower.contains(token) || parent_lower.contains(token);

    if ARCHIVE_KEYWORDS.iter().any(in_either) || ARCHIVE_PATHS.iter().any(in_either) {
        return true;
    }

    let filename = match filename {
        Some(name) => name.to_lowercase(),
        None => filename_of(pdf_uri),
    };
    if filename.is_empty() {
        return false;
    }
    if ARCHIVE_PREFIXES.iter().any(|p| filename.starts_with(p)) {
        return true;
    }

    let stem = filename
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .unwrap_or(&filename);
    ARCHIVE_SUFFIXES.iter().any(|s| stem.ends_with(s))
}
