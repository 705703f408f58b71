use serde::Serialize;

/// A website whose PDFs are scanned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Site {
    pub id: i32,
    pub domain_name: String,
    pub security_group_name: Option<String>,
    pub box_folder: Option<String>,
}

/// Canonical form of a domain used for lookups.
///
/// Case-insensitive, ignores a leading `www.`, a scheme and a trailing slash,
/// and treats `-` as `.` so crawl folder names map back to their domain.
pub fn normalize_domain(domain: &str) -> String {
    let lowered = domain.trim().to_ascii_lowercase();
    let without_scheme = lowered
        .strip_prefix("https://")
        .or_else(|| lowered.strip_prefix("http://"))
        .unwrap_or(&lowered);
    let host = without_scheme.trim_end_matches('/');
    let host = host.strip_prefix("www.").unwrap_or(host);
    host.replace('-', ".")
}

/// Name of the crawl output folder for a domain (`access.sfsu.edu` -> `access-sfsu-edu`).
pub fn folder_name_for_domain(domain: &str) -> String {
    normalize_domain(domain).replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("WWW.Access.SFSU.edu"), "access.sfsu.edu");
        assert_eq!(normalize_domain("access-sfsu-edu"), "access.sfsu.edu");
        assert_eq!(normalize_domain("https://www.sfsu.edu/"), "sfsu.edu");
    }

    #[test]
    fn test_folder_name_for_domain() {
        assert_eq!(folder_name_for_domain("www.access.sfsu.edu"), "access-sfsu-edu");
    }
}
