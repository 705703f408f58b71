//! User agent handling for HTTP requests.

/// Desktop Chrome user agent. Several campus sites reject obvious bots.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Accept header sent alongside the browser user agent.
pub const ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,application/pdf,*/*;q=0.8";

/// Resolve user agent from config value.
/// - None or empty => browser user agent
/// - other => custom user agent string
pub fn resolve_user_agent(config: Option<&str>) -> String {
    match config {
        None | Some("") => DEFAULT_USER_AGENT.to_string(),
        Some(custom) => custom.to_string(),
    }
}
