//! Shared helper functions for CLI commands.

use std::sync::Arc;

use console::style;

use crate::config::Settings;
use crate::conformance::VeraPdfChecker;
use crate::fetch::Fetcher;
use crate::repository::DbContext;

/// Open the database, creating the schema if needed.
pub async fn open_db(settings: &Settings) -> anyhow::Result<DbContext> {
    settings.ensure_directories()?;
    let ctx = settings.create_db_context();
    ctx.init_schema().await?;
    Ok(ctx)
}

pub fn build_fetcher(settings: &Settings) -> anyhow::Result<Arc<Fetcher>> {
    Ok(Arc::new(Fetcher::from_settings(settings)?))
}

/// veraPDF checker; warns when the binary is missing since every item will fail.
pub fn build_checker(settings: &Settings) -> Arc<VeraPdfChecker> {
    let checker = VeraPdfChecker::from_settings(settings);
    if !checker.is_available() {
        println!(
            "{} veraPDF not found ({}); every item will be recorded as a failure",
            style("!").yellow(),
            settings.checker.command
        );
    }
    Arc::new(checker)
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
