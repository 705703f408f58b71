//! Reconciliation commands.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::helpers::{build_fetcher, open_db};
use crate::config::Settings;
use crate::services::ReconcileService;

async fn service(settings: &Settings) -> anyhow::Result<ReconcileService> {
    let ctx = open_db(settings).await?;
    Ok(ReconcileService::new(ctx, build_fetcher(settings)?))
}

fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Probe stored links and record 404 flags.
pub async fn cmd_check_links(
    settings: &Settings,
    domain: Option<&str>,
    box_only: bool,
) -> anyhow::Result<()> {
    let service = service(settings).await?;
    let pb = spinner("Checking links...");
    let result = service.refresh_404_flags(domain, box_only).await;
    pb.finish_and_clear();
    let summary = result?;

    println!(
        "{} Checked {} rows: {} PDFs and {} parent pages return 404",
        style("✓").green(),
        summary.checked,
        summary.pdf_404,
        summary.parent_404
    );
    if summary.skipped > 0 {
        println!(
            "  {} {} rows skipped (whitespace in URI)",
            style("!").yellow(),
            summary.skipped
        );
    }
    Ok(())
}

/// Flag archived PDFs.
pub async fn cmd_update_archived(
    settings: &Settings,
    domain: Option<&str>,
    no_content: bool,
) -> anyhow::Result<()> {
    let service = service(settings).await?;
    let pb = spinner("Looking for archived content...");
    let result = service.update_archived(domain, no_content).await;
    pb.finish_and_clear();
    let summary = result?;

    println!(
        "{} Checked {} rows, {} newly archived, {} cleared",
        style("✓").green(),
        summary.checked,
        summary.flagged,
        summary.cleared
    );
    if summary.page_failures > 0 {
        println!(
            "  {} {} parent pages could not be fetched; their PDFs kept their page verdict",
            style("!").yellow(),
            summary.page_failures
        );
    }
    Ok(())
}

/// Flag rows missing from the latest crawl as removed.
pub async fn cmd_remove_stale(settings: &Settings, folder: Option<&str>) -> anyhow::Result<()> {
    let service = service(settings).await?;
    let summary = service
        .remove_stale(&settings.site_folders, &settings.crawl_filename, folder)
        .await?;

    println!(
        "{} {} rows removed, {} restored across {} folders",
        style("✓").green(),
        summary.removed,
        summary.restored,
        summary.folders
    );
    if summary.folders_skipped > 0 {
        println!(
            "  {} {} folders skipped (no site or no crawl output)",
            style("!").yellow(),
            summary.folders_skipped
        );
    }
    Ok(())
}
