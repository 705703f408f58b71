//! Scan and refresh commands.

use console::style;
use tokio::sync::mpsc;

use crate::cli::helpers::{build_checker, build_fetcher, open_db};
use crate::cli::progress::spawn_scan_progress;
use crate::config::{OverwritePolicy, Settings};
use crate::services::{CompletedScanSet, ScanConfig, ScanEvent, ScanOrchestrator, ScanSummary};

async fn orchestrator(settings: &Settings, fresh: bool) -> anyhow::Result<ScanOrchestrator> {
    let ctx = open_db(settings).await?;
    let ledger_path = settings.ledger_path();
    let ledger = if fresh {
        CompletedScanSet::fresh(&ledger_path)?
    } else {
        CompletedScanSet::open(&ledger_path)?
    };

    if !ledger.is_empty() {
        println!(
            "{} Resuming session: {} items already handled (use --fresh to start over)",
            style("→").cyan(),
            ledger.len()
        );
    }

    Ok(ScanOrchestrator::new(
        ctx,
        build_fetcher(settings)?,
        build_checker(settings),
        ledger,
        ScanConfig::from_settings(settings),
    ))
}

fn print_summary(summary: &ScanSummary) {
    println!(
        "{} Done: {} checked, {} skipped, {} failed across {} sites",
        style("✓").green(),
        summary.succeeded,
        summary.skipped_done + summary.skipped_existing,
        summary.failed,
        summary.sites
    );
    if summary.sites_skipped > 0 {
        println!(
            "  {} {} site folders skipped",
            style("!").yellow(),
            summary.sites_skipped
        );
    }
}

/// Scan every site folder.
pub async fn cmd_scan(settings: &Settings, fresh: bool) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<ScanEvent>(100);
    let display = spawn_scan_progress(event_rx);

    let mut scanner = orchestrator(settings, fresh).await?.with_events(event_tx);
    let result = scanner.scan_all().await;
    drop(scanner);
    let _ = display.await;

    print_summary(&result?);
    Ok(())
}

/// Scan one site by domain or crawl folder name.
pub async fn cmd_scan_site(settings: &Settings, site: &str) -> anyhow::Result<()> {
    let (event_tx, event_rx) = mpsc::channel::<ScanEvent>(100);
    let display = spawn_scan_progress(event_rx);

    let mut scanner = orchestrator(settings, false).await?.with_events(event_tx);
    let result = scanner.scan_site(site).await;
    drop(scanner);
    let _ = display.await;

    print_summary(&result?);
    Ok(())
}

/// Re-check stored PDFs and clean up superseded rows.
pub async fn cmd_refresh(settings: &Settings, domain: Option<&str>, replace: bool) -> anyhow::Result<()> {
    let policy = if replace {
        OverwritePolicy::Replace
    } else {
        settings.overwrite_policy
    };

    let (event_tx, event_rx) = mpsc::channel::<ScanEvent>(100);
    let display = spawn_scan_progress(event_rx);

    let mut scanner = orchestrator(settings, false).await?.with_events(event_tx);
    let result = scanner.refresh(domain, policy).await;
    drop(scanner);
    let _ = display.await;

    let summary = result?;
    print_summary(&summary);
    println!(
        "  {} {} superseded rows removed",
        style("→").dim(),
        summary.duplicates_removed
    );
    Ok(())
}
