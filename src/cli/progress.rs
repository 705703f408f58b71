//! Progress display for scan events.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::services::{ScanEvent, ScanOutcome};

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// Spawn a task that renders scan events until the sender is dropped.
pub fn spawn_scan_progress(mut event_rx: mpsc::Receiver<ScanEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;

        while let Some(event) = event_rx.recv().await {
            match event {
                ScanEvent::SiteStarted { domain, items } => {
                    println!("{} {} ({} items)", style("→").cyan(), domain, items);
                    let bar = ProgressBar::new(items as u64);
                    bar.set_style(bar_style());
                    progress = Some(bar);
                }
                ScanEvent::SiteSkipped { folder, reason } => {
                    println!("{} Skipped {}: {}", style("!").yellow(), folder, reason);
                }
                ScanEvent::ItemStarted { pair } => {
                    if let Some(ref bar) = progress {
                        bar.set_message(pair.pdf_uri);
                    }
                }
                ScanEvent::ItemFinished { pair, outcome } => {
                    if let Some(ref bar) = progress {
                        if let ScanOutcome::Failed { message, .. } = &outcome {
                            bar.println(format!(
                                "  {} {}: {}",
                                style("✗").red(),
                                pair.pdf_uri,
                                message
                            ));
                        }
                        bar.inc(1);
                    }
                }
                ScanEvent::SiteFinished { domain, summary } => {
                    if let Some(bar) = progress.take() {
                        bar.finish_and_clear();
                    }
                    println!(
                        "{} {}: {} checked, {} skipped, {} failed",
                        style("✓").green(),
                        domain,
                        summary.succeeded,
                        summary.skipped_done + summary.skipped_existing,
                        summary.failed
                    );
                    if summary.duplicates_removed > 0 {
                        println!(
                            "  {} {} superseded rows removed",
                            style("→").dim(),
                            summary.duplicates_removed
                        );
                    }
                }
            }
        }

        if let Some(bar) = progress {
            bar.finish_and_clear();
        }
    })
}
