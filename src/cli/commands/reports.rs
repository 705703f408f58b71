//! Report listing command.

use console::style;

use crate::cli::helpers::{open_db, truncate, yes_no};
use crate::config::Settings;

/// Print report summaries or failures of one site.
pub async fn cmd_reports(
    settings: &Settings,
    domain: &str,
    failures: bool,
    json: bool,
) -> anyhow::Result<()> {
    let ctx = open_db(settings).await?;

    if failures {
        let Some(failures) = ctx.list_failures_for_site(domain).await? else {
            println!("{} Site '{}' not found", style("✗").red(), domain);
            return Ok(());
        };
        if json {
            println!("{}", serde_json::to_string_pretty(&failures)?);
            return Ok(());
        }

        println!("\n{} ({} failures)", style(domain).bold(), failures.len());
        println!("{}", "-".repeat(100));
        for failure in failures {
            println!(
                "{}  {:<50} {}",
                failure.created_at.format("%Y-%m-%d %H:%M"),
                truncate(&failure.pdf_uri, 49),
                failure.error_message
            );
        }
        return Ok(());
    }

    let Some(reports) = ctx.list_reports_for_site(domain).await? else {
        println!("{} Site '{}' not found", style("✗").red(), domain);
        return Ok(());
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    println!("\n{} ({} PDFs)", style(domain).bold(), reports.len());
    println!("{}", "-".repeat(100));
    println!(
        "{:<50} {:>6} {:>6} {:<7} {:<11} {:>5} {}",
        "PDF", "Rules", "Checks", "Tagged", "Text", "Pages", "Flags"
    );
    println!("{}", "-".repeat(100));

    for summary in reports {
        let mut flags = Vec::new();
        if summary.pdf_is_archived {
            flags.push("archived");
        }
        if summary.pdf_returns_404 {
            flags.push("404");
        }
        if summary.parent_returns_404 {
            flags.push("parent-404");
        }
        if summary.pdf_is_removed {
            flags.push("removed");
        }

        let report = &summary.report;
        println!(
            "{:<50} {:>6} {:>6} {:<7} {:<11} {:>5} {}",
            truncate(&summary.pdf_uri, 49),
            report.violations,
            report.failed_checks,
            yes_no(report.tagged),
            report.pdf_text_type.as_str(),
            report.page_count,
            flags.join(",")
        );
    }

    Ok(())
}
