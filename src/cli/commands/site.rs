//! Site registry commands.

use console::style;

use crate::cli::helpers::{open_db, truncate};
use crate::config::Settings;
use crate::models::folder_name_for_domain;

/// Register a site or update its metadata.
pub async fn cmd_site_add(
    settings: &Settings,
    domain: &str,
    security_group: Option<&str>,
    box_folder: Option<&str>,
) -> anyhow::Result<()> {
    let ctx = open_db(settings).await?;
    let site = ctx.sites().upsert(domain, security_group, box_folder).await?;

    println!(
        "{} Registered {} (id {})",
        style("✓").green(),
        site.domain_name,
        site.id
    );
    println!(
        "  {} Crawl folder: {}",
        style("→").dim(),
        settings
            .site_folders
            .join(folder_name_for_domain(&site.domain_name))
            .display()
    );
    Ok(())
}

/// List registered sites.
pub async fn cmd_site_list(settings: &Settings) -> anyhow::Result<()> {
    let ctx = open_db(settings).await?;
    let sites = ctx.list_sites().await?;

    if sites.is_empty() {
        println!(
            "{} No sites registered. Run 'pdfaudit site add <domain>' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    println!("\n{}", style("Sites").bold());
    println!("{}", "-".repeat(72));
    println!("{:<5} {:<32} {:<18} Box folder", "ID", "Domain", "Security group");
    println!("{}", "-".repeat(72));

    for site in sites {
        println!(
            "{:<5} {:<32} {:<18} {}",
            site.id,
            truncate(&site.domain_name, 31),
            truncate(site.security_group_name.as_deref().unwrap_or("-"), 17),
            site.box_folder.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
