//! Initialize command.

use console::style;

use crate::config::Settings;

/// Create the data directory layout and the database schema.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    let ctx = settings.create_db_context();
    ctx.init_schema().await?;

    println!(
        "{} Initialized pdfaudit in {}",
        style("✓").green(),
        settings.data_dir.display()
    );
    println!(
        "  {} Crawl output is read from {}",
        style("→").dim(),
        settings.site_folders.display()
    );

    let sites = ctx.list_sites().await?;
    if sites.is_empty() {
        println!(
            "{} No sites registered. Add one with 'pdfaudit site add <domain>'",
            style("!").yellow()
        );
    }

    Ok(())
}
