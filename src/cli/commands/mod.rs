//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific modules.

mod init;
mod reconcile;
mod reports;
mod scan;
mod site;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::{load_settings_with_options, LoadOptions};

#[derive(Parser)]
#[command(name = "pdfaudit")]
#[command(about = "PDF accessibility conformance scanning for university websites")]
#[command(version)]
pub struct Cli {
    /// Data directory (overrides config file)
    #[arg(long, short = 't', global = true)]
    target: Option<PathBuf>,

    /// Config file path (overrides auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Resolve relative paths from current working directory instead of config file location
    #[arg(long, global = true)]
    cwd: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Create the data directory and the database schema
    Init,

    /// Manage the site registry
    Site {
        #[command(subcommand)]
        command: SiteCommands,
    },

    /// Scan the crawl output of every site folder
    Scan {
        /// Forget which items this session already handled
        #[arg(long)]
        fresh: bool,
    },

    /// Scan one site
    ScanSite {
        /// Domain (access.sfsu.edu) or crawl folder name (access-sfsu-edu)
        site: String,
    },

    /// Re-check every stored PDF, then remove superseded rows
    Refresh {
        /// Only refresh this domain
        #[arg(short, long)]
        domain: Option<String>,
        /// Overwrite existing reports instead of keeping them
        #[arg(long)]
        replace: bool,
    },

    /// Probe stored PDF and parent URLs and record which return 404
    CheckLinks {
        /// Only check this domain
        #[arg(short, long)]
        domain: Option<String>,
        /// Only check Box share links
        #[arg(long)]
        box_only: bool,
    },

    /// Flag archived PDFs by URL tokens and parent page markers
    UpdateArchived {
        /// Only update this domain
        #[arg(short, long)]
        domain: Option<String>,
        /// Use URL tokens only, without fetching parent pages
        #[arg(long)]
        no_content: bool,
    },

    /// Flag rows the latest crawl no longer finds as removed
    RemoveStale {
        /// Only reconcile this site folder (or domain)
        #[arg(short, long)]
        folder: Option<String>,
    },

    /// Show stored reports of a site
    Reports {
        /// Site domain
        domain: String,
        /// Show the failure log instead of reports
        #[arg(long)]
        failures: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SiteCommands {
    /// Register a site, or update its metadata
    Add {
        /// Domain name, e.g. access.sfsu.edu
        domain: String,
        /// Security group responsible for the site
        #[arg(long)]
        security_group: Option<String>,
        /// Box folder associated with the site
        #[arg(long)]
        box_folder: Option<String>,
    },
    /// List registered sites
    List,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config,
        data_dir: cli.target,
        use_cwd: cli.cwd,
    };
    let (settings, _config) = load_settings_with_options(options).await;

    match cli.command {
        Commands::Init => init::cmd_init(&settings).await,
        Commands::Site { command } => match command {
            SiteCommands::Add {
                domain,
                security_group,
                box_folder,
            } => {
                site::cmd_site_add(
                    &settings,
                    &domain,
                    security_group.as_deref(),
                    box_folder.as_deref(),
                )
                .await
            }
            SiteCommands::List => site::cmd_site_list(&settings).await,
        },
        Commands::Scan { fresh } => scan::cmd_scan(&settings, fresh).await,
        Commands::ScanSite { site } => scan::cmd_scan_site(&settings, &site).await,
        Commands::Refresh { domain, replace } => {
            scan::cmd_refresh(&settings, domain.as_deref(), replace).await
        }
        Commands::CheckLinks { domain, box_only } => {
            reconcile::cmd_check_links(&settings, domain.as_deref(), box_only).await
        }
        Commands::UpdateArchived { domain, no_content } => {
            reconcile::cmd_update_archived(&settings, domain.as_deref(), no_content).await
        }
        Commands::RemoveStale { folder } => {
            reconcile::cmd_remove_stale(&settings, folder.as_deref()).await
        }
        Commands::Reports {
            domain,
            failures,
            json,
        } => reports::cmd_reports(&settings, &domain, failures, json).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_refresh_flags() {
        let cli = Cli::parse_from(["pdfaudit", "refresh", "--domain", "access.sfsu.edu", "--replace"]);
        match cli.command {
            Commands::Refresh { domain, replace } => {
                assert_eq!(domain.as_deref(), Some("access.sfsu.edu"));
                assert!(replace);
            }
            _ => panic!("expected refresh"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_command() {
        let cli = Cli::parse_from(["pdfaudit", "check-links", "--box-only", "-v", "--config", "x.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::CheckLinks { box_only: true, domain: None }));
    }

    #[test]
    fn test_clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
