//! Reconciliation jobs.
//!
//! Independent passes over stored PDFs that bring their flags in line with
//! the live web and the latest crawl: dead-link detection, archive detection
//! and removal of rows the crawler no longer finds. Each job is idempotent.

mod archived;
mod links;
mod removal;

use std::sync::Arc;

use crate::fetch::RemoteFetcher;
use crate::models::{PdfFile, Site};
use crate::repository::DbContext;

pub use archived::ArchiveSummary;
pub use links::LinkCheckSummary;
pub use removal::RemovalSummary;

/// Runs the reconciliation jobs against one database.
pub struct ReconcileService {
    db: DbContext,
    fetcher: Arc<dyn RemoteFetcher>,
}

impl ReconcileService {
    pub fn new(db: DbContext, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self { db, fetcher }
    }

    /// Sites selected by an optional domain filter.
    async fn sites(&self, domain: Option<&str>) -> anyhow::Result<Vec<Site>> {
        match domain {
            Some(domain) => match self.db.sites().get_by_domain(domain).await? {
                Some(site) => Ok(vec![site]),
                None => anyhow::bail!("Unknown site: {}", domain),
            },
            None => Ok(self.db.sites().get_all().await?),
        }
    }

    /// Every stored row, removed ones included, for one domain or all sites.
    async fn rows(&self, domain: Option<&str>) -> anyhow::Result<Vec<PdfFile>> {
        let mut rows = Vec::new();
        for site in self.sites(domain).await? {
            rows.extend(self.db.pdf_files().get_by_site(site.id).await?);
        }
        Ok(rows)
    }
}
