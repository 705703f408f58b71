//! Removal of rows the latest crawl no longer finds.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use super::ReconcileService;
use crate::crawl::{self, SiteFolder};
use crate::fetch::normalize_box_url;
use crate::models::{folder_name_for_domain, PdfPair};

/// Counts from a removal pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RemovalSummary {
    pub folders: usize,
    /// Folders left untouched: no site, or no usable crawl output.
    pub folders_skipped: usize,
    pub removed: usize,
    pub restored: usize,
}

fn crawl_key(pdf_uri: &str, parent_uri: &str) -> (String, String) {
    (normalize_box_url(pdf_uri), normalize_box_url(parent_uri))
}

impl ReconcileService {
    /// Reconcile every site folder under `root`, or only `folder` when given.
    pub async fn remove_stale(
        &self,
        root: &Path,
        crawl_filename: &str,
        folder: Option<&str>,
    ) -> anyhow::Result<RemovalSummary> {
        let folders = match folder {
            Some(name) => vec![SiteFolder::new(root, &folder_name_for_domain(name), crawl_filename)],
            None => crawl::list_site_folders(root, crawl_filename)?,
        };

        let mut summary = RemovalSummary::default();
        for folder in folders {
            self.reconcile_folder(&folder, &mut summary).await?;
        }

        info!(
            "Removal reconciliation: {} rows removed, {} restored across {} folders ({} skipped)",
            summary.removed, summary.restored, summary.folders, summary.folders_skipped
        );
        Ok(summary)
    }

    async fn reconcile_folder(
        &self,
        folder: &SiteFolder,
        summary: &mut RemovalSummary,
    ) -> anyhow::Result<()> {
        let Some(site) = self.db.sites().get_by_domain(&folder.name).await? else {
            warn!("Skipping {}: no registered site", folder.name);
            summary.folders_skipped += 1;
            return Ok(());
        };

        // Without a fresh, non-empty crawl nothing can be judged missing.
        let output = match crawl::read_crawl_output(&folder.crawl_file).await {
            Ok(Some(output)) if !output.is_empty() => output,
            Ok(_) => {
                warn!("Skipping {}: crawl output missing or empty", folder.name);
                summary.folders_skipped += 1;
                return Ok(());
            }
            Err(e) => {
                warn!("Skipping {}: {}", folder.name, e);
                summary.folders_skipped += 1;
                return Ok(());
            }
        };

        let crawled: HashSet<(String, String)> = output
            .entries
            .iter()
            .map(|pair| crawl_key(&pair.pdf_uri, &pair.parent_uri))
            .collect();

        let rows = self.db.pdf_files().get_by_site(site.id).await?;
        let active: HashSet<PdfPair> = rows
            .iter()
            .filter(|row| !row.pdf_is_removed)
            .map(|row| row.pair())
            .collect();

        let mut missing: BTreeSet<PdfPair> = BTreeSet::new();
        let mut reappeared: BTreeSet<PdfPair> = BTreeSet::new();
        for row in &rows {
            let present = crawled.contains(&crawl_key(&row.pdf_uri, &row.parent_uri));
            match (present, row.pdf_is_removed) {
                (false, false) => {
                    missing.insert(row.pair());
                }
                // Superseded hashes of a live pair stay removed.
                (true, true) if !active.contains(&row.pair()) => {
                    reappeared.insert(row.pair());
                }
                _ => {}
            }
        }

        let repo = self.db.pdf_files();
        for pair in &missing {
            summary.removed += repo.mark_pdf_removed(pair).await?;
        }
        for pair in &reappeared {
            summary.restored += repo.restore_pdf(pair).await?;
        }
        if !reappeared.is_empty() {
            repo.delete_duplicates(site.id).await?;
        }

        summary.folders += 1;
        info!(
            "{}: {} stale rows removed, {} restored",
            site.domain_name,
            missing.len(),
            reappeared.len()
        );
        Ok(())
    }
}
