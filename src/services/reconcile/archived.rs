//! Archive flag detection over stored rows.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::ReconcileService;
use crate::archive::{archived_links, is_archived, link_key};
use crate::fetch::is_box_share_url;
use crate::models::PdfFile;

/// Counts from an archive detection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ArchiveSummary {
    pub checked: usize,
    /// Rows newly flagged as archived.
    pub flagged: usize,
    /// Rows whose archive flag was cleared.
    pub cleared: usize,
    pub pages_fetched: usize,
    /// Parent pages that could not be fetched; their rows kept their page verdict.
    pub page_failures: usize,
}

impl ReconcileService {
    /// Recompute the archive flag of every row from URL tokens and, unless
    /// `url_only`, archive markers on its parent page.
    ///
    /// Rows that no longer match are cleared. Where a verdict can't be
    /// reached (page not fetched, `url_only`, Box share not resolvable) the
    /// stored flag stands in for it.
    pub async fn update_archived(
        &self,
        domain: Option<&str>,
        url_only: bool,
    ) -> anyhow::Result<ArchiveSummary> {
        let rows = self.rows(domain).await?;
        let mut summary = ArchiveSummary::default();

        let mut by_parent: BTreeMap<String, Vec<PdfFile>> = BTreeMap::new();
        for row in rows {
            by_parent.entry(row.parent_uri.clone()).or_default().push(row);
        }

        for (parent_uri, rows) in by_parent {
            let on_page = if url_only {
                None
            } else {
                self.archived_on_page(&parent_uri, &mut summary).await
            };

            for row in rows {
                summary.checked += 1;
                // An unread page can't clear a flag it may have set.
                let marked = match &on_page {
                    Some(links) => links.contains(&link_key(&row.pdf_uri)),
                    None => row.pdf_is_archived,
                };
                let archived = marked || self.archived_by_name(&row, url_only).await;

                if archived == row.pdf_is_archived {
                    continue;
                }
                self.db.pdf_files().set_archived(row.id, archived).await?;
                if archived {
                    debug!("Archived: {}", row.pdf_uri);
                    summary.flagged += 1;
                } else {
                    debug!("No longer archived: {}", row.pdf_uri);
                    summary.cleared += 1;
                }
            }
        }

        info!(
            "Archive detection: {} rows checked, {} newly archived, {} cleared, {} pages fetched ({} failed)",
            summary.checked,
            summary.flagged,
            summary.cleared,
            summary.pages_fetched,
            summary.page_failures
        );
        Ok(summary)
    }

    /// URL and file-name heuristic for one row.
    async fn archived_by_name(&self, row: &PdfFile, url_only: bool) -> bool {
        if is_archived(&row.pdf_uri, &row.parent_uri, None) {
            return true;
        }
        if !is_box_share_url(&row.pdf_uri) {
            return false;
        }
        if url_only {
            return row.pdf_is_archived;
        }
        match self.fetcher.resolve_share(&row.pdf_uri).await {
            Ok(share) => is_archived(&row.pdf_uri, &row.parent_uri, Some(&share.filename)),
            Err(e) => {
                debug!("Keeping stored archive flag for {}: {}", row.pdf_uri, e);
                row.pdf_is_archived
            }
        }
    }

    async fn archived_on_page(
        &self,
        parent_uri: &str,
        summary: &mut ArchiveSummary,
    ) -> Option<HashSet<String>> {
        match self.fetcher.fetch_page(parent_uri).await {
            Ok(html) => {
                summary.pages_fetched += 1;
                Some(archived_links(&html, parent_uri))
            }
            Err(e) => {
                warn!("Could not fetch {} for archive markers: {}", parent_uri, e);
                summary.page_failures += 1;
                None
            }
        }
    }
}
