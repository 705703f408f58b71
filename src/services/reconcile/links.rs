//! Dead-link detection for stored PDFs and their parent pages.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info};

use super::ReconcileService;
use crate::fetch::is_box_share_url;

/// Counts from a 404 refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LinkCheckSummary {
    pub checked: usize,
    /// Rows whose URIs can't be probed as-is.
    pub skipped: usize,
    pub pdf_404: usize,
    pub parent_404: usize,
}

impl ReconcileService {
    /// Probe the PDF and parent URL of every row and store both 404 flags.
    ///
    /// With `box_only`, only rows whose PDF is a Box share link are probed.
    pub async fn refresh_404_flags(
        &self,
        domain: Option<&str>,
        box_only: bool,
    ) -> anyhow::Result<LinkCheckSummary> {
        let rows = self.rows(domain).await?;
        let mut summary = LinkCheckSummary::default();
        let mut parent_results: HashMap<String, bool> = HashMap::new();

        for row in rows {
            let is_box = is_box_share_url(&row.pdf_uri);
            if box_only && !is_box {
                continue;
            }
            if has_whitespace(&row.pdf_uri) || has_whitespace(&row.parent_uri) {
                debug!("Skipping URI with whitespace: {}", row.pdf_uri);
                summary.skipped += 1;
                continue;
            }

            let pdf_404 = if is_box {
                self.box_returns_404(&row.pdf_uri).await
            } else {
                self.fetcher.probe(&row.pdf_uri).await.returns_404()
            };

            let parent_404 = match parent_results.get(&row.parent_uri) {
                Some(result) => *result,
                None => {
                    let result = self.fetcher.probe(&row.parent_uri).await.returns_404();
                    parent_results.insert(row.parent_uri.clone(), result);
                    result
                }
            };

            self.db
                .pdf_files()
                .set_404_flags(row.id, pdf_404, parent_404)
                .await?;

            summary.checked += 1;
            summary.pdf_404 += usize::from(pdf_404);
            summary.parent_404 += usize::from(parent_404);
        }

        info!(
            "Checked {} links: {} PDFs and {} parent pages return 404 ({} skipped)",
            summary.checked, summary.pdf_404, summary.parent_404, summary.skipped
        );
        Ok(summary)
    }

    /// A share that no longer resolves counts as gone.
    async fn box_returns_404(&self, share_url: &str) -> bool {
        match self.fetcher.resolve_share(share_url).await {
            Ok(resolved) => self.fetcher.probe(&resolved.download_url).await.returns_404(),
            Err(e) => {
                debug!("Share {} did not resolve: {}", share_url, e);
                true
            }
        }
    }
}

fn has_whitespace(uri: &str) -> bool {
    uri.chars().any(char::is_whitespace)
}
