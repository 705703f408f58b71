//! Conformance scan service.
//!
//! Walks each site's crawl output and takes every `(pdf_uri, parent_uri)` item
//! through skip / download / check / persist, recording failures instead of
//! aborting. Emits events for progress tracking; holds no UI concerns.

mod ledger;
mod types;

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::archive::is_archived;
use crate::config::{OverwritePolicy, Settings};
use crate::conformance::ConformanceChecker;
use crate::crawl::{self, SiteFolder, MALFORMED_LINE_MESSAGE};
use crate::fetch::{FetchError, RemoteFetcher};
use crate::models::{folder_name_for_domain, PdfPair, Site};
use crate::repository::DbContext;

pub use ledger::CompletedScanSet;
pub use types::{FailureKind, ScanEvent, ScanOutcome, ScanSummary};

/// Name of the downloaded PDF inside the work directory.
pub const WORK_PDF_FILENAME: &str = "current.pdf";

/// Configuration for the scan service.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    pub site_folders: PathBuf,
    pub crawl_filename: String,
    pub work_dir: PathBuf,
    pub overwrite_policy: OverwritePolicy,
}

impl ScanConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            site_folders: settings.site_folders.clone(),
            crawl_filename: settings.crawl_filename.clone(),
            work_dir: settings.work_dir.clone(),
            overwrite_policy: settings.overwrite_policy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemMode {
    /// Honor the ledger and the existing-report skip.
    Scan,
    /// Re-check unconditionally; the ledger is neither read nor written.
    Refresh(OverwritePolicy),
}

/// A per-item failure before it is written to the failure log.
struct ItemFailure {
    kind: FailureKind,
    message: String,
}

impl ItemFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<FetchError> for ItemFailure {
    fn from(e: FetchError) -> Self {
        let kind = match e {
            FetchError::UnsupportedShare(_) => FailureKind::UnsupportedShare,
            _ => FailureKind::Fetch,
        };
        Self::new(kind, e.to_string())
    }
}

/// Sequential scan pipeline over the repository, the network and the checker.
pub struct ScanOrchestrator {
    db: DbContext,
    fetcher: Arc<dyn RemoteFetcher>,
    checker: Arc<dyn ConformanceChecker>,
    ledger: CompletedScanSet,
    config: ScanConfig,
    event_tx: Option<mpsc::Sender<ScanEvent>>,
}

impl ScanOrchestrator {
    pub fn new(
        db: DbContext,
        fetcher: Arc<dyn RemoteFetcher>,
        checker: Arc<dyn ConformanceChecker>,
        ledger: CompletedScanSet,
        config: ScanConfig,
    ) -> Self {
        Self {
            db,
            fetcher,
            checker,
            ledger,
            config,
            event_tx: None,
        }
    }

    /// Send progress events to `tx`.
    pub fn with_events(mut self, tx: mpsc::Sender<ScanEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn ledger(&self) -> &CompletedScanSet {
        &self.ledger
    }

    async fn emit(&self, event: ScanEvent) {
        if let Some(tx) = &self.event_tx {
            let _ = tx.send(event).await;
        }
    }

    /// Scan every site folder under the configured root.
    ///
    /// Folders that don't map to a registered site are skipped.
    pub async fn scan_all(&mut self) -> anyhow::Result<ScanSummary> {
        let folders = crawl::list_site_folders(&self.config.site_folders, &self.config.crawl_filename)?;
        info!(
            "Scanning {} site folders under {}",
            folders.len(),
            self.config.site_folders.display()
        );

        let mut total = ScanSummary::default();
        for folder in folders {
            let summary = self.scan_folder(&folder).await?;
            total.merge(&summary);
        }

        info!(
            "Scan finished: {} checked, {} skipped, {} failed across {} sites ({} skipped)",
            total.succeeded,
            total.skipped_done + total.skipped_existing,
            total.failed,
            total.sites,
            total.sites_skipped
        );
        Ok(total)
    }

    /// Scan one site given its domain or its crawl folder name.
    pub async fn scan_site(&mut self, domain_or_folder: &str) -> anyhow::Result<ScanSummary> {
        let folder = SiteFolder::new(
            &self.config.site_folders,
            &folder_name_for_domain(domain_or_folder),
            &self.config.crawl_filename,
        );
        self.scan_folder(&folder).await
    }

    async fn skip_folder(&self, folder: &SiteFolder, reason: String) -> ScanSummary {
        warn!("Skipping {}: {}", folder.name, reason);
        self.emit(ScanEvent::SiteSkipped {
            folder: folder.name.clone(),
            reason,
        })
        .await;
        ScanSummary {
            sites_skipped: 1,
            ..Default::default()
        }
    }

    /// Scan the crawl output of one site folder.
    pub async fn scan_folder(&mut self, folder: &SiteFolder) -> anyhow::Result<ScanSummary> {
        let Some(site) = self.db.sites().get_by_domain(&folder.name).await? else {
            return Ok(self.skip_folder(folder, "no registered site".to_string()).await);
        };

        let output = match crawl::read_crawl_output(&folder.crawl_file).await {
            Ok(Some(output)) => output,
            Ok(None) => {
                let reason = format!("missing {}", folder.crawl_file.display());
                return Ok(self.skip_folder(folder, reason).await);
            }
            Err(e) => {
                let reason = format!("unreadable {}: {}", folder.crawl_file.display(), e);
                return Ok(self.skip_folder(folder, reason).await);
            }
        };

        self.emit(ScanEvent::SiteStarted {
            domain: site.domain_name.clone(),
            items: output.entries.len(),
        })
        .await;

        let mut summary = ScanSummary {
            sites: 1,
            ..Default::default()
        };

        for line in &output.malformed {
            let outcome = self.record_malformed(line, site.id).await;
            summary.record(&outcome);
        }

        for pair in &output.entries {
            self.emit(ScanEvent::ItemStarted { pair: pair.clone() }).await;
            let outcome = self.process_item(pair, site.id, ItemMode::Scan).await;
            summary.record(&outcome);
            self.emit(ScanEvent::ItemFinished {
                pair: pair.clone(),
                outcome,
            })
            .await;
        }

        info!(
            "{}: {} checked, {} already done, {} with reports, {} failed",
            site.domain_name,
            summary.succeeded,
            summary.skipped_done,
            summary.skipped_existing,
            summary.failed
        );
        self.emit(ScanEvent::SiteFinished {
            domain: site.domain_name.clone(),
            summary,
        })
        .await;
        Ok(summary)
    }

    /// A crawl line without both URLs is logged once per session.
    async fn record_malformed(&mut self, line: &str, site_id: i32) -> ScanOutcome {
        let key = PdfPair::new(line, "");
        if self.ledger.contains(&key) {
            return ScanOutcome::SkippedAlreadyDone;
        }
        let failure = ItemFailure::new(FailureKind::MalformedEntry, MALFORMED_LINE_MESSAGE);
        self.fail(&key, site_id, failure, ItemMode::Scan).await
    }

    /// Re-check every active PDF of one domain, or of every site, then clean up
    /// rows superseded by the new results.
    pub async fn refresh(
        &mut self,
        domain: Option<&str>,
        policy: OverwritePolicy,
    ) -> anyhow::Result<ScanSummary> {
        let sites: Vec<Site> = match domain {
            Some(domain) => match self.db.sites().get_by_domain(domain).await? {
                Some(site) => vec![site],
                None => anyhow::bail!("Unknown site: {}", domain),
            },
            None => self.db.sites().get_all().await?,
        };

        let mut total = ScanSummary::default();
        for site in sites {
            let pairs: BTreeSet<PdfPair> = self
                .db
                .pdf_files()
                .get_by_site(site.id)
                .await?
                .into_iter()
                .filter(|f| !f.pdf_is_removed)
                .map(|f| f.pair())
                .collect();

            self.emit(ScanEvent::SiteStarted {
                domain: site.domain_name.clone(),
                items: pairs.len(),
            })
            .await;

            let mut summary = ScanSummary {
                sites: 1,
                ..Default::default()
            };
            for pair in &pairs {
                self.emit(ScanEvent::ItemStarted { pair: pair.clone() }).await;
                let outcome = self
                    .process_item(pair, site.id, ItemMode::Refresh(policy))
                    .await;
                summary.record(&outcome);
                self.emit(ScanEvent::ItemFinished {
                    pair: pair.clone(),
                    outcome,
                })
                .await;
            }

            summary.duplicates_removed = self.db.pdf_files().delete_duplicates(site.id).await?;
            info!(
                "Refreshed {}: {} checked, {} failed, {} superseded rows removed",
                site.domain_name, summary.succeeded, summary.failed, summary.duplicates_removed
            );
            self.emit(ScanEvent::SiteFinished {
                domain: site.domain_name.clone(),
                summary,
            })
            .await;
            total.merge(&summary);
        }
        Ok(total)
    }

    async fn process_item(&mut self, pair: &PdfPair, site_id: i32, mode: ItemMode) -> ScanOutcome {
        if mode == ItemMode::Scan {
            if self.ledger.contains(pair) {
                debug!("Already done this session: {}", pair);
                return ScanOutcome::SkippedAlreadyDone;
            }

            match self.db.pdf_files().report_exists(pair).await {
                Ok(true) => {
                    debug!("Report exists: {}", pair);
                    self.mark_completed(pair);
                    return ScanOutcome::SkippedReportExists;
                }
                Ok(false) => {}
                Err(e) => {
                    let failure = ItemFailure::new(FailureKind::Persistence, e.to_string());
                    return self.fail(pair, site_id, failure, mode).await;
                }
            }
        }

        let policy = match mode {
            ItemMode::Scan => self.config.overwrite_policy,
            ItemMode::Refresh(policy) => policy,
        };

        match self.check_and_store(pair, site_id, policy).await {
            Ok(outcome) => {
                debug!("Checked {}: {:?}", pair, outcome);
                if mode == ItemMode::Scan {
                    self.mark_completed(pair);
                }
                outcome
            }
            Err(failure) => self.fail(pair, site_id, failure, mode).await,
        }
    }

    /// Fetch, check and persist one item.
    async fn check_and_store(
        &self,
        pair: &PdfPair,
        site_id: i32,
        policy: OverwritePolicy,
    ) -> Result<ScanOutcome, ItemFailure> {
        let pdf = self.fetcher.fetch_pdf(&pair.pdf_uri).await?;

        let local_path = self.config.work_dir.join(WORK_PDF_FILENAME);
        tokio::fs::write(&local_path, &pdf.bytes).await.map_err(|e| {
            ItemFailure::new(
                FailureKind::Checker,
                format!("Failed to write {}: {}", local_path.display(), e),
            )
        })?;

        let report = self
            .checker
            .check(&local_path)
            .await
            .map_err(|e| ItemFailure::new(FailureKind::Checker, e.to_string()))?;

        let archived = is_archived(&pair.pdf_uri, &pair.parent_uri, pdf.filename.as_deref());

        let upsert = self
            .db
            .pdf_files()
            .upsert_pdf_and_report(pair, site_id, &report, archived, policy)
            .await
            .map_err(|e| ItemFailure::new(FailureKind::Persistence, e.to_string()))?;

        Ok(ScanOutcome::Succeeded {
            hash: report.pdf_hash,
            violations: report.violations,
            archived,
            report_inserted: upsert.report_inserted,
            pdf_inserted: upsert.pdf_inserted,
        })
    }

    /// Write the failure log entry; the item only counts as done once it is stored.
    async fn fail(
        &mut self,
        pair: &PdfPair,
        site_id: i32,
        failure: ItemFailure,
        mode: ItemMode,
    ) -> ScanOutcome {
        warn!("{} failed ({}): {}", pair, failure.kind, failure.message);

        match self
            .db
            .failures()
            .record_failure(pair, site_id, &failure.message)
            .await
        {
            Ok(()) => {
                if mode == ItemMode::Scan {
                    self.mark_completed(pair);
                }
            }
            Err(e) => warn!("Could not record failure for {}: {}", pair, e),
        }

        ScanOutcome::failed(failure.kind, failure.message)
    }

    fn mark_completed(&mut self, pair: &PdfPair) {
        if let Err(e) = self.ledger.mark(pair) {
            warn!(
                "Could not append {} to {}: {}",
                pair,
                self.ledger.path().display(),
                e
            );
        }
    }
}
