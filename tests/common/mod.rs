//! Fakes and fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pdfaudit::config::OverwritePolicy;
use pdfaudit::conformance::{content_hash, CheckerError, ConformanceChecker};
use pdfaudit::fetch::{
    FetchError, FetchedPdf, ProbeOutcome, RemoteFetcher, ResolvedShare, UnsupportedShareError,
};
use pdfaudit::models::{ConformanceReport, PdfTextType, Site};
use pdfaudit::repository::DbContext;
use pdfaudit::services::{CompletedScanSet, ScanConfig, ScanOrchestrator};
use tempfile::TempDir;

pub const CRAWL_FILENAME: &str = "scanned_pdfs.txt";

/// Network stand-in keyed by URL. Unknown PDFs and pages answer 404,
/// unknown probes answer 200.
#[derive(Default)]
pub struct FakeFetcher {
    pdfs: Mutex<HashMap<String, Vec<u8>>>,
    shares: Mutex<HashMap<String, ResolvedShare>>,
    pages: Mutex<HashMap<String, String>>,
    probes: Mutex<HashMap<String, ProbeOutcome>>,
    pub fetched: Mutex<Vec<String>>,
    pub probed: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pdf(&self, url: &str, bytes: &[u8]) {
        self.pdfs.lock().unwrap().insert(url.to_string(), bytes.to_vec());
    }

    pub fn set_share(&self, share_url: &str, download_url: &str, filename: &str) {
        self.shares.lock().unwrap().insert(
            share_url.to_string(),
            ResolvedShare {
                download_url: download_url.to_string(),
                filename: filename.to_string(),
            },
        );
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.pages.lock().unwrap().insert(url.to_string(), html.to_string());
    }

    pub fn remove_page(&self, url: &str) {
        self.pages.lock().unwrap().remove(url);
    }

    pub fn set_probe(&self, url: &str, outcome: ProbeOutcome) {
        self.probes.lock().unwrap().insert(url.to_string(), outcome);
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetched.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub fn total_fetches(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.pdfs
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn fetch_pdf(&self, url: &str) -> Result<FetchedPdf, FetchError> {
        self.fetched.lock().unwrap().push(url.to_string());
        let share = self.shares.lock().unwrap().get(url).cloned();
        match share {
            Some(resolved) => Ok(FetchedPdf {
                bytes: self.download(&resolved.download_url)?,
                filename: Some(resolved.filename),
            }),
            None => Ok(FetchedPdf {
                bytes: self.download(url)?,
                filename: url.rsplit('/').next().map(str::to_string),
            }),
        }
    }

    async fn resolve_share(&self, url: &str) -> Result<ResolvedShare, FetchError> {
        self.shares
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| UnsupportedShareError::NoItems.into())
    }

    async fn probe(&self, url: &str) -> ProbeOutcome {
        self.probed.lock().unwrap().push(url.to_string());
        self.probes
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or(ProbeOutcome::Status(200))
    }

    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::Status {
                status: 404,
                url: url.to_string(),
            })
    }
}

/// Checker stand-in: fingerprints the file and reports a fixed violation count.
pub struct FakeChecker {
    pub available: bool,
    pub violations: i32,
    pub checked: Mutex<usize>,
}

impl FakeChecker {
    pub fn new(violations: i32) -> Self {
        Self {
            available: true,
            violations,
            checked: Mutex::new(0),
        }
    }

    pub fn missing() -> Self {
        Self {
            available: false,
            ..Self::new(0)
        }
    }

    pub fn calls(&self) -> usize {
        *self.checked.lock().unwrap()
    }
}

#[async_trait]
impl ConformanceChecker for FakeChecker {
    async fn check(&self, pdf_path: &Path) -> Result<ConformanceReport, CheckerError> {
        *self.checked.lock().unwrap() += 1;
        if !self.available {
            return Err(CheckerError::ToolNotFound("verapdf".to_string()));
        }
        let bytes = std::fs::read(pdf_path)?;
        Ok(report(&content_hash(&bytes), self.violations))
    }
}

pub fn report(hash: &str, violations: i32) -> ConformanceReport {
    ConformanceReport {
        pdf_hash: hash.to_string(),
        violations,
        failed_checks: violations * 2,
        tagged: true,
        check_for_image_only: false,
        pdf_text_type: PdfTextType::Text,
        title_set: true,
        language_set: true,
        page_count: 5,
        has_form: false,
    }
}

/// Temp data directory with a database, a site-folder root and a work dir.
pub struct Workspace {
    pub dir: TempDir,
    pub db: DbContext,
}

impl Workspace {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("sites")).unwrap();
        std::fs::create_dir_all(dir.path().join("work")).unwrap();
        let db = DbContext::new(&dir.path().join("pdfaudit.db"));
        db.init_schema().await.unwrap();
        Self { dir, db }
    }

    pub fn site_folders(&self) -> PathBuf {
        self.dir.path().join("sites")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("completed_conformance")
    }

    pub async fn add_site(&self, domain: &str) -> Site {
        self.db.sites().upsert(domain, None, None).await.unwrap()
    }

    /// Write a crawl file for `folder`, one line per entry.
    pub fn write_crawl(&self, folder: &str, lines: &[&str]) {
        let path = self.site_folders().join(folder);
        std::fs::create_dir_all(&path).unwrap();
        let mut text = lines.join("\n");
        if !text.is_empty() {
            text.push('\n');
        }
        std::fs::write(path.join(CRAWL_FILENAME), text).unwrap();
    }

    pub fn config(&self, policy: OverwritePolicy) -> ScanConfig {
        ScanConfig {
            site_folders: self.site_folders(),
            crawl_filename: CRAWL_FILENAME.to_string(),
            work_dir: self.dir.path().join("work"),
            overwrite_policy: policy,
        }
    }

    /// Orchestrator resuming from the on-disk ledger.
    pub fn orchestrator(
        &self,
        fetcher: &Arc<FakeFetcher>,
        checker: &Arc<FakeChecker>,
    ) -> ScanOrchestrator {
        ScanOrchestrator::new(
            self.db.clone(),
            fetcher.clone(),
            checker.clone(),
            CompletedScanSet::open(&self.ledger_path()).unwrap(),
            self.config(OverwritePolicy::KeepExisting),
        )
    }

    /// Orchestrator with an emptied ledger.
    pub fn fresh_orchestrator(
        &self,
        fetcher: &Arc<FakeFetcher>,
        checker: &Arc<FakeChecker>,
    ) -> ScanOrchestrator {
        ScanOrchestrator::new(
            self.db.clone(),
            fetcher.clone(),
            checker.clone(),
            CompletedScanSet::fresh(&self.ledger_path()).unwrap(),
            self.config(OverwritePolicy::KeepExisting),
        )
    }
}
