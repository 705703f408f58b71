//! Scan service types and events.

use std::fmt;

use serde::Serialize;

use crate::models::PdfPair;

/// Why an item ended in [`ScanOutcome::Failed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fetch,
    UnsupportedShare,
    Checker,
    Persistence,
    MalformedEntry,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Fetch => "fetch",
            Self::UnsupportedShare => "unsupported share",
            Self::Checker => "checker",
            Self::Persistence => "persistence",
            Self::MalformedEntry => "malformed entry",
        };
        f.write_str(s)
    }
}

/// Terminal state of one `(pdf_uri, parent_uri)` item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Already handled earlier in this session.
    SkippedAlreadyDone,
    /// A row and a report already exist for the pair.
    SkippedReportExists,
    Failed {
        kind: FailureKind,
        message: String,
    },
    Succeeded {
        hash: String,
        violations: i32,
        archived: bool,
        report_inserted: bool,
        pdf_inserted: bool,
    },
}

impl ScanOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SkippedAlreadyDone | Self::SkippedReportExists)
    }
}

/// Events emitted while a site is scanned.
#[derive(Debug, Clone)]
pub enum ScanEvent {
    SiteStarted {
        domain: String,
        items: usize,
    },
    /// The crawl file of a site folder could not be used.
    SiteSkipped {
        folder: String,
        reason: String,
    },
    ItemStarted {
        pair: PdfPair,
    },
    ItemFinished {
        pair: PdfPair,
        outcome: ScanOutcome,
    },
    SiteFinished {
        domain: String,
        summary: ScanSummary,
    },
}

/// Outcome counts of a scan or refresh run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanSummary {
    pub succeeded: usize,
    pub skipped_done: usize,
    pub skipped_existing: usize,
    pub failed: usize,
    pub sites: usize,
    pub sites_skipped: usize,
    /// Rows logically removed by duplicate cleanup.
    pub duplicates_removed: usize,
}

impl ScanSummary {
    pub fn record(&mut self, outcome: &ScanOutcome) {
        match outcome {
            ScanOutcome::SkippedAlreadyDone => self.skipped_done += 1,
            ScanOutcome::SkippedReportExists => self.skipped_existing += 1,
            ScanOutcome::Failed { .. } => self.failed += 1,
            ScanOutcome::Succeeded { .. } => self.succeeded += 1,
        }
    }

    pub fn merge(&mut self, other: &ScanSummary) {
        self.succeeded += other.succeeded;
        self.skipped_done += other.skipped_done;
        self.skipped_existing += other.skipped_existing;
        self.failed += other.failed;
        self.sites += other.sites;
        self.sites_skipped += other.sites_skipped;
        self.duplicates_removed += other.duplicates_removed;
    }

    pub fn processed(&self) -> usize {
        self.succeeded + self.skipped_done + self.skipped_existing + self.failed
    }
}
